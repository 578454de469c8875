//! Core domain models for Conveyor
//!
//! This module defines the fundamental data structures that represent
//! jobs, steps, environments, workflows, and their configuration.

pub mod config;
pub mod environment;
pub mod job;
pub mod state;
pub mod workflow;

pub use config::WorkflowConfig;
pub use environment::{EnvironmentKind, EnvironmentSpec};
pub use job::{CachePolicy, FixturePolicy, JobBuilder, JobDefinition, RunWhen, StepDefinition};
pub use state::{
    AttemptRecord, CacheActivity, JobReport, JobStatus, StepReport, StepStatus, WorkflowReport,
    WorkflowStatus,
};
pub use workflow::WorkflowGraph;
