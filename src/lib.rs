//! conveyor - a CI workflow orchestration engine

pub mod cache;
pub mod cli;
pub mod core;
pub mod error;
pub mod execution;
pub mod persistence;

// Re-export commonly used types
pub use cache::{derive_key, CacheKey, CacheStore};
pub use core::{
    JobDefinition, JobReport, JobStatus, StepDefinition, WorkflowConfig, WorkflowGraph,
    WorkflowReport, WorkflowStatus,
};
pub use error::{EngineError, EngineResult};
pub use execution::{
    cancel_pair, CancelHandle, CancelSignal, JobExecutor, LocalProvisioner, Provisioner,
    WorkflowEvent, WorkflowScheduler,
};
