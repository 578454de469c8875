//! Execution layer
//!
//! The pieces that take a resolved workflow and actually run it: the step
//! runner, environment provisioning, fixture fetching, the per-job executor,
//! and the scheduler that fans jobs out concurrently.

pub mod cancel;
pub mod executor;
pub mod fixtures;
pub mod provisioner;
pub mod runner;
pub mod scheduler;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use executor::JobExecutor;
pub use fixtures::{FixtureFetcher, FixtureSource};
pub use provisioner::{EnvHandle, LocalProvisioner, Provisioner};
pub use runner::{StepOutcome, StepRunner};
pub use scheduler::{EventHandler, WorkflowEvent, WorkflowScheduler};
