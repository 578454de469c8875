//! Engine error taxonomy
//!
//! Step failures are deliberately *not* errors: a non-zero exit is recorded
//! in the job report and handled by the executor's control flow. Everything
//! here is a fault of the engine or its inputs, not of a step command.

use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Faults raised by the orchestration engine itself
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed job/workflow definition, or a cache-key input file that is
    /// missing before any step has run. Fatal for the affected job; fatal for
    /// the whole run only when raised at configuration-parse time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The execution environment could not be created. The job is marked
    /// `Errored` and none of its steps run.
    #[error("provisioning failed: {0}")]
    Provisioning(String),

    /// Cache store fault (distinct from a cache miss, which is not an error)
    #[error("cache error: {0}")]
    Cache(String),

    /// The run was cancelled while this operation was in flight
    #[error("cancelled")]
    Cancelled,

    /// Internal engine fault
    #[error("engine error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether this error came from the run being cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}
