//! Run result models
//!
//! A job moves `Pending -> Running -> {Succeeded, Failed, Errored, Cancelled}`.
//! The workflow-level result is a pure reduction over its jobs' terminal
//! states: it succeeds iff every job succeeded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal and in-flight states of a single job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Job has not started
    Pending,
    /// Environment is being provisioned or steps are running
    Running,
    /// All decisive steps exited zero
    Succeeded,
    /// A step exited non-zero
    Failed,
    /// The engine could not run the job (configuration or provisioning fault)
    Errored,
    /// The run was cancelled while the job was in flight
    Cancelled,
}

impl JobStatus {
    /// Check if the job is in a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    /// Whether this state counts as a pass for the workflow reduction
    pub fn is_passing(&self) -> bool {
        matches!(self, JobStatus::Succeeded)
    }
}

/// Aggregate result of a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStatus {
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

/// How a step ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    /// Final attempt exited zero
    Succeeded,
    /// Final attempt exited non-zero (all retries, if any, exhausted)
    Failed,
    /// Execution condition not met (an `on_fail` step after a success, or an
    /// `on_success` step after the job already failed)
    Skipped { reason: String },
}

/// One execution attempt of a step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based attempt number
    pub attempt: usize,
    /// Exit code of the child process, if it exited normally
    pub exit_code: Option<i32>,
    pub succeeded: bool,
    pub duration_ms: u64,
}

/// Recorded outcome of one step, including every retry attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub name: String,
    pub status: StepStatus,
    pub attempts: Vec<AttemptRecord>,
}

impl StepReport {
    pub fn skipped(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            status: StepStatus::Skipped {
                reason: reason.to_string(),
            },
            attempts: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        !matches!(self.status, StepStatus::Failed)
    }
}

/// Cache activity recorded for a job run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheActivity {
    /// Key that was restored, if the lookup hit
    pub restored_key: Option<String>,
    /// Key the paths were saved under, if the save checkpoint was reached
    pub saved_key: Option<String>,
}

/// Full record of one job's run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: String,
    pub status: JobStatus,
    pub steps: Vec<StepReport>,
    /// Combined stdout/stderr of every executed step, in order
    pub log: String,
    /// Engine-level error message for `Errored` jobs
    pub error: Option<String>,
    pub cache: CacheActivity,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobReport {
    pub fn new(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: JobStatus::Pending,
            steps: Vec::new(),
            log: String::new(),
            error: None,
            cache: CacheActivity::default(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Mark the job terminal with the given status
    pub fn finish(&mut self, status: JobStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    /// Look up a step report by name
    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Number of attempts recorded for a step
    pub fn step_attempts(&self, name: &str) -> usize {
        self.step(name).map(|s| s.attempts.len()).unwrap_or(0)
    }
}

/// Aggregate report for a workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReport {
    /// Unique run ID
    pub run_id: Uuid,
    pub workflow_name: String,
    pub status: WorkflowStatus,
    pub jobs: Vec<JobReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowReport {
    pub fn new(workflow_name: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            workflow_name: workflow_name.to_string(),
            status: WorkflowStatus::Running,
            jobs: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Reduce job statuses into the aggregate result. Cancellation wins over
    /// failure so an interrupted run is never reported as a plain failure.
    pub fn finish(&mut self) {
        let cancelled = self
            .jobs
            .iter()
            .any(|j| matches!(j.status, JobStatus::Cancelled));
        self.status = if cancelled {
            WorkflowStatus::Cancelled
        } else if self.jobs.iter().all(|j| j.status.is_passing()) {
            WorkflowStatus::Succeeded
        } else {
            WorkflowStatus::Failed
        };
        self.finished_at = Some(Utc::now());
    }

    pub fn passed(&self) -> bool {
        matches!(self.status, WorkflowStatus::Succeeded)
    }

    pub fn job(&self, job_id: &str) -> Option<&JobReport> {
        self.jobs.iter().find(|j| j.job_id == job_id)
    }

    pub fn succeeded_jobs(&self) -> usize {
        self.jobs.iter().filter(|j| j.status.is_passing()).count()
    }

    pub fn failed_jobs(&self) -> usize {
        self.jobs.iter().filter(|j| !j.status.is_passing()).count()
    }
}
