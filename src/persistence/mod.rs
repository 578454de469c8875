//! Persistence layer for workflow run history

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteRunStore;

use crate::core::{WorkflowReport, WorkflowStatus};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Summary of one workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRunSummary {
    /// Unique run ID
    pub run_id: Uuid,

    /// Workflow name
    pub workflow_name: String,

    /// Aggregate run status
    pub status: WorkflowStatus,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished (if finished)
    pub finished_at: Option<DateTime<Utc>>,

    /// Number of jobs that succeeded
    pub succeeded_jobs: usize,

    /// Number of jobs that did not succeed
    pub failed_jobs: usize,

    /// Total number of jobs in the run
    pub total_jobs: usize,
}

/// Trait for persistence backends
#[async_trait::async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Save a workflow run
    async fn save_run(&self, run: &WorkflowRunSummary) -> Result<()>;

    /// Load a run by ID
    async fn load_run(&self, run_id: Uuid) -> Result<Option<WorkflowRunSummary>>;

    /// List all runs for a workflow, newest first
    async fn list_runs(&self, workflow_name: &str) -> Result<Vec<WorkflowRunSummary>>;

    /// List all workflow names with recorded runs
    async fn list_workflows(&self) -> Result<Vec<String>>;
}

/// In-memory persistence (for testing or ephemeral use)
pub struct InMemoryPersistence {
    runs: tokio::sync::RwLock<std::collections::HashMap<Uuid, WorkflowRunSummary>>,
    by_workflow: tokio::sync::RwLock<std::collections::HashMap<String, Vec<Uuid>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self {
            runs: tokio::sync::RwLock::new(std::collections::HashMap::new()),
            by_workflow: tokio::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for InMemoryPersistence {
    async fn save_run(&self, run: &WorkflowRunSummary) -> Result<()> {
        let mut runs = self.runs.write().await;
        runs.insert(run.run_id, run.clone());

        let mut by_workflow = self.by_workflow.write().await;
        by_workflow
            .entry(run.workflow_name.clone())
            .or_insert_with(Vec::new)
            .push(run.run_id);

        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<WorkflowRunSummary>> {
        let runs = self.runs.read().await;
        Ok(runs.get(&run_id).cloned())
    }

    async fn list_runs(&self, workflow_name: &str) -> Result<Vec<WorkflowRunSummary>> {
        let runs = self.runs.read().await;
        let by_workflow = self.by_workflow.read().await;

        if let Some(ids) = by_workflow.get(workflow_name) {
            let mut result = Vec::new();
            for id in ids.iter().rev() {
                if let Some(run) = runs.get(id) {
                    result.push(run.clone());
                }
            }
            Ok(result)
        } else {
            Ok(Vec::new())
        }
    }

    async fn list_workflows(&self) -> Result<Vec<String>> {
        let by_workflow = self.by_workflow.read().await;
        Ok(by_workflow.keys().cloned().collect())
    }
}

/// Create a summary from a finished workflow report
pub fn summarize(report: &WorkflowReport) -> WorkflowRunSummary {
    WorkflowRunSummary {
        run_id: report.run_id,
        workflow_name: report.workflow_name.clone(),
        status: report.status,
        started_at: report.started_at,
        finished_at: report.finished_at,
        succeeded_jobs: report.succeeded_jobs(),
        failed_jobs: report.failed_jobs(),
        total_jobs: report.jobs.len(),
    }
}
