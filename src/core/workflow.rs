//! Workflow graph
//!
//! Jobs in a workflow are independent: there are no `requires` edges, and all
//! of them run concurrently. The only ordering input is the priority *hint*,
//! which front-loads historically slow jobs to shrink wall-clock time. The
//! hint affects start order, never correctness.

use crate::core::job::JobDefinition;
use crate::error::{EngineError, EngineResult};

/// The set of jobs selected to run together
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    pub name: String,
    /// Jobs in declaration order
    pub jobs: Vec<JobDefinition>,
    /// Job ids to start first, in hint order
    pub priority: Vec<String>,
}

impl WorkflowGraph {
    pub fn new(name: &str, jobs: Vec<JobDefinition>, priority: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            jobs,
            priority,
        }
    }

    /// Job ids in start order: hinted ids first (in hint order), then the
    /// rest in declaration order
    pub fn start_order(&self) -> Vec<String> {
        let mut order: Vec<String> = self
            .priority
            .iter()
            .filter(|id| self.jobs.iter().any(|j| &j.id == *id))
            .cloned()
            .collect();
        for job in &self.jobs {
            if !order.contains(&job.id) {
                order.push(job.id.clone());
            }
        }
        order
    }

    /// Look up a job by id
    pub fn job(&self, id: &str) -> Option<&JobDefinition> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Restrict the graph to a subset of job ids (`--only`). The priority
    /// hint is re-filtered so the subset still honors it.
    pub fn restrict(&self, only: &[String]) -> EngineResult<WorkflowGraph> {
        for id in only {
            if self.job(id).is_none() {
                return Err(EngineError::Configuration(format!(
                    "--only names '{}' which is not part of workflow '{}'",
                    id, self.name
                )));
            }
        }
        let jobs = self
            .jobs
            .iter()
            .filter(|j| only.contains(&j.id))
            .cloned()
            .collect();
        let priority = self
            .priority
            .iter()
            .filter(|id| only.contains(id))
            .cloned()
            .collect();
        Ok(WorkflowGraph::new(&self.name, jobs, priority))
    }
}
