//! Workflow scheduler
//!
//! Fans the workflow's jobs out over a bounded pool of concurrent tasks.
//! Scheduling is fail-open: one job's failure never prevents another from
//! starting, and the aggregate result is reduced only after every job has
//! reached a terminal state. The priority hint orders task submission;
//! the semaphore turns that order into actual start order under contention.

use crate::core::{JobReport, JobStatus, WorkflowGraph, WorkflowReport};
use crate::execution::cancel::CancelSignal;
use crate::execution::executor::JobExecutor;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

/// Progress notifications emitted while a workflow runs
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    JobStarted { job_id: String },
    JobFinished { job_id: String, status: JobStatus },
}

pub type EventHandler = Arc<dyn Fn(&WorkflowEvent) + Send + Sync>;

pub struct WorkflowScheduler {
    executor: Arc<JobExecutor>,
    concurrency: usize,
    handlers: Vec<EventHandler>,
}

impl WorkflowScheduler {
    pub fn new(executor: Arc<JobExecutor>, concurrency: usize) -> Self {
        Self {
            executor,
            concurrency: concurrency.max(1),
            handlers: Vec::new(),
        }
    }

    /// Register a progress handler (console reporter, test recorder)
    pub fn add_event_handler(&mut self, handler: EventHandler) {
        self.handlers.push(handler);
    }

    /// Run every job in the graph to completion and reduce the results
    pub async fn run(&self, graph: &WorkflowGraph, cancel: &CancelSignal) -> WorkflowReport {
        let mut report = WorkflowReport::new(&graph.name);
        info!(
            workflow = %graph.name,
            jobs = graph.jobs.len(),
            concurrency = self.concurrency,
            "workflow started"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let handlers: Arc<Vec<EventHandler>> = Arc::new(self.handlers.clone());

        let mut tasks = Vec::new();
        for job_id in graph.start_order() {
            let Some(job) = graph.job(&job_id) else {
                continue;
            };
            let job = job.clone();
            let executor = self.executor.clone();
            let semaphore = semaphore.clone();
            let handlers = handlers.clone();
            let cancel = cancel.clone();

            let task_id = job.id.clone();
            let task = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return cancelled_report(&job.id),
                };
                // A cancellation raised while this job was queued means it
                // never starts
                if cancel.is_cancelled() {
                    return cancelled_report(&job.id);
                }

                emit(
                    &handlers,
                    &WorkflowEvent::JobStarted {
                        job_id: job.id.clone(),
                    },
                );
                let job_report = executor.execute(&job, &cancel).await;
                emit(
                    &handlers,
                    &WorkflowEvent::JobFinished {
                        job_id: job_report.job_id.clone(),
                        status: job_report.status,
                    },
                );
                job_report
            });
            tasks.push((task_id, task));
        }

        for (job_id, task) in tasks {
            match task.await {
                Ok(job_report) => report.jobs.push(job_report),
                Err(e) => {
                    // A panicked task must not sink its siblings, and its job
                    // must still count against the aggregate. The real report
                    // is lost with the task, so record an engine fault in its
                    // place.
                    error!(job = %job_id, error = %e, "job task panicked");
                    report.jobs.push(errored_report(&job_id, &format!("job task panicked: {}", e)));
                }
            }
        }

        report.finish();
        info!(
            workflow = %graph.name,
            status = ?report.status,
            succeeded = report.succeeded_jobs(),
            failed = report.failed_jobs(),
            "workflow finished"
        );
        report
    }
}

fn cancelled_report(job_id: &str) -> JobReport {
    let mut report = JobReport::new(job_id);
    report.finish(JobStatus::Cancelled);
    report
}

fn errored_report(job_id: &str, error: &str) -> JobReport {
    let mut report = JobReport::new(job_id);
    report.error = Some(error.to_string());
    report.finish(JobStatus::Errored);
    report
}

fn emit(handlers: &[EventHandler], event: &WorkflowEvent) {
    for handler in handlers {
        handler(event);
    }
}
