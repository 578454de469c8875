//! Job executor
//!
//! Drives one job through its full lifecycle: derive the cache key, provision
//! the environment, restore the cache, satisfy fixtures, run the steps, save
//! the cache at the checkpoint, and tear the environment down. Teardown runs
//! exactly once for every successful provision, no matter how the steps
//! ended. The executor reports outcomes through `JobReport` and never
//! returns an error itself.

use crate::cache::{derive_key, CacheKey, CacheStore};
use crate::core::{
    AttemptRecord, JobDefinition, JobReport, JobStatus, RunWhen, StepReport, StepStatus,
};
use crate::error::EngineError;
use crate::execution::cancel::CancelSignal;
use crate::execution::fixtures::FixtureFetcher;
use crate::execution::provisioner::{EnvHandle, Provisioner};
use crate::execution::runner::StepRunner;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub struct JobExecutor {
    provisioner: Arc<dyn Provisioner>,
    cache: Arc<CacheStore>,
    runner: StepRunner,
    fetcher: FixtureFetcher,
    /// Base directory cache checksum inputs resolve against
    project_dir: PathBuf,
}

impl JobExecutor {
    pub fn new(
        provisioner: Arc<dyn Provisioner>,
        cache: Arc<CacheStore>,
        project_dir: PathBuf,
    ) -> Self {
        Self {
            provisioner,
            cache,
            runner: StepRunner::new(),
            fetcher: FixtureFetcher::new(),
            project_dir,
        }
    }

    /// Run one job to a terminal state. Engine faults become an `Errored`
    /// report, never a returned error.
    pub async fn execute(&self, job: &JobDefinition, cancel: &CancelSignal) -> JobReport {
        let mut report = JobReport::new(&job.id);
        report.status = JobStatus::Running;
        info!(job = %job.id, "job started");

        // The key is derived before anything is provisioned: an uncomputable
        // key is a configuration fault and must not cost an environment.
        let key = match self.derive_job_key(job) {
            Ok(key) => key,
            Err(e) => {
                report.error = Some(e.to_string());
                report.finish(JobStatus::Errored);
                return report;
            }
        };

        let handle = match self.provisioner.provision(&job.id, &job.environment).await {
            Ok(handle) => handle,
            Err(EngineError::Cancelled) => {
                report.finish(JobStatus::Cancelled);
                return report;
            }
            Err(e) => {
                report.error = Some(e.to_string());
                report.finish(JobStatus::Errored);
                return report;
            }
        };

        let status = self
            .run_in_env(job, key.as_ref(), &handle, cancel, &mut report)
            .await;

        if let Err(e) = self.provisioner.teardown(&handle).await {
            warn!(job = %job.id, error = %e, "environment teardown failed");
            if status.is_passing() {
                report.error = Some(e.to_string());
                report.finish(JobStatus::Errored);
                return report;
            }
        }

        report.finish(status);
        info!(job = %job.id, status = ?report.status, "job finished");
        report
    }

    fn derive_job_key(&self, job: &JobDefinition) -> Result<Option<CacheKey>, EngineError> {
        let Some(policy) = &job.cache else {
            return Ok(None);
        };
        let extras: Vec<PathBuf> = job
            .fixtures
            .as_ref()
            .and_then(|f| f.script.clone())
            .into_iter()
            .collect();
        derive_key(policy, &job.id, &extras, &self.project_dir).map(Some)
    }

    /// Everything between provision and teardown. Returns the terminal
    /// status instead of erroring so teardown always follows.
    async fn run_in_env(
        &self,
        job: &JobDefinition,
        key: Option<&CacheKey>,
        handle: &EnvHandle,
        cancel: &CancelSignal,
        report: &mut JobReport,
    ) -> JobStatus {
        if let Some(key) = key {
            match self.cache.restore(key, &handle.workdir).await {
                Ok(Some(_)) => {
                    report.cache.restored_key = Some(key.as_str().to_string());
                }
                Ok(None) => {}
                // A broken entry must not sink the job; run cold instead
                Err(e) => warn!(job = %job.id, error = %e, "cache restore failed, running cold"),
            }
        }

        // Fixtures come after the restore so a cached copy satisfies the
        // probe without refetching
        if let Some(policy) = &job.fixtures {
            match self.fetcher.ensure(policy, handle, cancel).await {
                Ok(source) => {
                    info!(job = %job.id, ?source, "fixtures ready");
                }
                Err(EngineError::Cancelled) => return JobStatus::Cancelled,
                Err(e) => {
                    report.error = Some(e.to_string());
                    return JobStatus::Errored;
                }
            }
        }

        let checkpoint = job.cache.as_ref().map(|policy| {
            policy
                .save_after
                .clone()
                .unwrap_or_else(|| job.steps[job.steps.len() - 1].name.clone())
        });

        let mut job_failed = false;
        let mut prev_failed = false;
        for step in &job.steps {
            let skip_reason = match step.when {
                RunWhen::OnFail if !prev_failed => Some("previous step succeeded"),
                RunWhen::OnSuccess if job_failed => Some("job already failed"),
                _ => None,
            };

            if let Some(reason) = skip_reason {
                report.steps.push(StepReport::skipped(&step.name, reason));
                // A skipped step is vacuously successful for `on_fail` purposes
                prev_failed = false;
            } else {
                let mut attempts = Vec::new();
                let mut succeeded = false;
                for attempt in 1..=step.max_attempts() {
                    let outcome = match self
                        .runner
                        .run(&step.command, &handle.workdir, &handle.env, cancel)
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(EngineError::Cancelled) => return JobStatus::Cancelled,
                        Err(e) => {
                            report.error = Some(e.to_string());
                            return JobStatus::Errored;
                        }
                    };

                    report.log.push_str(&outcome.combined_output());
                    attempts.push(AttemptRecord {
                        attempt,
                        exit_code: outcome.exit_code,
                        succeeded: outcome.succeeded,
                        duration_ms: outcome.duration.as_millis() as u64,
                    });
                    if outcome.succeeded {
                        succeeded = true;
                        break;
                    }
                    if attempt < step.max_attempts() {
                        warn!(job = %job.id, step = %step.name, attempt, "step failed, retrying");
                    }
                }

                report.steps.push(StepReport {
                    name: step.name.clone(),
                    status: if succeeded {
                        StepStatus::Succeeded
                    } else {
                        StepStatus::Failed
                    },
                    attempts,
                });
                prev_failed = !succeeded;
                // Retryable steps are best-effort; a plain step's failure is
                // decisive for the job
                if !succeeded && step.retries == 0 {
                    job_failed = true;
                }
            }

            if checkpoint.as_deref() == Some(step.name.as_str()) && !job_failed {
                self.save_cache(job, key, handle, report).await;
            }
        }

        if job_failed {
            JobStatus::Failed
        } else {
            JobStatus::Succeeded
        }
    }

    async fn save_cache(
        &self,
        job: &JobDefinition,
        key: Option<&CacheKey>,
        handle: &EnvHandle,
        report: &mut JobReport,
    ) {
        let (Some(policy), Some(key)) = (&job.cache, key) else {
            return;
        };
        match self
            .cache
            .save(key, &handle.workdir, &policy.paths)
            .await
        {
            Ok(()) => {
                report.cache.saved_key = Some(key.as_str().to_string());
            }
            Err(e) => warn!(job = %job.id, error = %e, "cache save failed"),
        }
    }
}
