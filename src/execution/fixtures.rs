//! Fixture fetching
//!
//! Jobs can declare external fixtures (datasets, seed archives, prebuilt
//! assets) that must exist before steps run. The fetcher probes the
//! destination first and only runs the fetch command when the fixture is
//! absent or empty, so a restored cache satisfies the requirement for free.

use crate::core::FixturePolicy;
use crate::error::{EngineError, EngineResult};
use crate::execution::cancel::CancelSignal;
use crate::execution::provisioner::EnvHandle;
use crate::execution::runner::StepRunner;
use std::path::Path;
use tracing::{debug, info};

/// How a fixture requirement was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureSource {
    /// Destination already populated, nothing fetched
    Reused,
    /// Fetch command ran and populated the destination
    Fetched,
}

#[derive(Debug, Clone, Default)]
pub struct FixtureFetcher {
    runner: StepRunner,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self {
            runner: StepRunner::new(),
        }
    }

    /// Make sure the fixture exists inside the environment. A failed fetch
    /// is a provisioning error: the job cannot meaningfully run without its
    /// inputs.
    pub async fn ensure(
        &self,
        policy: &FixturePolicy,
        handle: &EnvHandle,
        cancel: &CancelSignal,
    ) -> EngineResult<FixtureSource> {
        let dest = handle.workdir.join(&policy.dest);
        if is_populated(&dest) {
            debug!(job = %handle.job_id, dest = %policy.dest.display(), "fixture already present");
            return Ok(FixtureSource::Reused);
        }

        info!(job = %handle.job_id, dest = %policy.dest.display(), "fetching fixture");
        let outcome = self
            .runner
            .run(&policy.fetch, &handle.workdir, &handle.env, cancel)
            .await?;
        if !outcome.succeeded {
            return Err(EngineError::Provisioning(format!(
                "fixture fetch for '{}' failed with exit code {:?}: {}",
                handle.job_id,
                outcome.exit_code,
                outcome.stderr.trim()
            )));
        }
        if !is_populated(&dest) {
            return Err(EngineError::Provisioning(format!(
                "fixture fetch for '{}' succeeded but left '{}' empty",
                handle.job_id,
                policy.dest.display()
            )));
        }
        Ok(FixtureSource::Fetched)
    }
}

fn is_populated(dest: &Path) -> bool {
    if dest.is_file() {
        return std::fs::metadata(dest).map(|m| m.len() > 0).unwrap_or(false);
    }
    if dest.is_dir() {
        return std::fs::read_dir(dest)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
    }
    false
}
