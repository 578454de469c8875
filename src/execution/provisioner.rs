//! Environment provisioning
//!
//! A provisioner turns an `EnvironmentSpec` into a live environment handle
//! and tears it down afterwards. The executor guarantees teardown is called
//! exactly once for every successful provision, whatever happened to the
//! steps in between. Backends sit behind a trait so tests can substitute
//! recording fakes.

use crate::core::{EnvironmentKind, EnvironmentSpec};
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};
use uuid::Uuid;

/// A live, ready-to-run environment
#[derive(Debug, Clone)]
pub struct EnvHandle {
    pub id: Uuid,
    pub job_id: String,
    pub kind: EnvironmentKind,
    /// Directory step commands run in
    pub workdir: PathBuf,
    /// Environment variables steps receive
    pub env: HashMap<String, String>,
}

#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Bring up an environment for `job_id`. On error the backend must have
    /// cleaned up any partial state itself; the caller will not call
    /// `teardown` for a failed provision.
    async fn provision(&self, job_id: &str, spec: &EnvironmentSpec) -> EngineResult<EnvHandle>;

    /// Release the environment. Must be idempotent against already-gone
    /// resources so a crash-then-retry never errors.
    async fn teardown(&self, handle: &EnvHandle) -> EngineResult<()>;
}

/// Provisioner backed by per-job directories on the local machine.
///
/// Container and machine specs both realize as an isolated workdir; the
/// requested image is recorded in the step environment so commands can
/// see what they were asked for.
pub struct LocalProvisioner {
    root: PathBuf,
}

impl LocalProvisioner {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Environments under a per-run directory inside the system temp dir
    pub fn for_run(run_id: Uuid) -> Self {
        Self::new(std::env::temp_dir().join(format!("conveyor-{}", run_id)))
    }
}

#[async_trait]
impl Provisioner for LocalProvisioner {
    async fn provision(&self, job_id: &str, spec: &EnvironmentSpec) -> EngineResult<EnvHandle> {
        let id = Uuid::new_v4();
        let workdir = self.root.join(format!("{}-{}", job_id, id));
        tokio::fs::create_dir_all(&workdir).await.map_err(|e| {
            EngineError::Provisioning(format!(
                "cannot create environment dir for '{}': {}",
                job_id, e
            ))
        })?;

        let mut env = spec.env().clone();
        if let EnvironmentSpec::Container { image, .. } = spec {
            env.insert("CONVEYOR_IMAGE".to_string(), image.clone());
        }
        env.insert("CONVEYOR_JOB".to_string(), job_id.to_string());

        info!(job = job_id, env = %spec, dir = %workdir.display(), "environment provisioned");
        Ok(EnvHandle {
            id,
            job_id: job_id.to_string(),
            kind: spec.kind(),
            workdir,
            env,
        })
    }

    async fn teardown(&self, handle: &EnvHandle) -> EngineResult<()> {
        match tokio::fs::remove_dir_all(&handle.workdir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(EngineError::Provisioning(format!(
                    "teardown of '{}' failed: {}",
                    handle.job_id, e
                )))
            }
        }
        debug!(job = %handle.job_id, "environment torn down");
        Ok(())
    }
}
