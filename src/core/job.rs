//! Job domain model
//!
//! A `JobDefinition` is the immutable, fully-resolved form of one job: its
//! environment, env vars, ordered steps, and cache/fixture policies. It is
//! produced from configuration through `JobBuilder`, which layers per-job
//! overrides on top of a shared template instead of duplicating step lists.

use crate::core::environment::EnvironmentSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Execution condition of a step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunWhen {
    /// Run only while the job has not failed (the default)
    #[default]
    OnSuccess,
    /// Run regardless of earlier failures
    Always,
    /// Run only if the immediately preceding step (or retry group) failed
    OnFail,
}

/// A single step: a display name plus an opaque shell command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    /// Opaque command handed to the shell; the engine never interprets it
    pub command: String,
    pub when: RunWhen,
    /// Extra attempts after a non-zero exit; `2` means 3 total attempts.
    /// A retryable step is best-effort: exhausting attempts records the
    /// failure but does not fail the job.
    pub retries: usize,
}

impl StepDefinition {
    pub fn new(name: &str, command: &str) -> Self {
        Self {
            name: name.to_string(),
            command: command.to_string(),
            when: RunWhen::OnSuccess,
            retries: 0,
        }
    }

    pub fn when(mut self, when: RunWhen) -> Self {
        self.when = when;
        self
    }

    pub fn retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// Total attempts this step may consume
    pub fn max_attempts(&self) -> usize {
        self.retries + 1
    }
}

/// Cache key template plus the paths persisted under it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// Cache-scheme version tag, first key component
    pub version: String,
    /// Files whose content checksums join the key, in declared order
    pub checksum_files: Vec<PathBuf>,
    /// Paths (relative to the job workspace) persisted under the key
    pub paths: Vec<PathBuf>,
    /// Step name after which the cache is saved. `None` places the save
    /// checkpoint after the final step, so a failed job saves nothing.
    pub save_after: Option<String>,
}

impl CachePolicy {
    pub fn new(checksum_files: Vec<PathBuf>, paths: Vec<PathBuf>) -> Self {
        Self {
            version: "v1".to_string(),
            checksum_files,
            paths,
            save_after: None,
        }
    }
}

/// External fixture data ensured after the cache restore, fetched only when
/// the restored workspace does not already provide it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixturePolicy {
    /// Directory probed for existing fixture content
    pub dest: PathBuf,
    /// Opaque fetch command run when the probe misses
    pub fetch: String,
    /// Fetch script whose own checksum joins the cache key, so changing the
    /// fetch logic invalidates stale fixture caches
    pub script: Option<PathBuf>,
}

/// Fully-resolved definition of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub id: String,
    pub environment: EnvironmentSpec,
    pub steps: Vec<StepDefinition>,
    pub cache: Option<CachePolicy>,
    pub fixtures: Option<FixturePolicy>,
}

impl JobDefinition {
    /// Env vars injected into every step process of this job
    pub fn env(&self) -> &HashMap<String, String> {
        self.environment.env()
    }

    /// Checksum inputs for key derivation: the declared files plus the
    /// fixture fetch script, when one is declared
    pub fn checksum_inputs(&self) -> Vec<PathBuf> {
        let mut inputs = self
            .cache
            .as_ref()
            .map(|c| c.checksum_files.clone())
            .unwrap_or_default();
        if let Some(fixtures) = &self.fixtures {
            if let Some(script) = &fixtures.script {
                inputs.push(script.clone());
            }
        }
        inputs
    }
}

/// Builder producing `JobDefinition`s from a template base plus per-job
/// overrides (environment, identity, env vars, steps, cache, fixtures)
#[derive(Debug, Clone, Default)]
pub struct JobBuilder {
    id: Option<String>,
    environment: Option<EnvironmentSpec>,
    env: HashMap<String, String>,
    steps: Option<Vec<StepDefinition>>,
    cache: Option<CachePolicy>,
    fixtures: Option<FixturePolicy>,
}

impl JobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn environment(mut self, spec: EnvironmentSpec) -> Self {
        self.environment = Some(spec);
        self
    }

    /// Merge env vars; later calls win on key collisions
    pub fn env_vars(mut self, vars: &HashMap<String, String>) -> Self {
        self.env
            .extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn steps(mut self, steps: Vec<StepDefinition>) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn cache(mut self, policy: CachePolicy) -> Self {
        self.cache = Some(policy);
        self
    }

    pub fn fixtures(mut self, policy: FixturePolicy) -> Self {
        self.fixtures = Some(policy);
        self
    }

    /// Finalize the definition. The accumulated env map is folded into the
    /// environment spec so provisioning sees a single injected set.
    pub fn build(self) -> Result<JobDefinition, String> {
        let id = self.id.ok_or("job is missing an id")?;
        let mut environment = self
            .environment
            .ok_or_else(|| format!("job '{}' has no execution environment", id))?;
        let steps = self
            .steps
            .ok_or_else(|| format!("job '{}' has no steps", id))?;
        if steps.is_empty() {
            return Err(format!("job '{}' has an empty step list", id));
        }

        for (k, v) in self.env {
            environment.env_mut().entry(k).or_insert(v);
        }

        Ok(JobDefinition {
            id,
            environment,
            steps,
            cache: self.cache,
            fixtures: self.fixtures,
        })
    }
}
