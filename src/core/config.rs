//! Workflow configuration from YAML
//!
//! The document declares reusable job templates, jobs (template reference
//! plus overrides), and workflows (job id lists with a start-order hint).
//! Template merging happens through `JobBuilder`, never by textual
//! duplication. Env var precedence on merge: `environment.env` over job-level
//! `env` over template `env`.

use crate::core::environment::EnvironmentSpec;
use crate::core::job::{CachePolicy, FixturePolicy, JobBuilder, JobDefinition, RunWhen, StepDefinition};
use crate::core::workflow::WorkflowGraph;
use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Top-level configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Project name (display only)
    #[serde(default)]
    pub name: Option<String>,

    /// Reusable job bases, referenced by jobs via `template:`
    #[serde(default)]
    pub templates: HashMap<String, JobTemplateConfig>,

    /// Job declarations
    pub jobs: Vec<JobConfig>,

    /// Named workflows selecting jobs to run together
    pub workflows: HashMap<String, WorkflowSectionConfig>,
}

/// Shared base a job can inherit from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobTemplateConfig {
    #[serde(default)]
    pub environment: Option<EnvironmentConfig>,

    /// Env vars every inheriting job receives
    #[serde(default)]
    pub env: HashMap<String, String>,

    #[serde(default)]
    pub steps: Vec<StepConfig>,

    #[serde(default)]
    pub cache: Option<CacheConfig>,

    #[serde(default)]
    pub fixtures: Option<FixtureConfig>,
}

/// One job: a template reference plus overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Unique job identity
    pub id: String,

    /// Template to inherit from
    #[serde(default)]
    pub template: Option<String>,

    /// Environment override (replaces the template's wholesale)
    #[serde(default)]
    pub environment: Option<EnvironmentConfig>,

    /// Per-job env vars, merged over the template's
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Step list override (replaces the template's wholesale)
    #[serde(default)]
    pub steps: Option<Vec<StepConfig>>,

    #[serde(default)]
    pub cache: Option<CacheConfig>,

    #[serde(default)]
    pub fixtures: Option<FixtureConfig>,
}

/// Environment declaration: exactly one of `image` or `machine`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Container image reference
    #[serde(default)]
    pub image: Option<String>,

    /// Request a full machine context instead of a container
    #[serde(default)]
    pub machine: bool,

    /// Env vars injected by this environment
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl EnvironmentConfig {
    fn to_spec(&self, job_id: &str) -> EngineResult<EnvironmentSpec> {
        match (&self.image, self.machine) {
            (Some(image), false) => Ok(EnvironmentSpec::Container {
                image: image.clone(),
                env: self.env.clone(),
            }),
            (None, true) => Ok(EnvironmentSpec::Machine {
                env: self.env.clone(),
            }),
            (Some(_), true) => Err(EngineError::Configuration(format!(
                "job '{}' declares both a container image and machine: true",
                job_id
            ))),
            (None, false) => Err(EngineError::Configuration(format!(
                "job '{}' environment declares neither an image nor machine: true",
                job_id
            ))),
        }
    }
}

/// Step declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Display name
    pub name: String,

    /// Opaque shell command
    pub run: String,

    /// Execution condition
    #[serde(default)]
    pub when: RunWhen,

    /// Extra attempts after a failing exit (2 means 3 total attempts)
    #[serde(default)]
    pub retries: usize,
}

impl StepConfig {
    fn to_definition(&self) -> StepDefinition {
        StepDefinition::new(&self.name, &self.run)
            .when(self.when)
            .retries(self.retries)
    }
}

/// Cache declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Key version tag
    #[serde(default = "default_cache_version")]
    pub version: String,

    /// Checksum input files, in key order
    pub checksum_files: Vec<PathBuf>,

    /// Workspace paths persisted under the key
    pub paths: Vec<PathBuf>,

    /// Step after which the save checkpoint sits (default: the final step)
    #[serde(default)]
    pub save_after: Option<String>,
}

fn default_cache_version() -> String {
    "v1".to_string()
}

impl CacheConfig {
    fn to_policy(&self) -> CachePolicy {
        CachePolicy {
            version: self.version.clone(),
            checksum_files: self.checksum_files.clone(),
            paths: self.paths.clone(),
            save_after: self.save_after.clone(),
        }
    }
}

/// Fixture declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureConfig {
    /// Destination directory probed before fetching
    pub dest: PathBuf,

    /// Fetch command, run only when the probe misses
    pub fetch: String,

    /// Fetch script whose checksum joins the cache key
    #[serde(default)]
    pub script: Option<PathBuf>,
}

impl FixtureConfig {
    fn to_policy(&self) -> FixturePolicy {
        FixturePolicy {
            dest: self.dest.clone(),
            fetch: self.fetch.clone(),
            script: self.script.clone(),
        }
    }
}

/// One workflow: the jobs it runs and the start-order hint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSectionConfig {
    /// Job ids to run (all independent, all concurrent)
    pub jobs: Vec<String>,

    /// Job ids to start first; a scheduling hint, not a dependency
    #[serde(default)]
    pub priority: Vec<String>,
}

impl WorkflowConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            EngineError::Configuration(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> EngineResult<Self> {
        let config: WorkflowConfig = serde_yaml::from_str(yaml)
            .map_err(|e| EngineError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the whole document. Errors here are pipeline-fatal: they are
    /// raised before any job starts.
    pub fn validate(&self) -> EngineResult<()> {
        let mut seen_ids = HashSet::new();
        for job in &self.jobs {
            if !seen_ids.insert(&job.id) {
                return Err(EngineError::Configuration(format!(
                    "duplicate job id: {}",
                    job.id
                )));
            }
            if let Some(template) = &job.template {
                if !self.templates.contains_key(template) {
                    return Err(EngineError::Configuration(format!(
                        "job '{}' references unknown template '{}'",
                        job.id, template
                    )));
                }
            }
            // Full resolution catches the rest: missing environment/steps,
            // ambiguous environment, empty commands, bad save_after.
            self.resolve_job(&job.id)?;
        }

        for (name, section) in &self.workflows {
            if section.jobs.is_empty() {
                return Err(EngineError::Configuration(format!(
                    "workflow '{}' selects no jobs",
                    name
                )));
            }
            let mut selected = HashSet::new();
            for job_id in &section.jobs {
                if !self.jobs.iter().any(|j| &j.id == job_id) {
                    return Err(EngineError::Configuration(format!(
                        "workflow '{}' references unknown job '{}'",
                        name, job_id
                    )));
                }
                if !selected.insert(job_id) {
                    return Err(EngineError::Configuration(format!(
                        "workflow '{}' lists job '{}' twice",
                        name, job_id
                    )));
                }
            }
            for hinted in &section.priority {
                if !selected.contains(hinted) {
                    return Err(EngineError::Configuration(format!(
                        "workflow '{}' priority hint names '{}' which is not in its job list",
                        name, hinted
                    )));
                }
            }
        }

        Ok(())
    }

    /// Resolve one job into its immutable definition, merging its template
    pub fn resolve_job(&self, job_id: &str) -> EngineResult<JobDefinition> {
        let job = self
            .jobs
            .iter()
            .find(|j| j.id == job_id)
            .ok_or_else(|| {
                EngineError::Configuration(format!("unknown job '{}'", job_id))
            })?;

        let template = match &job.template {
            Some(name) => Some(self.templates.get(name).ok_or_else(|| {
                EngineError::Configuration(format!(
                    "job '{}' references unknown template '{}'",
                    job.id, name
                ))
            })?),
            None => None,
        };

        let env_config = job
            .environment
            .as_ref()
            .or_else(|| template.and_then(|t| t.environment.as_ref()))
            .ok_or_else(|| {
                EngineError::Configuration(format!(
                    "job '{}' has no execution environment",
                    job.id
                ))
            })?;

        let step_configs: &[StepConfig] = match &job.steps {
            Some(steps) => steps,
            None => template.map(|t| t.steps.as_slice()).unwrap_or(&[]),
        };
        let steps = self.validate_steps(&job.id, step_configs)?;

        let cache = job
            .cache
            .as_ref()
            .or_else(|| template.and_then(|t| t.cache.as_ref()))
            .map(|c| c.to_policy());
        if let Some(cache) = &cache {
            if let Some(save_after) = &cache.save_after {
                if !steps.iter().any(|s| &s.name == save_after) {
                    return Err(EngineError::Configuration(format!(
                        "job '{}' cache save_after names unknown step '{}'",
                        job.id, save_after
                    )));
                }
            }
            if cache.paths.is_empty() {
                return Err(EngineError::Configuration(format!(
                    "job '{}' cache declares no paths to persist",
                    job.id
                )));
            }
        }

        let fixtures = job
            .fixtures
            .as_ref()
            .or_else(|| template.and_then(|t| t.fixtures.as_ref()))
            .map(|f| f.to_policy());

        let mut builder = JobBuilder::new()
            .id(&job.id)
            .environment(env_config.to_spec(&job.id)?)
            .steps(steps);
        if let Some(template) = template {
            builder = builder.env_vars(&template.env);
        }
        builder = builder.env_vars(&job.env);
        if let Some(cache) = cache {
            builder = builder.cache(cache);
        }
        if let Some(fixtures) = fixtures {
            builder = builder.fixtures(fixtures);
        }

        builder.build().map_err(EngineError::Configuration)
    }

    fn validate_steps(
        &self,
        job_id: &str,
        configs: &[StepConfig],
    ) -> EngineResult<Vec<StepDefinition>> {
        if configs.is_empty() {
            return Err(EngineError::Configuration(format!(
                "job '{}' has no steps",
                job_id
            )));
        }
        let mut names = HashSet::new();
        for (index, step) in configs.iter().enumerate() {
            if step.run.trim().is_empty() {
                return Err(EngineError::Configuration(format!(
                    "job '{}' step '{}' has an empty command",
                    job_id, step.name
                )));
            }
            if !names.insert(&step.name) {
                return Err(EngineError::Configuration(format!(
                    "job '{}' has duplicate step name '{}'",
                    job_id, step.name
                )));
            }
            if index == 0 && step.when == RunWhen::OnFail {
                return Err(EngineError::Configuration(format!(
                    "job '{}' starts with on_fail step '{}' which has no preceding step",
                    job_id, step.name
                )));
            }
        }
        Ok(configs.iter().map(|s| s.to_definition()).collect())
    }

    /// Build the runnable graph for a named workflow
    pub fn build_workflow(&self, name: &str) -> EngineResult<WorkflowGraph> {
        let section = self.workflows.get(name).ok_or_else(|| {
            EngineError::Configuration(format!("unknown workflow '{}'", name))
        })?;

        let jobs = section
            .jobs
            .iter()
            .map(|id| self.resolve_job(id))
            .collect::<EngineResult<Vec<_>>>()?;

        Ok(WorkflowGraph::new(name, jobs, section.priority.clone()))
    }

    /// Names of declared workflows, sorted for stable output
    pub fn workflow_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.workflows.keys().cloned().collect();
        names.sort();
        names
    }
}
