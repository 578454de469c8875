//! Execution environment specification
//!
//! Every job runs inside exactly one isolated environment: a container image
//! or a full machine. Provisioning is a separate concern (see
//! `execution::provisioner`); this module is only the declarative spec.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The kind of isolation a job asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvironmentKind {
    Container,
    Machine,
}

/// Resolved environment specification for a job. Exactly one variant per job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvironmentSpec {
    /// Container image with injected environment variables
    Container {
        /// Image reference, e.g. `cimg/rust:1.75`
        image: String,
        /// Variables injected into every step of the job
        env: HashMap<String, String>,
    },
    /// A full machine context, for jobs that themselves manage nested
    /// container builds
    Machine {
        env: HashMap<String, String>,
    },
}

impl EnvironmentSpec {
    pub fn kind(&self) -> EnvironmentKind {
        match self {
            EnvironmentSpec::Container { .. } => EnvironmentKind::Container,
            EnvironmentSpec::Machine { .. } => EnvironmentKind::Machine,
        }
    }

    /// Variables this environment injects into step processes
    pub fn env(&self) -> &HashMap<String, String> {
        match self {
            EnvironmentSpec::Container { env, .. } => env,
            EnvironmentSpec::Machine { env } => env,
        }
    }

    pub fn env_mut(&mut self) -> &mut HashMap<String, String> {
        match self {
            EnvironmentSpec::Container { env, .. } => env,
            EnvironmentSpec::Machine { env } => env,
        }
    }
}

impl fmt::Display for EnvironmentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentSpec::Container { image, .. } => write!(f, "container({})", image),
            EnvironmentSpec::Machine { .. } => write!(f, "machine"),
        }
    }
}
