//! CLI command definitions

use clap::Args;
use std::path::PathBuf;

/// Run a workflow
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Name of the workflow to run
    pub workflow: String,

    /// Path to the workflow YAML file
    #[arg(short, long, default_value = "conveyor.yml")]
    pub file: String,

    /// Maximum number of jobs running at once
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    /// Run only these jobs (comma-separated ids)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Cache directory (defaults to the user cache dir)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Don't save this run to history
    #[arg(long)]
    pub no_history: bool,
}

/// Validate a workflow configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to the workflow YAML file
    #[arg(short, long, default_value = "conveyor.yml")]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List workflows defined in a configuration
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Path to the workflow YAML file
    #[arg(short, long, default_value = "conveyor.yml")]
    pub file: String,

    /// Show run counts from history
    #[arg(long)]
    pub with_counts: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show run history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Workflow name to filter by
    #[arg(short, long)]
    pub workflow: Option<String>,

    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Show full details
    #[arg(long)]
    pub verbose: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Show a specific run by ID
    #[arg(long)]
    pub run_id: Option<String>,
}
