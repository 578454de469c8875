//! CLI output formatting

use crate::{
    core::{JobReport, JobStatus, StepStatus, WorkflowStatus},
    execution::WorkflowEvent,
    persistence::WorkflowRunSummary,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar over the workflow's jobs
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a job status for display
pub fn format_job_status(status: JobStatus) -> String {
    match status {
        JobStatus::Pending => style("PENDING").dim().to_string(),
        JobStatus::Running => style("RUNNING").yellow().to_string(),
        JobStatus::Succeeded => style("SUCCEEDED").green().to_string(),
        JobStatus::Failed => style("FAILED").red().to_string(),
        JobStatus::Errored => style("ERRORED").magenta().to_string(),
        JobStatus::Cancelled => style("CANCELLED").yellow().to_string(),
    }
}

/// Format a workflow status for display
pub fn format_workflow_status(status: WorkflowStatus) -> String {
    match status {
        WorkflowStatus::Running => style("RUNNING").yellow().to_string(),
        WorkflowStatus::Succeeded => style("SUCCEEDED").green().to_string(),
        WorkflowStatus::Failed => style("FAILED").red().to_string(),
        WorkflowStatus::Cancelled => style("CANCELLED").yellow().to_string(),
    }
}

/// Format a scheduler event for display
pub fn format_workflow_event(event: &WorkflowEvent) -> String {
    match event {
        WorkflowEvent::JobStarted { job_id } => {
            format!("{} {}", SPINNER, style(job_id).cyan())
        }
        WorkflowEvent::JobFinished { job_id, status } => {
            let icon = match status {
                JobStatus::Succeeded => CHECK,
                JobStatus::Failed | JobStatus::Errored => CROSS,
                _ => WARN,
            };
            format!("{} {} - {}", icon, style(job_id).bold(), format_job_status(*status))
        }
    }
}

/// One summary line per job, with step counts and cache activity
pub fn format_job_line(report: &JobReport) -> String {
    let executed = report
        .steps
        .iter()
        .filter(|s| !matches!(s.status, StepStatus::Skipped { .. }))
        .count();
    let mut line = format!(
        "{} - {} ({}/{} steps run)",
        style(&report.job_id).bold(),
        format_job_status(report.status),
        executed,
        report.steps.len()
    );
    if let Some(key) = &report.cache.restored_key {
        line.push_str(&format!(" [cache hit: {}]", style(short_key(key)).dim()));
    }
    if report.cache.saved_key.is_some() {
        line.push_str(&format!(" [{}]", style("cache saved").cyan()));
    }
    if let Some(error) = &report.error {
        line.push_str(&format!("\n    {}", style(error).red()));
    }
    line
}

/// Format a run summary for history listings
pub fn format_run_summary(summary: &WorkflowRunSummary) -> String {
    let status_icon = match summary.status {
        WorkflowStatus::Succeeded => CHECK,
        WorkflowStatus::Failed => CROSS,
        WorkflowStatus::Running => SPINNER,
        WorkflowStatus::Cancelled => WARN,
    };

    format!(
        "{} {} - {} - {} ({}/{} jobs)",
        status_icon,
        style(&summary.run_id.to_string()[..8]).dim(),
        style(&summary.workflow_name).bold(),
        format_workflow_status(summary.status),
        summary.succeeded_jobs,
        summary.total_jobs
    )
}

/// Format step output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}

fn short_key(key: &str) -> &str {
    // Job ids can be arbitrary text, so truncate on a char boundary
    match key.char_indices().nth(24) {
        Some((idx, _)) => &key[..idx],
        None => key,
    }
}
