//! conveyor - CI workflow orchestration engine

use anyhow::{Context, Result};
use conveyor::cache::CacheStore;
use conveyor::cli::commands::{HistoryCommand, ListCommand, RunCommand, ValidateCommand};
use conveyor::cli::output::*;
use conveyor::cli::{Cli, Command};
use conveyor::core::WorkflowConfig;
use conveyor::execution::{
    cancel_pair, JobExecutor, LocalProvisioner, WorkflowEvent, WorkflowScheduler,
};
use conveyor::persistence::{summarize, PersistenceBackend, WorkflowRunSummary};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_workflow(cmd).await?,
        Command::Validate(cmd) => validate_config(cmd)?,
        Command::List(cmd) => list_workflows(cmd).await?,
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

async fn run_workflow(cmd: &RunCommand) -> Result<()> {
    let config = WorkflowConfig::from_file(&cmd.file)
        .with_context(|| format!("Failed to load workflow config from {}", cmd.file))?;

    println!(
        "{} Loaded config: {}",
        INFO,
        style(config.name.as_deref().unwrap_or(&cmd.file)).bold()
    );

    let mut graph = config
        .build_workflow(&cmd.workflow)
        .context("Unknown workflow")?;
    if !cmd.only.is_empty() {
        graph = graph.restrict(&cmd.only)?;
        println!(
            "{} Restricted to {} job(s): {}",
            INFO,
            style(graph.jobs.len()).cyan(),
            cmd.only.join(", ")
        );
    }

    // Checksum inputs resolve against the config file's directory
    let project_dir = Path::new(&cmd.file)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let cache = match &cmd.cache_dir {
        Some(dir) => CacheStore::new(dir.clone())?,
        None => CacheStore::with_default_root()?,
    };
    let executor = Arc::new(JobExecutor::new(
        Arc::new(LocalProvisioner::for_run(Uuid::new_v4())),
        Arc::new(cache),
        project_dir,
    ));

    // First ctrl-c cancels running jobs; environments are still torn down
    let (cancel_handle, cancel_signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{} Cancelling run, waiting for teardown...", WARN);
            cancel_handle.cancel();
        }
    });

    println!(
        "{} Starting workflow {} ({} jobs, concurrency {})",
        ROCKET,
        style(&graph.name).bold(),
        style(graph.jobs.len()).cyan(),
        style(cmd.concurrency).cyan()
    );

    let mut scheduler = WorkflowScheduler::new(executor, cmd.concurrency);
    let progress = create_progress_bar(graph.jobs.len());
    let bar = progress.clone();
    scheduler.add_event_handler(Arc::new(move |event| {
        bar.println(format_workflow_event(event));
        if matches!(event, WorkflowEvent::JobFinished { .. }) {
            bar.inc(1);
        }
    }));

    let report = scheduler.run(&graph, &cancel_signal).await;
    progress.finish_and_clear();

    println!();
    for job in &report.jobs {
        println!("  {}", format_job_line(job));
    }

    // Show logs of jobs that did not pass
    for job in &report.jobs {
        if !job.status.is_passing() && !job.log.is_empty() {
            println!(
                "\n{} Output from {}:",
                INFO,
                style(&job.job_id).bold()
            );
            println!("{}", format_output(&job.log, 50));
        }
    }

    if !cmd.no_history {
        let store = history_store().await?;
        let summary = summarize(&report);
        store.save_run(&summary).await?;
        println!(
            "\n{} Run saved to history (ID: {})",
            INFO,
            style(&summary.run_id.to_string()[..8]).dim()
        );
    }

    println!(
        "\n{} Workflow {} {}",
        if report.passed() { CHECK } else { CROSS },
        style(&report.workflow_name).bold(),
        format_workflow_status(report.status)
    );

    if !report.passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn validate_config(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating {}...", INFO, cmd.file);

    match WorkflowConfig::from_file(&cmd.file) {
        Ok(config) => {
            println!("{} Configuration is valid!", CHECK);
            println!(
                "  Name: {}",
                style(config.name.as_deref().unwrap_or("(unnamed)")).bold()
            );
            println!("  Jobs: {}", style(config.jobs.len()).cyan());
            println!("  Templates: {}", style(config.templates.len()).cyan());
            println!("  Workflows: {}", style(config.workflows.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}

async fn list_workflows(cmd: &ListCommand) -> Result<()> {
    let config = WorkflowConfig::from_file(&cmd.file)?;
    let names = config.workflow_names();

    if names.is_empty() {
        println!("{} No workflows defined in {}", INFO, cmd.file);
        return Ok(());
    }

    println!(
        "{} Workflows in {}:",
        INFO,
        style(config.name.as_deref().unwrap_or(&cmd.file)).bold()
    );

    let store = if cmd.with_counts {
        Some(history_store().await?)
    } else {
        None
    };

    let mut json_data = Vec::new();
    for name in &names {
        let jobs = config
            .build_workflow(name)
            .map(|g| g.jobs.len())
            .unwrap_or(0);

        if let Some(store) = &store {
            let runs = store.list_runs(name).await?;
            let succeeded = runs
                .iter()
                .filter(|r| r.status == conveyor::core::WorkflowStatus::Succeeded)
                .count();
            println!(
                "  {} ({} jobs, {} runs: {} succeeded)",
                style(name).bold(),
                style(jobs).cyan(),
                style(runs.len()).cyan(),
                style(succeeded).green()
            );
            json_data.push(serde_json::json!({
                "name": name,
                "jobs": jobs,
                "run_count": runs.len(),
            }));
        } else {
            println!("  {} ({} jobs)", style(name).bold(), style(jobs).cyan());
            json_data.push(serde_json::json!({ "name": name, "jobs": jobs }));
        }
    }

    if cmd.json {
        let data = serde_json::json!({ "workflows": json_data });
        println!("\n{}", serde_json::to_string_pretty(&data)?);
    }

    Ok(())
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = history_store().await?;

    if let Some(run_id_str) = &cmd.run_id {
        let run_id = Uuid::parse_str(run_id_str).context("Invalid run ID format")?;
        match store.load_run(run_id).await? {
            Some(summary) => print_run_details(&summary, cmd.verbose)?,
            None => println!("{} Run not found", WARN),
        }
        return Ok(());
    }

    let runs = if let Some(workflow_name) = &cmd.workflow {
        store.list_runs(workflow_name).await?
    } else {
        let workflows = store.list_workflows().await?;
        let mut all_runs = Vec::new();
        for workflow in &workflows {
            all_runs.extend(store.list_runs(workflow).await?);
        }
        all_runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all_runs
    };
    let runs: Vec<WorkflowRunSummary> = runs.into_iter().take(cmd.limit).collect();

    if runs.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(());
    }

    println!("{} Run history (showing latest {}):", INFO, cmd.limit);

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        for summary in &runs {
            println!("  {}", format_run_summary(summary));
        }
    }

    Ok(())
}

fn print_run_details(summary: &WorkflowRunSummary, verbose: bool) -> Result<()> {
    println!("{} Run Details", INFO);
    println!("  ID: {}", style(summary.run_id).cyan());
    println!("  Workflow: {}", style(&summary.workflow_name).bold());
    println!("  Status: {}", format_workflow_status(summary.status));
    println!("  Started: {}", style(summary.started_at.to_rfc3339()).dim());
    if let Some(finished) = summary.finished_at {
        println!("  Finished: {}", style(finished.to_rfc3339()).dim());
        if let Ok(duration) = finished.signed_duration_since(summary.started_at).to_std() {
            println!("  Duration: {}", style(format_duration(duration)).dim());
        }
    }
    println!(
        "  Jobs: {} succeeded, {} failed ({} total)",
        style(summary.succeeded_jobs).green(),
        style(summary.failed_jobs).red(),
        summary.total_jobs
    );

    if verbose {
        println!("\n  {}", style("Full details:").bold());
        let json = serde_json::to_string_pretty(summary)?;
        for line in json.lines() {
            println!("    {}", line);
        }
    }

    Ok(())
}

fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(feature = "sqlite")]
async fn history_store() -> Result<Arc<dyn PersistenceBackend>> {
    Ok(Arc::new(
        conveyor::persistence::SqliteRunStore::with_default_path().await?,
    ))
}

#[cfg(not(feature = "sqlite"))]
async fn history_store() -> Result<Arc<dyn PersistenceBackend>> {
    Ok(Arc::new(conveyor::persistence::InMemoryPersistence::new()))
}
