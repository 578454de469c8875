//! Test: concurrent scheduling - fail-open, priority hints, job selection

use crate::helpers::*;
use conveyor::core::{JobStatus, WorkflowStatus};

#[tokio::test]
async fn test_fail_open_all_jobs_reach_terminal_states() {
    let yaml = r#"
jobs:
  - id: fast-fail
    environment:
      machine: true
    steps:
      - name: work
        run: "exit 1"
  - id: slow-pass
    environment:
      machine: true
    steps:
      - name: work
        run: "sleep 0.2 && echo done"
  - id: errored
    environment:
      machine: true
    cache:
      checksum_files: [nope.lock]
      paths: [target]
    steps:
      - name: work
        run: "echo unreachable"
workflows:
  main:
    jobs: [fast-fail, slow-pass, errored]
"#;
    let harness = TestHarness::new();
    let report = harness.run_workflow(yaml, "main", 3).await;

    assert_eq!(report.status, WorkflowStatus::Failed);
    assert_job_status(&report, "fast-fail", JobStatus::Failed);
    assert_job_status(&report, "slow-pass", JobStatus::Succeeded);
    assert_job_status(&report, "errored", JobStatus::Errored);
    assert_eq!(report.succeeded_jobs(), 1);
    assert_eq!(report.failed_jobs(), 2);
}

#[tokio::test]
async fn test_priority_hint_orders_starts_under_contention() {
    let yaml = r#"
jobs:
  - id: quick-a
    environment:
      machine: true
    steps:
      - name: work
        run: "true"
  - id: quick-b
    environment:
      machine: true
    steps:
      - name: work
        run: "true"
  - id: slow-suite
    environment:
      machine: true
    steps:
      - name: work
        run: "true"
workflows:
  main:
    jobs: [quick-a, quick-b, slow-suite]
    priority: [slow-suite]
"#;
    let harness = TestHarness::new();
    let (report, starts) = harness
        .run_workflow_recording_starts(yaml, "main", 1)
        .await;

    assert!(report.passed());
    assert_eq!(starts, vec!["slow-suite", "quick-a", "quick-b"]);
}

#[tokio::test]
async fn test_restricted_selection_runs_only_named_jobs() {
    let yaml = r#"
jobs:
  - id: test-core
    environment:
      machine: true
    steps:
      - name: work
        run: "echo core"
  - id: test-slow
    environment:
      machine: true
    steps:
      - name: work
        run: "echo slow"
  - id: docker-smoke
    environment:
      machine: true
    steps:
      - name: work
        run: "echo smoke"
workflows:
  main:
    jobs: [test-core, test-slow, docker-smoke]
"#;
    let harness = TestHarness::new();
    let config = config_from_yaml(yaml);
    let graph = config
        .build_workflow("main")
        .unwrap()
        .restrict(&["test-core".to_string()])
        .unwrap();

    let report = harness
        .scheduler(2)
        .run(&graph, &conveyor::execution::CancelSignal::never())
        .await;

    assert!(report.passed());
    assert_eq!(report.jobs.len(), 1);
    assert!(report.job("test-core").is_some());
}

#[tokio::test]
async fn test_template_env_layering_reaches_step_processes() {
    let yaml = r#"
templates:
  base:
    environment:
      machine: true
      env:
        FROM_ENV: "environment"
    env:
      FROM_TEMPLATE: "template"
      OVERRIDDEN: "template"
    steps:
      - name: dump
        run: "echo $FROM_ENV $FROM_TEMPLATE $OVERRIDDEN"
jobs:
  - id: layered
    template: base
    env:
      OVERRIDDEN: "job"
workflows:
  main:
    jobs: [layered]
"#;
    let harness = TestHarness::new();
    let report = harness.run_workflow(yaml, "main", 1).await;

    assert!(report.passed());
    let log = &report.job("layered").unwrap().log;
    assert!(log.contains("environment template job"), "log was: {}", log);
}

#[tokio::test]
async fn test_workflow_with_single_job_reduces_cleanly() {
    let yaml = r#"
jobs:
  - id: only
    environment:
      machine: true
    steps:
      - name: work
        run: "echo solo"
workflows:
  main:
    jobs: [only]
"#;
    let harness = TestHarness::new();
    let report = harness.run_workflow(yaml, "main", 4).await;

    assert_eq!(report.status, WorkflowStatus::Succeeded);
    assert_eq!(report.jobs.len(), 1);
    assert!(report.finished_at.is_some());
}
