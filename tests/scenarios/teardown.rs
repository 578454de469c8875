//! Test: environment lifecycle - teardown runs exactly once per provision

use crate::helpers::*;
use conveyor::core::JobStatus;

const SINGLE_JOB: &str = r#"
jobs:
  - id: solo
    environment:
      machine: true
    steps:
      - name: work
        run: "{COMMAND}"
workflows:
  main:
    jobs: [solo]
"#;

fn single_job(command: &str) -> String {
    SINGLE_JOB.replace("{COMMAND}", command)
}

#[tokio::test]
async fn test_teardown_after_success() {
    let harness = TestHarness::new();
    let report = harness.run_workflow(&single_job("echo ok"), "main", 1).await;

    assert!(report.passed());
    assert_eq!(harness.provisioner.provisions(), 1);
    assert_eq!(harness.provisioner.teardowns(), 1);
}

#[tokio::test]
async fn test_teardown_after_step_failure() {
    let harness = TestHarness::new();
    let report = harness.run_workflow(&single_job("exit 1"), "main", 1).await;

    assert_job_status(&report, "solo", JobStatus::Failed);
    assert_eq!(harness.provisioner.provisions(), 1);
    assert_eq!(harness.provisioner.teardowns(), 1);
}

#[tokio::test]
async fn test_teardown_after_fixture_error() {
    let yaml = r#"
jobs:
  - id: solo
    environment:
      machine: true
    fixtures:
      dest: data
      fetch: "exit 9"
    steps:
      - name: work
        run: "echo never reached"
workflows:
  main:
    jobs: [solo]
"#;
    let harness = TestHarness::new();
    let report = harness.run_workflow(yaml, "main", 1).await;

    assert_job_status(&report, "solo", JobStatus::Errored);
    // The environment was up when the fetch failed, so it must come down
    assert_eq!(harness.provisioner.provisions(), 1);
    assert_eq!(harness.provisioner.teardowns(), 1);
    assert!(report.job("solo").unwrap().steps.is_empty());
}

#[tokio::test]
async fn test_no_teardown_when_provision_fails() {
    let harness = TestHarness::new();
    harness.provisioner.fail_provision_for("solo");
    let report = harness.run_workflow(&single_job("echo ok"), "main", 1).await;

    assert_job_status(&report, "solo", JobStatus::Errored);
    assert_eq!(harness.provisioner.provisions(), 0);
    assert_eq!(harness.provisioner.teardowns(), 0);
}

#[tokio::test]
async fn test_no_provision_when_cache_key_underivable() {
    let yaml = r#"
jobs:
  - id: solo
    environment:
      machine: true
    cache:
      checksum_files: [missing-lockfile]
      paths: [target]
    steps:
      - name: work
        run: "echo never reached"
workflows:
  main:
    jobs: [solo]
"#;
    let harness = TestHarness::new();
    let report = harness.run_workflow(yaml, "main", 1).await;

    // An uncomputable key is caught before any environment exists
    assert_job_status(&report, "solo", JobStatus::Errored);
    assert!(report.job("solo").unwrap().steps.is_empty());
    assert_eq!(harness.provisioner.provisions(), 0);
    assert_eq!(harness.provisioner.teardowns(), 0);
}

#[tokio::test]
async fn test_every_job_in_workflow_gets_torn_down() {
    let yaml = r#"
jobs:
  - id: ok
    environment:
      machine: true
    steps:
      - name: work
        run: "echo fine"
  - id: broken
    environment:
      machine: true
    steps:
      - name: work
        run: "exit 1"
workflows:
  main:
    jobs: [ok, broken]
"#;
    let harness = TestHarness::new();
    let report = harness.run_workflow(yaml, "main", 2).await;

    assert!(!report.passed());
    assert_eq!(harness.provisioner.provisions(), 2);
    assert_eq!(harness.provisioner.teardowns(), 2);
}
