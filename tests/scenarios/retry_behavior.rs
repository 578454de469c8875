//! Test: step retries - bounded attempts, best-effort semantics

use crate::helpers::*;
use conveyor::core::JobStatus;

/// Command that fails until it has been run `n` times (state kept in the
/// job's workspace)
fn succeed_on_attempt(n: usize) -> String {
    format!(
        "c=$(cat attempts 2>/dev/null || echo 0); c=$((c+1)); echo $c > attempts; test $c -ge {}",
        n
    )
}

#[tokio::test]
async fn test_retry_succeeds_on_third_attempt() {
    let yaml = format!(
        r#"
jobs:
  - id: flaky
    environment:
      machine: true
    steps:
      - name: merge base
        run: "{}"
        retries: 2
      - name: test
        run: "echo tests pass"
workflows:
  main:
    jobs: [flaky]
"#,
        succeed_on_attempt(3)
    );

    let harness = TestHarness::new();
    let report = harness.run_workflow(&yaml, "main", 1).await;

    assert!(report.passed());
    assert_eq!(step_attempts(&report, "flaky", "merge base"), 3);
    assert_step_succeeded(&report, "flaky", "merge base");
    assert_step_succeeded(&report, "flaky", "test");
}

#[tokio::test]
async fn test_exhausted_retries_are_recorded_but_not_decisive() {
    let yaml = r#"
jobs:
  - id: tolerant
    environment:
      machine: true
    steps:
      - name: optional sync
        run: "exit 1"
        retries: 2
      - name: test
        run: "echo tests pass"
workflows:
  main:
    jobs: [tolerant]
"#;
    let harness = TestHarness::new();
    let report = harness.run_workflow(yaml, "main", 1).await;

    // Three attempts recorded, step failed, job still decided by later steps
    assert_eq!(step_attempts(&report, "tolerant", "optional sync"), 3);
    assert_step_failed(&report, "tolerant", "optional sync");
    assert_job_status(&report, "tolerant", JobStatus::Succeeded);
}

#[tokio::test]
async fn test_later_decisive_step_still_fails_the_job() {
    let yaml = r#"
jobs:
  - id: doomed
    environment:
      machine: true
    steps:
      - name: optional sync
        run: "exit 1"
        retries: 1
      - name: test
        run: "exit 1"
workflows:
  main:
    jobs: [doomed]
"#;
    let harness = TestHarness::new();
    let report = harness.run_workflow(yaml, "main", 1).await;

    assert_eq!(step_attempts(&report, "doomed", "optional sync"), 2);
    assert_step_failed(&report, "doomed", "test");
    assert_job_status(&report, "doomed", JobStatus::Failed);
}

#[tokio::test]
async fn test_no_retries_means_single_attempt() {
    let yaml = r#"
jobs:
  - id: strict
    environment:
      machine: true
    steps:
      - name: test
        run: "exit 1"
workflows:
  main:
    jobs: [strict]
"#;
    let harness = TestHarness::new();
    let report = harness.run_workflow(yaml, "main", 1).await;

    assert_eq!(step_attempts(&report, "strict", "test"), 1);
    assert_job_status(&report, "strict", JobStatus::Failed);
}

#[tokio::test]
async fn test_successful_first_attempt_skips_retries() {
    let yaml = r#"
jobs:
  - id: stable
    environment:
      machine: true
    steps:
      - name: merge base
        run: "true"
        retries: 5
workflows:
  main:
    jobs: [stable]
"#;
    let harness = TestHarness::new();
    let report = harness.run_workflow(yaml, "main", 1).await;

    assert!(report.passed());
    assert_eq!(step_attempts(&report, "stable", "merge base"), 1);
}
