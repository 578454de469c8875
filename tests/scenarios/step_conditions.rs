//! Test: step execution conditions - on_success, always, on_fail

use crate::helpers::*;
use conveyor::core::JobStatus;

#[tokio::test]
async fn test_on_fail_runs_only_after_a_failure() {
    let yaml = r#"
jobs:
  - id: broken
    environment:
      machine: true
    steps:
      - name: build
        run: "exit 1"
      - name: collect logs
        run: "echo collecting"
        when: on_fail
workflows:
  main:
    jobs: [broken]
"#;
    let harness = TestHarness::new();
    let report = harness.run_workflow(yaml, "main", 1).await;

    assert_job_status(&report, "broken", JobStatus::Failed);
    assert_step_succeeded(&report, "broken", "collect logs");
}

#[tokio::test]
async fn test_on_fail_skipped_after_success() {
    let yaml = r#"
jobs:
  - id: healthy
    environment:
      machine: true
    steps:
      - name: build
        run: "true"
      - name: collect logs
        run: "echo collecting"
        when: on_fail
workflows:
  main:
    jobs: [healthy]
"#;
    let harness = TestHarness::new();
    let report = harness.run_workflow(yaml, "main", 1).await;

    assert!(report.passed());
    assert_step_skipped(&report, "healthy", "collect logs");
}

#[tokio::test]
async fn test_skipped_on_fail_counts_as_success_for_the_next_one() {
    let yaml = r#"
jobs:
  - id: chained
    environment:
      machine: true
    steps:
      - name: build
        run: "true"
      - name: first triage
        run: "echo one"
        when: on_fail
      - name: second triage
        run: "echo two"
        when: on_fail
workflows:
  main:
    jobs: [chained]
"#;
    let harness = TestHarness::new();
    let report = harness.run_workflow(yaml, "main", 1).await;

    assert!(report.passed());
    assert_step_skipped(&report, "chained", "first triage");
    assert_step_skipped(&report, "chained", "second triage");
}

#[tokio::test]
async fn test_on_fail_reacts_to_immediate_predecessor_only() {
    let yaml = r#"
jobs:
  - id: staggered
    environment:
      machine: true
    steps:
      - name: build
        run: "exit 1"
      - name: recover
        run: "echo recovered"
        when: on_fail
      - name: late triage
        run: "echo too late"
        when: on_fail
workflows:
  main:
    jobs: [staggered]
"#;
    let harness = TestHarness::new();
    let report = harness.run_workflow(yaml, "main", 1).await;

    // `recover` ran because `build` failed; `late triage` is skipped because
    // its immediate predecessor succeeded
    assert_step_succeeded(&report, "staggered", "recover");
    assert_step_skipped(&report, "staggered", "late triage");
}

#[tokio::test]
async fn test_always_runs_after_failure_and_on_success_does_not() {
    let yaml = r#"
jobs:
  - id: mixed
    environment:
      machine: true
    steps:
      - name: build
        run: "exit 1"
      - name: test
        run: "echo testing"
      - name: upload artifacts
        run: "echo uploading"
        when: always
workflows:
  main:
    jobs: [mixed]
"#;
    let harness = TestHarness::new();
    let report = harness.run_workflow(yaml, "main", 1).await;

    assert_job_status(&report, "mixed", JobStatus::Failed);
    assert_step_skipped(&report, "mixed", "test");
    assert_step_succeeded(&report, "mixed", "upload artifacts");
}

#[tokio::test]
async fn test_always_step_failure_is_decisive() {
    let yaml = r#"
jobs:
  - id: cleanup-broken
    environment:
      machine: true
    steps:
      - name: test
        run: "true"
      - name: cleanup
        run: "exit 1"
        when: always
workflows:
  main:
    jobs: [cleanup-broken]
"#;
    let harness = TestHarness::new();
    let report = harness.run_workflow(yaml, "main", 1).await;

    assert_job_status(&report, "cleanup-broken", JobStatus::Failed);
}

#[tokio::test]
async fn test_retry_group_failure_triggers_on_fail() {
    let yaml = r#"
jobs:
  - id: grouped
    environment:
      machine: true
    steps:
      - name: optional sync
        run: "exit 1"
        retries: 2
      - name: triage
        run: "echo triaging"
        when: on_fail
workflows:
  main:
    jobs: [grouped]
"#;
    let harness = TestHarness::new();
    let report = harness.run_workflow(yaml, "main", 1).await;

    // The retry group exhausted all attempts, so the on_fail step fires even
    // though the job itself still passes
    assert_job_status(&report, "grouped", JobStatus::Succeeded);
    assert_eq!(step_attempts(&report, "grouped", "optional sync"), 3);
    assert_step_succeeded(&report, "grouped", "triage");
}
