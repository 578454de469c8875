//! Test: cache lifecycle across workflow runs

use crate::helpers::*;
use conveyor::core::JobStatus;

const CACHED_PAIR: &str = r#"
jobs:
  - id: job-a
    environment:
      machine: true
    cache:
      checksum_files: [deps.lock]
      paths: [target]
    steps:
      - name: restore marker
        run: "mkdir -p target"
      - name: build
        run: "exit 1"
      - name: test
        run: "echo tests"
      - name: package
        run: "echo packaging"
  - id: job-b
    environment:
      machine: true
    cache:
      checksum_files: [deps.lock]
      paths: [target]
    steps:
      - name: build
        run: "mkdir -p target && echo artifact > target/out"
      - name: test
        run: "echo tests pass"
workflows:
  main:
    jobs: [job-a, job-b]
"#;

#[tokio::test]
async fn test_failed_job_saves_nothing_while_sibling_saves() {
    let harness = TestHarness::new();
    harness.write_project_file("deps.lock", b"pinned");

    let report = harness.run_workflow(CACHED_PAIR, "main", 2).await;

    // A fails at step 2 of 4: remaining on_success steps are skipped and its
    // cache entry is never written. B is unaffected and saves.
    assert!(!report.passed());
    assert_job_status(&report, "job-a", JobStatus::Failed);
    assert_job_status(&report, "job-b", JobStatus::Succeeded);
    assert_step_skipped(&report, "job-a", "test");
    assert_step_skipped(&report, "job-a", "package");
    assert!(report.job("job-a").unwrap().cache.saved_key.is_none());
    assert!(report.job("job-b").unwrap().cache.saved_key.is_some());
    assert_eq!(harness.provisioner.teardowns(), 2);
}

#[tokio::test]
async fn test_second_run_restores_what_the_first_saved() {
    let harness = TestHarness::new();
    harness.write_project_file("deps.lock", b"pinned");

    let first = harness.run_workflow(CACHED_PAIR, "main", 2).await;
    let saved = first.job("job-b").unwrap().cache.saved_key.clone().unwrap();

    let second = harness.run_workflow(CACHED_PAIR, "main", 2).await;
    assert_eq!(
        second.job("job-b").unwrap().cache.restored_key.as_deref(),
        Some(saved.as_str())
    );
}

#[tokio::test]
async fn test_changed_checksum_input_misses_the_old_entry() {
    let harness = TestHarness::new();
    harness.write_project_file("deps.lock", b"pinned v1");
    let first = harness.run_workflow(CACHED_PAIR, "main", 2).await;
    let old_key = first.job("job-b").unwrap().cache.saved_key.clone().unwrap();

    harness.write_project_file("deps.lock", b"pinned v2");
    let second = harness.run_workflow(CACHED_PAIR, "main", 2).await;
    let job_b = second.job("job-b").unwrap();

    assert!(job_b.cache.restored_key.is_none());
    assert_ne!(job_b.cache.saved_key.as_deref(), Some(old_key.as_str()));
}

#[tokio::test]
async fn test_misconfigured_job_errors_while_sibling_completes() {
    let yaml = r#"
jobs:
  - id: misconfigured
    environment:
      machine: true
    cache:
      checksum_files: [absent.lock]
      paths: [target]
    steps:
      - name: build
        run: "echo unreachable"
  - id: fine
    environment:
      machine: true
    steps:
      - name: build
        run: "echo ok"
workflows:
  main:
    jobs: [misconfigured, fine]
"#;
    let harness = TestHarness::new();
    let report = harness.run_workflow(yaml, "main", 2).await;

    assert_job_status(&report, "misconfigured", JobStatus::Errored);
    assert!(report.job("misconfigured").unwrap().steps.is_empty());
    assert_job_status(&report, "fine", JobStatus::Succeeded);
}

#[tokio::test]
async fn test_save_after_checkpoint_persists_despite_later_failure() {
    let yaml = r#"
jobs:
  - id: checkpointed
    environment:
      machine: true
    cache:
      checksum_files: [deps.lock]
      paths: [target]
      save_after: build
    steps:
      - name: build
        run: "mkdir -p target && touch target/bin"
      - name: test
        run: "exit 1"
workflows:
  main:
    jobs: [checkpointed]
"#;
    let harness = TestHarness::new();
    harness.write_project_file("deps.lock", b"pinned");
    let report = harness.run_workflow(yaml, "main", 1).await;

    assert_job_status(&report, "checkpointed", JobStatus::Failed);
    assert!(report.job("checkpointed").unwrap().cache.saved_key.is_some());
}

#[tokio::test]
async fn test_fixture_fetched_once_then_reused_from_cache() {
    let yaml = r#"
jobs:
  - id: seeded
    environment:
      machine: true
    cache:
      checksum_files: [deps.lock]
      paths: [data]
    fixtures:
      dest: data
      fetch: "mkdir -p data && echo seed > data/fixture && echo fetched >> fetch-count"
    steps:
      - name: check
        run: "test -s data/fixture"
workflows:
  main:
    jobs: [seeded]
"#;
    let harness = TestHarness::new();
    harness.write_project_file("deps.lock", b"pinned");

    let first = harness.run_workflow(yaml, "main", 1).await;
    assert!(first.passed());
    assert!(first.job("seeded").unwrap().cache.saved_key.is_some());

    // The restored cache populates `data`, so the probe hits and the fetch
    // command never runs again
    let second = harness.run_workflow(yaml, "main", 1).await;
    assert!(second.passed());
    assert!(second.job("seeded").unwrap().cache.restored_key.is_some());
}

#[tokio::test]
async fn test_fixture_script_content_is_part_of_the_key() {
    let yaml = r#"
jobs:
  - id: scripted
    environment:
      machine: true
    cache:
      checksum_files: [deps.lock]
      paths: [data]
    fixtures:
      dest: data
      fetch: "mkdir -p data && echo seed > data/fixture"
      script: fetch.sh
    steps:
      - name: check
        run: "test -s data/fixture"
workflows:
  main:
    jobs: [scripted]
"#;
    let harness = TestHarness::new();
    harness.write_project_file("deps.lock", b"pinned");
    harness.write_project_file("fetch.sh", b"curl -o data/fixture https://example.test/v1");

    let first = harness.run_workflow(yaml, "main", 1).await;
    let old_key = first.job("scripted").unwrap().cache.saved_key.clone().unwrap();

    // Changing the fetch logic invalidates the old entry
    harness.write_project_file("fetch.sh", b"curl -o data/fixture https://example.test/v2");
    let second = harness.run_workflow(yaml, "main", 1).await;
    let job = second.job("scripted").unwrap();

    assert!(job.cache.restored_key.is_none());
    assert_ne!(job.cache.saved_key.as_deref(), Some(old_key.as_str()));
}
