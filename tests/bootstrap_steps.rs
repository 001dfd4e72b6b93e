//! Step-sequence tests for the bootstrap runner
//!
//! These exercise the conditional and idempotence behavior of the
//! filesystem-facing steps (working directory, source, remote config,
//! container) composed in runner order, using temp directories and an
//! in-memory object store. Nothing here needs root, Docker, git, or AWS.

use highlights_bootstrap::config::BootstrapConfig;
use highlights_bootstrap::host::HostState;
use highlights_bootstrap::step::StepStatus;
use highlights_bootstrap::steps::{container, env_file, host_agent, source, workdir};
use highlights_bootstrap::store::ObjectStore;
use std::collections::HashMap;
use std::path::Path;

/// In-memory object store standing in for S3
#[derive(Default)]
struct MemStore {
    objects: HashMap<(String, String), Vec<u8>>,
}

impl MemStore {
    fn with_object(bucket: &str, key: &str, bytes: &[u8]) -> Self {
        let mut store = Self::default();
        store
            .objects
            .insert((bucket.to_string(), key.to_string()), bytes.to_vec());
        store
    }
}

impl ObjectStore for MemStore {
    async fn exists(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    async fn fetch(&self, bucket: &str, key: &str) -> anyhow::Result<Vec<u8>> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such object"))
    }
}

fn current_user() -> String {
    let output = std::process::Command::new("id").arg("-un").output().unwrap();
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

fn config_at(root: &Path) -> BootstrapConfig {
    BootstrapConfig {
        app_root: root.display().to_string(),
        service_user: current_user(),
        ..BootstrapConfig::default()
    }
}

#[tokio::test]
async fn test_empty_repo_url_reduces_downstream_steps_to_skips() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("highlights");
    let config = config_at(&root);
    let store = MemStore::default();
    let mut state = HostState::new();

    let workdir_outcome = workdir::run(&config, &mut state).await;
    let source_outcome = source::run(&config, &mut state).await;
    let env_outcome = env_file::run(&config, &mut state, &store).await;
    let container_outcome = container::run(&config, &mut state).await;

    assert_eq!(workdir_outcome.status, StepStatus::Succeeded);
    assert_eq!(source_outcome.status, StepStatus::SkippedDependencyMissing);
    assert_eq!(env_outcome.status, StepStatus::SkippedDependencyMissing);
    assert_eq!(
        container_outcome.status,
        StepStatus::SkippedDependencyMissing
    );

    // Every outcome lets the run continue; nothing is fatal.
    for outcome in [workdir_outcome, source_outcome, env_outcome, container_outcome] {
        assert!(outcome.status.allows_continuation());
    }

    assert!(state.source_dir.is_none());
    assert!(state.env_file.is_none());
    assert!(!state.container_running);
}

#[tokio::test]
async fn test_negative_probe_means_no_env_file_is_ever_created() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("highlights");
    let config = BootstrapConfig {
        env_bucket: "highlights-config".to_string(),
        env_key: "prod/.env".to_string(),
        ..config_at(&root)
    };
    // Bucket/key configured but the object was never uploaded.
    let store = MemStore::default();
    let mut state = HostState::new();

    workdir::run(&config, &mut state).await;
    let outcome = env_file::run(&config, &mut state, &store).await;

    assert_eq!(outcome.status, StepStatus::SkippedDependencyMissing);
    assert!(state.env_file.is_none());
    assert!(!config.env_file().exists());
}

#[tokio::test]
async fn test_second_run_converges_to_the_same_host_state() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("highlights");
    let config = BootstrapConfig {
        repo_url: "https://github.com/example/sports-highlights-pipeline.git".to_string(),
        env_bucket: "highlights-config".to_string(),
        env_key: "prod/.env".to_string(),
        ..config_at(&root)
    };
    let store = MemStore::with_object("highlights-config", "prod/.env", b"RAPIDAPI_KEY=k\n");

    // A previous bootstrap already left a checkout behind.
    std::fs::create_dir_all(config.source_dir().join(".git")).unwrap();

    let mut first = HostState::new();
    workdir::run(&config, &mut first).await;
    source::run(&config, &mut first).await;
    env_file::run(&config, &mut first, &store).await;

    let mut second = HostState::new();
    let workdir_outcome = workdir::run(&config, &mut second).await;
    let source_outcome = source::run(&config, &mut second).await;
    let env_outcome = env_file::run(&config, &mut second, &store).await;

    // Re-running changed nothing observable.
    assert_eq!(workdir_outcome.status, StepStatus::Succeeded);
    assert_eq!(source_outcome.status, StepStatus::SkippedAlreadySatisfied);
    assert_eq!(env_outcome.status, StepStatus::Succeeded);

    assert_eq!(first.workdir_ready, second.workdir_ready);
    assert_eq!(first.source_dir, second.source_dir);
    assert_eq!(first.env_file, second.env_file);

    let env = std::fs::read_to_string(config.env_file()).unwrap();
    assert_eq!(env, "RAPIDAPI_KEY=k\n");
}

#[tokio::test]
async fn test_host_agent_failure_does_not_stop_the_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("highlights");
    let config = config_at(&root);
    let store = MemStore::default();
    let mut state = HostState::new();

    // The agent install fails outright ("false" stands in for snap and
    // systemctl); everything after it must still run.
    let agent_outcome = host_agent::run_with_tools(&mut state, "false", "false").await;
    let workdir_outcome = workdir::run(&config, &mut state).await;
    let source_outcome = source::run(&config, &mut state).await;
    let env_outcome = env_file::run(&config, &mut state, &store).await;

    assert_eq!(agent_outcome.status, StepStatus::FailedNonFatal);
    assert!(agent_outcome.status.allows_continuation());
    assert_eq!(workdir_outcome.status, StepStatus::Succeeded);
    assert!(source_outcome.status.allows_continuation());
    assert!(env_outcome.status.allows_continuation());
    assert!(root.is_dir());

    // Exactly one non-fatal failure, nothing fatal.
    let statuses = [
        agent_outcome.status,
        workdir_outcome.status,
        source_outcome.status,
        env_outcome.status,
    ];
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == StepStatus::FailedNonFatal)
            .count(),
        1
    );
    assert!(!statuses.contains(&StepStatus::FailedFatal));
}

#[tokio::test]
async fn test_checkout_without_build_descriptor_skips_the_container() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("highlights");
    let config = BootstrapConfig {
        repo_url: "https://github.com/example/sports-highlights-pipeline.git".to_string(),
        ..config_at(&root)
    };
    // Checkout exists but carries no Dockerfile.
    std::fs::create_dir_all(config.source_dir().join(".git")).unwrap();

    let mut state = HostState::new();
    workdir::run(&config, &mut state).await;
    let source_outcome = source::run(&config, &mut state).await;
    let container_outcome = container::run(&config, &mut state).await;

    assert_eq!(source_outcome.status, StepStatus::SkippedAlreadySatisfied);
    assert_eq!(
        container_outcome.status,
        StepStatus::SkippedDependencyMissing
    );
    assert!(!state.container_running);
    assert!(container_outcome.status.allows_continuation());
}
