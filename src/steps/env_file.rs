//! Step 6: remote configuration fetch
//!
//! Probes the object store for the environment object and, only when the
//! probe is positive, materializes it as the application's `.env` file. An
//! absent object is an expected skip: freshly created deployments have no
//! environment uploaded yet, and the pipeline must still bootstrap.

use crate::command::{run_command, CommandConfig};
use crate::config::BootstrapConfig;
use crate::host::HostState;
use crate::step::StepOutcome;
use crate::store::ObjectStore;
use tracing::info;

pub const NAME: &str = "remote_config";

/// Fetch the environment object into `<app_root>/.env`
pub async fn run(
    config: &BootstrapConfig,
    state: &mut HostState,
    store: &impl ObjectStore,
) -> StepOutcome {
    let Some(object) = config.env_object() else {
        return StepOutcome::dependency_missing("no environment object configured");
    };

    if !store.exists(&object.bucket, &object.key).await {
        return StepOutcome::dependency_missing(format!(
            "s3://{}/{} not present",
            object.bucket, object.key
        ));
    }

    let bytes = match store.fetch(&object.bucket, &object.key).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return StepOutcome::failed_non_fatal(format!(
                "fetch of s3://{}/{} failed: {:#}",
                object.bucket, object.key, e
            ));
        }
    };

    let dest = config.env_file();
    if let Err(e) = tokio::fs::write(&dest, &bytes).await {
        return StepOutcome::failed_non_fatal(format!(
            "cannot write {}: {}",
            dest.display(),
            e
        ));
    }
    info!(path = %dest.display(), bytes = bytes.len(), "Environment file materialized");

    let owner = format!("{}:{}", config.service_user, config.service_user);
    let dest_str = dest.display().to_string();
    let chown = run_command(
        "chown",
        &[&owner, &dest_str],
        &CommandConfig::with_timeout_secs(30),
    )
    .await;
    match chown {
        Ok(output) if output.success => {
            state.env_file = Some(dest);
            StepOutcome::succeeded()
        }
        Ok(output) => {
            // The file is in place and readable by the runner's children;
            // only the ownership handoff failed.
            state.env_file = Some(dest);
            StepOutcome::failed_non_fatal(format!(
                "env file written but chown to {} failed: {}",
                config.service_user,
                output.error_detail()
            ))
        }
        Err(e) => {
            state.env_file = Some(dest);
            StepOutcome::failed_non_fatal(format!("chown unavailable: {:#}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepStatus;
    use std::collections::HashMap;

    /// In-memory store for exercising the fetch step
    #[derive(Default)]
    struct MemStore {
        objects: HashMap<(String, String), Vec<u8>>,
        fail_fetch: bool,
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
            if self.fail_fetch {
                anyhow::bail!("store unavailable");
            }
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

    fn test_config(root: &std::path::Path) -> BootstrapConfig {
        BootstrapConfig {
            env_bucket: "highlights-config".to_string(),
            env_key: "prod/.env".to_string(),
            app_root: root.display().to_string(),
            service_user: current_user(),
            ..BootstrapConfig::default()
        }
    }

    #[tokio::test]
    async fn test_unconfigured_object_skips() {
        let config = BootstrapConfig::default();
        let mut state = HostState::new();
        let store = MemStore::default();

        let outcome = run(&config, &mut state, &store).await;
        assert_eq!(outcome.status, StepStatus::SkippedDependencyMissing);
        assert!(state.env_file.is_none());
    }

    #[tokio::test]
    async fn test_absent_object_skips_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut state = HostState::new();
        let store = MemStore::default();

        let outcome = run(&config, &mut state, &store).await;
        assert_eq!(outcome.status, StepStatus::SkippedDependencyMissing);
        assert!(state.env_file.is_none());
        assert!(!config.env_file().exists());
    }

    #[tokio::test]
    async fn test_present_object_is_materialized() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut state = HostState::new();
        let store = MemStore::with_object(
            "highlights-config",
            "prod/.env",
            b"RAPIDAPI_KEY=secret\nAWS_REGION=ap-south-1\n",
        );

        let outcome = run(&config, &mut state, &store).await;
        assert_eq!(outcome.status, StepStatus::Succeeded);
        assert_eq!(state.env_file.as_deref(), Some(config.env_file().as_path()));
        let written = std::fs::read_to_string(config.env_file()).unwrap();
        assert!(written.contains("RAPIDAPI_KEY=secret"));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_non_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut state = HostState::new();
        let mut store = MemStore::with_object("highlights-config", "prod/.env", b"x=1\n");
        store.fail_fetch = true;

        let outcome = run(&config, &mut state, &store).await;
        assert_eq!(outcome.status, StepStatus::FailedNonFatal);
        assert!(state.env_file.is_none());
    }
}
