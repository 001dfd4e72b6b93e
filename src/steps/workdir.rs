//! Step 4: working directory setup
//!
//! Creates the application root and hands ownership to the service account.
//! Creation is a no-op when the directory already exists, so the step is
//! safely re-runnable.

use crate::command::{run_command, CommandConfig};
use crate::config::BootstrapConfig;
use crate::host::HostState;
use crate::step::StepOutcome;

pub const NAME: &str = "working_directory";

/// Create the app root and chown it to the service account
pub async fn run(config: &BootstrapConfig, state: &mut HostState) -> StepOutcome {
    if let Err(e) = tokio::fs::create_dir_all(&config.app_root).await {
        return StepOutcome::failed_non_fatal(format!(
            "cannot create {}: {}",
            config.app_root, e
        ));
    }

    let owner = format!("{}:{}", config.service_user, config.service_user);
    let chown = run_command(
        "chown",
        &["-R", &owner, &config.app_root],
        &CommandConfig::with_timeout_secs(60),
    )
    .await;
    match chown {
        Ok(output) if output.success => {
            state.workdir_ready = true;
            StepOutcome::succeeded()
        }
        Ok(output) => StepOutcome::failed_non_fatal(format!(
            "directory created but chown to {} failed: {}",
            config.service_user,
            output.error_detail()
        )),
        Err(e) => StepOutcome::failed_non_fatal(format!("chown unavailable: {:#}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepStatus;

    fn current_user() -> String {
        let output = std::process::Command::new("id").arg("-un").output().unwrap();
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }

    fn test_config(root: &std::path::Path) -> BootstrapConfig {
        BootstrapConfig {
            app_root: root.display().to_string(),
            service_user: current_user(),
            ..BootstrapConfig::default()
        }
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("highlights");
        let config = test_config(&root);
        let mut state = HostState::new();

        let outcome = run(&config, &mut state).await;
        assert_eq!(outcome.status, StepStatus::Succeeded);
        assert!(root.is_dir());
        assert!(state.workdir_ready);
    }

    #[tokio::test]
    async fn test_rerun_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("highlights");
        let config = test_config(&root);

        let mut state = HostState::new();
        run(&config, &mut state).await;
        let outcome = run(&config, &mut state).await;
        assert_eq!(outcome.status, StepStatus::Succeeded);
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn test_unknown_user_is_non_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("highlights");
        let config = BootstrapConfig {
            app_root: root.display().to_string(),
            service_user: "no-such-user-1357".to_string(),
            ..BootstrapConfig::default()
        };
        let mut state = HostState::new();

        let outcome = run(&config, &mut state).await;
        assert_eq!(outcome.status, StepStatus::FailedNonFatal);
        // The directory itself still got created
        assert!(root.is_dir());
        assert!(!state.workdir_ready);
    }
}
