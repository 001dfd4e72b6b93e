//! Step 3: host agent provisioning
//!
//! Best-effort install of the remote-management (SSM) agent. The agent is
//! operator convenience, not a pipeline dependency, so every failure is
//! swallowed into a non-fatal outcome. The failure is still reported; the
//! audit log must show that the host has no management agent.

use crate::command::{run_command, CommandConfig};
use crate::host::HostState;
use crate::step::StepOutcome;
use tracing::info;

pub const NAME: &str = "host_agent";

const SERVICE: &str = "snap.amazon-ssm-agent.amazon-ssm-agent.service";

/// Install and enable the SSM agent, best effort
pub async fn run(state: &mut HostState) -> StepOutcome {
    run_with_tools(state, "snap", "systemctl").await
}

/// Same step with the snap and systemctl binaries injected, so the failure
/// paths can be exercised with stand-in commands
pub async fn run_with_tools(state: &mut HostState, snap: &str, systemctl: &str) -> StepOutcome {
    let config = CommandConfig::for_package_ops();

    // Already active from the base image?
    if let Ok(output) = run_command(
        systemctl,
        &["is-active", "--quiet", SERVICE],
        &CommandConfig::with_timeout_secs(30),
    )
    .await
    {
        if output.success {
            state.host_agent_ready = true;
            return StepOutcome::already_satisfied("SSM agent already active");
        }
    }

    let install = run_command(
        snap,
        &["install", "amazon-ssm-agent", "--classic"],
        &config,
    )
    .await;
    match install {
        Ok(output) if output.success => {}
        Ok(output) => {
            return StepOutcome::failed_non_fatal(format!(
                "agent install failed: {}",
                output.error_detail()
            ));
        }
        Err(e) => {
            return StepOutcome::failed_non_fatal(format!("agent install unavailable: {:#}", e));
        }
    }

    let enable = run_command(
        systemctl,
        &["enable", "--now", SERVICE],
        &CommandConfig::with_timeout_secs(60),
    )
    .await;
    match enable {
        Ok(output) if output.success => {
            info!("SSM agent installed and enabled");
            state.host_agent_ready = true;
            StepOutcome::succeeded()
        }
        Ok(output) => StepOutcome::failed_non_fatal(format!(
            "agent service activation failed: {}",
            output.error_detail()
        )),
        Err(e) => StepOutcome::failed_non_fatal(format!("systemctl unavailable: {:#}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepStatus;

    #[tokio::test]
    async fn test_active_agent_short_circuits() {
        let mut state = HostState::new();
        // "true" stands in for a systemctl whose is-active check passes.
        let outcome = run_with_tools(&mut state, "snap", "true").await;
        assert_eq!(outcome.status, StepStatus::SkippedAlreadySatisfied);
        assert!(state.host_agent_ready);
    }

    #[tokio::test]
    async fn test_install_failure_is_non_fatal() {
        let mut state = HostState::new();
        // is-active fails, then the install itself fails.
        let outcome = run_with_tools(&mut state, "false", "false").await;
        assert_eq!(outcome.status, StepStatus::FailedNonFatal);
        assert!(outcome.status.allows_continuation());
        assert!(outcome.detail.unwrap().contains("agent install failed"));
        assert!(!state.host_agent_ready);
    }

    #[tokio::test]
    async fn test_missing_installer_is_non_fatal() {
        let mut state = HostState::new();
        let outcome =
            run_with_tools(&mut state, "no-such-snap-binary-8642", "false").await;
        assert_eq!(outcome.status, StepStatus::FailedNonFatal);
        assert!(!state.host_agent_ready);
    }
}
