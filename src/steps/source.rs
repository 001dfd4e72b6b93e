//! Step 5: source acquisition
//!
//! Clones the pipeline repository into a fixed subpath of the app root,
//! under the service account identity. Skips when no repository is
//! configured and when a checkout is already present; a re-run must never
//! attempt a second clone or fail because the destination exists.

use crate::command::{run_command_as, CommandConfig};
use crate::config::BootstrapConfig;
use crate::host::HostState;
use crate::step::StepOutcome;
use tracing::info;

pub const NAME: &str = "source_acquisition";

/// Clone the configured repository if no checkout exists yet
pub async fn run(config: &BootstrapConfig, state: &mut HostState) -> StepOutcome {
    let Some(url) = config.repo_url() else {
        return StepOutcome::dependency_missing("no repository configured");
    };

    let dest = config.source_dir();
    if dest.join(".git").exists() {
        info!(path = %dest.display(), "Checkout already present");
        state.source_dir = Some(dest);
        return StepOutcome::already_satisfied("checkout already present");
    }

    let dest_str = dest.display().to_string();
    let clone = run_command_as(
        &config.service_user,
        "git",
        &["clone", url, &dest_str],
        &CommandConfig::for_download(),
    )
    .await;
    match clone {
        Ok(output) if output.success => {
            info!(url, path = %dest_str, "Repository cloned");
            state.source_dir = Some(dest);
            StepOutcome::succeeded()
        }
        Ok(output) => StepOutcome::failed_non_fatal(format!(
            "clone of {} failed: {}",
            url,
            output.error_detail()
        )),
        Err(e) => StepOutcome::failed_non_fatal(format!("git unavailable: {:#}", e)),
    }
}
