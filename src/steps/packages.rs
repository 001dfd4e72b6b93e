//! Step 1: system package sync
//!
//! The only step allowed to fail the whole run: if the package manager
//! itself is broken the host is unusable and nothing downstream can recover.
//! A failed install of individual packages is downgraded to non-fatal, but
//! never silently ignored: the step's contract is "all listed binaries
//! present", verified after the install.

use crate::command::{binary_on_path, run_command, CommandConfig};
use crate::defaults::{BASE_PACKAGES, BASE_PACKAGE_BINARIES};
use crate::host::HostState;
use crate::step::StepOutcome;
use tracing::info;

pub const NAME: &str = "system_packages";

/// Sync the package index and install the base package set
pub async fn run(state: &mut HostState) -> StepOutcome {
    let config = CommandConfig::for_package_ops();

    let update = match run_command("apt-get", &["update", "-y"], &config).await {
        Ok(output) => output,
        Err(e) => {
            return StepOutcome::failed_fatal(format!("package manager unavailable: {:#}", e));
        }
    };
    if !update.success {
        return StepOutcome::failed_fatal(format!(
            "apt-get update failed: {}",
            update.error_detail()
        ));
    }

    let mut args = vec!["install", "-y"];
    args.extend_from_slice(BASE_PACKAGES);
    let install = match run_command("apt-get", &args, &config).await {
        Ok(output) => output,
        Err(e) => {
            return StepOutcome::failed_fatal(format!("package manager unavailable: {:#}", e));
        }
    };

    // The install exit code alone is not the contract; verify that every
    // expected binary actually landed on the host.
    let missing = missing_binaries(BASE_PACKAGE_BINARIES);
    state.packages_ready = missing.is_empty();
    state.missing_binaries = missing.clone();

    if !missing.is_empty() {
        return StepOutcome::failed_non_fatal(format!(
            "binaries missing after install: {}",
            missing.join(", ")
        ));
    }

    info!(packages = ?BASE_PACKAGES, "Base packages verified present");
    if install.success {
        StepOutcome::succeeded()
    } else {
        // Everything we need is present despite the non-zero exit (for
        // example a failing unrelated trigger); record it rather than hide it.
        StepOutcome::succeeded_with(format!(
            "install exited non-zero but all binaries present: {}",
            install.error_detail()
        ))
    }
}

/// Which of the expected binaries are not on PATH
fn missing_binaries(expected: &[&str]) -> Vec<String> {
    expected
        .iter()
        .filter(|name| binary_on_path(name).is_none())
        .map(|name| name.to_string())
        .collect()
}
