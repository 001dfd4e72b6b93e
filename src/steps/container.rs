//! Step 7: image build and initial run
//!
//! Conditional on a build descriptor (Dockerfile) inside the checkout. The
//! container name is fixed and singular: an existing container of that name
//! means a previous bootstrap already started it, which is a collision to
//! report, never a reason to crash the sequence.

use crate::command::{run_command, CommandConfig};
use crate::config::BootstrapConfig;
use crate::host::HostState;
use crate::step::StepOutcome;
use tracing::info;

pub const NAME: &str = "container";

/// Build the image from the checkout and start the initial container
pub async fn run(config: &BootstrapConfig, state: &mut HostState) -> StepOutcome {
    let Some(source_dir) = state.source_dir.clone() else {
        return StepOutcome::dependency_missing("no source checkout");
    };
    if !source_dir.join("Dockerfile").exists() {
        return StepOutcome::dependency_missing(format!(
            "no Dockerfile in {}",
            source_dir.display()
        ));
    }
    if state.missing_binaries.iter().any(|b| b == "docker") {
        return StepOutcome::dependency_missing(
            "container runtime did not install in the package step",
        );
    }

    let context = source_dir.display().to_string();
    let build = run_command(
        "docker",
        &["build", "-t", &config.image_tag, &context],
        &CommandConfig::for_build(),
    )
    .await;
    match build {
        Ok(output) if output.success => {
            info!(tag = %config.image_tag, "Image built");
        }
        Ok(output) => {
            return StepOutcome::failed_non_fatal(format!(
                "image build failed: {}",
                output.error_detail()
            ));
        }
        Err(e) => return StepOutcome::failed_non_fatal(format!("docker unavailable: {:#}", e)),
    }

    // A container from a previous bootstrap may already hold the name.
    if let Ok(existing) = run_command(
        "docker",
        &["ps", "-a", "--format", "{{.Names}}"],
        &CommandConfig::with_timeout_secs(30),
    )
    .await
    {
        if existing.stdout.iter().any(|n| n == &config.container_name) {
            state.container_running = true;
            return StepOutcome::already_satisfied(format!(
                "container '{}' already exists",
                config.container_name
            ));
        }
    }

    let env_file = state.env_file.as_ref().map(|p| p.display().to_string());
    let mut args = vec!["run", "-d", "--name", config.container_name.as_str()];
    if let Some(path) = env_file.as_deref() {
        args.push("--env-file");
        args.push(path);
    }
    args.push(&config.image_tag);

    let run = run_command("docker", &args, &CommandConfig::for_build()).await;
    match run {
        Ok(output) if output.success => {
            info!(name = %config.container_name, "Container started");
            state.container_running = true;
            StepOutcome::succeeded()
        }
        Ok(output) if is_name_collision(&output.stderr) => {
            // Lost a race against an earlier run; the container exists, which
            // is the end state this step wants.
            state.container_running = true;
            StepOutcome::succeeded_with(format!(
                "container name '{}' already in use",
                config.container_name
            ))
        }
        Ok(output) => StepOutcome::failed_non_fatal(format!(
            "container start failed: {}",
            output.error_detail()
        )),
        Err(e) => StepOutcome::failed_non_fatal(format!("docker unavailable: {:#}", e)),
    }
}

/// Whether docker's stderr indicates the fixed container name is taken
fn is_name_collision(stderr: &[String]) -> bool {
    stderr.iter().any(|line| line.contains("is already in use"))
}
