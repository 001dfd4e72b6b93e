//! Step 8: recurring job registration
//!
//! Installs a crontab entry for the service account that re-runs the image
//! on the configured cadence. The original boot script appended blindly and
//! accumulated duplicate entries across re-runs; here the existing crontab
//! is listed first and the entry is only added when no equivalent line is
//! already present.

use crate::command::{run_command, run_command_with_stdin, CommandConfig};
use crate::config::BootstrapConfig;
use crate::host::HostState;
use crate::step::StepOutcome;
use std::path::Path;
use tracing::info;

pub const NAME: &str = "job_schedule";

/// Register the recurring pipeline job in the service account's crontab
pub async fn run(config: &BootstrapConfig, state: &mut HostState) -> StepOutcome {
    let entry = render_entry(config, state.env_file.as_deref());

    let list = run_command(
        "crontab",
        &["-l", "-u", &config.service_user],
        &CommandConfig::with_timeout_secs(30),
    )
    .await;
    let existing = match list {
        // Non-zero exit means "no crontab for user"; start from empty.
        Ok(output) if output.success => output.stdout_text(),
        Ok(_) => String::new(),
        Err(e) => {
            return StepOutcome::failed_non_fatal(format!("crontab unavailable: {:#}", e));
        }
    };

    let Some(updated) = merge_entry(&existing, &entry, &config.cron_schedule, &config.image_tag)
    else {
        state.job_scheduled = true;
        return StepOutcome::already_satisfied("equivalent cron entry already present");
    };

    let install = run_command_with_stdin(
        "crontab",
        &["-u", &config.service_user, "-"],
        updated.as_bytes(),
        &CommandConfig::with_timeout_secs(30),
    )
    .await;
    match install {
        Ok(output) if output.success => {
            info!(user = %config.service_user, entry = %entry, "Cron entry installed");
            state.job_scheduled = true;
            StepOutcome::succeeded()
        }
        Ok(output) => StepOutcome::failed_non_fatal(format!(
            "crontab install failed: {}",
            output.error_detail()
        )),
        Err(e) => StepOutcome::failed_non_fatal(format!("crontab unavailable: {:#}", e)),
    }
}

/// Render the cron line for the recurring run
///
/// The job re-invokes the image with `--rm` so repeated runs never collide
/// on a container name, and appends all output to the host cron log.
pub fn render_entry(config: &BootstrapConfig, env_file: Option<&Path>) -> String {
    let env = env_file
        .map(|p| format!(" --env-file {}", p.display()))
        .unwrap_or_default();
    format!(
        "{} docker run --rm{} {} >> {} 2>&1",
        config.cron_schedule, env, config.image_tag, config.cron_log
    )
}

/// Merge `entry` into an existing crontab, returning the new crontab text or
/// `None` when the entry is already present verbatim
///
/// Equivalence is keyed on schedule plus image, not the exact line: a
/// re-bootstrap that renders the entry differently (an env file appeared or
/// disappeared) replaces the stale line instead of stacking a second job on
/// the same cadence.
pub fn merge_entry(existing: &str, entry: &str, schedule: &str, image_tag: &str) -> Option<String> {
    let wanted = entry.trim();
    let has_exact = existing.lines().any(|line| line.trim() == wanted);
    let has_stale = existing
        .lines()
        .any(|line| line.trim() != wanted && is_equivalent(line, schedule, image_tag));
    if has_exact && !has_stale {
        return None;
    }

    let mut lines: Vec<&str> = existing
        .lines()
        .filter(|line| !is_equivalent(line, schedule, image_tag))
        .collect();
    lines.push(wanted);
    Some(lines.join("\n") + "\n")
}

/// Whether a crontab line runs the same image on the same schedule
fn is_equivalent(line: &str, schedule: &str, image_tag: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.starts_with('#') {
        return false;
    }
    let schedule_fields: Vec<&str> = schedule.split_whitespace().collect();
    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    fields.len() > schedule_fields.len()
        && fields[..schedule_fields.len()] == schedule_fields[..]
        && fields.iter().any(|f| *f == image_tag)
}
