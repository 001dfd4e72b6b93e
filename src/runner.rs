//! The bootstrap runner: an ordered, failure-tolerant step sequence
//!
//! Runs the eight provisioning steps in order, threading `HostState` through
//! them and recording one audit line per step. Graceful degradation is the
//! core property: every outcome except `FailedFatal` lets the sequence
//! continue, so a host that cannot reach its repository or its config object
//! still ends up with base tooling and a scheduled job.

use crate::config::BootstrapConfig;
use crate::host::HostState;
use crate::logging::HostLog;
use crate::step::{RunReport, StepOutcome, StepRecord};
use crate::steps;
use crate::store::ObjectStore;
use std::time::Instant;

/// Execute the full bootstrap sequence
pub async fn run_bootstrap(
    config: &BootstrapConfig,
    store: &impl ObjectStore,
    log: &HostLog,
) -> RunReport {
    let mut state = HostState::new();
    let mut report = RunReport::new();

    log.note(&format!(
        "bootstrap starting: app_root={} image={} container={}",
        config.app_root, config.image_tag, config.container_name
    ));

    let sequence_start = Instant::now();

    // Step 1 is the only one that may halt the run.
    let started = Instant::now();
    let outcome = steps::packages::run(&mut state).await;
    let halt = !record(&mut report, log, steps::packages::NAME, outcome, started);
    if halt {
        log.note(&format!("bootstrap halted: {}", report.summary()));
        return report;
    }

    let started = Instant::now();
    let outcome = steps::cloud_cli::run(&mut state).await;
    record(&mut report, log, steps::cloud_cli::NAME, outcome, started);

    let started = Instant::now();
    let outcome = steps::host_agent::run(&mut state).await;
    record(&mut report, log, steps::host_agent::NAME, outcome, started);

    let started = Instant::now();
    let outcome = steps::workdir::run(config, &mut state).await;
    record(&mut report, log, steps::workdir::NAME, outcome, started);

    let started = Instant::now();
    let outcome = steps::source::run(config, &mut state).await;
    record(&mut report, log, steps::source::NAME, outcome, started);

    let started = Instant::now();
    let outcome = steps::env_file::run(config, &mut state, store).await;
    record(&mut report, log, steps::env_file::NAME, outcome, started);

    let started = Instant::now();
    let outcome = steps::container::run(config, &mut state).await;
    record(&mut report, log, steps::container::NAME, outcome, started);

    let started = Instant::now();
    let outcome = steps::schedule::run(config, &mut state).await;
    record(&mut report, log, steps::schedule::NAME, outcome, started);

    log.note(&format!(
        "bootstrap finished in {:.1}s: {}",
        sequence_start.elapsed().as_secs_f64(),
        report.summary()
    ));
    log.note(&describe_host(&state));
    report
}

/// Render the final host state for the audit trail
fn describe_host(state: &HostState) -> String {
    format!(
        "host state: packages={} cloud_cli={} host_agent={} workdir={} source={} env_file={} container={} job_scheduled={}",
        if state.packages_ready {
            "ready".to_string()
        } else {
            format!("missing [{}]", state.missing_binaries.join(", "))
        },
        state.cloud_cli_ready,
        state.host_agent_ready,
        state.workdir_ready,
        state
            .source_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none".to_string()),
        state
            .env_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none".to_string()),
        state.container_running,
        state.job_scheduled,
    )
}

/// Record a finished step; returns whether the run may continue
fn record(
    report: &mut RunReport,
    log: &HostLog,
    name: &'static str,
    outcome: StepOutcome,
    started: Instant,
) -> bool {
    let record = StepRecord {
        finished_at: chrono::Utc::now(),
        step: name,
        status: outcome.status,
        detail: outcome.detail,
        duration_secs: started.elapsed().as_secs_f64(),
    };
    log.record(&record);
    let proceed = record.status.allows_continuation();
    report.push(record);
    proceed
}
