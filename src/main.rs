//! bootstrap-runner: one-shot host provisioning for the highlights pipeline
//!
//! Runs unattended from the instance's boot hook. The host-local audit log is
//! the only operator interface; the exit code is non-zero only when the
//! package manager is broken or the overall wall-clock budget is exhausted,
//! so the orchestrator still marks degraded-but-usable hosts as ready.

use anyhow::Result;
use clap::Parser;
use highlights_bootstrap::config::{validate_config, BootstrapConfig};
use highlights_bootstrap::logging::HostLog;
use highlights_bootstrap::runner::run_bootstrap;
use highlights_bootstrap::step::{StepRecord, StepStatus};
use highlights_bootstrap::store::S3Store;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "bootstrap-runner")]
#[command(about = "One-shot host bootstrap for the highlights pipeline")]
struct Args {
    /// JSON config file rendered by the launch template
    #[arg(long)]
    config: Option<PathBuf>,

    /// Repository to clone (overrides the config file)
    #[arg(long)]
    repo_url: Option<String>,

    /// Bucket holding the environment object (overrides the config file)
    #[arg(long)]
    env_bucket: Option<String>,

    /// Key of the environment object (overrides the config file)
    #[arg(long)]
    env_key: Option<String>,

    /// Application root directory (overrides the config file)
    #[arg(long)]
    app_root: Option<String>,

    /// Audit log path (overrides the config file)
    #[arg(long)]
    audit_log: Option<String>,
}

impl Args {
    fn apply_to(&self, config: &mut BootstrapConfig) {
        if let Some(v) = &self.repo_url {
            config.repo_url = v.clone();
        }
        if let Some(v) = &self.env_bucket {
            config.env_bucket = v.clone();
        }
        if let Some(v) = &self.env_key {
            config.env_key = v.clone();
        }
        if let Some(v) = &self.app_root {
            config.app_root = v.clone();
        }
        if let Some(v) = &self.audit_log {
            config.audit_log = v.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => BootstrapConfig::load(path)?,
        None => BootstrapConfig::default(),
    };
    args.apply_to(&mut config);
    validate_config(&config)?;

    info!(
        app_root = %config.app_root,
        image = %config.image_tag,
        repo = config.repo_url().unwrap_or("<none>"),
        "Starting bootstrap-runner"
    );

    let log = HostLog::open(Path::new(&config.audit_log));
    let store = S3Store::from_env().await;

    let report = match tokio::time::timeout(
        config.run_timeout(),
        run_bootstrap(&config, &store, &log),
    )
    .await
    {
        Ok(report) => report,
        Err(_) => {
            // The run is expected to finish well inside the budget; a hang
            // here must surface instead of leaving the host half-mutated
            // and silent.
            let record = StepRecord {
                finished_at: chrono::Utc::now(),
                step: "overall_timeout",
                status: StepStatus::FailedFatal,
                detail: Some(format!(
                    "bootstrap exceeded {}s wall-clock budget",
                    config.run_timeout_secs
                )),
                duration_secs: config.run_timeout().as_secs_f64(),
            };
            log.record(&record);
            error!(timeout_secs = config.run_timeout_secs, "Bootstrap timed out");
            anyhow::bail!("bootstrap timed out after {}s", config.run_timeout_secs);
        }
    };

    if report.has_fatal() {
        error!(summary = %report.summary(), "Bootstrap failed fatally");
        anyhow::bail!("bootstrap failed: {}", report.summary());
    }

    info!(summary = %report.summary(), "Bootstrap complete");
    Ok(())
}
