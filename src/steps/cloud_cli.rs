//! Step 2: cloud CLI provisioning
//!
//! Conditional on a presence probe: when `aws` is already on PATH the step is
//! a no-op. Otherwise the fixed-version installer archive is downloaded
//! (with bounded retries), checked for the ZIP magic before extraction, and
//! its installer executed. None of this is required for the primary pipeline,
//! so every failure here is non-fatal.

use crate::command::{binary_on_path, run_command, CommandConfig};
use crate::defaults::AWS_CLI_INSTALLER_URL;
use crate::host::HostState;
use crate::step::StepOutcome;
use backon::{ExponentialBuilder, Retryable};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

pub const NAME: &str = "cloud_cli";

/// ZIP local-file-header magic
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];

/// Install the AWS CLI v2 if it is not already present
pub async fn run(state: &mut HostState) -> StepOutcome {
    run_with_probe(state, binary_on_path).await
}

/// Same step with the presence probe injected, so the already-satisfied
/// short-circuit can be exercised without touching PATH
pub async fn run_with_probe(
    state: &mut HostState,
    probe: impl Fn(&str) -> Option<std::path::PathBuf>,
) -> StepOutcome {
    if let Some(path) = probe("aws") {
        state.cloud_cli_ready = true;
        return StepOutcome::already_satisfied(format!("aws present at {}", path.display()));
    }

    let work_dir = std::env::temp_dir().join("awscli-install");
    if let Err(e) = std::fs::create_dir_all(&work_dir) {
        return StepOutcome::failed_non_fatal(format!(
            "cannot create {}: {}",
            work_dir.display(),
            e
        ));
    }
    let archive = work_dir.join("awscliv2.zip");
    let archive_str = archive.display().to_string();

    if let Err(e) = download_installer(&archive_str).await {
        return StepOutcome::failed_non_fatal(format!("installer download failed: {:#}", e));
    }

    match is_zip_archive(&archive) {
        Ok(true) => {}
        Ok(false) => {
            return StepOutcome::failed_non_fatal(
                "downloaded installer is not a ZIP archive".to_string(),
            );
        }
        Err(e) => {
            return StepOutcome::failed_non_fatal(format!("cannot read installer archive: {}", e));
        }
    }

    let work_dir_str = work_dir.display().to_string();
    let unzip = run_command(
        "unzip",
        &["-o", "-q", &archive_str, "-d", &work_dir_str],
        &CommandConfig::for_download(),
    )
    .await;
    match unzip {
        Ok(output) if output.success => {}
        Ok(output) => {
            return StepOutcome::failed_non_fatal(format!(
                "unzip failed: {}",
                output.error_detail()
            ));
        }
        Err(e) => return StepOutcome::failed_non_fatal(format!("unzip unavailable: {:#}", e)),
    }

    let installer = work_dir.join("aws/install").display().to_string();
    let install = run_command(&installer, &["--update"], &CommandConfig::for_download()).await;
    match install {
        Ok(output) if output.success => {}
        Ok(output) => {
            return StepOutcome::failed_non_fatal(format!(
                "installer failed: {}",
                output.error_detail()
            ));
        }
        Err(e) => return StepOutcome::failed_non_fatal(format!("installer unavailable: {:#}", e)),
    }

    // The installer links into /usr/local/bin; re-probe instead of trusting it.
    match binary_on_path("aws") {
        Some(path) => {
            info!(path = %path.display(), "Cloud CLI installed");
            state.cloud_cli_ready = true;
            StepOutcome::succeeded()
        }
        None => StepOutcome::failed_non_fatal(
            "installer reported success but aws is not on PATH".to_string(),
        ),
    }
}

/// Download the installer archive with bounded exponential backoff
async fn download_installer(dest: &str) -> anyhow::Result<()> {
    let attempt = || async {
        let output = run_command(
            "curl",
            &["-sSf", "-L", "-o", dest, AWS_CLI_INSTALLER_URL],
            &CommandConfig::for_download(),
        )
        .await?;
        if !output.success {
            anyhow::bail!("download failed: {}", output.error_detail());
        }
        Ok(())
    };

    attempt
        .retry(
            ExponentialBuilder::default()
                .with_min_delay(Duration::from_secs(2))
                .with_max_delay(Duration::from_secs(30))
                .with_max_times(3),
        )
        .notify(|err, dur: Duration| {
            warn!(error = %err, retry_in = ?dur, "CLI download failed, retrying");
        })
        .await
}

/// Check the file starts with the ZIP local-file-header magic
fn is_zip_archive(path: &Path) -> std::io::Result<bool> {
    use std::io::Read;
    let mut file = std::fs::File::open(path)?;
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == ZIP_MAGIC),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}
