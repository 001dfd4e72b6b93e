//! Shared command execution with timeouts and captured output
//!
//! Every external operation (package manager, git, docker, crontab) goes
//! through this runner so that timeouts, output capture, and exit-status
//! handling are uniform across steps.

use anyhow::{Context, Result};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Configuration for command execution
#[derive(Debug, Clone)]
pub struct CommandConfig {
    /// Command timeout (kills process if exceeded)
    pub timeout: Duration,
    /// Time to wait for output capture tasks to flush after the command exits
    pub stream_flush_timeout: Duration,
}

impl CommandConfig {
    /// Configuration for package-manager operations (10 minute timeout)
    pub fn for_package_ops() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            stream_flush_timeout: Duration::from_secs(2),
        }
    }

    /// Configuration for network downloads (5 minute timeout)
    pub fn for_download() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            stream_flush_timeout: Duration::from_secs(2),
        }
    }

    /// Configuration for image builds (15 minute timeout)
    pub fn for_build() -> Self {
        Self {
            timeout: Duration::from_secs(900),
            stream_flush_timeout: Duration::from_secs(2),
        }
    }

    /// Create with custom timeout, default stream flush timeout
    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
            stream_flush_timeout: Duration::from_secs(2),
        }
    }
}

/// Captured result of one external command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Whether the command exited zero
    pub success: bool,
    /// Captured stdout lines
    pub stdout: Vec<String>,
    /// Captured stderr lines
    pub stderr: Vec<String>,
}

impl CommandOutput {
    /// Short error detail for the audit log: the tail of stderr, or stdout
    /// when stderr is empty
    pub fn error_detail(&self) -> String {
        let lines = if self.stderr.is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let tail: Vec<&str> = lines
            .iter()
            .rev()
            .take(3)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        tail.join(" | ")
    }

    /// Full stdout as one string
    pub fn stdout_text(&self) -> String {
        self.stdout.join("\n")
    }
}

/// Run a command, capturing its output line by line
///
/// # Returns
/// * `Ok(output)` with `output.success` reflecting the exit status
/// * `Err` if the binary could not be spawned, the wait failed, or the
///   timeout elapsed (the process is killed first)
pub async fn run_command(cmd: &str, args: &[&str], config: &CommandConfig) -> Result<CommandOutput> {
    run_command_inner(Command::new(cmd), cmd, args, None, config).await
}

/// Run a command under the given account via `sudo -u`
///
/// The runner itself executes as root at boot; steps that touch the checkout
/// drop to the service account instead.
pub async fn run_command_as(
    user: &str,
    cmd: &str,
    args: &[&str],
    config: &CommandConfig,
) -> Result<CommandOutput> {
    let mut sudo = Command::new("sudo");
    sudo.arg("-u").arg(user).arg("--").arg(cmd);
    run_command_inner(sudo, cmd, args, None, config).await
}

/// Run a command with the given bytes piped to its stdin
pub async fn run_command_with_stdin(
    cmd: &str,
    args: &[&str],
    stdin: &[u8],
    config: &CommandConfig,
) -> Result<CommandOutput> {
    run_command_inner(Command::new(cmd), cmd, args, Some(stdin), config).await
}

async fn run_command_inner(
    mut command: Command,
    cmd: &str,
    args: &[&str],
    stdin: Option<&[u8]>,
    config: &CommandConfig,
) -> Result<CommandOutput> {
    debug!(
        cmd = %cmd,
        args = ?args,
        timeout_secs = config.timeout.as_secs(),
        "Running command"
    );

    command
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if stdin.is_some() {
        command.stdin(Stdio::piped());
    } else {
        command.stdin(Stdio::null());
    }

    let mut child = command
        .spawn()
        .with_context(|| format!("Failed to spawn command: {}", cmd))?;

    if let Some(bytes) = stdin {
        let mut handle = child.stdin.take().context("Failed to open stdin")?;
        handle
            .write_all(bytes)
            .await
            .with_context(|| format!("Failed to write stdin to {}", cmd))?;
        drop(handle);
    }

    let stdout = child.stdout.take().context("Failed to capture stdout")?;
    let stderr = child.stderr.take().context("Failed to capture stderr")?;

    let stdout_lines = Arc::new(Mutex::new(Vec::new()));
    let stderr_lines = Arc::new(Mutex::new(Vec::new()));

    let stdout_buf = stdout_lines.clone();
    let stdout_handle = tokio::spawn(async move {
        let reader = BufReader::new(stdout);
        let mut lines = reader.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(line = %line, "stdout");
            if let Ok(mut buf) = stdout_buf.lock() {
                buf.push(line);
            }
        }
    });

    let stderr_buf = stderr_lines.clone();
    let stderr_handle = tokio::spawn(async move {
        let reader = BufReader::new(stderr);
        let mut lines = reader.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(line = %line, "stderr");
            if let Ok(mut buf) = stderr_buf.lock() {
                buf.push(line);
            }
        }
    });

    // Wait for command with timeout
    let wait_result = tokio::time::timeout(config.timeout, child.wait()).await;

    let success = match wait_result {
        Ok(Ok(status)) => status.success(),
        Ok(Err(e)) => return Err(e).context("Failed waiting for command"),
        Err(_) => {
            warn!(
                cmd = %cmd,
                timeout_secs = config.timeout.as_secs(),
                "Command timed out, killing process"
            );
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to kill timed-out process");
            }
            return Err(anyhow::anyhow!(
                "Command '{}' timed out after {}s",
                cmd,
                config.timeout.as_secs()
            ));
        }
    };

    // Wait for capture tasks to drain remaining output
    let _ = tokio::time::timeout(config.stream_flush_timeout, stdout_handle).await;
    let _ = tokio::time::timeout(config.stream_flush_timeout, stderr_handle).await;

    let stdout = std::mem::take(&mut *stdout_lines.lock().unwrap_or_else(|e| e.into_inner()));
    let stderr = std::mem::take(&mut *stderr_lines.lock().unwrap_or_else(|e| e.into_inner()));

    Ok(CommandOutput {
        success,
        stdout,
        stderr,
    })
}

/// Look up an executable on PATH
///
/// Presence probe used by the conditional steps; avoids shelling out to
/// `which` just to ask a filesystem question.
pub fn binary_on_path(name: &str) -> Option<std::path::PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
