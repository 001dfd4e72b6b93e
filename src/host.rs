//! Mutable view of what the bootstrap has actually put on the host
//!
//! `HostState` replaces the ambient shell state the original boot script
//! relied on: each step reads the fields it depends on and writes the fields
//! it owns, so the data flow between steps is explicit.

use std::path::PathBuf;

/// What has been installed or configured on the machine so far
#[derive(Debug, Default, Clone)]
pub struct HostState {
    /// Package index synced and base packages verified present
    pub packages_ready: bool,
    /// Base package binaries still missing after install, if any
    pub missing_binaries: Vec<String>,
    /// Cloud CLI available on PATH
    pub cloud_cli_ready: bool,
    /// Remote-management agent installed and enabled
    pub host_agent_ready: bool,
    /// Application root exists and is owned by the service account
    pub workdir_ready: bool,
    /// Source checkout location, set once a checkout is present
    pub source_dir: Option<PathBuf>,
    /// Materialized environment file, set once written
    pub env_file: Option<PathBuf>,
    /// Initial container started (or already present)
    pub container_running: bool,
    /// Recurring cron entry installed (or already present)
    pub job_scheduled: bool,
}

impl HostState {
    pub fn new() -> Self {
        Self::default()
    }
}
