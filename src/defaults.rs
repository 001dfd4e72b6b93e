//! Default configuration values for the bootstrap runner
//!
//! These constants keep the CLI, the JSON config loader, and the tests in
//! agreement about what an unconfigured host looks like.

use std::time::Duration;

/// Application root on the host
pub const DEFAULT_APP_ROOT: &str = "/opt/highlights";

/// Subdirectory of the app root that receives the source checkout
pub const SOURCE_SUBDIR: &str = "app";

/// Name of the environment file materialized from the object store
pub const ENV_FILE_NAME: &str = ".env";

/// Container image tag built from the source checkout
pub const DEFAULT_IMAGE_TAG: &str = "sports-highlights:latest";

/// Fixed container name for the initial detached run
pub const DEFAULT_CONTAINER_NAME: &str = "highlights-pipeline";

/// Cron schedule for the recurring pipeline run (daily, 03:00 UTC)
pub const DEFAULT_CRON_SCHEDULE: &str = "0 3 * * *";

/// Host log file the cron job appends to
pub const DEFAULT_CRON_LOG: &str = "/var/log/highlights-cron.log";

/// Host log file the runner writes its per-step audit records to
pub const DEFAULT_AUDIT_LOG: &str = "/var/log/bootstrap-runner.log";

/// Non-privileged account that owns the checkout and runs the cron job
pub const DEFAULT_SERVICE_USER: &str = "ubuntu";

/// AWS region used when none is configured in the environment
pub const DEFAULT_REGION: &str = "ap-south-1";

/// Fixed-version AWS CLI v2 installer archive
pub const AWS_CLI_INSTALLER_URL: &str =
    "https://awscli.amazonaws.com/awscli-exe-linux-x86_64-2.15.30.zip";

/// Base packages every host needs before the pipeline can run
pub const BASE_PACKAGES: &[&str] = &["docker.io", "git", "python3", "unzip"];

/// Binary each base package must provide, verified post-install
pub const BASE_PACKAGE_BINARIES: &[&str] = &["docker", "git", "python3", "unzip"];

/// Overall wall-clock budget for one bootstrap run (30 minutes)
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(1800);

// Serde default functions for struct field defaults

/// Returns the default application root
pub fn default_app_root() -> String {
    DEFAULT_APP_ROOT.to_string()
}

/// Returns the default image tag
pub fn default_image_tag() -> String {
    DEFAULT_IMAGE_TAG.to_string()
}

/// Returns the default container name
pub fn default_container_name() -> String {
    DEFAULT_CONTAINER_NAME.to_string()
}

/// Returns the default cron schedule
pub fn default_cron_schedule() -> String {
    DEFAULT_CRON_SCHEDULE.to_string()
}

/// Returns the default cron log path
pub fn default_cron_log() -> String {
    DEFAULT_CRON_LOG.to_string()
}

/// Returns the default audit log path
pub fn default_audit_log() -> String {
    DEFAULT_AUDIT_LOG.to_string()
}

/// Returns the default service user
pub fn default_service_user() -> String {
    DEFAULT_SERVICE_USER.to_string()
}

/// Returns the default run timeout in seconds
pub fn default_run_timeout_secs() -> u64 {
    DEFAULT_RUN_TIMEOUT.as_secs()
}
