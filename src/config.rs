//! Bootstrap configuration loading from JSON
//!
//! The launch template renders a small JSON document onto the host; the
//! runner loads it once at startup and never mutates it. Empty strings are
//! treated the same as absent fields so templated-but-blank values behave
//! like unset ones.

use crate::defaults;
use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Location of the remote environment object in the object store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Bucket name
    pub bucket: String,
    /// Object key
    pub key: String,
}

/// Bootstrap configuration, fixed for the life of one run
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    /// Repository to clone into the app root (empty/absent to skip)
    #[serde(default)]
    pub repo_url: String,

    /// Bucket holding the environment object (empty/absent to skip)
    #[serde(default)]
    pub env_bucket: String,

    /// Key of the environment object within `env_bucket`
    #[serde(default)]
    pub env_key: String,

    /// Application root directory on the host
    #[serde(default = "defaults::default_app_root")]
    pub app_root: String,

    /// Container image tag to build and run
    #[serde(default = "defaults::default_image_tag")]
    pub image_tag: String,

    /// Name of the initial detached container
    #[serde(default = "defaults::default_container_name")]
    pub container_name: String,

    /// Cron schedule for the recurring run (5-field expression)
    #[serde(default = "defaults::default_cron_schedule")]
    pub cron_schedule: String,

    /// Host log file the cron job appends to
    #[serde(default = "defaults::default_cron_log")]
    pub cron_log: String,

    /// Host log file receiving the per-step audit records
    #[serde(default = "defaults::default_audit_log")]
    pub audit_log: String,

    /// Non-privileged account owning the checkout and the cron job
    #[serde(default = "defaults::default_service_user")]
    pub service_user: String,

    /// Wall-clock budget for the whole run, in seconds
    #[serde(default = "defaults::default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            repo_url: String::new(),
            env_bucket: String::new(),
            env_key: String::new(),
            app_root: defaults::default_app_root(),
            image_tag: defaults::default_image_tag(),
            container_name: defaults::default_container_name(),
            cron_schedule: defaults::default_cron_schedule(),
            cron_log: defaults::default_cron_log(),
            audit_log: defaults::default_audit_log(),
            service_user: defaults::default_service_user(),
            run_timeout_secs: defaults::default_run_timeout_secs(),
        }
    }
}

impl BootstrapConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Repository URL, with blank values treated as absent
    pub fn repo_url(&self) -> Option<&str> {
        let trimmed = self.repo_url.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Remote environment object, present only when both halves are set
    pub fn env_object(&self) -> Option<RemoteObject> {
        let bucket = self.env_bucket.trim();
        let key = self.env_key.trim();
        if bucket.is_empty() || key.is_empty() {
            return None;
        }
        Some(RemoteObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    /// Destination of the source checkout
    pub fn source_dir(&self) -> PathBuf {
        Path::new(&self.app_root).join(defaults::SOURCE_SUBDIR)
    }

    /// Destination of the materialized environment file
    pub fn env_file(&self) -> PathBuf {
        Path::new(&self.app_root).join(defaults::ENV_FILE_NAME)
    }

    /// Overall wall-clock budget for the run
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

/// Validate a loaded configuration before the run starts
pub fn validate_config(config: &BootstrapConfig) -> Result<(), ConfigError> {
    if config.app_root.trim().is_empty() {
        return Err(ConfigError::EmptyAppRoot);
    }
    if config.image_tag.trim().is_empty() {
        return Err(ConfigError::EmptyImageTag);
    }
    if config.container_name.trim().is_empty() {
        return Err(ConfigError::EmptyContainerName);
    }
    if config.service_user.trim().is_empty() {
        return Err(ConfigError::EmptyServiceUser);
    }
    let fields = config.cron_schedule.split_whitespace().count();
    if fields != 5 {
        return Err(ConfigError::InvalidCronSchedule(
            fields,
            config.cron_schedule.clone(),
        ));
    }
    let bucket_set = !config.env_bucket.trim().is_empty();
    let key_set = !config.env_key.trim().is_empty();
    if bucket_set != key_set {
        return Err(ConfigError::PartialEnvObject {
            bucket: config.env_bucket.clone(),
            key: config.env_key.clone(),
        });
    }
    if config.run_timeout_secs == 0 {
        return Err(ConfigError::InvalidRunTimeout);
    }
    Ok(())
}
