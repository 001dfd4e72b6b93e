//! Configuration validation errors
//!
//! Typed errors for configuration validation, replacing ad-hoc `anyhow::bail!`
//! calls at the load boundary.

use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// app_root field is empty
    #[error("app_root cannot be empty")]
    EmptyAppRoot,

    /// image_tag field is empty
    #[error("image_tag cannot be empty")]
    EmptyImageTag,

    /// container_name field is empty
    #[error("container_name cannot be empty")]
    EmptyContainerName,

    /// cron_schedule field is malformed
    #[error("cron_schedule must have 5 fields, got {0} in '{1}'")]
    InvalidCronSchedule(usize, String),

    /// service_user field is empty
    #[error("service_user cannot be empty")]
    EmptyServiceUser,

    /// env_object has a bucket but no key, or vice versa
    #[error("env_object requires both bucket and key, got bucket='{bucket}' key='{key}'")]
    PartialEnvObject { bucket: String, key: String },

    /// run_timeout_secs is zero
    #[error("run_timeout_secs must be greater than 0")]
    InvalidRunTimeout,

    /// Failed to parse JSON configuration
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Failed to read configuration file
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create an IO error with path context
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ConfigError::EmptyAppRoot.to_string(),
            "app_root cannot be empty"
        );
        assert_eq!(
            ConfigError::InvalidCronSchedule(3, "0 3 *".to_string()).to_string(),
            "cron_schedule must have 5 fields, got 3 in '0 3 *'"
        );
    }

    #[test]
    fn test_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::io("/etc/bootstrap.json", io_err);
        assert!(err.to_string().contains("/etc/bootstrap.json"));
    }
}
