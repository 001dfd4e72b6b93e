//! Object store access for the remote environment object
//!
//! The runner only reads from the store: a presence probe and a fetch. Both
//! are defined on a trait so the fetch step can be exercised against an
//! in-memory store in tests. The production implementation sits on the S3
//! SDK; transient store failures are reported by the probe as "absent", which
//! downgrades the fetch step to an expected skip instead of an error.

use anyhow::{Context, Result};
use aws_sdk_s3::Client;
use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;
use tracing::{debug, warn};

use crate::defaults::DEFAULT_REGION;

/// Read-only view of the object store
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    /// Whether an object exists at `bucket`/`key`
    ///
    /// Transient store errors count as absent; the caller treats absence as
    /// an expected skip, never a failure.
    async fn exists(&self, bucket: &str, key: &str) -> bool;

    /// Fetch the object's bytes
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

/// Production store backed by the S3 SDK
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Build a store from the ambient AWS environment, falling back to the
    /// deployment's default region
    pub async fn from_env() -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::meta::region::RegionProviderChain::default_provider().or_else(
                aws_config::Region::new(DEFAULT_REGION),
            ))
            .load()
            .await;
        Self {
            client: Client::new(&config),
        }
    }

    /// Wrap an existing client (used by integration tests)
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl ObjectStore for S3Store {
    async fn exists(&self, bucket: &str, key: &str) -> bool {
        debug!(bucket, key, "Probing for object");
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => true,
            Err(e) => {
                // NotFound is the expected miss; anything else (throttling,
                // credentials, network) is logged and treated the same way.
                debug!(bucket, key, error = %e, "Object probe negative");
                false
            }
        }
    }

    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let get = || async {
            let response = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .with_context(|| format!("Failed to fetch s3://{}/{}", bucket, key))?;
            let body = response
                .body
                .collect()
                .await
                .context("Failed to read object body")?;
            Ok::<_, anyhow::Error>(body.into_bytes().to_vec())
        };

        get.retry(
            ExponentialBuilder::default()
                .with_min_delay(Duration::from_secs(1))
                .with_max_delay(Duration::from_secs(10))
                .with_max_times(3),
        )
        .notify(|err, dur: Duration| {
            warn!(bucket, key, error = %err, retry_in = ?dur, "Object fetch failed, retrying");
        })
        .await
    }
}
