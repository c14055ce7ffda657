//! Object store backed by Apache OpenDAL.
//!
//! One `Operator` per bucket; GCS and S3-compatible services share the same
//! code path, so switching providers is a config change.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use opendal::{services, ErrorKind, Operator};
use tracing::debug;

use super::BaseObjectStore;
use crate::config::{StorageConfig, StorageProvider};

pub struct OpendalObjectStore {
    operators: HashMap<String, Operator>,
}

impl OpendalObjectStore {
    /// Build a store with a single operator for `config.bucket`
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let operator = match config.provider {
            StorageProvider::Gcs => {
                let mut builder = services::Gcs::default().bucket(&config.bucket);
                if let Some(path) = &config.credential_path {
                    builder = builder.credential_path(path);
                }
                if let Some(endpoint) = &config.endpoint {
                    builder = builder.endpoint(endpoint);
                }
                Operator::new(builder)
                    .context("Failed to build GCS operator")?
                    .finish()
            }
            StorageProvider::S3 => {
                let mut builder = services::S3::default().bucket(&config.bucket);
                if let Some(region) = &config.region {
                    builder = builder.region(region);
                }
                if let Some(endpoint) = &config.endpoint {
                    builder = builder.endpoint(endpoint);
                }
                Operator::new(builder)
                    .context("Failed to build S3 operator")?
                    .finish()
            }
        };

        Ok(Self::new().with_bucket(config.bucket.clone(), operator))
    }

    pub fn new() -> Self {
        Self {
            operators: HashMap::new(),
        }
    }

    /// Register an operator that serves `bucket`
    pub fn with_bucket(mut self, bucket: impl Into<String>, operator: Operator) -> Self {
        self.operators.insert(bucket.into(), operator);
        self
    }

    fn operator(&self, bucket: &str) -> Result<&Operator> {
        self.operators
            .get(bucket)
            .ok_or_else(|| anyhow!("Bucket {} is not configured", bucket))
    }
}

impl Default for OpendalObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseObjectStore for OpendalObjectStore {
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        match self.operator(bucket)?.stat(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to stat {}/{}", bucket, key)),
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()> {
        debug!(bucket = %bucket, key = %key, size = body.len(), "Writing object");
        self.operator(bucket)?
            .write_with(key, body)
            .content_type(content_type)
            .cache_control(cache_control)
            .await
            .with_context(|| format!("Failed to write {}/{}", bucket, key))?;
        Ok(())
    }

    async fn signed_put_url(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String> {
        let request = self
            .operator(bucket)?
            .presign_write_with(key, ttl)
            .content_type(content_type)
            .await
            .with_context(|| format!("Failed to presign {}/{}", bucket, key))?;
        Ok(request.uri().to_string())
    }
}
