// Test doubles for kernel infrastructure
//
// MockObjectStore stands in for GCS/S3 in unit and integration tests. It records
// every call and can be told to fail, so tests can assert what the engine asked
// the store to do and how failures propagate.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::BaseObjectStore;

/// Arguments captured from a put_object call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutCall {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub cache_control: String,
    pub size: usize,
}

/// Arguments captured from a signed_put_url call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignCall {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub ttl: Duration,
}

#[derive(Clone, Default)]
pub struct MockObjectStore {
    objects: Arc<Mutex<HashSet<(String, String)>>>,
    exists_calls: Arc<Mutex<Vec<(String, String)>>>,
    put_calls: Arc<Mutex<Vec<PutCall>>>,
    sign_calls: Arc<Mutex<Vec<SignCall>>>,
    fail_exists: bool,
    fail_puts: bool,
    delay: Option<Duration>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `bucket/key` was already uploaded
    pub fn with_object(self, bucket: &str, key: &str) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()));
        self
    }

    /// Every existence check returns an error
    pub fn failing_exists(mut self) -> Self {
        self.fail_exists = true;
        self
    }

    /// Every upload returns an error
    pub fn failing_puts(mut self) -> Self {
        self.fail_puts = true;
        self
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains(&(bucket.to_string(), key.to_string()))
    }

    pub fn exists_calls(&self) -> Vec<(String, String)> {
        self.exists_calls.lock().unwrap().clone()
    }

    pub fn put_calls(&self) -> Vec<PutCall> {
        self.put_calls.lock().unwrap().clone()
    }

    pub fn sign_calls(&self) -> Vec<SignCall> {
        self.sign_calls.lock().unwrap().clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl BaseObjectStore for MockObjectStore {
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        self.exists_calls
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string()));
        self.pause().await;

        if self.fail_exists {
            return Err(anyhow!("mock stat failure for {}/{}", bucket, key));
        }
        Ok(self.contains(bucket, key))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()> {
        self.put_calls.lock().unwrap().push(PutCall {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            cache_control: cache_control.to_string(),
            size: body.len(),
        });
        self.pause().await;

        if self.fail_puts {
            return Err(anyhow!("mock write failure for {}/{}", bucket, key));
        }
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn signed_put_url(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String> {
        self.sign_calls.lock().unwrap().push(SignCall {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            ttl,
        });
        Ok(format!(
            "https://signed.test/{}/{}?expires_in={}",
            bucket,
            key,
            ttl.as_secs()
        ))
    }
}
