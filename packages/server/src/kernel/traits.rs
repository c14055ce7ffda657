// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Post rules (which keys to check, when to upload) live in the posts domain.
//
// Naming convention: Base* for trait names (e.g., BaseObjectStore)

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

// =============================================================================
// Object Store Trait (Infrastructure - bucket/key blob storage)
// =============================================================================

/// Bucket-addressed blob storage for post option images.
///
/// Implementations must be safe to share across tasks: the upsert engine
/// clones the handle into one task per option and calls it concurrently.
#[async_trait]
pub trait BaseObjectStore: Send + Sync {
    /// Whether `key` exists in `bucket`
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool>;

    /// Write `body` to `bucket/key` with the given object metadata
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()>;

    /// Issue a URL the client can PUT `content_type` bytes to until `ttl` elapses
    async fn signed_put_url(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String>;
}
