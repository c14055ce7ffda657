use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use typed_builder::TypedBuilder;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub storage: StorageConfig,
    pub posts: PostServiceConfig,
}

/// Which object store backend holds post option images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageProvider {
    Gcs,
    S3,
}

impl std::str::FromStr for StorageProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gcs" => Ok(StorageProvider::Gcs),
            "s3" => Ok(StorageProvider::S3),
            _ => Err(anyhow::anyhow!("Invalid storage provider: {}", s)),
        }
    }
}

/// Connection settings for the object store
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    /// Service account JSON (GCS) path; S3 reads its keys from the usual AWS env vars
    pub credential_path: Option<String>,
    /// Base used to build public option URLs, e.g. `https://storage.googleapis.com`
    pub public_url: String,
}

/// Settings injected into the post reconciliation engine.
///
/// Bucket name, time windows and limits all live here so tests can build
/// the engine without touching the environment.
#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct PostServiceConfig {
    /// The only bucket options may reference
    pub bucket_name: String,
    /// How far in the past `opens_at` may be when a post is scheduled
    #[builder(default = chrono::Duration::minutes(10))]
    pub opens_at_grace: chrono::Duration,
    #[builder(default = 6)]
    pub max_options: usize,
    /// Minimum option count once a post is live
    #[builder(default = 2)]
    pub min_live_options: usize,
    #[builder(default = Duration::from_secs(15 * 60))]
    pub signed_url_ttl: Duration,
    #[builder(default = 5 << 20)]
    pub max_upload_bytes: usize,
    #[builder(default = "public,max-age=31536000".to_string())]
    pub cache_control: String,
    #[builder(default = "https://storage.googleapis.com".to_string())]
    pub public_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let provider = env::var("STORAGE_PROVIDER")
            .unwrap_or_else(|_| "gcs".to_string())
            .parse()
            .context("STORAGE_PROVIDER must be gcs or s3")?;
        let bucket = env::var("STORAGE_BUCKET").unwrap_or_else(|_| "quorum-vote".to_string());
        if bucket.trim().is_empty() {
            bail!("STORAGE_BUCKET must not be empty");
        }
        let public_url = env::var("STORAGE_PUBLIC_URL")
            .unwrap_or_else(|_| "https://storage.googleapis.com".to_string());

        let storage = StorageConfig {
            provider,
            bucket: bucket.clone(),
            endpoint: env::var("STORAGE_ENDPOINT").ok(),
            region: env::var("STORAGE_REGION").ok(),
            credential_path: env::var("STORAGE_CREDENTIAL_PATH").ok(),
            public_url: public_url.clone(),
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            storage,
            posts: PostServiceConfig::builder()
                .bucket_name(bucket)
                .public_url(public_url)
                .build(),
        })
    }
}
