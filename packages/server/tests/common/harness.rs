//! Test harness with testcontainers for integration testing.
//!
//! One Postgres container and one migration run are shared by every test in
//! the binary. Tests use fresh UUIDs, so they never see each other's rows
//! unless they list everything.

use std::sync::Arc;

use anyhow::{Context, Result};
use quorum_core::config::PostServiceConfig;
use quorum_core::kernel::{MockObjectStore, ServerDeps};
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

pub const TEST_BUCKET: &str = "quorum-vote-test";

/// Shared test infrastructure that persists across all tests.
struct SharedTestInfra {
    db_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=quorum_core=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .with_cmd(["-c", "max_connections=200"])
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Per-test context: a fresh pool on the shared database.
///
/// ```ignore
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let deps = ctx.deps(MockObjectStore::new());
/// }
/// ```
pub struct TestHarness {
    pub db_pool: PgPool,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.db_pool.close().await;
    }
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .context("Failed to connect to test database")?;

        Ok(Self { db_pool })
    }

    pub fn post_config(&self) -> PostServiceConfig {
        PostServiceConfig::builder()
            .bucket_name(TEST_BUCKET)
            .public_url("https://cdn.test")
            .build()
    }

    /// Server dependencies backed by `store`
    pub fn deps(&self, store: MockObjectStore) -> ServerDeps {
        self.deps_with_config(store, self.post_config())
    }

    pub fn deps_with_config(&self, store: MockObjectStore, config: PostServiceConfig) -> ServerDeps {
        ServerDeps::new(self.db_pool.clone(), Arc::new(store), config)
    }
}
