//! Server dependencies for post actions (using traits for testability)
//!
//! Actions receive `&ServerDeps` instead of reaching for globals: the database
//! pool, the object store handle and the engine settings all come from here.

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::PostServiceConfig;
use crate::kernel::BaseObjectStore;

/// Dependencies accessible to post actions
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    /// Shared, stateless handle; cloned into each storage task
    pub object_store: Arc<dyn BaseObjectStore>,
    pub posts: PostServiceConfig,
}

impl ServerDeps {
    pub fn new(
        db_pool: PgPool,
        object_store: Arc<dyn BaseObjectStore>,
        posts: PostServiceConfig,
    ) -> Self {
        Self {
            db_pool,
            object_store,
            posts,
        }
    }
}
