use dataloader::non_cached::Loader;
use dataloader::BatchFn;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::common::{OptionId, PostId};
use crate::domains::posts::data::OptionData;
use crate::domains::posts::models::{DbLock, Post, PostOption};

/// Batches Post lookups by ID.
pub struct PostLoader {
    pub db: Arc<PgPool>,
}

impl PostLoader {
    pub fn new(db: Arc<PgPool>) -> Self {
        Self { db }
    }
}

impl BatchFn<Uuid, Option<Post>> for PostLoader {
    fn load(
        &mut self,
        keys: &[Uuid],
    ) -> impl std::future::Future<Output = HashMap<Uuid, Option<Post>>> {
        let db = self.db.clone();
        let ids: Vec<PostId> = keys.iter().copied().map(PostId::from_uuid).collect();
        async move {
            let posts = Post::find_by_filter(&ids, DbLock::None, db.as_ref())
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Batched post load failed");
                    Vec::new()
                });
            let mut map: HashMap<Uuid, Option<Post>> = posts
                .into_iter()
                .map(|p| (p.id.into_uuid(), Some(p)))
                .collect();
            for id in &ids {
                map.entry(id.into_uuid()).or_insert(None);
            }
            map
        }
    }
}

/// Batches option lookups by option ID.
pub struct OptionLoader {
    pub db: Arc<PgPool>,
    pub public_url: String,
}

impl OptionLoader {
    pub fn new(db: Arc<PgPool>, public_url: impl Into<String>) -> Self {
        Self {
            db,
            public_url: public_url.into(),
        }
    }
}

impl BatchFn<Uuid, Option<OptionData>> for OptionLoader {
    fn load(
        &mut self,
        keys: &[Uuid],
    ) -> impl std::future::Future<Output = HashMap<Uuid, Option<OptionData>>> {
        let db = self.db.clone();
        let public_url = self.public_url.clone();
        let ids: Vec<OptionId> = keys.iter().copied().map(OptionId::from_uuid).collect();
        async move {
            let options = PostOption::find_by_filter(&ids, &[], DbLock::None, db.as_ref())
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Batched option load failed");
                    Vec::new()
                });
            let mut map: HashMap<Uuid, Option<OptionData>> = options
                .into_iter()
                .map(|o| (o.id.into_uuid(), Some(OptionData::from_model(o, &public_url))))
                .collect();
            for id in &ids {
                map.entry(id.into_uuid()).or_insert(None);
            }
            map
        }
    }
}

/// Batches option lists by owning post ID, each ordered by position.
pub struct PostOptionsLoader {
    pub db: Arc<PgPool>,
    pub public_url: String,
}

impl PostOptionsLoader {
    pub fn new(db: Arc<PgPool>, public_url: impl Into<String>) -> Self {
        Self {
            db,
            public_url: public_url.into(),
        }
    }
}

impl BatchFn<Uuid, Vec<OptionData>> for PostOptionsLoader {
    fn load(
        &mut self,
        keys: &[Uuid],
    ) -> impl std::future::Future<Output = HashMap<Uuid, Vec<OptionData>>> {
        let db = self.db.clone();
        let public_url = self.public_url.clone();
        let post_ids: Vec<PostId> = keys.iter().copied().map(PostId::from_uuid).collect();
        async move {
            let options = PostOption::find_by_filter(&[], &post_ids, DbLock::None, db.as_ref())
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Batched post options load failed");
                    Vec::new()
                });
            let mut map: HashMap<Uuid, Vec<OptionData>> = HashMap::new();
            for option in options {
                map.entry(option.post_id.into_uuid())
                    .or_default()
                    .push(OptionData::from_model(option, &public_url));
            }
            for id in &post_ids {
                map.entry(id.into_uuid()).or_default();
            }
            map
        }
    }
}

/// Request-scoped loaders for post reads
pub struct DataLoaders {
    pub post: Loader<Uuid, Option<Post>, PostLoader>,
    pub option: Loader<Uuid, Option<OptionData>, OptionLoader>,
    pub post_options: Loader<Uuid, Vec<OptionData>, PostOptionsLoader>,
}

impl DataLoaders {
    pub fn new(db: Arc<PgPool>, public_url: &str) -> Self {
        Self {
            post: Loader::new(PostLoader::new(db.clone())),
            option: Loader::new(OptionLoader::new(db.clone(), public_url)),
            post_options: Loader::new(PostOptionsLoader::new(db, public_url)),
        }
    }
}
