//! Object store work that must succeed before an upsert commits.
//!
//! Each new option gets one task: upload its bytes, or confirm its signed
//! upload landed. Tasks run concurrently with the database writes and are
//! joined by [`StorageBarrier::wait`] right before commit.

use std::sync::Arc;

use anyhow::anyhow;
use bytes::Bytes;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::common::{OptionId, PostId};
use crate::config::PostServiceConfig;
use crate::domains::posts::data::{file_ref, uploaded_option_key, ImageFormat, OptionFile};
use crate::domains::posts::error::PostError;
use crate::kernel::BaseObjectStore;

/// Storage side effect for one new option
#[derive(Debug, Clone)]
pub enum FileTask {
    VerifyExists {
        option_id: OptionId,
        bucket: String,
        key: String,
    },
    Upload {
        option_id: OptionId,
        bucket: String,
        key: String,
        body: Bytes,
        content_type: String,
        cache_control: String,
    },
}

impl FileTask {
    /// Resolve where the option's file lives and what has to happen to it.
    ///
    /// Returns the stored file reference alongside the task.
    pub fn for_option(
        post_id: PostId,
        option_id: OptionId,
        file: &OptionFile,
        config: &PostServiceConfig,
    ) -> Result<(String, Self), PostError> {
        match file {
            OptionFile::SignedUpload { bucket, file_key } => Ok((
                file_ref(bucket, file_key),
                FileTask::VerifyExists {
                    option_id,
                    bucket: bucket.clone(),
                    key: file_key.clone(),
                },
            )),
            OptionFile::Upload {
                bytes,
                content_type,
            } => {
                let format = ImageFormat::from_content_type(content_type)
                    .ok_or(PostError::UnsupportedFileType)?;
                let key = uploaded_option_key(post_id, option_id, format);
                Ok((
                    file_ref(&config.bucket_name, &key),
                    FileTask::Upload {
                        option_id,
                        bucket: config.bucket_name.clone(),
                        key,
                        body: bytes.clone(),
                        content_type: content_type.clone(),
                        cache_control: config.cache_control.clone(),
                    },
                ))
            }
        }
    }

    async fn run(self, store: &dyn BaseObjectStore) -> Result<(), PostError> {
        match self {
            FileTask::VerifyExists {
                option_id,
                bucket,
                key,
            } => {
                let exists = store
                    .object_exists(&bucket, &key)
                    .await
                    .map_err(PostError::Storage)?;
                if !exists {
                    return Err(PostError::OptionFileNotFound { key });
                }
                debug!(option_id = %option_id, key = %key, "Verified option upload");
            }
            FileTask::Upload {
                option_id,
                bucket,
                key,
                body,
                content_type,
                cache_control,
            } => {
                store
                    .put_object(&bucket, &key, body, &content_type, &cache_control)
                    .await
                    .map_err(PostError::Storage)?;
                debug!(option_id = %option_id, key = %key, "Uploaded option file");
            }
        }
        Ok(())
    }
}

/// In-flight storage tasks for one upsert.
///
/// Dropping the barrier aborts whatever is still running.
pub struct StorageBarrier {
    tasks: JoinSet<Result<(), PostError>>,
}

impl StorageBarrier {
    /// Start every task on the runtime immediately
    pub fn spawn(tasks: Vec<FileTask>, store: Arc<dyn BaseObjectStore>) -> Self {
        let mut set = JoinSet::new();
        for task in tasks {
            let store = store.clone();
            set.spawn(async move { task.run(store.as_ref()).await });
        }
        Self { tasks: set }
    }

    /// Tasks still running
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every task. The first failure aborts the rest and is returned.
    pub async fn wait(mut self) -> Result<(), PostError> {
        while let Some(joined) = self.tasks.join_next().await {
            let outcome = joined
                .map_err(|e| PostError::Internal(anyhow!("storage task did not finish: {}", e)))
                .and_then(|result| result);

            if let Err(e) = outcome {
                warn!(error = %e, remaining = self.tasks.len(), "Storage task failed");
                self.tasks.abort_all();
                return Err(e);
            }
        }
        Ok(())
    }
}
