use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};

use super::DbLock;
use crate::common::{OptionId, PostId};

/// One image choice inside a post
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostOption {
    pub id: OptionId,
    pub post_id: PostId,
    pub position: i32,
    /// `{bucket}/{key}` of the stored image
    pub file_ref: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row written by `PostOption::insert`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPostOption {
    pub id: OptionId,
    pub post_id: PostId,
    pub position: i32,
    pub file_ref: String,
}

impl PostOption {
    /// Public URL of the option's image under `public_base_url`
    pub fn public_url(&self, public_base_url: &str) -> String {
        format!("{}/{}", public_base_url.trim_end_matches('/'), self.file_ref)
    }

    /// Find options by id and/or owning post, ordered by post then position.
    ///
    /// Empty slices apply no restriction.
    pub async fn find_by_filter<'e, E>(
        ids: &[OptionId],
        post_ids: &[PostId],
        lock: DbLock,
        executor: E,
    ) -> sqlx::Result<Vec<Self>>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            SELECT po.id, po.post_id, po.position, po.file_ref, po.created_at, po.updated_at
            FROM post_option po
            WHERE (cardinality($1::uuid[]) = 0 OR po.id = ANY($1))
              AND (cardinality($2::uuid[]) = 0 OR po.post_id = ANY($2))
            ORDER BY po.post_id, po.position
            {}
            "#,
            lock.clause("po")
        );

        sqlx::query_as::<_, PostOption>(&query)
            .bind(ids)
            .bind(post_ids)
            .fetch_all(executor)
            .await
    }

    pub async fn insert(option: &NewPostOption, conn: &mut PgConnection) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO post_option (id, post_id, position, file_ref)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(option.id)
        .bind(option.post_id)
        .bind(option.position)
        .bind(&option.file_ref)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn update_position(
        id: OptionId,
        post_id: PostId,
        position: i32,
        conn: &mut PgConnection,
    ) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            UPDATE post_option
            SET position = $3, updated_at = NOW()
            WHERE id = $1 AND post_id = $2
            "#,
        )
        .bind(id)
        .bind(post_id)
        .bind(position)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Delete the given options of a post, returning how many rows went away
    pub async fn delete_many(
        post_id: PostId,
        ids: &[OptionId],
        conn: &mut PgConnection,
    ) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM post_option WHERE post_id = $1 AND id = ANY($2)")
            .bind(post_id)
            .bind(ids)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}
