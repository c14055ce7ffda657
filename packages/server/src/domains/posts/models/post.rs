use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};

use super::DbLock;
use crate::common::{CustomerId, OptionId, PostId, VoteId};

/// A votable post with its derived option/vote/tag lists
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: PostId,
    pub author_id: CustomerId,
    pub design_phase: Option<DesignPhase>,
    pub context: Option<String>,
    pub category: Option<PostCategory>,
    pub opens_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,

    // Aggregated from child tables
    pub option_ids: Vec<OptionId>, // ordered by position
    pub vote_ids: Vec<VoteId>,
    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "design_phase", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DesignPhase {
    Wireframe,
    LoFi,
    HiFi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "post_category", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostCategory {
    Animation,
    Branding,
    Illustration,
    Print,
    Product,
    Typography,
    Web,
}

/// Column values written by `Post::upsert`
#[derive(Debug, Clone, PartialEq)]
pub struct PostUpsert {
    pub id: PostId,
    pub author_id: CustomerId,
    pub design_phase: Option<DesignPhase>,
    pub context: Option<String>,
    pub category: Option<PostCategory>,
    pub opens_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
}

// =============================================================================
// SQL Queries
// =============================================================================

impl Post {
    /// Find non-deleted posts by id, newest `opens_at` first.
    ///
    /// An empty `ids` slice applies no id restriction.
    pub async fn find_by_filter<'e, E>(
        ids: &[PostId],
        lock: DbLock,
        executor: E,
    ) -> sqlx::Result<Vec<Self>>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            SELECT
                p.id,
                p.author_id,
                p.design_phase,
                p.context,
                p.category,
                p.opens_at,
                p.closes_at,
                COALESCE(
                    (SELECT array_agg(po.id ORDER BY po.position)
                     FROM post_option po WHERE po.post_id = p.id),
                    '{{}}'
                ) AS option_ids,
                COALESCE(
                    (SELECT array_agg(pv.id ORDER BY pv.created_at, pv.id)
                     FROM post_vote pv WHERE pv.post_id = p.id),
                    '{{}}'
                ) AS vote_ids,
                COALESCE(
                    (SELECT array_agg(pt.tag ORDER BY pt.tag)
                     FROM post_tag pt WHERE pt.post_id = p.id),
                    '{{}}'
                ) AS tags,
                p.created_at,
                p.updated_at
            FROM post p
            WHERE p.deleted_at IS NULL
              AND (cardinality($1::uuid[]) = 0 OR p.id = ANY($1))
            ORDER BY p.opens_at DESC NULLS LAST, p.id
            {}
            "#,
            lock.clause("p")
        );

        sqlx::query_as::<_, Post>(&query)
            .bind(ids)
            .fetch_all(executor)
            .await
    }

    /// Take a transaction-scoped advisory lock on `id`.
    ///
    /// `FOR UPDATE` only locks rows that exist; this serializes two upserts
    /// that both try to create the same post.
    pub async fn acquire_upsert_lock(id: PostId, conn: &mut PgConnection) -> sqlx::Result<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Insert the post, or update its mutable columns if it already exists.
    ///
    /// The update only applies when the stored author matches, so the
    /// returned row count is 0 when the id belongs to someone else.
    pub async fn upsert(post: &PostUpsert, conn: &mut PgConnection) -> sqlx::Result<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO post (
                id,
                author_id,
                design_phase,
                context,
                category,
                opens_at,
                closes_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                design_phase = EXCLUDED.design_phase,
                context = EXCLUDED.context,
                category = EXCLUDED.category,
                opens_at = EXCLUDED.opens_at,
                closes_at = EXCLUDED.closes_at,
                updated_at = NOW()
            WHERE post.author_id = EXCLUDED.author_id
              AND post.deleted_at IS NULL
            "#,
        )
        .bind(post.id)
        .bind(post.author_id)
        .bind(post.design_phase)
        .bind(&post.context)
        .bind(post.category)
        .bind(post.opens_at)
        .bind(post.closes_at)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }
}
