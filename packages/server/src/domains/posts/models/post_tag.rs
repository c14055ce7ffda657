use sqlx::PgConnection;

use crate::common::PostId;

/// Free-form label attached to a post
pub struct PostTag;

impl PostTag {
    /// Attach tags, ignoring ones the post already has
    pub async fn insert_many(
        post_id: PostId,
        tags: &[String],
        conn: &mut PgConnection,
    ) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO post_tag (post_id, tag)
            SELECT $1, tag FROM UNNEST($2::text[]) AS tag
            ON CONFLICT (post_id, tag) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(tags)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn delete_many(
        post_id: PostId,
        tags: &[String],
        conn: &mut PgConnection,
    ) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM post_tag WHERE post_id = $1 AND tag = ANY($2)")
            .bind(post_id)
            .bind(tags)
            .execute(conn)
            .await?;
        Ok(())
    }
}
