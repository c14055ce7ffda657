//! Post upsert action
//!
//! Creates a post or reconciles an existing one against the request:
//! - Serialize on the post id and lock the stored row
//! - Validate the merged view and plan option/tag writes
//! - Start object store tasks for new options
//! - Apply writes (post, deletes, repositions, inserts, tags)
//! - Commit only once every storage task has succeeded

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use super::reconcile::{diff_options, diff_tags, OptionPlan, TagPlan};
use super::storage::{FileTask, StorageBarrier};
use super::validation::{check_not_live, check_opens_at_not_passed, check_shape, PostShape};
use crate::config::PostServiceConfig;
use crate::domains::posts::data::UpsertPostRequest;
use crate::domains::posts::error::{PostError, PostErrorKind};
use crate::domains::posts::models::{
    DbLock, NewPostOption, Post, PostOption, PostTag, PostUpsert,
};
use crate::kernel::ServerDeps;

/// Everything an upsert will write, decided before any write is issued
#[derive(Debug, Clone)]
pub struct UpsertPlan {
    pub post: PostUpsert,
    pub created: bool,
    pub options: OptionPlan,
    /// Rows for `options.insert`, in the same order
    pub inserts: Vec<NewPostOption>,
    pub file_tasks: Vec<FileTask>,
    /// `None` leaves stored tags alone
    pub tags: Option<TagPlan>,
}

/// Validate `request` and work out the writes needed to apply it.
///
/// `existing` is the locked post with its options, or `None` when the id is
/// new. Nothing here touches the database or the object store.
pub fn plan_upsert(
    request: &UpsertPostRequest,
    existing: Option<(&Post, &[PostOption])>,
    config: &PostServiceConfig,
    now: DateTime<Utc>,
) -> Result<UpsertPlan, PostError> {
    let post = match existing {
        None => {
            check_opens_at_not_passed(request.opens_at, now, config)?;
            PostUpsert {
                id: request.id,
                author_id: request.author_id,
                design_phase: request.design_phase,
                context: request.context.clone(),
                category: request.category,
                opens_at: request.opens_at,
                closes_at: request.closes_at,
            }
        }
        Some((stored, _)) => {
            if stored.author_id != request.author_id {
                return Err(PostError::PostNotOwned);
            }
            check_not_live(stored.opens_at, now)?;
            check_opens_at_not_passed(request.opens_at, now, config)?;
            PostUpsert {
                id: stored.id,
                author_id: stored.author_id,
                design_phase: request.design_phase.or(stored.design_phase),
                context: request.context.clone().or_else(|| stored.context.clone()),
                category: request.category.or(stored.category),
                opens_at: request.opens_at.or(stored.opens_at),
                closes_at: request.closes_at.or(stored.closes_at),
            }
        }
    };

    check_shape(
        PostShape {
            opens_at: post.opens_at,
            closes_at: post.closes_at,
            options: &request.options,
        },
        now,
        config,
    )?;

    let stored_options = existing.map(|(_, options)| options).unwrap_or(&[]);
    let options = diff_options(stored_options, &request.options)?;

    let mut inserts = Vec::with_capacity(options.insert.len());
    let mut file_tasks = Vec::with_capacity(options.insert.len());
    for insert in &options.insert {
        let (file_ref, task) = FileTask::for_option(post.id, insert.id, &insert.file, config)?;
        inserts.push(NewPostOption {
            id: insert.id,
            post_id: post.id,
            position: insert.position,
            file_ref,
        });
        file_tasks.push(task);
    }

    let tags = request.tags.as_ref().map(|desired| {
        let stored_tags = existing.map(|(stored, _)| stored.tags.as_slice()).unwrap_or(&[]);
        diff_tags(stored_tags, desired)
    });

    Ok(UpsertPlan {
        post,
        created: existing.is_none(),
        options,
        inserts,
        file_tasks,
        tags,
    })
}

/// Create or update a post and reconcile its options and tags.
///
/// Either every write commits together with every storage task having
/// succeeded, or nothing is committed.
#[instrument(skip(request, deps), fields(post_id = %request.id, author_id = %request.author_id))]
pub async fn upsert_post(request: UpsertPostRequest, deps: &ServerDeps) -> Result<(), PostError> {
    apply_upsert(request, deps).await.inspect_err(|e| match e.kind() {
        PostErrorKind::Infrastructure => error!(error = %e, "Post upsert failed"),
        _ => debug!(error = %e, "Post upsert rejected"),
    })
}

async fn apply_upsert(request: UpsertPostRequest, deps: &ServerDeps) -> Result<(), PostError> {
    let post_id = request.id;
    let mut tx = deps.db_pool.begin().await?;

    Post::acquire_upsert_lock(post_id, &mut tx).await?;
    let stored = Post::find_by_filter(&[post_id], DbLock::ForUpdate, &mut *tx)
        .await?
        .into_iter()
        .next();
    let stored_options = match &stored {
        Some(_) => PostOption::find_by_filter(&[], &[post_id], DbLock::ForUpdate, &mut *tx).await?,
        None => Vec::new(),
    };

    let plan = plan_upsert(
        &request,
        stored.as_ref().map(|post| (post, stored_options.as_slice())),
        &deps.posts,
        Utc::now(),
    )?;

    // Option ids are global; a new id must not already belong to another post
    if !plan.inserts.is_empty() {
        let new_ids: Vec<_> = plan.inserts.iter().map(|o| o.id).collect();
        let taken = PostOption::find_by_filter(&new_ids, &[], DbLock::None, &mut *tx).await?;
        if let Some(option) = taken.first() {
            return Err(PostError::Validation(format!(
                "option {} belongs to another post",
                option.id
            )));
        }
    }

    info!(
        created = plan.created,
        deletes = plan.options.delete.len(),
        repositions = plan.options.reposition.len(),
        inserts = plan.inserts.len(),
        "Applying post upsert"
    );

    let barrier = StorageBarrier::spawn(plan.file_tasks, deps.object_store.clone());
    debug!(storage_tasks = barrier.len(), "Started option storage tasks");

    if Post::upsert(&plan.post, &mut tx).await? == 0 {
        // Row changed hands or was deleted since it was read
        return Err(PostError::PostNotOwned);
    }

    if !plan.options.delete.is_empty() {
        PostOption::delete_many(post_id, &plan.options.delete, &mut tx).await?;
    }
    for (option_id, position) in &plan.options.reposition {
        PostOption::update_position(*option_id, post_id, *position, &mut tx).await?;
    }
    for option in &plan.inserts {
        PostOption::insert(option, &mut tx).await?;
    }

    if let Some(tags) = &plan.tags {
        if !tags.insert.is_empty() {
            PostTag::insert_many(post_id, &tags.insert, &mut tx).await?;
        }
        if !tags.delete.is_empty() {
            PostTag::delete_many(post_id, &tags.delete, &mut tx).await?;
        }
    }

    if let Err(e) = barrier.wait().await {
        warn!(error = %e, "Option storage failed, rolling back post upsert");
        tx.rollback().await?;
        return Err(e);
    }

    tx.commit().await?;

    info!(created = plan.created, "Post upsert committed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{CustomerId, OptionId, PostId};
    use crate::domains::posts::data::{file_ref, UpsertPostOptionRequest};
    use crate::domains::posts::models::DesignPhase;
    use chrono::Duration;

    fn config() -> PostServiceConfig {
        PostServiceConfig::builder().bucket_name("quorum-vote").build()
    }

    fn stored_post(author_id: CustomerId, opens_at: Option<DateTime<Utc>>) -> Post {
        Post {
            id: PostId::new(),
            author_id,
            design_phase: Some(DesignPhase::LoFi),
            context: Some("which logo?".to_string()),
            category: None,
            opens_at,
            closes_at: opens_at.map(|t| t + Duration::days(1)),
            option_ids: Vec::new(),
            vote_ids: Vec::new(),
            tags: vec!["logo".to_string()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn no_options() -> &'static [PostOption] {
        &[]
    }

    fn stored_option(post: &Post, position: i32) -> PostOption {
        PostOption {
            id: OptionId::new(),
            post_id: post.id,
            position,
            file_ref: file_ref("quorum-vote", &format!("post-options/{}.png", position)),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn create_plans_every_option_as_insert() {
        let now = Utc::now();
        let request = UpsertPostRequest::builder()
            .id(PostId::new())
            .author_id(CustomerId::new())
            .opens_at(now + Duration::hours(1))
            .options(vec![
                UpsertPostOptionRequest::signed(
                    OptionId::new(),
                    1,
                    "quorum-vote",
                    "post-options/signed/a.png",
                ),
                UpsertPostOptionRequest::upload(OptionId::new(), 2, vec![1u8, 2, 3], "image/png"),
            ])
            .build();

        let plan = plan_upsert(&request, None, &config(), now).unwrap();

        assert!(plan.created);
        assert_eq!(plan.inserts.len(), 2);
        assert_eq!(plan.file_tasks.len(), 2);
        assert_eq!(plan.inserts[0].file_ref, "quorum-vote/post-options/signed/a.png");
        assert_eq!(
            plan.inserts[1].file_ref,
            format!(
                "quorum-vote/post-options/{}/{}.png",
                request.id, request.options[1].id
            )
        );
        assert!(plan.tags.is_none());
    }

    #[test]
    fn update_by_other_author_is_rejected_first() {
        let now = Utc::now();
        let stored = stored_post(CustomerId::new(), Some(now - Duration::days(1)));
        let request = UpsertPostRequest::builder()
            .id(stored.id)
            .author_id(CustomerId::new())
            .build();

        let result = plan_upsert(&request, Some((&stored, no_options())), &config(), now);
        assert!(matches!(result, Err(PostError::PostNotOwned)));
    }

    #[test]
    fn live_post_cannot_be_edited() {
        let now = Utc::now();
        let author = CustomerId::new();
        let stored = stored_post(author, Some(now - Duration::minutes(1)));
        let request = UpsertPostRequest::builder()
            .id(stored.id)
            .author_id(author)
            .build();

        let result = plan_upsert(&request, Some((&stored, no_options())), &config(), now);
        assert!(matches!(result, Err(PostError::OpensAtAlreadyPassed)));
    }

    #[test]
    fn update_merges_request_over_stored_fields() {
        let now = Utc::now();
        let author = CustomerId::new();
        let stored = stored_post(author, Some(now + Duration::days(1)));
        let options = vec![stored_option(&stored, 1)];
        let request = UpsertPostRequest::builder()
            .id(stored.id)
            .author_id(author)
            .design_phase(DesignPhase::HiFi)
            .options(vec![UpsertPostOptionRequest::existing(options[0].id, 1)])
            .build();

        let plan = plan_upsert(&request, Some((&stored, &options)), &config(), now).unwrap();

        assert!(!plan.created);
        assert_eq!(plan.post.design_phase, Some(DesignPhase::HiFi));
        assert_eq!(plan.post.context, stored.context);
        assert_eq!(plan.post.opens_at, stored.opens_at);
        assert_eq!(plan.post.closes_at, stored.closes_at);
        assert!(plan.options.is_empty());
    }

    #[test]
    fn merged_closing_time_is_checked_against_stored_opening() {
        let now = Utc::now();
        let author = CustomerId::new();
        let stored = stored_post(author, Some(now + Duration::days(2)));
        let request = UpsertPostRequest::builder()
            .id(stored.id)
            .author_id(author)
            .closes_at(now + Duration::days(1))
            .build();

        let result = plan_upsert(&request, Some((&stored, no_options())), &config(), now);
        assert!(matches!(result, Err(PostError::ClosesAtNotAfterOpensAt)));
    }

    #[test]
    fn tags_are_diffed_against_stored_tags() {
        let now = Utc::now();
        let author = CustomerId::new();
        let stored = stored_post(author, None);
        let request = UpsertPostRequest::builder()
            .id(stored.id)
            .author_id(author)
            .tags(vec!["serif".to_string()])
            .build();

        let plan = plan_upsert(&request, Some((&stored, no_options())), &config(), now).unwrap();
        let tags = plan.tags.unwrap();

        assert_eq!(tags.insert, vec!["serif"]);
        assert_eq!(tags.delete, vec!["logo"]);
    }

    #[test]
    fn create_with_stale_opening_time_fails_before_option_checks() {
        let now = Utc::now();
        let request = UpsertPostRequest::builder()
            .id(PostId::new())
            .author_id(CustomerId::new())
            .opens_at(now - Duration::minutes(11))
            .build();

        let result = plan_upsert(&request, None, &config(), now);
        assert!(matches!(result, Err(PostError::OpensAtAlreadyPassed)));
    }
}
