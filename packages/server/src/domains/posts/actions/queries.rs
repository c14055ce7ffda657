//! Read-side post operations

use tracing::debug;

use crate::domains::posts::data::{GetOptionsByFilterRequest, GetPostsByFilterRequest, OptionData};
use crate::domains::posts::error::PostError;
use crate::domains::posts::models::{DbLock, Post, PostOption};
use crate::kernel::ServerDeps;

/// Non-deleted posts matching `request.ids`, newest opening time first.
/// An empty id list returns every post.
pub async fn get_posts_by_filter(
    request: GetPostsByFilterRequest,
    deps: &ServerDeps,
) -> Result<Vec<Post>, PostError> {
    let posts = Post::find_by_filter(&request.ids, DbLock::None, &deps.db_pool).await?;
    debug!(requested = request.ids.len(), found = posts.len(), "Loaded posts");
    Ok(posts)
}

/// Options matching the given ids and/or posts, with public image URLs
pub async fn get_options_by_filter(
    request: GetOptionsByFilterRequest,
    deps: &ServerDeps,
) -> Result<Vec<OptionData>, PostError> {
    let options =
        PostOption::find_by_filter(&request.ids, &request.post_ids, DbLock::None, &deps.db_pool)
            .await?;

    Ok(options
        .into_iter()
        .map(|option| OptionData::from_model(option, &deps.posts.public_url))
        .collect())
}
