//! Test fixtures for building upsert requests and seeding storage.

use chrono::{DateTime, Duration, Utc};
use quorum_core::common::{CustomerId, OptionId, PostId};
use quorum_core::domains::posts::{UpsertPostOptionRequest, UpsertPostRequest};
use quorum_core::kernel::MockObjectStore;

use super::TEST_BUCKET;

/// Option with a signed upload key in the test bucket
pub fn signed_option(id: OptionId, position: i32) -> UpsertPostOptionRequest {
    UpsertPostOptionRequest::signed(id, position, TEST_BUCKET, option_key(id))
}

/// Key a signed URL would have issued for `id`
pub fn option_key(id: OptionId) -> String {
    format!("post-options/signed/{}.png", id)
}

/// Store that already holds the signed uploads for `ids`
pub fn store_with_uploads(ids: &[OptionId]) -> MockObjectStore {
    ids.iter().fold(MockObjectStore::new(), |store, id| {
        store.with_object(TEST_BUCKET, &option_key(*id))
    })
}

/// Draft post opening tomorrow with the given options
pub fn draft_request(
    id: PostId,
    author_id: CustomerId,
    options: Vec<UpsertPostOptionRequest>,
) -> UpsertPostRequest {
    let opens_at = tomorrow();
    UpsertPostRequest::builder()
        .id(id)
        .author_id(author_id)
        .context("Which logo reads better at small sizes?".to_string())
        .opens_at(opens_at)
        .closes_at(opens_at + Duration::days(2))
        .options(options)
        .build()
}

pub fn tomorrow() -> DateTime<Utc> {
    Utc::now() + Duration::days(1)
}

/// `n` new option ids with signed options at positions 1..=n
pub fn signed_options(n: i32) -> (Vec<OptionId>, Vec<UpsertPostOptionRequest>) {
    let ids: Vec<OptionId> = (0..n).map(|_| OptionId::new()).collect();
    let options = ids
        .iter()
        .zip(1..)
        .map(|(id, position)| signed_option(*id, position))
        .collect();
    (ids, options)
}
