use tracing::info;
use uuid::Uuid;

use crate::domains::posts::data::{
    signed_upload_key, GenerateSignedOptionUrlRequest, ImageFormat, SignedOptionUrl,
};
use crate::domains::posts::error::PostError;
use crate::kernel::ServerDeps;

/// Issue a short-lived URL the client can upload an option image to.
///
/// The returned bucket and key are what a later upsert passes back as a
/// signed upload; the upsert then checks the object actually exists.
pub async fn generate_signed_option_url(
    request: GenerateSignedOptionUrlRequest,
    deps: &ServerDeps,
) -> Result<SignedOptionUrl, PostError> {
    let format =
        ImageFormat::from_file_name(&request.file_name).ok_or(PostError::UnsupportedFileType)?;
    if request.content_type.trim().is_empty() {
        return Err(PostError::Validation("content type is required".to_string()));
    }

    let bucket = deps.posts.bucket_name.clone();
    let file_key = signed_upload_key(Uuid::new_v4(), format);
    let url = deps
        .object_store
        .signed_put_url(
            &bucket,
            &file_key,
            &request.content_type,
            deps.posts.signed_url_ttl,
        )
        .await
        .map_err(PostError::Storage)?;

    info!(file_key = %file_key, "Issued signed option upload URL");

    Ok(SignedOptionUrl {
        bucket,
        file_key,
        url,
    })
}
