//! Request and response types for post operations.

use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::common::{CustomerId, OptionId, PostId};
use crate::domains::posts::models::{DesignPhase, PostCategory, PostOption};

// =============================================================================
// Upsert
// =============================================================================

/// Create a post or update one the caller owns.
///
/// `None` scalar fields keep the stored value on update. `options` is the
/// complete desired option list. `tags: None` leaves tags untouched.
#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct UpsertPostRequest {
    pub id: PostId,
    pub author_id: CustomerId,
    #[builder(default)]
    pub design_phase: Option<DesignPhase>,
    #[builder(default)]
    pub context: Option<String>,
    #[builder(default)]
    pub category: Option<PostCategory>,
    #[builder(default)]
    pub opens_at: Option<DateTime<Utc>>,
    #[builder(default)]
    pub closes_at: Option<DateTime<Utc>>,
    #[builder(default)]
    pub options: Vec<UpsertPostOptionRequest>,
    #[builder(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct UpsertPostOptionRequest {
    pub id: OptionId,
    pub position: i32,
    pub file: Option<OptionFile>,
}

impl UpsertPostOptionRequest {
    /// Keep an option that already exists, possibly at a new position
    pub fn existing(id: OptionId, position: i32) -> Self {
        Self {
            id,
            position,
            file: None,
        }
    }

    /// New option backed by an object the client uploaded through a signed URL
    pub fn signed(
        id: OptionId,
        position: i32,
        bucket: impl Into<String>,
        file_key: impl Into<String>,
    ) -> Self {
        Self {
            id,
            position,
            file: Some(OptionFile::SignedUpload {
                bucket: bucket.into(),
                file_key: file_key.into(),
            }),
        }
    }

    /// New option whose image bytes arrive with the request
    pub fn upload(
        id: OptionId,
        position: i32,
        bytes: impl Into<Bytes>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            position,
            file: Some(OptionFile::Upload {
                bytes: bytes.into(),
                content_type: content_type.into(),
            }),
        }
    }
}

/// Where the image for a new option comes from
#[derive(Debug, Clone)]
pub enum OptionFile {
    SignedUpload { bucket: String, file_key: String },
    Upload { bytes: Bytes, content_type: String },
}

// =============================================================================
// Reads
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct GetPostsByFilterRequest {
    pub ids: Vec<PostId>,
}

#[derive(Debug, Clone, Default)]
pub struct GetOptionsByFilterRequest {
    pub ids: Vec<OptionId>,
    pub post_ids: Vec<PostId>,
}

/// Option as exposed to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionData {
    pub id: OptionId,
    pub post_id: PostId,
    pub position: i32,
    pub url: String,
}

impl OptionData {
    pub fn from_model(option: PostOption, public_base_url: &str) -> Self {
        Self {
            url: option.public_url(public_base_url),
            id: option.id,
            post_id: option.post_id,
            position: option.position,
        }
    }
}

// =============================================================================
// Signed uploads
// =============================================================================

#[derive(Debug, Clone)]
pub struct GenerateSignedOptionUrlRequest {
    pub file_name: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOptionUrl {
    pub bucket: String,
    pub file_key: String,
    pub url: String,
}

// =============================================================================
// Image formats
// =============================================================================

/// Image formats accepted for options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
}

impl ImageFormat {
    /// Match a file name or key by its extension, ignoring case
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
        }
    }
}

/// Prefix of every key handed out through a signed upload URL
pub const SIGNED_UPLOAD_PREFIX: &str = "post-options/signed/";

/// Key a client uploads to through a signed URL
pub fn signed_upload_key(name: impl std::fmt::Display, format: ImageFormat) -> String {
    format!("{}{}.{}", SIGNED_UPLOAD_PREFIX, name, format.extension())
}

/// Whether `key` is a direct child of the signed upload prefix
pub fn is_signed_upload_key(key: &str) -> bool {
    key.strip_prefix(SIGNED_UPLOAD_PREFIX)
        .is_some_and(|name| !name.is_empty() && !name.contains('/'))
}

/// Key for image bytes sent with an upsert. Scoped by post so option ids
/// chosen by one author cannot address another post's objects.
pub fn uploaded_option_key(
    post_id: PostId,
    option_id: OptionId,
    format: ImageFormat,
) -> String {
    format!("post-options/{}/{}.{}", post_id, option_id, format.extension())
}

/// Stored reference for an object
pub fn file_ref(bucket: &str, key: &str) -> String {
    format!("{}/{}", bucket, key)
}
