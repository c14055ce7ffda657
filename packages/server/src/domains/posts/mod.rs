pub mod actions;
pub mod data;
pub mod error;
pub mod loader;
pub mod models;

// Re-export actions
pub use actions::{
    generate_signed_option_url, get_options_by_filter, get_posts_by_filter, upsert_post,
};

// Re-export request/response types
pub use data::{
    GenerateSignedOptionUrlRequest, GetOptionsByFilterRequest, GetPostsByFilterRequest,
    OptionData, OptionFile, SignedOptionUrl, UpsertPostOptionRequest, UpsertPostRequest,
};

pub use error::{PostError, PostErrorKind};
pub use loader::DataLoaders;

// Re-export models
pub use models::{DesignPhase, Post, PostCategory, PostOption};
