//! Post domain actions
//!
//! Entry points take a request plus `&ServerDeps` and return `PostError` on
//! failure. The pure pieces (validation, diffing, planning) are public so
//! they can be exercised without a database.

pub mod queries;
pub mod reconcile;
pub mod signed_url;
pub mod storage;
pub mod upsert_post;
pub mod validation;

pub use queries::{get_options_by_filter, get_posts_by_filter};
pub use reconcile::{diff_options, diff_tags, normalize_tags, OptionPlan, TagPlan};
pub use signed_url::generate_signed_option_url;
pub use storage::{FileTask, StorageBarrier};
pub use upsert_post::{plan_upsert, upsert_post, UpsertPlan};
