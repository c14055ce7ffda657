pub mod post;
pub mod post_option;
pub mod post_tag;

pub use post::{DesignPhase, Post, PostCategory, PostUpsert};
pub use post_option::{NewPostOption, PostOption};
pub use post_tag::PostTag;

/// Row lock applied to a SELECT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DbLock {
    #[default]
    None,
    /// Exclusive row lock held until the surrounding transaction ends
    ForUpdate,
}

impl DbLock {
    /// Clause appended to the end of a query
    pub(crate) fn clause(self, table: &str) -> String {
        match self {
            DbLock::None => String::new(),
            DbLock::ForUpdate => format!("FOR UPDATE OF {}", table),
        }
    }
}
