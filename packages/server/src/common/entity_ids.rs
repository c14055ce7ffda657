//! Typed ID definitions for post-domain entities.

pub use super::id::Id;

/// Marker type for Post entities.
pub struct Post;

/// Marker type for PostOption entities (one image choice within a post).
pub struct PostOption;

/// Marker type for PostVote entities.
pub struct PostVote;

/// Marker type for Customer entities (authors and voters).
pub struct Customer;

pub type PostId = Id<Post>;

pub type OptionId = Id<PostOption>;

pub type VoteId = Id<PostVote>;

pub type CustomerId = Id<Customer>;
