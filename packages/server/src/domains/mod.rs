// Domain modules
pub mod posts;
