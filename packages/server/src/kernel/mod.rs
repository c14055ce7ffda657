//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod object_store;
pub mod test_dependencies;
pub mod traits;

pub use deps::ServerDeps;
pub use object_store::OpendalObjectStore;
pub use test_dependencies::MockObjectStore;
pub use traits::*;
