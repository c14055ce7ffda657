// Quorum API Core
//
// Post storage for the design-feedback voting app: customers author posts with
// 2-6 image options and other customers vote on them. This crate owns the post
// upsert reconciliation engine and the read/upload helpers around it; the
// GraphQL layer calls into `domains::posts::actions` in-process.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
