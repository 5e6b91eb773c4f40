//! Storage adapters and the Lambda-facing pipeline for zipping part files.
//!
//! This crate owns runtime integration details (the S3-compatible object
//! store adapter, archive building, and the processing pipeline). Request
//! and response contracts plus naming rules live in `part_zipper_core`.

pub mod adapters;
pub mod archive;
pub mod handlers;
