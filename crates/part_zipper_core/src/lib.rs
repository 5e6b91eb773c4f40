//! Shared part-zipper domain primitives.
//!
//! This crate owns the invocation request/response contract and the object
//! naming rules. It intentionally excludes storage SDK and Lambda runtime
//! concerns, which live in `part_zipper_lambda`.

pub mod contract;
pub mod naming;
