//! Domain models for UniHR.
//!
//! These are the core types shared across all crates.

pub mod actor;
pub mod assignment;
pub mod history;
pub mod org_unit;
pub mod relation;
pub mod structure_request;
pub mod workflow;
