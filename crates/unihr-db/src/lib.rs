//! UniHR Database: SurrealDB connection management and repository
//! implementations.
//!
//! This crate provides:
//! - Opening and migrating the store ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Error types ([`DbError`])
//! - SurrealDB implementations of the `unihr-core` repository traits

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use repository::{
    SurrealHierarchyRepository, SurrealOrgAssignmentRepository, SurrealOrgStructureRepository,
    SurrealOrgUnitRepository, SurrealWorkflowRepository,
};
pub use schema::{run_migrations, schema_v1};
