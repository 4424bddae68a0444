//! Core domain types for the UniHR governance core: org hierarchy,
//! approval workflow and authorization scope.

pub mod error;
pub mod hierarchy;
pub mod models;
pub mod repository;
pub mod scope;
pub mod transition;
