//! UniHR governance: org hierarchy service, approval workflow engine,
//! authorization scope resolution and org assignments.

pub mod assignment;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod org_structure;
pub mod scope;
pub mod workflow;

pub use assignment::AssignmentService;
pub use config::GovernanceConfig;
pub use error::GovernanceError;
pub use hierarchy::{HierarchyService, MoveUnit, RegisterUnit};
pub use org_structure::{CreateOrgUnit, OrgStructureService, ProposeMove, ProposedOrgUnit};
pub use scope::ScopeResolver;
pub use workflow::{ApplyAction, WorkflowEngine};
