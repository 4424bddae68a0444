//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "scope_revision",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1: initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Org units
-- =======================================================================
DEFINE TABLE org_unit SCHEMAFULL;
DEFINE FIELD code ON TABLE org_unit TYPE string;
DEFINE FIELD name ON TABLE org_unit TYPE string;
DEFINE FIELD unit_type ON TABLE org_unit TYPE string \
    ASSERT $value IN ['University', 'School', 'Faculty', 'Department', \
    'Division', 'Office', 'Center', 'Institute'];
DEFINE FIELD status ON TABLE org_unit TYPE string \
    ASSERT $value IN ['Draft', 'Active', 'Archived'];
-- Projection of the open relation; written only by structural scripts.
DEFINE FIELD parent_id ON TABLE org_unit TYPE option<string>;
DEFINE FIELD description ON TABLE org_unit TYPE option<string>;
DEFINE FIELD metadata ON TABLE org_unit TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD version ON TABLE org_unit TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE org_unit TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE org_unit TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_org_unit_code ON TABLE org_unit COLUMNS code UNIQUE;
DEFINE INDEX idx_org_unit_parent ON TABLE org_unit COLUMNS parent_id;

-- =======================================================================
-- Effective-dated parent/child relations
-- =======================================================================
DEFINE TABLE org_unit_relation SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update FULL
        FOR delete NONE;
DEFINE FIELD parent_id ON TABLE org_unit_relation TYPE string;
DEFINE FIELD child_id ON TABLE org_unit_relation TYPE string;
DEFINE FIELD relation_type ON TABLE org_unit_relation TYPE string \
    ASSERT $value IN ['Administrative', 'Academic'];
DEFINE FIELD effective_from ON TABLE org_unit_relation TYPE datetime;
DEFINE FIELD effective_to ON TABLE org_unit_relation \
    TYPE option<datetime>;
DEFINE FIELD note ON TABLE org_unit_relation TYPE option<string>;
DEFINE FIELD created_at ON TABLE org_unit_relation TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_relation_child ON TABLE org_unit_relation \
    COLUMNS child_id;
DEFINE INDEX idx_relation_parent ON TABLE org_unit_relation \
    COLUMNS parent_id;

-- =======================================================================
-- Org unit change log (append-only)
-- =======================================================================
DEFINE TABLE org_unit_history SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD org_unit_id ON TABLE org_unit_history TYPE string;
DEFINE FIELD change_type ON TABLE org_unit_history TYPE string \
    ASSERT $value IN ['Created', 'Renamed', 'Moved', 'Archived'];
DEFINE FIELD old_name ON TABLE org_unit_history TYPE option<string>;
DEFINE FIELD new_name ON TABLE org_unit_history TYPE option<string>;
DEFINE FIELD details ON TABLE org_unit_history TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD changed_by ON TABLE org_unit_history TYPE option<string>;
DEFINE FIELD changed_at ON TABLE org_unit_history TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_history_unit ON TABLE org_unit_history \
    COLUMNS org_unit_id;

-- =======================================================================
-- Hierarchy revision counter (single row)
-- =======================================================================
DEFINE TABLE hierarchy_state SCHEMAFULL;
DEFINE FIELD revision ON TABLE hierarchy_state TYPE int DEFAULT 0;
DEFINE FIELD updated_at ON TABLE hierarchy_state TYPE datetime \
    DEFAULT time::now();
CREATE hierarchy_state:main SET revision = 0;

-- =======================================================================
-- Org structure requests
-- =======================================================================
DEFINE TABLE org_structure_request SCHEMAFULL;
DEFINE FIELD request_type ON TABLE org_structure_request TYPE string \
    ASSERT $value IN ['CreateUnit', 'RenameUnit', 'MoveUnit', 'ArchiveUnit'];
DEFINE FIELD status ON TABLE org_structure_request TYPE string \
    ASSERT $value IN ['Draft', 'Submitted', 'Reviewing', 'Approved', \
    'Rejected'];
DEFINE FIELD requester_id ON TABLE org_structure_request TYPE string;
DEFINE FIELD target_org_unit_id ON TABLE org_structure_request \
    TYPE string;
DEFINE FIELD owner_org_id ON TABLE org_structure_request TYPE string;
DEFINE FIELD payload ON TABLE org_structure_request TYPE object FLEXIBLE;
DEFINE FIELD workflow_step ON TABLE org_structure_request TYPE int \
    DEFAULT 0;
DEFINE FIELD current_reviewer_id ON TABLE org_structure_request \
    TYPE option<string>;
DEFINE FIELD created_at ON TABLE org_structure_request TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE org_structure_request TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_structure_request_owner ON TABLE org_structure_request \
    COLUMNS owner_org_id;
DEFINE INDEX idx_structure_request_target ON TABLE org_structure_request \
    COLUMNS target_org_unit_id;

-- =======================================================================
-- Course/program publication workflow items
-- =======================================================================
DEFINE TABLE workflow_item SCHEMAFULL;
DEFINE FIELD subject ON TABLE workflow_item TYPE string \
    ASSERT $value IN ['Course', 'Program'];
DEFINE FIELD subject_id ON TABLE workflow_item TYPE string;
DEFINE FIELD title ON TABLE workflow_item TYPE string;
DEFINE FIELD owner_org_id ON TABLE workflow_item TYPE string;
DEFINE FIELD requester_id ON TABLE workflow_item TYPE string;
DEFINE FIELD stage ON TABLE workflow_item TYPE string \
    ASSERT $value IN ['Faculty', 'AcademicOffice', 'AcademicBoard'];
DEFINE FIELD status ON TABLE workflow_item TYPE string \
    ASSERT $value IN ['Draft', 'Submitted', 'Reviewing', 'Approved', \
    'Rejected', 'Published'];
DEFINE FIELD current_reviewer_id ON TABLE workflow_item \
    TYPE option<string>;
DEFINE FIELD priority ON TABLE workflow_item TYPE string \
    ASSERT $value IN ['Low', 'Normal', 'High', 'Urgent'];
DEFINE FIELD notes ON TABLE workflow_item TYPE option<string>;
DEFINE FIELD version ON TABLE workflow_item TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE workflow_item TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE workflow_item TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_workflow_item_owner ON TABLE workflow_item \
    COLUMNS owner_org_id;

-- =======================================================================
-- Approval history (append-only, shared by items and requests)
-- =======================================================================
DEFINE TABLE workflow_history SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD target_table ON TABLE workflow_history TYPE string \
    ASSERT $value IN ['workflow_item', 'org_structure_request'];
DEFINE FIELD target_id ON TABLE workflow_history TYPE string;
DEFINE FIELD sequence ON TABLE workflow_history TYPE int;
DEFINE FIELD action ON TABLE workflow_history TYPE string \
    ASSERT $value IN ['Submit', 'StartReview', 'Approve', 'Reject', \
    'Return', 'Publish'];
DEFINE FIELD reviewer_id ON TABLE workflow_history TYPE string;
DEFINE FIELD reviewer_role ON TABLE workflow_history TYPE string;
DEFINE FIELD comments ON TABLE workflow_history TYPE option<string>;
DEFINE FIELD from_stage ON TABLE workflow_history TYPE option<string>;
DEFINE FIELD to_stage ON TABLE workflow_history TYPE option<string>;
DEFINE FIELD from_status ON TABLE workflow_history TYPE string;
DEFINE FIELD to_status ON TABLE workflow_history TYPE string;
DEFINE FIELD created_at ON TABLE workflow_history TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_workflow_history_sequence ON TABLE workflow_history \
    COLUMNS target_table, target_id, sequence UNIQUE;

-- =======================================================================
-- Org assignments (soft-deleted via end_date)
-- =======================================================================
DEFINE TABLE org_assignment SCHEMAFULL;
DEFINE FIELD employee_id ON TABLE org_assignment TYPE string;
DEFINE FIELD org_unit_id ON TABLE org_assignment TYPE string;
DEFINE FIELD position_id ON TABLE org_assignment TYPE option<string>;
DEFINE FIELD assignment_type ON TABLE org_assignment TYPE string \
    ASSERT $value IN ['Permanent', 'Concurrent', 'Acting', 'Secondment'];
DEFINE FIELD is_primary ON TABLE org_assignment TYPE bool DEFAULT false;
DEFINE FIELD allocation_percent ON TABLE org_assignment TYPE int \
    ASSERT $value >= 1 AND $value <= 100;
DEFINE FIELD start_date ON TABLE org_assignment TYPE datetime;
DEFINE FIELD end_date ON TABLE org_assignment TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE org_assignment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_assignment_employee ON TABLE org_assignment \
    COLUMNS employee_id;
DEFINE INDEX idx_assignment_unit ON TABLE org_assignment \
    COLUMNS org_unit_id;
";

// -----------------------------------------------------------------------
// Schema v2: scope revision counter
// -----------------------------------------------------------------------

// Bumped by every write that can change what an actor's scope resolves
// to: assignment writes and relation changes. Workflow transitions are
// guarded on it.
const SCHEMA_V2: &str = "\
DEFINE TABLE scope_state SCHEMAFULL;
DEFINE FIELD revision ON TABLE scope_state TYPE int DEFAULT 0;
DEFINE FIELD updated_at ON TABLE scope_state TYPE datetime \
    DEFAULT time::now();
CREATE scope_state:main SET revision = 0;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
