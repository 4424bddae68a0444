//! Server configuration: command line flags, each backed by a `UNIHR_*`
//! environment variable.

use clap::{ArgAction, Args, Parser};
use unihr_db::DbConfig;
use unihr_governance::GovernanceConfig;

/// UniHR governance server.
#[derive(Debug, Parser)]
#[command(name = "unihr-server")]
#[command(about = "Migrates the UniHR governance store and audits the org hierarchy", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub db: DbConfig,

    #[command(flatten)]
    pub governance: GovernanceArgs,

    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[arg(long, env = "UNIHR_LOG", default_value = "unihr=info")]
    pub log_filter: String,

    /// Emit JSON log lines.
    #[arg(long, env = "UNIHR_LOG_JSON")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct GovernanceArgs {
    /// Permissions granting organization-wide scope for every permission.
    #[arg(
        long,
        env = "UNIHR_BLANKET_PERMISSIONS",
        value_delimiter = ',',
        default_values_t = GovernanceConfig::default().blanket_permissions
    )]
    pub blanket_permissions: Vec<String>,

    /// Seed org-subtree scopes only from primary assignments.
    #[arg(
        long,
        env = "UNIHR_SCOPE_PRIMARY_ONLY",
        action = ArgAction::Set,
        default_value_t = GovernanceConfig::default().scope_from_primary_only
    )]
    pub scope_primary_only: bool,

    /// Maximum number of ancestors an org unit may have.
    #[arg(
        long,
        env = "UNIHR_MAX_HIERARCHY_DEPTH",
        default_value_t = GovernanceConfig::default().max_hierarchy_depth
    )]
    pub max_hierarchy_depth: usize,
}

impl From<GovernanceArgs> for GovernanceConfig {
    fn from(args: GovernanceArgs) -> Self {
        Self {
            blanket_permissions: args.blanket_permissions,
            scope_from_primary_only: args.scope_primary_only,
            max_hierarchy_depth: args.max_hierarchy_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn governance_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "unihr-server",
            "--blanket-permissions",
            "*,hr.superuser",
            "--scope-primary-only",
            "false",
            "--max-hierarchy-depth",
            "6",
        ])
        .unwrap();

        let config = GovernanceConfig::from(cli.governance);
        assert_eq!(config.blanket_permissions, vec!["*", "hr.superuser"]);
        assert!(!config.scope_from_primary_only);
        assert_eq!(config.max_hierarchy_depth, 6);
    }

    #[test]
    fn bad_depth_is_rejected() {
        assert!(Cli::try_parse_from(["unihr-server", "--max-hierarchy-depth", "deep"]).is_err());
    }
}
