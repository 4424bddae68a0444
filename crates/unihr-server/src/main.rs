//! UniHR Server: application entry point.
//!
//! Connects to SurrealDB, applies pending migrations, audits the org
//! hierarchy and then waits for shutdown. The governance services are
//! consumed by the HR application layer, which is deployed separately.

mod config;
mod error;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use unihr_db::{DbManager, SurrealHierarchyRepository, SurrealOrgUnitRepository};
use unihr_governance::{GovernanceConfig, HierarchyService};

use crate::config::Cli;
use crate::error::ServerError;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_filter));
    if cli.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!("Starting UniHR governance server...");

    let manager = DbManager::open(&cli.db).await?;
    let db = manager.client().clone();
    let config = GovernanceConfig::from(cli.governance);

    let hierarchy = HierarchyService::new(
        SurrealOrgUnitRepository::new(db.clone()),
        SurrealHierarchyRepository::new(db),
        config,
    );
    match hierarchy.verify_integrity().await {
        Ok(report) if report.is_clean() => {}
        Ok(report) => warn!(
            violations = report.violations.len(),
            "Org hierarchy has integrity violations"
        ),
        Err(e) => error!(error = %e, "Org hierarchy audit failed"),
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }

    info!("UniHR governance server stopped.");
    Ok(())
}
