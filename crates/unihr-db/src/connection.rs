//! Opening the governance store.

use clap::Args;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::repository::{fetch_revision, fetch_scope_revision};
use crate::schema::run_migrations;

/// Location of the governance store and the root credentials used to
/// open it. Every field is a `--db-*` flag backed by a `UNIHR_DB_*`
/// variable.
#[derive(Debug, Clone, Args)]
pub struct DbConfig {
    /// SurrealDB WebSocket address.
    #[arg(long = "db-url", env = "UNIHR_DB_URL", default_value = "127.0.0.1:8000")]
    pub url: String,

    #[arg(long = "db-namespace", env = "UNIHR_DB_NAMESPACE", default_value = "unihr")]
    pub namespace: String,

    #[arg(long = "db-database", env = "UNIHR_DB_DATABASE", default_value = "governance")]
    pub database: String,

    #[arg(long = "db-user", env = "UNIHR_DB_USER", default_value = "root")]
    pub username: String,

    #[arg(
        long = "db-password",
        env = "UNIHR_DB_PASSWORD",
        default_value = "root",
        hide_env_values = true
    )]
    pub password: String,
}

/// An open, migrated governance store.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Connect as root, select the configured namespace and database and
    /// bring the schema up to date. The returned store is ready for the
    /// repositories.
    pub async fn open(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Opening governance store"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        run_migrations(&db).await?;

        let hierarchy_revision = fetch_revision(&db).await?;
        let scope_revision = fetch_scope_revision(&db).await?;
        info!(hierarchy_revision, scope_revision, "Governance store ready");

        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
