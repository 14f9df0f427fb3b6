//! Relational task store
//!
//! PostgreSQL-backed persistence for accounts, credentials, signing keys,
//! and download tasks. Repository functions are generic over the executor
//! so the same query runs against the pool or inside a transaction; a unit
//! of work is `store.begin()` followed by `tx.commit()`, with rollback on
//! drop along every error path.

mod accounts;
mod credentials;
mod signing_keys;
mod tasks;

pub use accounts::{create_account, get_account_by_id, get_account_by_name, AccountRow};
pub use credentials::{create_credential, get_credential, CredentialRow};
pub use signing_keys::{create_signing_key, get_signing_key, SigningKeyRow};
pub use tasks::{
    count_tasks_by_account, create_task, delete_task, get_task, get_task_for_update,
    list_tasks_by_account, update_task, DownloadStatus, DownloadType, NewTask, TaskRow,
};

use crate::config::DatabaseConfig;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use thiserror::Error;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

const MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Handle on the task store; cheap to clone (wraps a connection pool).
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Connect to PostgreSQL and apply embedded migrations idempotently.
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self> {
        let opts = PgConnectOptions::new()
            .host(&cfg.host)
            .port(cfg.port)
            .username(&cfg.username)
            .password(&cfg.password)
            .database(&cfg.database);

        tracing::info!(
            host = %cfg.host,
            port = cfg.port,
            database = %cfg.database,
            username = %cfg.username,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Wrap an existing pool; migrations are the caller's concern.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Begin a unit of work. Commit explicitly; dropping the transaction
    /// rolls it back.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }
}

/// Translate driver errors, surfacing unique violations distinctly.
fn map_insert_error(err: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::AlreadyExists(what.to_string());
        }
    }
    StoreError::Database(err)
}
