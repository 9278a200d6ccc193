pub mod schema;
use std::sync::Arc;

use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;

#[derive(Clone)]
pub struct Db {
    pub pool: Arc<AnyPool>,
}

impl Db {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(16)
            .connect(database_url)
            .await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        schema::migrate(&self.pool).await
    }
}

/// True for errors a fresh attempt can clear: SQLite busy/locked and
/// Postgres serialization failures or deadlocks.
pub fn is_transient(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| match cause.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db)) => {
            let code = db.code();
            matches!(
                code.as_deref(),
                Some("5") | Some("6") | Some("261") | Some("262") | Some("517") | Some("40001")
                    | Some("40P01")
            ) || {
                let msg = db.message().to_ascii_lowercase();
                msg.contains("database is locked") || msg.contains("table is locked")
            }
        }
        Some(sqlx::Error::PoolTimedOut) => true,
        _ => false,
    })
}

/// True for a unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}
