//! SQLite connection setup

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open (or create) the SQLite database at `db_path`
///
/// Creates the parent directory when missing.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    Ok(pool)
}
