//! Database access for kweb-server

pub mod trees;

use kweb_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open the service database and create its tables
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let pool = kweb_common::db::init_database_pool(db_path).await?;
    trees::init_trees_table(&pool).await?;
    tracing::info!("Database tables initialized (trees)");
    Ok(pool)
}
