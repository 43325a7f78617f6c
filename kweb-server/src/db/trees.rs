//! Tree snapshot persistence
//!
//! Append-only log of whole-tree JSON snapshots. The latest row (highest id)
//! is the current tree. The tree structure itself is opaque here.

use kweb_common::Result;
use serde_json::{json, Value};
use sqlx::SqlitePool;

/// Name of the root node of a fresh tree
pub const INITIAL_TREE_NAME: &str = "All Topics";

/// Tree with only the root node
pub fn initial_tree() -> Value {
    json!({ "name": INITIAL_TREE_NAME })
}

/// Create the `trees` table and seed it when empty
pub async fn init_trees_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS trees (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tree_data TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trees")
        .fetch_one(pool)
        .await?;

    if count == 0 {
        append_tree(pool, &initial_tree()).await?;
        tracing::info!("Seeded trees table with initial tree");
    }

    Ok(())
}

/// Most recent snapshot, or the initial tree when none exist
pub async fn load_latest_tree(pool: &SqlitePool) -> Result<Value> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT tree_data FROM trees ORDER BY id DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    match row {
        Some((data,)) => Ok(serde_json::from_str(&data)?),
        None => Ok(initial_tree()),
    }
}

/// Append a snapshot, returning its row id
pub async fn append_tree(pool: &SqlitePool, tree: &Value) -> Result<i64> {
    let data = serde_json::to_string(tree)?;

    let result = sqlx::query("INSERT INTO trees (tree_data) VALUES (?)")
        .bind(data)
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Number of stored snapshots
pub async fn snapshot_count(pool: &SqlitePool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trees")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
