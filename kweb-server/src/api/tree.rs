//! Tree snapshot endpoints
//!
//! The UI owns the tree structure; the service only stores and returns
//! whole snapshots.

use axum::{extract::State, routing::get, routing::post, Json, Router};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::db::trees;
use crate::{ApiResult, AppState};

/// Response for tree mutations
#[derive(Debug, Serialize)]
pub struct TreeUpdateResponse {
    pub status: String,
    pub data: Value,
}

impl TreeUpdateResponse {
    fn success(data: Value) -> Self {
        Self {
            status: "success".to_string(),
            data,
        }
    }
}

/// GET /tree
pub async fn get_tree(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let tree = trees::load_latest_tree(&state.db).await?;
    Ok(Json(tree))
}

/// POST /update-tree
///
/// **Request:** the full tree JSON
/// **Response:** `{"status": "success", "data": <tree>}`
pub async fn update_tree(
    State(state): State<AppState>,
    Json(tree): Json<Value>,
) -> ApiResult<Json<TreeUpdateResponse>> {
    let id = trees::append_tree(&state.db, &tree).await?;
    tracing::debug!(snapshot_id = id, "Tree snapshot saved");
    Ok(Json(TreeUpdateResponse::success(tree)))
}

/// POST /reset-tree
///
/// Stores a fresh root-only tree and forgets all topic provenance. The
/// generation cache is left intact.
pub async fn reset_tree(State(state): State<AppState>) -> ApiResult<Json<TreeUpdateResponse>> {
    let tree = trees::initial_tree();
    trees::append_tree(&state.db, &tree).await?;
    state.pipeline.reset_provenance();
    info!("Tree reset");
    Ok(Json(TreeUpdateResponse::success(tree)))
}

/// Build tree routes
pub fn tree_routes() -> Router<AppState> {
    Router::new()
        .route("/tree", get(get_tree))
        .route("/update-tree", post(update_tree))
        .route("/reset-tree", post(reset_tree))
}
