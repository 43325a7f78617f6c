//! Topic pipeline endpoints
//!
//! Thin adapters over [`crate::services::KnowledgePipeline`]. Generation
//! failures never surface as errors here; only a missing image is a 404.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{ApiError, ApiResult, AppState};

/// Body of the 404 for a topic without an image
pub const IMAGE_NOT_FOUND: &str = "Image not found";

/// Request body naming a tree node
#[derive(Debug, Deserialize)]
pub struct NodeRequest {
    pub name: Option<String>,
}

/// Response for POST /node-click
#[derive(Debug, Serialize)]
pub struct NodeClickResponse {
    /// Literal-list text of the child topics
    pub name: String,
}

/// Request body for POST /generate-annotation
#[derive(Debug, Deserialize)]
pub struct AnnotationRequest {
    pub text: Option<String>,
    pub topic: Option<String>,
}

/// Response for POST /generate-annotation
#[derive(Debug, Serialize)]
pub struct AnnotationResponse {
    pub annotation: String,
}

fn required(field: &str, value: Option<String>) -> ApiResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing required field: {}", field)))
}

/// POST /node-click
///
/// **Request:** `{"name": "Astronomy"}`
/// **Response:** `{"name": "['Black Holes', 'Exoplanets', ...]"}`
pub async fn node_click(
    State(state): State<AppState>,
    Json(payload): Json<NodeRequest>,
) -> ApiResult<Json<NodeClickResponse>> {
    let name = required("name", payload.name)?;
    let expansion = state.pipeline.expand(&name).await;
    Ok(Json(NodeClickResponse {
        name: expansion.raw,
    }))
}

/// POST /node-detail
///
/// **Response:** `{"title", "content", "originalTopic"}`; a degraded
/// placeholder is returned with status 500.
pub async fn node_detail(
    State(state): State<AppState>,
    Json(payload): Json<NodeRequest>,
) -> ApiResult<Response> {
    let name = required("name", payload.name)?;
    let outcome = state.pipeline.detail(&name).await;

    if outcome.degraded {
        state
            .record_error(format!("Detail generation failed for {}", name))
            .await;
        return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(outcome.detail)).into_response());
    }

    Ok(Json(outcome.detail).into_response())
}

/// GET /topic-image/:topic
///
/// Serves the cached (or freshly fetched) JPEG for the topic's origin.
/// **Not found:** 404 with the plain-text body `Image not found`.
pub async fn topic_image(
    State(state): State<AppState>,
    Path(topic): Path<String>,
) -> ApiResult<Response> {
    let Some(path) = state.pipeline.resolve_image(&topic).await else {
        tracing::debug!(topic = %topic, "No image available");
        return Ok((StatusCode::NOT_FOUND, IMAGE_NOT_FOUND).into_response());
    };

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        ApiError::Internal(format!("Failed to read image {}: {}", path.display(), e))
    })?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response())
}

/// POST /generate-annotation
///
/// **Request:** `{"text": "<selected excerpt>", "topic": "Astronomy"}`
/// **Response:** `{"annotation": "<1-2 sentence explanation>"}`
pub async fn generate_annotation(
    State(state): State<AppState>,
    Json(payload): Json<AnnotationRequest>,
) -> ApiResult<Json<AnnotationResponse>> {
    let text = required("text", payload.text)?;
    let topic = required("topic", payload.topic)?;

    let annotation = state.pipeline.annotate(&text, &topic).await;
    Ok(Json(AnnotationResponse { annotation }))
}

/// Build topic routes
pub fn topic_routes() -> Router<AppState> {
    Router::new()
        .route("/node-click", post(node_click))
        .route("/node-detail", post(node_detail))
        .route("/topic-image/:topic", get(topic_image))
        .route("/generate-annotation", post(generate_annotation))
}
