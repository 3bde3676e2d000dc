//! Explosion routes
//!
//! The HTTP surface acting as the invocation trigger: one route to run a
//! generation invocation, one read-only route for the reconciled status.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::commands::generate::{handle as handle_generate, GenerateArtifactCommand};
use super::queries::status::{handle as handle_status, StatusQuery, StatusQueryError};
use crate::AppState;

/// Create explosion routes
pub fn explosion_routes() -> Router<AppState> {
    Router::new()
        .route("/explosion/generate", post(generate_artifact))
        .route(
            "/explosion/status/:artifact_set_id/:version",
            get(get_status),
        )
}

/// Run one generation invocation.
///
/// POST /explosion/generate
///
/// Always answers 200 with the structured job result; the `success` flag
/// inside the body is the outcome.
async fn generate_artifact(
    State(state): State<AppState>,
    Json(cmd): Json<GenerateArtifactCommand>,
) -> Response {
    let response = handle_generate(state.store, state.source, cmd).await;
    (StatusCode::OK, Json(json!(response))).into_response()
}

/// Reconciled status for one (artifact set, version) pair.
///
/// GET /explosion/status/:artifact_set_id/:version
async fn get_status(
    State(state): State<AppState>,
    Path((artifact_set_id, version)): Path<(String, String)>,
) -> Result<Response, StatusCode> {
    let query = StatusQuery {
        artifact_set_id,
        version,
    };

    match handle_status(state.store, query).await {
        Ok(doc) => Ok((StatusCode::OK, Json(json!(doc))).into_response()),
        Err(StatusQueryError::MissingInput) => Err(StatusCode::BAD_REQUEST),
        Err(e) => {
            tracing::error!("failed to read status: {:?}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
