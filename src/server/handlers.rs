use super::AppState;
use super::errors::ApiError;
use crate::error::RagError;
use crate::types::{HealthResponse, ProcessRequest, ProcessResponse};
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

/// `POST /process`: answer a question from the document directory
pub async fn process_handler(
    State(state): State<AppState>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!("Rejected request body: {}", rejection.body_text());
        ApiError::bad_request(rejection.body_text())
    })?;

    let query = request
        .validate()
        .map_err(|e| ApiError::from(RagError::from(e)))?;
    tracing::info!("Processing query: {}", query);

    let response = state.service.process(query).await?;
    match response.response {
        Some(result) => {
            tracing::info!("Answer: {}", result);
            Ok(Json(ProcessResponse { result }))
        }
        None => {
            tracing::info!("No result found for query");
            Err(ApiError::not_found())
        }
    }
}

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("GIT_COMMIT_HASH").to_string(),
    })
}
