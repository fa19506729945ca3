use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Not ready while the loaded flashcard prompt cannot carry chunk text.
pub async fn readiness_check(Extension(state): Extension<Arc<AppState>>) -> StatusCode {
    if state.pipeline.is_ready() {
        StatusCode::OK
    } else {
        warn!("Flashcard prompt template has no text placeholder");
        StatusCode::SERVICE_UNAVAILABLE
    }
}
