use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::models::request::BuildRequest;
use crate::services::{AnkiConnectClient, DeckPublisher, PublishOutcome};
use crate::state::AppState;
use crate::utils::error::ApiError;

/// `POST /autonomous-anki-builder`
pub async fn build_deck_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<BuildRequest>, JsonRejection>,
) -> Result<Json<Vec<PublishOutcome>>, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {}", e)))?;
    let job = request.into_job()?;

    info!(
        "Build request: input_path={}, deck={}",
        job.input_path, job.deck_name
    );

    let bridge = AnkiConnectClient::new(
        state.bridge_client.clone(),
        job.bridge_url.clone(),
        state.bridge.version,
    );
    let publisher = DeckPublisher::new(Arc::new(bridge), state.bridge.note_type.clone());

    let outcomes = state.pipeline.run(&job, &publisher).await.map_err(|e| {
        error!("Error: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(outcomes))
}
