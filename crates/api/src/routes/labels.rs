use axum::Json;
use axum::extract::State;
use deepguard_infra::labels::LabelEntry;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation;

#[derive(Debug, Serialize)]
pub(crate) struct SeedResponse {
    pub urls: Vec<String>,
}

pub(crate) async fn seed(State(state): State<AppState>) -> Result<Json<SeedResponse>, ApiError> {
    let urls = state.labels.seed_urls().await.map_err(|err| {
        tracing::error!(error = %err, "failed to read seed urls");
        ApiError::Internal
    })?;
    Ok(Json(SeedResponse { urls }))
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LabelRequest {
    #[validate(length(min = 1, max = 2048))]
    pub url: String,
    #[validate(length(min = 1, max = 64))]
    pub label: String,
    #[validate(length(max = 128))]
    pub reporter: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LabelResponse {
    pub ok: bool,
}

pub(crate) async fn label(
    State(state): State<AppState>,
    Json(payload): Json<LabelRequest>,
) -> Result<Json<LabelResponse>, ApiError> {
    validation::validate(&payload)?;
    let entry = LabelEntry {
        url: payload.url,
        label: payload.label,
        reporter: payload.reporter,
    };
    state.labels.append(&entry).await.map_err(|err| {
        tracing::error!(error = %err, "failed to append label");
        ApiError::Internal
    })?;
    Ok(Json(LabelResponse { ok: true }))
}
