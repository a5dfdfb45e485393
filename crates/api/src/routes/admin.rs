use axum::Json;
use axum::extract::State;
use deepguard_domain::accounts::ScanRecord;
use deepguard_domain::reviews::ReviewDecision;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::map_domain_error;
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation;

#[derive(Debug, Serialize)]
pub(crate) struct PendingReviewsResponse {
    pub pending_reviews: Vec<ScanRecord>,
    pub count: usize,
}

pub(crate) async fn pending_reviews(
    State(state): State<AppState>,
) -> Result<Json<PendingReviewsResponse>, ApiError> {
    let pending_reviews = state.reviews.pending().await.map_err(map_domain_error)?;
    Ok(Json(PendingReviewsResponse {
        count: pending_reviews.len(),
        pending_reviews,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ReviewDecisionRequest {
    #[validate(length(min = 1, max = 64))]
    pub scan_id: String,
    #[validate(length(min = 1, max = 32))]
    pub verdict: String,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

pub(crate) async fn review_decision(
    State(state): State<AppState>,
    Json(payload): Json<ReviewDecisionRequest>,
) -> Result<Json<ScanRecord>, ApiError> {
    validation::validate(&payload)?;
    let record = state
        .reviews
        .decide(ReviewDecision {
            scan_id: payload.scan_id,
            verdict: payload.verdict,
            notes: payload.notes,
        })
        .await
        .map_err(map_domain_error)?;
    Ok(Json(record))
}
