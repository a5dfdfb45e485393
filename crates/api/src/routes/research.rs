use axum::extract::State;
use axum::http::StatusCode;
use axum::{
    Json,
    response::{IntoResponse, Response},
};
use deepguard_domain::research::ResearchQuery;
use serde::Deserialize;
use validator::Validate;

use super::map_domain_error;
use crate::error::ApiError;
use crate::state::AppState;
use crate::{observability, validation};

// Required fields default to empty so the service reports them by name.

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AnalyzeScamRequest {
    #[serde(default)]
    pub url: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(length(max = 4000))]
    pub additional_context: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WalletRequest {
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct EndorsementRequest {
    #[serde(default)]
    pub celebrity_name: String,
    #[serde(default)]
    pub crypto_project: String,
    #[validate(length(max = 4000))]
    pub claim: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextRequest {
    #[serde(default)]
    pub text: String,
}

pub(crate) async fn analyze_scam(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeScamRequest>,
) -> Result<Response, ApiError> {
    validation::validate(&payload)?;
    run_research(
        &state,
        ResearchQuery::AnalyzeUrl {
            url: payload.url,
            description: payload.description,
            additional_context: payload.additional_context,
        },
    )
    .await
}

pub(crate) async fn wallet(
    State(state): State<AppState>,
    Json(payload): Json<WalletRequest>,
) -> Result<Response, ApiError> {
    run_research(
        &state,
        ResearchQuery::Wallet {
            address: payload.address,
        },
    )
    .await
}

pub(crate) async fn endorsement(
    State(state): State<AppState>,
    Json(payload): Json<EndorsementRequest>,
) -> Result<Response, ApiError> {
    validation::validate(&payload)?;
    run_research(
        &state,
        ResearchQuery::Endorsement {
            celebrity_name: payload.celebrity_name,
            crypto_project: payload.crypto_project,
            claim: payload.claim,
        },
    )
    .await
}

pub(crate) async fn text(
    State(state): State<AppState>,
    Json(payload): Json<TextRequest>,
) -> Result<Response, ApiError> {
    run_research(&state, ResearchQuery::Text { text: payload.text }).await
}

/// A backend failure is still a report; it goes out as 502 with
/// `success: false`.
async fn run_research(state: &AppState, query: ResearchQuery) -> Result<Response, ApiError> {
    let kind = query.kind();
    let report = state.research.run(query).await.map_err(|err| {
        observability::register_research_request(kind, "rejected");
        map_domain_error(err)
    })?;

    if report.success {
        observability::register_research_request(kind, "success");
        Ok(Json(report).into_response())
    } else {
        observability::register_research_request(kind, "upstream_error");
        Ok((StatusCode::BAD_GATEWAY, Json(report)).into_response())
    }
}
