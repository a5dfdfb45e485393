use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::{
    Json,
    response::{IntoResponse, Response},
};
use deepguard_domain::accounts::{AccountCreate, AccountStats};
use deepguard_domain::error::AuthFailure;
use deepguard_domain::tiers::{Quota, Tier};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{map_domain_error, require_api_key};
use crate::error::ApiError;
use crate::middleware::ApiKeyContext;
use crate::state::AppState;
use crate::validation;

fn default_tier() -> String {
    Tier::Free.as_str().to_string()
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CreateAccountRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[serde(default = "default_tier")]
    #[validate(length(min = 1, max = 32))]
    pub tier: String,
    #[validate(length(max = 2048))]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateAccountResponse {
    pub api_key: String,
    pub email: String,
    pub tier: Tier,
    pub scans_limit: Quota,
}

pub(crate) async fn create_account(
    State(state): State<AppState>,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<Response, ApiError> {
    validation::validate(&payload)?;
    let account = state
        .accounts
        .create(AccountCreate {
            email: payload.email,
            tier: payload.tier,
            webhook_url: payload.webhook_url,
        })
        .await
        .map_err(map_domain_error)?;

    let body = CreateAccountResponse {
        scans_limit: account.monthly_quota(),
        api_key: account.api_key,
        email: account.email,
        tier: account.tier,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub(crate) async fn account_stats(
    State(state): State<AppState>,
    Extension(ctx): Extension<ApiKeyContext>,
) -> Result<Json<AccountStats>, ApiError> {
    let api_key = require_api_key(&ctx)?;
    let stats = state
        .accounts
        .stats(api_key)
        .await
        .map_err(map_domain_error)?
        .ok_or_else(|| ApiError::Unauthorized(AuthFailure::UnknownKey.to_string()))?;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UpdateWebhookRequest {
    #[validate(length(min = 1, max = 2048))]
    pub webhook_url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateWebhookResponse {
    pub success: bool,
    pub webhook_url: String,
}

pub(crate) async fn update_webhook(
    State(state): State<AppState>,
    Extension(ctx): Extension<ApiKeyContext>,
    Json(payload): Json<UpdateWebhookRequest>,
) -> Result<Json<UpdateWebhookResponse>, ApiError> {
    validation::validate(&payload)?;
    let api_key = require_api_key(&ctx)?;
    let updated = state
        .accounts
        .update_webhook(api_key, &payload.webhook_url)
        .await
        .map_err(map_domain_error)?;
    if !updated {
        return Err(ApiError::Unauthorized(AuthFailure::UnknownKey.to_string()));
    }

    let webhook_url = state
        .accounts
        .webhook_url(api_key)
        .await
        .map_err(map_domain_error)?
        .unwrap_or(payload.webhook_url);
    tracing::info!("account webhook updated");
    Ok(Json(UpdateWebhookResponse {
        success: true,
        webhook_url,
    }))
}
