use axum::extract::{Extension, State};
use axum::http::{HeaderName, HeaderValue};
use axum::{
    Json,
    response::{IntoResponse, Response},
};
use deepguard_domain::accounts::ScanRecord;
use deepguard_domain::admission::{ScanRequest, ScanResponse};
use deepguard_domain::error::DomainError;
use deepguard_infra::auth::constant_time_eq;
use serde::Deserialize;
use validator::Validate;

use super::map_domain_error;
use crate::error::ApiError;
use crate::middleware::ApiKeyContext;
use crate::state::AppState;
use crate::{observability, validation};

const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// `url` defaults to empty so a missing field is reported after the key
/// check, like an empty one.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ScanBody {
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub url: String,
    #[validate(length(max = 128))]
    pub source: Option<String>,
}

pub(crate) async fn scan(
    State(state): State<AppState>,
    Extension(ctx): Extension<ApiKeyContext>,
    Json(payload): Json<ScanBody>,
) -> Result<Json<ScanResponse>, ApiError> {
    validation::validate(&payload)?;
    let request = ScanRequest {
        url: payload.url,
        source: payload.source,
    };

    let response = state
        .admission
        .admit(ctx.key(), request)
        .await
        .map_err(|err| {
            observability::register_scan_rejection("metered", rejection_reason(&err));
            map_domain_error(err)
        })?;

    observability::register_scan(
        "metered",
        ScanRecord::is_flagged(response.score),
        response.details.error.is_some(),
    );
    Ok(Json(response))
}

/// Static-key detection without metering or webhooks.
pub(crate) async fn detect(
    State(state): State<AppState>,
    Extension(ctx): Extension<ApiKeyContext>,
    Json(payload): Json<ScanBody>,
) -> Result<Response, ApiError> {
    validation::validate(&payload)?;

    let Some(api_key) = ctx
        .key()
        .filter(|key| state.legacy_keys.iter().any(|known| constant_time_eq(known, key)))
    else {
        observability::register_scan_rejection("legacy", "unknown_key");
        return Err(ApiError::Unauthorized("invalid or missing API key".into()));
    };

    let decision = state.legacy_limiter.check(api_key);
    if !decision.allowed {
        observability::register_scan_rejection("legacy", "rate_limited");
        tracing::warn!(limit = state.legacy_limiter.limit(), "legacy detect rate limited");
        let mut response = ApiError::RateLimited.into_response();
        insert_remaining(&mut response, 0);
        return Ok(response);
    }

    let url = payload.url.trim();
    if url.is_empty() {
        observability::register_scan_rejection("legacy", "missing_url");
        return Err(ApiError::Validation("url is required".into()));
    }

    let outcome = state.aggregator.score(url).await;
    let body = ScanResponse::unmetered(outcome, payload.source);
    observability::register_scan(
        "legacy",
        ScanRecord::is_flagged(body.score),
        body.details.error.is_some(),
    );

    let mut response = Json(body).into_response();
    insert_remaining(&mut response, decision.remaining);
    Ok(response)
}

fn insert_remaining(response: &mut Response, remaining: u32) {
    response.headers_mut().insert(
        HeaderName::from_static(RATE_LIMIT_REMAINING_HEADER),
        HeaderValue::from(remaining),
    );
}

fn rejection_reason(err: &DomainError) -> &'static str {
    match err {
        DomainError::Auth(failure) => failure.as_str(),
        DomainError::QuotaExceeded { .. } => "quota_exceeded",
        DomainError::Validation(_) => "validation_error",
        _ => "error",
    }
}
