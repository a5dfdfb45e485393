mod accounts;
mod admin;
mod labels;
mod research;
mod scan;

use axum::extract::State;
use axum::{
    Json, Router,
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use deepguard_domain::error::DomainError;
use serde::Serialize;

use crate::middleware::ApiKeyContext;
use crate::{error::ApiError, middleware as app_middleware, observability, state::AppState};

pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/admin/pending-reviews", get(admin::pending_reviews))
        .route("/admin/review-decision", post(admin::review_decision))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::require_admin_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/v1/scan", post(scan::scan))
        .route("/detect", post(scan::detect))
        .route("/v1/account/create", post(accounts::create_account))
        .route("/v1/account/stats", get(accounts::account_stats))
        .route("/v1/account/webhook", post(accounts::update_webhook))
        .route("/v1/research/analyze-scam", post(research::analyze_scam))
        .route("/v1/research/wallet", post(research::wallet))
        .route("/v1/research/endorsement", post(research::endorsement))
        .route("/v1/research/text", post(research::text))
        .route("/seed", get(labels::seed))
        .route("/label", post(labels::label))
        .merge(admin)
        .route_layer(middleware::from_fn(app_middleware::metrics_layer))
        .layer(middleware::from_fn(app_middleware::api_key_middleware))
        .layer(app_middleware::timeout_layer())
        .layer(app_middleware::trace_layer())
        .layer(app_middleware::set_request_id_layer())
        .layer(app_middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(
            app_middleware::correlation_id_middleware,
        ))
        .layer(app_middleware::cors_layer(&state.config.cors_allowed_origin));

    if !state.config.is_test() {
        app = app.layer(app_middleware::rate_limit_layer());
    }

    app.with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    environment: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.app_env.clone(),
    })
}

async fn metrics() -> Result<Response, ApiError> {
    let body = observability::render_metrics()
        .ok_or_else(|| ApiError::Unavailable("metrics recorder not installed".into()))?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

fn require_api_key(ctx: &ApiKeyContext) -> Result<&str, ApiError> {
    ctx.key()
        .ok_or_else(|| ApiError::Unauthorized("API key required".into()))
}

fn map_domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::Validation(message) => ApiError::Validation(message),
        err @ DomainError::InvalidTier(_) => ApiError::Validation(err.to_string()),
        DomainError::Auth(failure) => ApiError::Unauthorized(failure.to_string()),
        err @ DomainError::QuotaExceeded { .. } => ApiError::QuotaExceeded(err.to_string()),
        DomainError::NotFound => ApiError::NotFound,
        DomainError::Conflict => ApiError::Conflict,
        DomainError::Unavailable(message) => ApiError::Unavailable(message),
    }
}
