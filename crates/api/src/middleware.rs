use axum::{
    body::Body,
    extract::MatchedPath,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::GovernorLayer;
use tower_governor::governor::{GovernorConfig, GovernorConfigBuilder};
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::{Span, info_span};
use uuid::Uuid;

use crate::error::ApiError;
use crate::observability;
use crate::state::AppState;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";
pub const API_KEY_HEADER: &str = "x-api-key";
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

#[derive(Clone, Debug)]
#[allow(dead_code)]
pub struct CorrelationId(pub String);

/// The caller's `X-API-Key`, if any. Handlers decide what the key means.
#[derive(Clone, Debug, Default)]
pub struct ApiKeyContext {
    pub api_key: Option<String>,
}

impl ApiKeyContext {
    pub fn key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

#[derive(Clone)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string();
        let value = HeaderValue::from_str(&id).ok()?;
        Some(RequestId::new(value))
    }
}

pub fn trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, RequestSpan> {
    TraceLayer::new_for_http().make_span_with(RequestSpan)
}

#[derive(Clone, Default)]
pub(crate) struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, req: &Request<B>) -> Span {
        let request_id_header = HeaderName::from_static("x-request-id");
        let request_id = req
            .headers()
            .get(&request_id_header)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-");
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-");
        info_span!(
            "http_request",
            method = %req.method(),
            uri = %req.uri(),
            request_id = %request_id,
            correlation_id = %correlation_id
        )
    }
}

pub fn set_request_id_layer() -> SetRequestIdLayer<UuidRequestId> {
    SetRequestIdLayer::x_request_id(UuidRequestId)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Must stay above the frame extractor's own timeout.
pub fn timeout_layer() -> TimeoutLayer {
    TimeoutLayer::new(Duration::from_secs(240))
}

pub fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let origins = allowed_origin
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let allow_origin = if origins.is_empty() {
        tracing::warn!("no valid CORS origin configured; allowing none");
        AllowOrigin::list(Vec::<HeaderValue>::new())
    } else {
        AllowOrigin::list(origins)
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

pub type RateLimitLayer = GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware>;

pub fn rate_limit_layer() -> RateLimitLayer {
    let config = GovernorConfigBuilder::default()
        .per_second(50)
        .burst_size(100)
        .finish()
        .unwrap_or_else(|| {
            tracing::error!(
                "rate limit config builder produced invalid values; using conservative default"
            );
            GovernorConfig::default()
        });
    GovernorLayer {
        config: Arc::new(config),
    }
}

pub async fn api_key_middleware(mut req: Request<Body>, next: Next) -> Response {
    let api_key = header_value(req.headers(), API_KEY_HEADER).map(str::to_string);
    req.extensions_mut().insert(ApiKeyContext { api_key });
    next.run(req).await
}

pub async fn require_admin_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(presented) = header_value(req.headers(), ADMIN_KEY_HEADER) else {
        return ApiError::Unauthorized("admin key required".into()).into_response();
    };
    if !state.admin.verify(presented) {
        tracing::warn!(path = %req.uri().path(), "admin key rejected");
        return ApiError::Forbidden.into_response();
    }
    next.run(req).await
}

pub async fn correlation_id_middleware(mut req: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static(CORRELATION_ID_HEADER);
    let correlation_id = match req.headers().get(&header_name) {
        Some(value) => match value.to_str() {
            Ok(value) => value.to_string(),
            Err(_) => {
                return ApiError::Validation("invalid correlation id".into()).into_response();
            }
        },
        None => Uuid::now_v7().to_string(),
    };

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        req.headers_mut().insert(header_name.clone(), value);
    }

    req.extensions_mut()
        .insert(CorrelationId(correlation_id.clone()));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(header_name, value);
    }
    response
}

pub async fn metrics_layer(req: Request<Body>, next: Next) -> Response {
    let start = std::time::Instant::now();
    let method = req.method().as_str().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let response = next.run(req).await;
    let status = response.status();
    observability::register_http_request(&method, &route, status, start.elapsed());
    response
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
