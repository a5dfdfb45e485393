use std::sync::Arc;
use std::time::Duration;

use axum::Json as AxumJson;
use axum::Router;
use axum::body::Body;
use axum::body::to_bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::routing::post;
use deepguard_domain::ports::BoxFuture;
use deepguard_domain::ports::media::{
    ClassifierError, DecodeError, ExtractionError, FetchError, Frame, FrameClassifier,
    FrameDecoder, FrameExtractor, ResourceFetcher,
};
use deepguard_domain::ports::research::{
    ResearchCompletion, ResearchError, ResearchPrompt, ThreatResearch,
};
use deepguard_infra::config::AppConfig;
use deepguard_infra::webhook_transport::ReqwestWebhookTransport;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower::ServiceExt;

use crate::observability;
use crate::routes;
use crate::state::{AppState, Collaborators};

const ADMIN_KEY: &str = "test-admin-secret";

fn test_config() -> AppConfig {
    AppConfig {
        app_env: "test".to_string(),
        port: 0,
        log_level: "info".to_string(),
        legacy_api_keys: "demo-key, partner-key".to_string(),
        rate_limit_per_min: 2,
        rate_limit_window_secs: 3600,
        admin_secret: ADMIN_KEY.to_string(),
        cors_allowed_origin: "http://localhost:3000".to_string(),
        fetch_timeout_ms: 2_000,
        video_frame_count: 4,
        ytdlp_bin: "yt-dlp".to_string(),
        ffmpeg_bin: "ffmpeg".to_string(),
        ffprobe_bin: "ffprobe".to_string(),
        webhook_timeout_ms: 2_000,
        webhook_max_attempts: 3,
        webhook_backoff_base_ms: 10,
        research_api_key: String::new(),
        research_base_url: "http://127.0.0.1:9".to_string(),
        research_model: "stub-model".to_string(),
        research_timeout_ms: 2_000,
        data_dir: "target/deepguard-test-data".to_string(),
    }
}

struct StubFetcher {
    status: Option<u16>,
}

impl ResourceFetcher for StubFetcher {
    fn fetch(&self, _url: &str) -> BoxFuture<'_, Result<Vec<u8>, FetchError>> {
        let result = match self.status {
            Some(status) => Err(FetchError::Status(status)),
            None => Ok(b"stub image bytes".to_vec()),
        };
        Box::pin(async move { result })
    }
}

struct SolidDecoder;

impl FrameDecoder for SolidDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<Frame, DecodeError> {
        Frame::filled(8, 8, [120, 120, 120]).ok_or_else(|| DecodeError("empty frame".into()))
    }
}

struct FixedClassifier(f64);

impl FrameClassifier for FixedClassifier {
    fn predict_frames(&self, frames: &[Frame]) -> Result<Vec<f64>, ClassifierError> {
        Ok(vec![self.0; frames.len()])
    }
}

struct NoVideo;

impl FrameExtractor for NoVideo {
    fn extract(
        &self,
        _url: &str,
        _frame_count: usize,
    ) -> BoxFuture<'_, Result<Vec<Frame>, ExtractionError>> {
        Box::pin(async { Err(ExtractionError::Unavailable("no video tools in tests".into())) })
    }
}

struct StubResearch {
    fail: bool,
}

impl ThreatResearch for StubResearch {
    fn complete(
        &self,
        prompt: &ResearchPrompt,
    ) -> BoxFuture<'_, Result<ResearchCompletion, ResearchError>> {
        let user = prompt.user.clone();
        let fail = self.fail;
        Box::pin(async move {
            if fail {
                return Err(ResearchError::Upstream {
                    status: 500,
                    message: "upstream exploded".into(),
                });
            }
            Ok(ResearchCompletion {
                content: format!("RISK LEVEL: LOW ({} chars reviewed)", user.len()),
                model: "stub-model".into(),
            })
        })
    }
}

fn collaborators(probability: f64) -> Collaborators {
    Collaborators {
        fetcher: Arc::new(StubFetcher { status: None }),
        decoder: Arc::new(SolidDecoder),
        classifier: Arc::new(FixedClassifier(probability)),
        extractor: Arc::new(NoVideo),
        transport: Arc::new(ReqwestWebhookTransport::new().expect("webhook client")),
        research: None,
    }
}

fn test_app() -> Router {
    test_app_with(test_config(), collaborators(0.1))
}

fn test_app_with(config: AppConfig, collaborators: Collaborators) -> Router {
    routes::router(AppState::with_collaborators(config, collaborators))
}

fn json_request(method: &str, uri: &str, headers: &[(&str, &str)], body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get_request(uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).expect("request")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&body).to_string())
        })
    };
    (status, headers, value)
}

async fn create_account(app: &Router, body: Value) -> String {
    let (status, _, body) = send(app, json_request("POST", "/v1/account/create", &[], body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body["api_key"].as_str().expect("api key").to_string()
}

type Received = Arc<Mutex<Vec<Value>>>;

async fn record_webhook(
    State(received): State<Received>,
    AxumJson(body): AxumJson<Value>,
) -> StatusCode {
    received.lock().await.push(body);
    StatusCode::OK
}

async fn spawn_webhook_receiver() -> (String, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/hook", post(record_webhook))
        .with_state(received.clone());
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind webhook stub");
    let addr = listener.local_addr().expect("webhook stub addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve webhook stub");
    });
    (format!("http://{addr}/hook"), received)
}

async fn wait_for_events(received: &Received, count: usize) -> Vec<Value> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let events = received.lock().await;
                if events.len() >= count {
                    return events.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("webhook events arrive")
}

fn event_names(events: &[Value]) -> Vec<String> {
    let mut names = events
        .iter()
        .filter_map(|event| event["event"].as_str().map(str::to_string))
        .collect::<Vec<_>>();
    names.sort();
    names
}

#[tokio::test]
async fn health_reports_environment() {
    let app = test_app();
    let (status, headers, body) = send(&app, get_request("/health", &[])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "test");
    assert!(headers.contains_key("x-request-id"));
    assert!(headers.contains_key("x-correlation-id"));
}

#[tokio::test]
async fn correlation_id_is_echoed() {
    let app = test_app();
    let (_, headers, _) = send(
        &app,
        get_request("/health", &[("x-correlation-id", "corr-scan-42")]),
    )
    .await;
    assert_eq!(
        headers
            .get("x-correlation-id")
            .and_then(|value| value.to_str().ok()),
        Some("corr-scan-42")
    );
}

#[tokio::test]
async fn create_account_defaults_to_free_tier() {
    let app = test_app();
    let (status, _, body) = send(
        &app,
        json_request(
            "POST",
            "/v1/account/create",
            &[],
            json!({ "email": "ops@example.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["api_key"].as_str().expect("key").starts_with("dfg_"));
    assert_eq!(body["email"], "ops@example.com");
    assert_eq!(body["tier"], "free");
    assert_eq!(body["scans_limit"], 10);

    let (status, _, body) = send(
        &app,
        json_request(
            "POST",
            "/v1/account/create",
            &[],
            json!({ "email": "big@example.com", "tier": "enterprise" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["scans_limit"], "unlimited");
}

#[tokio::test]
async fn create_account_rejects_bad_input() {
    let app = test_app();
    for payload in [
        json!({ "email": "ops@example.com", "tier": "platinum" }),
        json!({ "email": "not-an-email" }),
        json!({ "email": "ops@example.com", "webhook_url": "ftp://example.com/hook" }),
    ] {
        let (status, _, body) =
            send(&app, json_request("POST", "/v1/account/create", &[], payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(body["error"]["code"], "validation_error");
    }
}

#[tokio::test]
async fn free_tier_scans_until_quota_then_429() {
    let app = test_app();
    let api_key = create_account(&app, json!({ "email": "free@example.com" })).await;

    for expected_remaining in (0..10).rev() {
        let (status, _, body) = send(
            &app,
            json_request(
                "POST",
                "/v1/scan",
                &[("x-api-key", &api_key)],
                json!({ "url": "https://example.com/btc-giveaway", "source": "extension" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "body: {body}");
        assert_eq!(body["score"], 0.7);
        assert_eq!(body["flags"], json!(["contains_giveaway_keyword"]));
        assert_eq!(body["details"]["source"], "extension");
        assert_eq!(body["details"]["manual_review_pending"], false);
        assert_eq!(body["details"]["scans_remaining"], expected_remaining);
        assert!(body["details"]["scan_id"].as_str().is_some());
    }

    let (status, _, body) = send(
        &app,
        json_request(
            "POST",
            "/v1/scan",
            &[("x-api-key", &api_key)],
            json!({ "url": "https://example.com/btc-giveaway" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "quota_exceeded");
    assert!(
        body["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("10 scans"))
    );

    let (status, _, stats) = send(
        &app,
        get_request("/v1/account/stats", &[("x-api-key", &api_key)]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["scans_used"], 10);
    assert_eq!(stats["scans_remaining"], 0);
    assert_eq!(stats["total_scans"], 10);
}

#[tokio::test]
async fn scan_rejects_missing_and_unknown_keys() {
    let app = test_app();
    let cases: [(&[(&str, &str)], &str); 3] = [
        (&[], "invalid API key format"),
        (&[("x-api-key", "demo-key")], "invalid API key format"),
        (&[("x-api-key", "dfg_not_a_real_key")], "API key not found"),
    ];
    for (headers, message) in cases {
        let (status, _, body) = send(
            &app,
            json_request(
                "POST",
                "/v1/scan",
                headers,
                json!({ "url": "https://example.com" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "unauthorized");
        assert_eq!(body["error"]["message"], message);
    }
}

#[tokio::test]
async fn scan_requires_url_after_key_check() {
    let app = test_app();
    let api_key = create_account(&app, json!({ "email": "u@example.com" })).await;

    let (status, _, body) = send(
        &app,
        json_request("POST", "/v1/scan", &[("x-api-key", &api_key)], json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("url is required"))
    );

    let (_, _, stats) = send(
        &app,
        get_request("/v1/account/stats", &[("x-api-key", &api_key)]),
    )
    .await;
    assert_eq!(stats["scans_used"], 0);
}

#[tokio::test]
async fn failed_image_fetch_degrades_to_heuristic_score() {
    let mut collaborators = collaborators(0.99);
    collaborators.fetcher = Arc::new(StubFetcher { status: Some(404) });
    let app = test_app_with(test_config(), collaborators);
    let api_key = create_account(&app, json!({ "email": "u@example.com" })).await;

    let (status, _, body) = send(
        &app,
        json_request(
            "POST",
            "/v1/scan",
            &[("x-api-key", &api_key)],
            json!({ "url": "https://cdn.example.com/airdrop.png" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 0.7);
    assert!(
        body["details"]["error"]
            .as_str()
            .is_some_and(|error| error.contains("fetch failed"))
    );
    assert_eq!(body["details"]["scans_remaining"], 9);
}

#[tokio::test]
async fn flagged_pro_scan_notifies_and_goes_through_review() {
    let (webhook_url, received) = spawn_webhook_receiver().await;
    let app = test_app_with(test_config(), collaborators(0.9));
    let api_key = create_account(
        &app,
        json!({ "email": "pro@example.com", "tier": "pro", "webhook_url": webhook_url }),
    )
    .await;

    let (status, _, scan) = send(
        &app,
        json_request(
            "POST",
            "/v1/scan",
            &[("x-api-key", &api_key)],
            json!({ "url": "https://cdn.example.com/elon.jpg" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {scan}");
    assert_eq!(scan["flags"], json!(["model_suspect_frame"]));
    assert_eq!(scan["details"]["manual_review_pending"], true);
    assert_eq!(scan["details"]["scans_remaining"], 499);
    let scan_id = scan["details"]["scan_id"]
        .as_str()
        .expect("scan id")
        .to_string();

    let events = wait_for_events(&received, 2).await;
    assert_eq!(event_names(&events), vec!["scan.completed", "scan.flagged"]);
    let flagged = events
        .iter()
        .find(|event| event["event"] == "scan.flagged")
        .expect("flagged event");
    assert_eq!(flagged["data"]["scan_id"], scan_id.as_str());
    assert_eq!(flagged["data"]["severity"], "high");
    assert_eq!(flagged["data"]["manual_review_pending"], true);

    let (status, _, pending) = send(
        &app,
        get_request("/admin/pending-reviews", &[("x-admin-key", ADMIN_KEY)]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["count"], 1);
    assert_eq!(pending["pending_reviews"][0]["scan_id"], scan_id.as_str());
    assert!(pending["pending_reviews"][0].get("api_key").is_none());

    let decision = json!({ "scan_id": scan_id, "verdict": "confirmed", "notes": "  known deepfake  " });
    let (status, _, record) = send(
        &app,
        json_request(
            "POST",
            "/admin/review-decision",
            &[("x-admin-key", ADMIN_KEY)],
            decision.clone(),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {record}");
    assert_eq!(record["manual_review_pending"], false);
    assert_eq!(record["review"]["verdict"], "confirmed");
    assert_eq!(record["review"]["notes"], "known deepfake");

    let events = wait_for_events(&received, 3).await;
    let review = events
        .iter()
        .find(|event| event["event"] == "review.completed")
        .expect("review event");
    assert_eq!(review["data"]["reviewed_verdict"], "confirmed");
    assert_eq!(review["data"]["reviewer_notes"], "known deepfake");

    let (status, _, _) = send(
        &app,
        json_request(
            "POST",
            "/admin/review-decision",
            &[("x-admin-key", ADMIN_KEY)],
            decision,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, _, pending) = send(
        &app,
        get_request("/admin/pending-reviews", &[("x-admin-key", ADMIN_KEY)]),
    )
    .await;
    assert_eq!(pending["count"], 0);
}

#[tokio::test]
async fn review_decision_validates_scan_and_verdict() {
    let app = test_app();
    let (status, _, _) = send(
        &app,
        json_request(
            "POST",
            "/admin/review-decision",
            &[("x-admin-key", ADMIN_KEY)],
            json!({ "scan_id": "missing", "verdict": "confirmed" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, body) = send(
        &app,
        json_request(
            "POST",
            "/admin/review-decision",
            &[("x-admin-key", ADMIN_KEY)],
            json!({ "scan_id": "missing", "verdict": "maybe" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("verdict"))
    );
}

#[tokio::test]
async fn admin_routes_require_admin_key() {
    let app = test_app();
    let (status, _, _) = send(&app, get_request("/admin/pending-reviews", &[])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = send(
        &app,
        get_request("/admin/pending-reviews", &[("x-admin-key", "guess")]),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");
}

#[tokio::test]
async fn empty_admin_secret_denies_everyone() {
    let mut config = test_config();
    config.admin_secret = String::new();
    let app = test_app_with(config, collaborators(0.1));
    let (status, _, _) = send(
        &app,
        get_request("/admin/pending-reviews", &[("x-admin-key", ADMIN_KEY)]),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn webhook_update_requires_known_key_and_http_url() {
    let app = test_app();
    let api_key = create_account(&app, json!({ "email": "hooks@example.com" })).await;

    let (status, _, body) = send(
        &app,
        json_request(
            "POST",
            "/v1/account/webhook",
            &[("x-api-key", &api_key)],
            json!({ "webhook_url": "https://hooks.example.com/deepguard" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["webhook_url"], "https://hooks.example.com/deepguard");

    let (status, _, _) = send(
        &app,
        json_request(
            "POST",
            "/v1/account/webhook",
            &[("x-api-key", &api_key)],
            json!({ "webhook_url": "javascript:alert(1)" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(
        &app,
        json_request(
            "POST",
            "/v1/account/webhook",
            &[("x-api-key", "dfg_unknown")],
            json!({ "webhook_url": "https://hooks.example.com/deepguard" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn stats_reject_unknown_key() {
    let app = test_app();
    let (status, _, _) = send(&app, get_request("/v1/account/stats", &[])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, body) = send(
        &app,
        get_request("/v1/account/stats", &[("x-api-key", "dfg_unknown")]),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "API key not found");
}

#[tokio::test]
async fn legacy_detect_is_rate_limited_per_key() {
    let app = test_app();
    let detect = |key: &'static str| {
        json_request(
            "POST",
            "/detect",
            &[("x-api-key", key)],
            json!({ "url": "https://example.com/free-airdrop" }),
        )
    };

    let (status, headers, body) = send(&app, detect("demo-key")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 0.7);
    assert!(body["details"].get("scan_id").is_none());
    assert_eq!(
        headers
            .get("x-ratelimit-remaining")
            .and_then(|value| value.to_str().ok()),
        Some("1")
    );

    let (status, _, _) = send(&app, detect("demo-key")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, headers, body) = send(&app, detect("demo-key")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "rate_limited");
    assert_eq!(
        headers
            .get("x-ratelimit-remaining")
            .and_then(|value| value.to_str().ok()),
        Some("0")
    );

    let (status, _, _) = send(&app, detect("partner-key")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn legacy_detect_rejects_unknown_key() {
    let app = test_app();
    let (status, _, body) = send(
        &app,
        json_request(
            "POST",
            "/detect",
            &[("x-api-key", "not-listed")],
            json!({ "url": "https://example.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "invalid or missing API key");
}

#[tokio::test]
async fn research_is_unavailable_without_backend() {
    let app = test_app();
    let (status, _, body) = send(
        &app,
        json_request(
            "POST",
            "/v1/research/wallet",
            &[],
            json!({ "address": "0xabc" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "service_unavailable");
}

#[tokio::test]
async fn research_reports_success_and_upstream_failure() {
    let mut ok = collaborators(0.1);
    ok.research = Some(Arc::new(StubResearch { fail: false }));
    let app = test_app_with(test_config(), ok);

    let (status, _, body) = send(
        &app,
        json_request(
            "POST",
            "/v1/research/endorsement",
            &[],
            json!({ "celebrity_name": "Elon Musk", "crypto_project": "DogeMax" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["model"], "stub-model");
    assert_eq!(body["celebrity"], "Elon Musk");
    assert_eq!(body["project"], "DogeMax");
    assert!(
        body["analysis"]
            .as_str()
            .is_some_and(|analysis| analysis.starts_with("RISK LEVEL"))
    );

    let (status, _, body) = send(
        &app,
        json_request("POST", "/v1/research/text", &[], json!({ "text": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");

    let mut failing = collaborators(0.1);
    failing.research = Some(Arc::new(StubResearch { fail: true }));
    let app = test_app_with(test_config(), failing);
    let (status, _, body) = send(
        &app,
        json_request(
            "POST",
            "/v1/research/analyze-scam",
            &[],
            json!({ "url": "https://example.com/claim" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert_eq!(body["url"], "https://example.com/claim");
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|error| error.contains("500"))
    );
}

#[tokio::test]
async fn seed_and_label_use_data_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    tokio::fs::write(
        dir.path().join("seed_urls.txt"),
        "https://a.example/giveaway\n\nhttps://b.example\n",
    )
    .await
    .expect("seed file");
    let mut config = test_config();
    config.data_dir = dir.path().to_string_lossy().to_string();
    let app = test_app_with(config, collaborators(0.1));

    let (status, _, body) = send(&app, get_request("/seed", &[])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["urls"],
        json!(["https://a.example/giveaway", "https://b.example"])
    );

    let (status, _, body) = send(
        &app,
        json_request(
            "POST",
            "/label",
            &[],
            json!({ "url": "https://a.example/giveaway", "label": "scam" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let written = tokio::fs::read_to_string(dir.path().join("labels.csv"))
        .await
        .expect("labels file");
    assert_eq!(
        written,
        "url,label,reporter\r\nhttps://a.example/giveaway,scam,anonymous\r\n"
    );

    let (status, _, _) = send(
        &app,
        json_request("POST", "/label", &[], json!({ "url": "", "label": "scam" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn metrics_endpoint_is_exposed() {
    let _ = observability::init_metrics();
    observability::register_scan("metered", true, false);
    let app = test_app();

    let (status, _, _) = send(&app, get_request("/health", &[])).await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request("/metrics", &[]))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("text/plain"))
    );
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = String::from_utf8(body.to_vec()).expect("metrics body");
    assert!(body.contains("deepguard_api_http_requests_total"));
    assert!(body.contains("deepguard_api_scans_total"));
}

#[tokio::test]
async fn state_builds_outbound_clients_from_config() {
    let state = AppState::new(test_config()).expect("state without research");
    assert!(!state.research.is_configured());

    let mut config = test_config();
    config.research_api_key = "research-key".to_string();
    let state = AppState::new(config).expect("state with research");
    assert!(state.research.is_configured());
}
