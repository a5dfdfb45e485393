use std::time::{Duration, Instant};

use deepguard_domain::ports::BoxFuture;
use deepguard_domain::ports::webhook::{TransportError, WebhookTransport};
use deepguard_domain::webhook::{USER_AGENT, is_accepted_status};
use metrics::{counter, histogram};
use serde_json::Value;

const WEBHOOK_ATTEMPT_TOTAL: &str = "deepguard_webhook_attempt_total";
const WEBHOOK_ATTEMPT_DURATION_MS: &str = "deepguard_webhook_attempt_duration_ms";

#[derive(Clone)]
pub struct ReqwestWebhookTransport {
    http: reqwest::Client,
}

impl ReqwestWebhookTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http })
    }
}

impl WebhookTransport for ReqwestWebhookTransport {
    fn post_json(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> BoxFuture<'_, Result<u16, TransportError>> {
        let url = url.to_string();
        let body = body.clone();
        Box::pin(async move {
            let started = Instant::now();
            let result = self
                .http
                .post(&url)
                .timeout(timeout)
                .json(&body)
                .send()
                .await
                .map(|response| response.status().as_u16())
                .map_err(|err| {
                    if err.is_timeout() {
                        TransportError::Timeout
                    } else {
                        TransportError::Transport(err.to_string())
                    }
                });
            record_attempt(&result, started.elapsed().as_secs_f64() * 1000.0);
            result
        })
    }
}

fn record_attempt(result: &Result<u16, TransportError>, duration_ms: f64) {
    let (outcome, status_code) = match result {
        Ok(status) if is_accepted_status(*status) => ("success", status.to_string()),
        Ok(status) => ("rejected", status.to_string()),
        Err(TransportError::Timeout) => ("timeout", "none".to_string()),
        Err(TransportError::Transport(_)) => ("transport_error", "none".to_string()),
    };

    counter!(
        WEBHOOK_ATTEMPT_TOTAL,
        "result" => outcome,
        "status_code" => status_code.clone()
    )
    .increment(1);

    histogram!(
        WEBHOOK_ATTEMPT_DURATION_MS,
        "result" => outcome,
        "status_code" => status_code
    )
    .record(duration_ms.max(0.0));
}
