use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::accounts::ScanRecord;
use crate::ports::webhook::{TransportError, WebhookTransport};
use crate::reviews::ReviewOutcome;
use crate::util::{format_ms_rfc3339, now_ms};

pub const USER_AGENT: &str = "DeepfakeGuard-Webhook/1.0";
pub const ACCEPTED_STATUS_CODES: [u16; 4] = [200, 201, 202, 204];
pub const HIGH_SEVERITY_THRESHOLD: f64 = 0.8;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum WebhookEventType {
    #[serde(rename = "scan.completed")]
    ScanCompleted,
    #[serde(rename = "scan.flagged")]
    ScanFlagged,
    #[serde(rename = "review.completed")]
    ReviewCompleted,
}

impl WebhookEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScanCompleted => "scan.completed",
            Self::ScanFlagged => "scan.flagged",
            Self::ReviewCompleted => "review.completed",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WebhookEnvelope {
    pub event: WebhookEventType,
    pub timestamp: String,
    pub data: Value,
}

impl WebhookEnvelope {
    pub fn new(event: WebhookEventType, data: Value) -> Self {
        Self {
            event,
            timestamp: format_ms_rfc3339(now_ms()),
            data,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WebhookDeliveryResult {
    Success,
    RetryableFailure,
    Exhausted,
}

impl WebhookDeliveryResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::RetryableFailure => "retryable_failure",
            Self::Exhausted => "exhausted",
        }
    }
}

pub fn is_accepted_status(status: u16) -> bool {
    ACCEPTED_STATUS_CODES.contains(&status)
}

/// Delay slept after the zero-based `attempt` failed: `base * 2^attempt`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let multiplier = 1u32 << attempt.min(16);
    base.saturating_mul(multiplier)
}

pub fn scan_completed_payload(record: &ScanRecord) -> Value {
    json!({
        "scan_id": record.scan_id,
        "url": record.url,
        "score": record.score,
        "flags": record.flags,
        "is_flagged": record.flagged,
    })
}

pub fn scan_flagged_payload(record: &ScanRecord) -> Value {
    let severity = if record.score > HIGH_SEVERITY_THRESHOLD {
        "high"
    } else {
        "medium"
    };
    json!({
        "scan_id": record.scan_id,
        "url": record.url,
        "score": record.score,
        "flags": record.flags,
        "severity": severity,
        "manual_review_pending": true,
    })
}

pub fn review_completed_payload(record: &ScanRecord, review: &ReviewOutcome) -> Value {
    json!({
        "scan_id": record.scan_id,
        "original_score": record.score,
        "reviewed_verdict": review.verdict.as_str(),
        "reviewer_notes": review.notes,
    })
}

#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

/// Best-effort webhook delivery. Failures end up in logs only.
#[derive(Clone)]
pub struct NotificationDispatcher {
    transport: Arc<dyn WebhookTransport>,
    config: DispatcherConfig,
}

impl NotificationDispatcher {
    /// `max_attempts` below one is raised to one.
    pub fn new(transport: Arc<dyn WebhookTransport>, mut config: DispatcherConfig) -> Self {
        config.max_attempts = config.max_attempts.max(1);
        Self { transport, config }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub async fn deliver(&self, endpoint: &str, event: WebhookEventType, data: Value) -> bool {
        self.deliver_with_attempts(endpoint, event, data, self.config.max_attempts)
            .await
    }

    pub async fn deliver_with_attempts(
        &self,
        endpoint: &str,
        event: WebhookEventType,
        data: Value,
        max_attempts: u32,
    ) -> bool {
        let max_attempts = max_attempts.max(1);
        let body = match serde_json::to_value(WebhookEnvelope::new(event, data)) {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(event = event.as_str(), error = %err, "webhook payload encode failed");
                return false;
            }
        };

        for attempt in 0..max_attempts {
            let result = tokio::time::timeout(
                self.config.timeout,
                self.transport.post_json(endpoint, &body, self.config.timeout),
            )
            .await
            .unwrap_or(Err(TransportError::Timeout));

            match result {
                Ok(status) if is_accepted_status(status) => {
                    tracing::info!(
                        event = event.as_str(),
                        attempt = attempt + 1,
                        status,
                        "webhook delivered"
                    );
                    return true;
                }
                Ok(status) => {
                    tracing::warn!(
                        event = event.as_str(),
                        attempt = attempt + 1,
                        status,
                        result = WebhookDeliveryResult::RetryableFailure.as_str(),
                        "webhook rejected"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        event = event.as_str(),
                        attempt = attempt + 1,
                        error = %err,
                        result = WebhookDeliveryResult::RetryableFailure.as_str(),
                        "webhook attempt failed"
                    );
                }
            }

            if attempt + 1 < max_attempts {
                tokio::time::sleep(backoff_delay(self.config.backoff_base, attempt)).await;
            }
        }

        tracing::error!(
            event = event.as_str(),
            attempts = max_attempts,
            result = WebhookDeliveryResult::Exhausted.as_str(),
            "webhook delivery gave up"
        );
        false
    }

    /// Runs delivery on its own task; the caller never waits for it.
    pub fn schedule(
        &self,
        endpoint: String,
        event: WebhookEventType,
        data: Value,
    ) -> tokio::task::JoinHandle<bool> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.deliver(&endpoint, event, data).await })
    }
}
