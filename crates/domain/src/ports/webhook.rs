use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use super::BoxFuture;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("webhook request timed out")]
    Timeout,
    #[error("webhook transport error: {0}")]
    Transport(String),
}

/// Posts a JSON body to a customer endpoint and reports the response status.
pub trait WebhookTransport: Send + Sync {
    fn post_json(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> BoxFuture<'_, Result<u16, TransportError>>;
}
