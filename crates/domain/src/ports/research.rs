use thiserror::Error;

use super::BoxFuture;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResearchPrompt {
    pub system: String,
    pub user: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResearchCompletion {
    pub content: String,
    pub model: String,
}

#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("research request timed out")]
    Timeout,
    #[error("research transport error: {0}")]
    Transport(String),
    #[error("research upstream returned status {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("research response decode error: {0}")]
    InvalidResponse(String),
}

pub trait ThreatResearch: Send + Sync {
    fn complete(
        &self,
        prompt: &ResearchPrompt,
    ) -> BoxFuture<'_, Result<ResearchCompletion, ResearchError>>;
}
