use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid tier: {0}")]
    InvalidTier(String),
    #[error(transparent)]
    Auth(#[from] AuthFailure),
    #[error("monthly scan limit reached ({limit} scans). Please upgrade your plan.")]
    QuotaExceeded { limit: u64 },
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

/// Reasons an API key is refused before any quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("invalid API key format")]
    MalformedKey,
    #[error("API key not found")]
    UnknownKey,
    #[error("API key has been deactivated")]
    Deactivated,
}

impl AuthFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedKey => "malformed_key",
            Self::UnknownKey => "unknown_key",
            Self::Deactivated => "deactivated",
        }
    }
}
