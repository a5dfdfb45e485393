use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::AppConfig;

const FALLBACK_DIRECTIVE: &str = "info";

/// `RUST_LOG` wins over the configured level when it is set.
pub fn env_filter(config: &AppConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_DIRECTIVE))
}

pub fn init_tracing(config: &AppConfig) -> Result<()> {
    let filter = env_filter(config);
    let result = if config.is_production() {
        fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .with_target(false)
            .try_init()
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .try_init()
    };
    result.map_err(|err| anyhow!("install tracing subscriber: {err}"))
}
