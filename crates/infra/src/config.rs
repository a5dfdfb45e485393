use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_env: String,
    pub port: u16,
    pub log_level: String,
    pub legacy_api_keys: String,
    pub rate_limit_per_min: u32,
    pub rate_limit_window_secs: u64,
    pub admin_secret: String,
    pub cors_allowed_origin: String,
    pub fetch_timeout_ms: u64,
    pub video_frame_count: usize,
    pub ytdlp_bin: String,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
    pub webhook_timeout_ms: u64,
    pub webhook_max_attempts: u32,
    pub webhook_backoff_base_ms: u64,
    pub research_api_key: String,
    pub research_base_url: String,
    pub research_model: String,
    pub research_timeout_ms: u64,
    pub data_dir: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let cfg = config::Config::builder()
            .set_default("app_env", "development")?
            .set_default("port", 8000)?
            .set_default("log_level", "info")?
            .set_default("legacy_api_keys", "demo-key")?
            .set_default("rate_limit_per_min", 60)?
            .set_default("rate_limit_window_secs", 60)?
            .set_default("admin_secret", "")?
            .set_default("cors_allowed_origin", "http://localhost:3000")?
            .set_default("fetch_timeout_ms", 15_000)?
            .set_default("video_frame_count", 4)?
            .set_default("ytdlp_bin", "yt-dlp")?
            .set_default("ffmpeg_bin", "ffmpeg")?
            .set_default("ffprobe_bin", "ffprobe")?
            .set_default("webhook_timeout_ms", 10_000)?
            .set_default("webhook_max_attempts", 3)?
            .set_default("webhook_backoff_base_ms", 1_000)?
            .set_default("research_api_key", "")?
            .set_default("research_base_url", "https://api.perplexity.ai")?
            .set_default("research_model", "llama-3.1-sonar-small-128k-online")?
            .set_default("research_timeout_ms", 30_000)?
            .set_default("data_dir", "data")?
            .add_source(config::Environment::default().separator("__"))
            .build()?;
        cfg.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn is_test(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("test")
    }

    pub fn legacy_keys(&self) -> Vec<String> {
        self.legacy_api_keys
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn research_enabled(&self) -> bool {
        !self.research_api_key.trim().is_empty()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_millis(self.webhook_timeout_ms)
    }

    pub fn webhook_backoff_base(&self) -> Duration {
        Duration::from_millis(self.webhook_backoff_base_ms)
    }

    pub fn research_timeout(&self) -> Duration {
        Duration::from_millis(self.research_timeout_ms)
    }

    pub fn seed_file(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("seed_urls.txt")
    }

    pub fn labels_file(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("labels.csv")
    }
}
