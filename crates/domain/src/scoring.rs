use std::sync::Arc;
use std::time::Duration;

use crate::ports::media::{
    FetchError, Frame, FrameClassifier, FrameDecoder, FrameExtractor, ResourceFetcher,
};

pub const BASE_SCORE: f64 = 0.05;
pub const KEYWORD_SCORE: f64 = 0.7;
/// Model probabilities are damped before they compete with the heuristics.
pub const MODEL_WEIGHT: f64 = 0.95;
pub const MODEL_FLAG_THRESHOLD: f64 = 0.6;

pub const FLAG_GIVEAWAY_KEYWORD: &str = "contains_giveaway_keyword";
pub const FLAG_SUSPECT_FRAME: &str = "model_suspect_frame";
pub const FLAG_SUSPECT_VIDEO_FRAMES: &str = "model_suspect_video_frames";

const SCAM_KEYWORDS: [&str; 2] = ["giveaway", "airdrop"];
const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];
const VIDEO_MARKERS: [&str; 3] = ["youtube.com", "youtu.be", ".mp4"];

pub fn has_scam_keyword(url: &str) -> bool {
    let lowered = url.to_lowercase();
    SCAM_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

pub fn is_image_url(url: &str) -> bool {
    let lowered = url.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|extension| lowered.ends_with(extension))
}

pub fn is_video_url(url: &str) -> bool {
    let lowered = url.to_lowercase();
    VIDEO_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Only http(s) URLs are handed to media tools.
pub fn is_http_url(url: &str) -> bool {
    let lowered = url.trim_start().to_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoreOutcome {
    pub score: f64,
    pub flags: Vec<String>,
    pub error: Option<String>,
}

impl ScoreOutcome {
    fn baseline() -> Self {
        Self {
            score: BASE_SCORE,
            flags: Vec::new(),
            error: None,
        }
    }

    fn raise(&mut self, candidate: f64) {
        self.score = self.score.max(candidate);
    }

    fn flag(&mut self, flag: &str) {
        if !self.flags.iter().any(|existing| existing == flag) {
            self.flags.push(flag.to_string());
        }
    }
}

#[derive(Clone, Debug)]
pub struct ScoringConfig {
    pub fetch_timeout: Duration,
    pub video_frame_count: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(15),
            video_frame_count: 4,
        }
    }
}

/// Combines the keyword heuristic and the frame classifier into one risk
/// score. Every step can only raise the running score.
#[derive(Clone)]
pub struct ScoreAggregator {
    fetcher: Arc<dyn ResourceFetcher>,
    decoder: Arc<dyn FrameDecoder>,
    classifier: Arc<dyn FrameClassifier>,
    extractor: Arc<dyn FrameExtractor>,
    config: ScoringConfig,
}

impl ScoreAggregator {
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        decoder: Arc<dyn FrameDecoder>,
        classifier: Arc<dyn FrameClassifier>,
        extractor: Arc<dyn FrameExtractor>,
        config: ScoringConfig,
    ) -> Self {
        Self {
            fetcher,
            decoder,
            classifier,
            extractor,
            config,
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub async fn score(&self, url: &str) -> ScoreOutcome {
        let mut outcome = ScoreOutcome::baseline();

        if has_scam_keyword(url) {
            outcome.raise(KEYWORD_SCORE);
            outcome.flag(FLAG_GIVEAWAY_KEYWORD);
        }

        if is_image_url(url) {
            let frame = match self.fetch_frame(url).await {
                Ok(frame) => frame,
                Err(error) => {
                    tracing::warn!(error = %error, "image scoring degraded");
                    outcome.error = Some(error);
                    return outcome;
                }
            };
            match self.mean_probability(vec![frame]).await {
                Ok(Some(mean)) => {
                    outcome.raise(mean * MODEL_WEIGHT);
                    if mean > MODEL_FLAG_THRESHOLD {
                        outcome.flag(FLAG_SUSPECT_FRAME);
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(error = %error, "image classifier failed");
                    outcome.error = Some(error);
                    return outcome;
                }
            }
        }

        if is_video_url(url) && !is_http_url(url) {
            tracing::warn!("video url is not http(s), skipping extraction");
            outcome.error = Some("video url must be http(s)".to_string());
        } else if is_video_url(url) {
            match self
                .extractor
                .extract(url, self.config.video_frame_count)
                .await
            {
                Ok(frames) => match self.mean_probability(frames).await {
                    Ok(Some(mean)) => {
                        outcome.raise(mean * MODEL_WEIGHT);
                        if mean > MODEL_FLAG_THRESHOLD {
                            outcome.flag(FLAG_SUSPECT_VIDEO_FRAMES);
                        }
                    }
                    Ok(None) => {
                        tracing::debug!("no video frames extracted");
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "video classifier failed");
                        outcome.error = Some(error);
                    }
                },
                Err(error) => {
                    tracing::warn!(error = %error, "video frame extraction failed");
                    outcome.error = Some(error.to_string());
                }
            }
        }

        outcome
    }

    async fn fetch_frame(&self, url: &str) -> Result<Frame, String> {
        let bytes = match tokio::time::timeout(self.config.fetch_timeout, self.fetcher.fetch(url))
            .await
        {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(error)) => return Err(format!("fetch failed: {error}")),
            Err(_) => return Err(format!("fetch failed: {}", FetchError::Timeout)),
        };
        let decoder = Arc::clone(&self.decoder);
        tokio::task::spawn_blocking(move || decoder.decode(&bytes))
            .await
            .map_err(|error| format!("decode task failed: {error}"))?
            .map_err(|error| error.to_string())
    }

    /// Decoding and inference are CPU-bound and run on the blocking pool.
    async fn mean_probability(&self, frames: Vec<Frame>) -> Result<Option<f64>, String> {
        if frames.is_empty() {
            return Ok(None);
        }
        let classifier = Arc::clone(&self.classifier);
        let probabilities = tokio::task::spawn_blocking(move || classifier.predict_frames(&frames))
            .await
            .map_err(|error| format!("classifier task failed: {error}"))?
            .map_err(|error| error.to_string())?;
        if probabilities.is_empty() {
            return Ok(None);
        }
        let sum: f64 = probabilities
            .iter()
            .map(|probability| probability.clamp(0.0, 1.0))
            .sum();
        Ok(Some(sum / probabilities.len() as f64))
    }
}
