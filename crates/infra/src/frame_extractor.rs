use std::io::ErrorKind;
use std::path::Path;
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;

use deepguard_domain::ports::BoxFuture;
use deepguard_domain::ports::media::{ExtractionError, Frame, FrameDecoder, FrameExtractor};
use deepguard_domain::scoring::is_http_url;
use tokio::process::Command;

use crate::config::AppConfig;
use crate::media::ImageFrameDecoder;

const YTDLP_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/mp4/best";
const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(180);
const STDERR_TAIL_CHARS: usize = 400;

/// Pulls frames out of a remote video with `yt-dlp`, `ffprobe` and `ffmpeg`.
/// Child processes are killed if the scoring future is dropped.
#[derive(Clone)]
pub struct CommandFrameExtractor {
    ytdlp_bin: String,
    ffprobe_bin: String,
    ffmpeg_bin: String,
    timeout: Duration,
    decoder: Arc<dyn FrameDecoder>,
}

impl CommandFrameExtractor {
    pub fn new(
        ytdlp_bin: impl Into<String>,
        ffprobe_bin: impl Into<String>,
        ffmpeg_bin: impl Into<String>,
    ) -> Self {
        Self {
            ytdlp_bin: ytdlp_bin.into(),
            ffprobe_bin: ffprobe_bin.into(),
            ffmpeg_bin: ffmpeg_bin.into(),
            timeout: DEFAULT_EXTRACTION_TIMEOUT,
            decoder: Arc::new(ImageFrameDecoder),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.ytdlp_bin.clone(),
            config.ffprobe_bin.clone(),
            config.ffmpeg_bin.clone(),
        )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, url: &str, frame_count: usize) -> Result<Vec<Frame>, ExtractionError> {
        let workdir = tempfile::tempdir()
            .map_err(|err| ExtractionError::Failed(format!("create temp dir: {err}")))?;
        let video = workdir.path().join("video.mp4");

        let video_arg = video.to_string_lossy().to_string();
        let output = run_tool(
            &self.ytdlp_bin,
            &[
                "-f",
                YTDLP_FORMAT,
                "--merge-output-format",
                "mp4",
                "--no-playlist",
                "-o",
                &video_arg,
                "--",
                url,
            ],
        )
        .await?;
        ensure_success(&self.ytdlp_bin, &output)?;
        if !video.exists() {
            return Err(ExtractionError::Failed(
                "downloader produced no video file".into(),
            ));
        }

        let duration = self.probe_duration(&video).await;
        let timestamps = evenly_spaced_timestamps(duration, frame_count);

        let mut frames = Vec::with_capacity(timestamps.len());
        for (index, timestamp) in timestamps.into_iter().enumerate() {
            let target = workdir.path().join(format!("frame_{index:03}.png"));
            match self.grab_frame(&video, timestamp, &target).await {
                Ok(frame) => frames.push(frame),
                Err(err) => {
                    tracing::debug!(index, timestamp, error = %err, "skipping video frame");
                }
            }
        }
        Ok(frames)
    }

    async fn probe_duration(&self, video: &Path) -> Option<f64> {
        let video_arg = video.to_string_lossy().to_string();
        let output = run_tool(
            &self.ffprobe_bin,
            &[
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
                &video_arg,
            ],
        )
        .await
        .ok()?;
        if !output.status.success() {
            return None;
        }
        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }

    async fn grab_frame(
        &self,
        video: &Path,
        timestamp: f64,
        target: &Path,
    ) -> Result<Frame, ExtractionError> {
        let video_arg = video.to_string_lossy().to_string();
        let target_arg = target.to_string_lossy().to_string();
        let seek = format!("{timestamp:.3}");
        let output = run_tool(
            &self.ffmpeg_bin,
            &[
                "-v",
                "error",
                "-ss",
                &seek,
                "-i",
                &video_arg,
                "-frames:v",
                "1",
                "-y",
                &target_arg,
            ],
        )
        .await?;
        ensure_success(&self.ffmpeg_bin, &output)?;

        let bytes = tokio::fs::read(target)
            .await
            .map_err(|err| ExtractionError::Failed(format!("read frame: {err}")))?;
        let decoder = Arc::clone(&self.decoder);
        tokio::task::spawn_blocking(move || decoder.decode(&bytes))
            .await
            .map_err(|err| ExtractionError::Failed(format!("decode task: {err}")))?
            .map_err(|err| ExtractionError::Failed(err.to_string()))
    }
}

impl FrameExtractor for CommandFrameExtractor {
    fn extract(
        &self,
        url: &str,
        frame_count: usize,
    ) -> BoxFuture<'_, Result<Vec<Frame>, ExtractionError>> {
        let url = url.to_string();
        Box::pin(async move {
            if frame_count == 0 {
                return Ok(Vec::new());
            }
            if !is_http_url(&url) {
                return Err(ExtractionError::Failed("unsupported url scheme".into()));
            }
            match tokio::time::timeout(self.timeout, self.run(&url, frame_count)).await {
                Ok(result) => result,
                Err(_) => Err(ExtractionError::Failed("frame extraction timed out".into())),
            }
        })
    }
}

async fn run_tool(binary: &str, args: &[&str]) -> Result<Output, ExtractionError> {
    Command::new(binary)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|err| match err.kind() {
            ErrorKind::NotFound => ExtractionError::Unavailable(format!("{binary} not found")),
            _ => ExtractionError::Failed(format!("spawn {binary}: {err}")),
        })
}

fn ensure_success(binary: &str, output: &Output) -> Result<(), ExtractionError> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let tail: String = stderr
        .chars()
        .rev()
        .take(STDERR_TAIL_CHARS)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    Err(ExtractionError::Failed(format!(
        "{binary} exited with {}: {}",
        output.status,
        tail.trim()
    )))
}

fn parse_duration(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}

/// `count` seek positions at `i * duration / count`. Without a known
/// duration a single frame at the start is taken.
pub fn evenly_spaced_timestamps(duration: Option<f64>, count: usize) -> Vec<f64> {
    match duration {
        Some(duration) if count > 0 => (0..count)
            .map(|index| index as f64 * duration / count as f64)
            .collect(),
        None if count > 0 => vec![0.0],
        _ => Vec::new(),
    }
}
