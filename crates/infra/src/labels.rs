use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::config::AppConfig;

pub const LABELS_HEADER: [&str; 3] = ["url", "label", "reporter"];
pub const ANONYMOUS_REPORTER: &str = "anonymous";

#[derive(Debug, Error)]
pub enum LabelStoreError {
    #[error("label store io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelEntry {
    pub url: String,
    pub label: String,
    pub reporter: Option<String>,
}

/// Flat-file helpers for the labeling workflow: a seed URL list and an
/// append-only CSV of human labels.
#[derive(Clone)]
pub struct LabelStore {
    seed_file: PathBuf,
    labels_file: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl LabelStore {
    pub fn new(seed_file: impl Into<PathBuf>, labels_file: impl Into<PathBuf>) -> Self {
        Self {
            seed_file: seed_file.into(),
            labels_file: labels_file.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.seed_file(), config.labels_file())
    }

    pub async fn seed_urls(&self) -> Result<Vec<String>, LabelStoreError> {
        let raw = match tokio::fs::read_to_string(&self.seed_file).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub async fn append(&self, entry: &LabelEntry) -> Result<(), LabelStoreError> {
        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.labels_file.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let created = !tokio::fs::try_exists(&self.labels_file).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.labels_file)
            .await?;

        let mut buffer = String::new();
        if created {
            buffer.push_str(&csv_row(&LABELS_HEADER));
        }
        let reporter = entry
            .reporter
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(ANONYMOUS_REPORTER);
        buffer.push_str(&csv_row(&[entry.url.as_str(), entry.label.as_str(), reporter]));

        file.write_all(buffer.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(fields: &[&str]) -> String {
    let mut row = fields
        .iter()
        .map(|field| csv_field(field))
        .collect::<Vec<_>>()
        .join(",");
    row.push_str("\r\n");
    row
}
