use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::accounts::ScanRecord;
use crate::error::DomainError;
use crate::ports::accounts::AccountRepository;
use crate::util::now_ms;
use crate::webhook::{NotificationDispatcher, WebhookEventType, review_completed_payload};

const MAX_NOTES_LENGTH: usize = 4_000;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewVerdict {
    Confirmed,
    FalsePositive,
    Uncertain,
}

impl ReviewVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::FalsePositive => "false_positive",
            Self::Uncertain => "uncertain",
        }
    }
}

impl FromStr for ReviewVerdict {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "confirmed" => Ok(Self::Confirmed),
            "false_positive" => Ok(Self::FalsePositive),
            "uncertain" => Ok(Self::Uncertain),
            other => Err(DomainError::Validation(format!(
                "verdict must be one of confirmed, false_positive, uncertain (got {other})"
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub verdict: ReviewVerdict,
    pub notes: Option<String>,
    pub reviewed_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct ReviewDecision {
    pub scan_id: String,
    pub verdict: String,
    pub notes: Option<String>,
}

/// Applies moderator verdicts to flagged scans awaiting manual review.
#[derive(Clone)]
pub struct ReviewService {
    repository: Arc<dyn AccountRepository>,
    dispatcher: NotificationDispatcher,
}

impl ReviewService {
    pub fn new(repository: Arc<dyn AccountRepository>, dispatcher: NotificationDispatcher) -> Self {
        Self {
            repository,
            dispatcher,
        }
    }

    pub async fn pending(&self) -> DomainResult<Vec<ScanRecord>> {
        self.repository.list_pending_reviews().await
    }

    pub async fn decide(&self, decision: ReviewDecision) -> DomainResult<ScanRecord> {
        let scan_id = decision.scan_id.trim();
        if scan_id.is_empty() {
            return Err(DomainError::Validation("scan_id is required".into()));
        }
        let verdict: ReviewVerdict = decision.verdict.parse()?;
        let notes = decision
            .notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());
        if notes
            .as_ref()
            .is_some_and(|notes| notes.len() > MAX_NOTES_LENGTH)
        {
            return Err(DomainError::Validation("notes are too long".into()));
        }

        let outcome = ReviewOutcome {
            verdict,
            notes,
            reviewed_at_ms: now_ms(),
        };
        let record = self.repository.apply_review(scan_id, &outcome).await?;
        tracing::info!(
            scan_id = %record.scan_id,
            verdict = verdict.as_str(),
            "manual review recorded"
        );

        if let Some(account) = self.repository.get(&record.api_key).await?
            && let Some(webhook_url) = account.webhook_url
        {
            self.dispatcher.schedule(
                webhook_url,
                WebhookEventType::ReviewCompleted,
                review_completed_payload(&record, &outcome),
            );
        }

        Ok(record)
    }
}
