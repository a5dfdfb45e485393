use serde::Serialize;

use crate::DomainResult;
use crate::accounts::{AccountService, RecordedScan, ScanOutcome};
use crate::error::{AuthFailure, DomainError};
use crate::scoring::{ScoreAggregator, ScoreOutcome};
use crate::tiers::Quota;
use crate::webhook::{
    NotificationDispatcher, WebhookEventType, scan_completed_payload, scan_flagged_payload,
};

#[derive(Clone, Debug)]
pub struct ScanRequest {
    pub url: String,
    pub source: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ScanResponse {
    pub score: f64,
    pub flags: Vec<String>,
    pub details: ScanDetails,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ScanDetails {
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_review_pending: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scans_remaining: Option<Quota>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanResponse {
    /// Response for callers that are not metered (the static-key path).
    pub fn unmetered(outcome: ScoreOutcome, source: Option<String>) -> Self {
        Self {
            score: outcome.score,
            flags: outcome.flags,
            details: ScanDetails {
                source,
                scan_id: None,
                manual_review_pending: None,
                scans_remaining: None,
                error: outcome.error,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdmissionState {
    Unauthenticated,
    Validated,
    Scored,
    Recorded,
    NotifyScheduled,
    Responded,
    Rejected(&'static str),
}

impl AdmissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Validated => "validated",
            Self::Scored => "scored",
            Self::Recorded => "recorded",
            Self::NotifyScheduled => "notify_scheduled",
            Self::Responded => "responded",
            Self::Rejected(reason) => *reason,
        }
    }
}

/// Validates, scores, meters and notifies for one metered scan request.
#[derive(Clone)]
pub struct AdmissionController {
    accounts: AccountService,
    aggregator: ScoreAggregator,
    dispatcher: NotificationDispatcher,
}

impl AdmissionController {
    pub fn new(
        accounts: AccountService,
        aggregator: ScoreAggregator,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            accounts,
            aggregator,
            dispatcher,
        }
    }

    pub async fn admit(
        &self,
        api_key: Option<&str>,
        request: ScanRequest,
    ) -> DomainResult<ScanResponse> {
        let mut trace = vec![AdmissionState::Unauthenticated];
        self.admit_traced(api_key, request, &mut trace).await
    }

    /// Same as [`admit`](Self::admit), recording every state visited.
    async fn admit_traced(
        &self,
        api_key: Option<&str>,
        request: ScanRequest,
        trace: &mut Vec<AdmissionState>,
    ) -> DomainResult<ScanResponse> {
        let account = match self.accounts.validate(api_key).await {
            Ok(account) => account,
            Err(err) => {
                transition(trace, AdmissionState::Rejected(rejection_reason(&err)));
                return Err(err);
            }
        };
        transition(trace, AdmissionState::Validated);

        let url = request.url.trim().to_string();
        if url.is_empty() {
            transition(trace, AdmissionState::Rejected("missing_url"));
            return Err(DomainError::Validation("url is required".into()));
        }

        let outcome = self.aggregator.score(&url).await;
        transition(trace, AdmissionState::Scored);

        let scan = ScanOutcome {
            url,
            score: outcome.score,
            flags: outcome.flags.clone(),
        };
        let recorded = match self.accounts.increment(&account.api_key, &scan).await {
            Ok(recorded) => recorded,
            Err(err) => {
                transition(trace, AdmissionState::Rejected(rejection_reason(&err)));
                return Err(err);
            }
        };
        let Some(RecordedScan { record, account }) = recorded else {
            transition(trace, AdmissionState::Rejected("unknown_key"));
            return Err(AuthFailure::UnknownKey.into());
        };
        transition(trace, AdmissionState::Recorded);

        // Entered with or without a webhook; scheduling nothing is a valid plan.
        if let Some(webhook_url) = account.webhook_url.clone() {
            self.dispatcher.schedule(
                webhook_url.clone(),
                WebhookEventType::ScanCompleted,
                scan_completed_payload(&record),
            );
            if record.flagged {
                self.dispatcher.schedule(
                    webhook_url,
                    WebhookEventType::ScanFlagged,
                    scan_flagged_payload(&record),
                );
            }
        }
        transition(trace, AdmissionState::NotifyScheduled);

        let response = ScanResponse {
            score: record.score,
            flags: record.flags.clone(),
            details: ScanDetails {
                source: request.source,
                scan_id: Some(record.scan_id.clone()),
                manual_review_pending: Some(record.manual_review_pending),
                scans_remaining: Some(account.scans_remaining()),
                error: outcome.error,
            },
        };
        transition(trace, AdmissionState::Responded);
        Ok(response)
    }
}

fn rejection_reason(err: &DomainError) -> &'static str {
    match err {
        DomainError::Auth(failure) => failure.as_str(),
        DomainError::QuotaExceeded { .. } => "quota_exceeded",
        _ => "validation_error",
    }
}

fn transition(trace: &mut Vec<AdmissionState>, next: AdmissionState) {
    let from = trace
        .last()
        .map_or(AdmissionState::Unauthenticated.as_str(), AdmissionState::as_str);
    tracing::debug!(from, to = next.as_str(), "admission transition");
    trace.push(next);
}
