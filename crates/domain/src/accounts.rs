use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::{AuthFailure, DomainError};
use crate::ports::accounts::AccountRepository;
use crate::reviews::ReviewOutcome;
use crate::tiers::{Quota, Tier};
use crate::util::{format_ms_rfc3339, now_ms, uuid_v7_without_dashes};

pub const API_KEY_PREFIX: &str = "dfg_";
/// Scores strictly above this value are flagged.
pub const FLAG_THRESHOLD: f64 = 0.6;

const API_KEY_ENTROPY_BYTES: usize = 32;
const MAX_EMAIL_LENGTH: usize = 254;
const MAX_WEBHOOK_URL_LENGTH: usize = 2_048;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub api_key: String,
    pub email: String,
    pub tier: Tier,
    pub webhook_url: Option<String>,
    pub scans_used_this_month: u64,
    pub total_scans: u64,
    pub active: bool,
    pub current_period_start_ms: i64,
    pub created_at_ms: i64,
}

impl Account {
    pub fn monthly_quota(&self) -> Quota {
        self.tier.definition().monthly_quota
    }

    pub fn scans_remaining(&self) -> Quota {
        self.monthly_quota().remaining(self.scans_used_this_month)
    }
}

#[derive(Clone, Debug)]
pub struct AccountCreate {
    pub email: String,
    pub tier: String,
    pub webhook_url: Option<String>,
}

/// One admitted scan. Appended once to the scan log and only touched again
/// by a review decision.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScanRecord {
    pub scan_id: String,
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub email: String,
    pub url: String,
    pub score: f64,
    pub flags: Vec<String>,
    pub flagged: bool,
    pub manual_review_pending: bool,
    pub created_at_ms: i64,
    pub review: Option<ReviewOutcome>,
}

impl ScanRecord {
    pub fn is_flagged(score: f64) -> bool {
        score > FLAG_THRESHOLD
    }
}

/// What the score aggregator produced for one admitted request.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanOutcome {
    pub url: String,
    pub score: f64,
    pub flags: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedScan {
    pub record: ScanRecord,
    pub account: Account,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct AccountStats {
    pub email: String,
    pub tier: Tier,
    pub scans_used: u64,
    pub scans_limit: Quota,
    pub scans_remaining: Quota,
    pub total_scans: u64,
    pub created_at: String,
}

impl From<&Account> for AccountStats {
    fn from(account: &Account) -> Self {
        Self {
            email: account.email.clone(),
            tier: account.tier,
            scans_used: account.scans_used_this_month,
            scans_limit: account.monthly_quota(),
            scans_remaining: account.scans_remaining(),
            total_scans: account.total_scans,
            created_at: format_ms_rfc3339(account.created_at_ms),
        }
    }
}

/// Owns API-key validation and usage charging on top of an
/// [`AccountRepository`].
#[derive(Clone)]
pub struct AccountService {
    repository: Arc<dyn AccountRepository>,
}

impl AccountService {
    pub fn new(repository: Arc<dyn AccountRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> Arc<dyn AccountRepository> {
        self.repository.clone()
    }

    pub async fn create(&self, input: AccountCreate) -> DomainResult<Account> {
        let tier: Tier = input.tier.parse()?;
        let email = validate_email(&input.email)?;
        let webhook_url = input
            .webhook_url
            .as_deref()
            .map(validate_webhook_url)
            .transpose()?;

        let now = now_ms();
        let account = Account {
            api_key: generate_api_key(),
            email,
            tier,
            webhook_url,
            scans_used_this_month: 0,
            total_scans: 0,
            active: true,
            current_period_start_ms: now,
            created_at_ms: now,
        };
        let account = self.repository.create(&account).await?;
        tracing::info!(tier = account.tier.as_str(), "account created");
        Ok(account)
    }

    /// Checks the key and the monthly quota without charging anything.
    pub async fn validate(&self, api_key: Option<&str>) -> DomainResult<Account> {
        let api_key = api_key
            .map(str::trim)
            .filter(|key| key.starts_with(API_KEY_PREFIX))
            .ok_or(AuthFailure::MalformedKey)?;

        let account = self
            .repository
            .get(api_key)
            .await?
            .ok_or(AuthFailure::UnknownKey)?;

        if !account.active {
            return Err(AuthFailure::Deactivated.into());
        }

        let quota = account.monthly_quota();
        if quota.is_exhausted(account.scans_used_this_month) {
            return Err(DomainError::QuotaExceeded {
                limit: quota.limit().unwrap_or_default(),
            });
        }

        Ok(account)
    }

    /// Charges one scan and records it. Returns `None` for an unknown key;
    /// callers are expected to have validated first.
    pub async fn increment(
        &self,
        api_key: &str,
        outcome: &ScanOutcome,
    ) -> DomainResult<Option<RecordedScan>> {
        let Some(account) = self.repository.get(api_key).await? else {
            return Ok(None);
        };

        let flagged = ScanRecord::is_flagged(outcome.score);
        let record = ScanRecord {
            scan_id: uuid_v7_without_dashes(),
            api_key: account.api_key.clone(),
            email: account.email.clone(),
            url: outcome.url.clone(),
            score: outcome.score,
            flags: outcome.flags.clone(),
            flagged,
            manual_review_pending: account.tier.definition().manual_review && flagged,
            created_at_ms: now_ms(),
            review: None,
        };

        let Some(account) = self.repository.commit_scan(&record).await? else {
            return Ok(None);
        };
        Ok(Some(RecordedScan { record, account }))
    }

    pub async fn stats(&self, api_key: &str) -> DomainResult<Option<AccountStats>> {
        let account = self.repository.get(api_key).await?;
        Ok(account.as_ref().map(AccountStats::from))
    }

    pub async fn update_webhook(&self, api_key: &str, webhook_url: &str) -> DomainResult<bool> {
        let webhook_url = validate_webhook_url(webhook_url)?;
        self.repository.update_webhook(api_key, &webhook_url).await
    }

    pub async fn webhook_url(&self, api_key: &str) -> DomainResult<Option<String>> {
        let account = self.repository.get(api_key).await?;
        Ok(account.and_then(|account| account.webhook_url))
    }

    pub async fn pending_reviews(&self) -> DomainResult<Vec<ScanRecord>> {
        self.repository.list_pending_reviews().await
    }
}

pub fn generate_api_key() -> String {
    let mut bytes = [0u8; API_KEY_ENTROPY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    format!("{API_KEY_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes))
}

fn validate_email(email: &str) -> DomainResult<String> {
    let email = email.trim();
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return Err(DomainError::Validation("email is required".into()));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok(email.to_string())
        }
        _ => Err(DomainError::Validation("valid email required".into())),
    }
}

fn validate_webhook_url(url: &str) -> DomainResult<String> {
    let url = url.trim();
    if url.len() > MAX_WEBHOOK_URL_LENGTH {
        return Err(DomainError::Validation("webhook_url is too long".into()));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(DomainError::Validation(
            "webhook_url must be an http(s) URL".into(),
        ));
    }
    Ok(url.to_string())
}
