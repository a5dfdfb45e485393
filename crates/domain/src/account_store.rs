use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::DomainResult;
use crate::accounts::{Account, ScanRecord};
use crate::error::DomainError;
use crate::ports::BoxFuture;
use crate::ports::accounts::AccountRepository;
use crate::reviews::ReviewOutcome;

/// Process-local account registry and append-only scan log.
///
/// Every mutation takes the single write lock, so counter updates and the
/// matching log append are observed together or not at all.
#[derive(Clone, Default)]
pub struct InMemoryAccountRepository {
    inner: Arc<RwLock<StoreState>>,
}

#[derive(Default)]
struct StoreState {
    accounts: HashMap<String, Account>,
    scans: Vec<ScanRecord>,
    scan_index: HashMap<String, usize>,
    pending: BTreeSet<usize>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn scan_count(&self) -> usize {
        self.inner.read().await.scans.len()
    }
}

impl AccountRepository for InMemoryAccountRepository {
    fn create(&self, account: &Account) -> BoxFuture<'_, DomainResult<Account>> {
        let account = account.clone();
        Box::pin(async move {
            let mut state = self.inner.write().await;
            if state.accounts.contains_key(&account.api_key) {
                return Err(DomainError::Conflict);
            }
            state
                .accounts
                .insert(account.api_key.clone(), account.clone());
            Ok(account)
        })
    }

    fn get(&self, api_key: &str) -> BoxFuture<'_, DomainResult<Option<Account>>> {
        let api_key = api_key.to_string();
        Box::pin(async move { Ok(self.inner.read().await.accounts.get(&api_key).cloned()) })
    }

    fn commit_scan(&self, record: &ScanRecord) -> BoxFuture<'_, DomainResult<Option<Account>>> {
        let record = record.clone();
        Box::pin(async move {
            let mut guard = self.inner.write().await;
            let state = &mut *guard;
            let Some(account) = state.accounts.get_mut(&record.api_key) else {
                return Ok(None);
            };

            let quota = account.monthly_quota();
            if quota.is_exhausted(account.scans_used_this_month) {
                return Err(DomainError::QuotaExceeded {
                    limit: quota.limit().unwrap_or_default(),
                });
            }
            account.scans_used_this_month += 1;
            account.total_scans += 1;
            let account = account.clone();

            let position = state.scans.len();
            if record.manual_review_pending {
                state.pending.insert(position);
            }
            state.scan_index.insert(record.scan_id.clone(), position);
            state.scans.push(record);

            Ok(Some(account))
        })
    }

    fn update_webhook(
        &self,
        api_key: &str,
        webhook_url: &str,
    ) -> BoxFuture<'_, DomainResult<bool>> {
        let api_key = api_key.to_string();
        let webhook_url = webhook_url.to_string();
        Box::pin(async move {
            let mut state = self.inner.write().await;
            match state.accounts.get_mut(&api_key) {
                Some(account) => {
                    account.webhook_url = Some(webhook_url);
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn get_scan(&self, scan_id: &str) -> BoxFuture<'_, DomainResult<Option<ScanRecord>>> {
        let scan_id = scan_id.to_string();
        Box::pin(async move {
            let state = self.inner.read().await;
            Ok(state
                .scan_index
                .get(&scan_id)
                .and_then(|position| state.scans.get(*position))
                .cloned())
        })
    }

    fn list_pending_reviews(&self) -> BoxFuture<'_, DomainResult<Vec<ScanRecord>>> {
        Box::pin(async move {
            let state = self.inner.read().await;
            Ok(state
                .pending
                .iter()
                .filter_map(|position| state.scans.get(*position))
                .cloned()
                .collect())
        })
    }

    fn apply_review(
        &self,
        scan_id: &str,
        review: &ReviewOutcome,
    ) -> BoxFuture<'_, DomainResult<ScanRecord>> {
        let scan_id = scan_id.to_string();
        let review = review.clone();
        Box::pin(async move {
            let mut guard = self.inner.write().await;
            let state = &mut *guard;
            let position = *state
                .scan_index
                .get(&scan_id)
                .ok_or(DomainError::NotFound)?;
            let record = state.scans.get_mut(position).ok_or(DomainError::NotFound)?;
            if !record.manual_review_pending {
                return Err(DomainError::Conflict);
            }
            record.manual_review_pending = false;
            record.review = Some(review);
            state.pending.remove(&position);
            Ok(record.clone())
        })
    }
}
