use crate::DomainResult;
use crate::accounts::{Account, ScanRecord};
use crate::ports::BoxFuture;
use crate::reviews::ReviewOutcome;

pub trait AccountRepository: Send + Sync {
    fn create(&self, account: &Account) -> BoxFuture<'_, DomainResult<Account>>;

    fn get(&self, api_key: &str) -> BoxFuture<'_, DomainResult<Option<Account>>>;

    /// Charges one scan to the owning account and appends `record` to the scan
    /// log as a single atomic step. Returns `None` when the key is unknown and
    /// `DomainError::QuotaExceeded` when the quota was exhausted in between
    /// validation and commit.
    fn commit_scan(&self, record: &ScanRecord) -> BoxFuture<'_, DomainResult<Option<Account>>>;

    fn update_webhook(
        &self,
        api_key: &str,
        webhook_url: &str,
    ) -> BoxFuture<'_, DomainResult<bool>>;

    fn get_scan(&self, scan_id: &str) -> BoxFuture<'_, DomainResult<Option<ScanRecord>>>;

    fn list_pending_reviews(&self) -> BoxFuture<'_, DomainResult<Vec<ScanRecord>>>;

    fn apply_review(
        &self,
        scan_id: &str,
        review: &ReviewOutcome,
    ) -> BoxFuture<'_, DomainResult<ScanRecord>>;
}
