use crate::domain::campaign::{Campaign, CampaignPatch, CampaignStatus, NewCampaign};
use crate::domain::donation::{CampaignId, Donation, DonationId, DonationStatus, UserId};
use crate::domain::money::Amount;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub type CampaignRepositoryRef = Arc<dyn CampaignRepository>;
pub type DonationRepositoryRef = Arc<dyn DonationRepository>;
pub type LedgerStoreRef = Arc<dyn LedgerStore>;
pub type CacheRef = Arc<dyn Cache>;
pub type CacheInvalidationRef = Arc<dyn CacheInvalidation>;
pub type NotificationDispatcherRef = Arc<dyn NotificationDispatcher>;

/// One window of a paginated campaign listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

/// Lookup and CRUD surface for campaigns.
///
/// Totals (`current_amount`, `donors_count`) are not writable through this
/// trait; they only change via [`LedgerStore::apply_settlement`].
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    async fn find(&self, id: CampaignId) -> Result<Option<Campaign>>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Campaign>>;
    async fn active(&self) -> Result<Vec<Campaign>>;
    async fn featured(&self) -> Result<Vec<Campaign>>;
    async fn by_category(&self, category: &str) -> Result<Vec<Campaign>>;
    async fn by_user(&self, user_id: UserId) -> Result<Vec<Campaign>>;
    async fn by_status(&self, status: CampaignStatus) -> Result<Vec<Campaign>>;
    async fn paginate(&self, page: usize, per_page: usize) -> Result<Page<Campaign>>;
    async fn search(&self, term: &str) -> Result<Vec<Campaign>>;
    async fn create(&self, new: NewCampaign) -> Result<Campaign>;
    async fn update(&self, id: CampaignId, patch: CampaignPatch) -> Result<Campaign>;
    async fn delete(&self, id: CampaignId) -> Result<bool>;
    async fn approve(&self, id: CampaignId, approved_by: UserId) -> Result<Campaign>;
    async fn reject(&self, id: CampaignId, reason: Option<String>) -> Result<Campaign>;
    async fn bulk_set_status(&self, ids: &[CampaignId], status: CampaignStatus) -> Result<usize>;
    async fn increment_views(&self, id: CampaignId) -> Result<()>;
}

/// Read surface for donations. All writes go through [`LedgerStore`].
#[async_trait]
pub trait DonationRepository: Send + Sync {
    async fn find(&self, id: DonationId) -> Result<Option<Donation>>;
    async fn find_by_number(&self, donation_number: &str) -> Result<Option<Donation>>;
    async fn by_campaign(&self, campaign_id: CampaignId) -> Result<Vec<Donation>>;
    async fn by_donor(&self, user_id: UserId) -> Result<Vec<Donation>>;
    async fn by_status(&self, status: DonationStatus) -> Result<Vec<Donation>>;
    async fn recent(&self, limit: usize) -> Result<Vec<Donation>>;
}

/// The settlement applied to a pending (or, for refunds, completed) donation.
#[derive(Debug, Clone)]
pub enum Settlement {
    Completed {
        transaction_id: String,
        details: Value,
    },
    Failed {
        reason: String,
    },
    Refunded {
        refund_transaction_id: String,
        amount: Amount,
    },
}

/// A settlement after commit: the donation post-transition, and the campaign
/// post-recompute when the donation's contribution changed.
#[derive(Debug, Clone)]
pub struct SettledDonation {
    pub donation: Donation,
    pub campaign: Option<Campaign>,
}

/// The transactional writer for the donation ledger. Only the orchestrator
/// holds one.
///
/// Implementations must make each method a single atomic commit: a crash or
/// error mid-operation leaves no partial state, and the campaign-aggregate
/// recompute inside `apply_settlement` lands in the same commit as the
/// donation-status write.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Durably inserts a donation in `pending`, enforcing uniqueness of
    /// `donation_number`. Returns [`crate::error::Error::DuplicateDonationNumber`]
    /// when the number is taken so the caller can regenerate and retry.
    async fn insert_pending(&self, donation: Donation) -> Result<Donation>;

    /// Applies a state transition and, when the donation's contribution to
    /// its campaign changed, recomputes that campaign's totals by full
    /// aggregation over its completed donations — all in one commit.
    async fn apply_settlement(
        &self,
        donation_id: DonationId,
        settlement: Settlement,
    ) -> Result<SettledDonation>;
}

/// Key/value cache with bounded TTLs, fronting the repositories.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;
    async fn forget(&self, key: &str) -> Result<()>;
    async fn forget_prefix(&self, prefix: &str) -> Result<()>;
    async fn flush(&self) -> Result<()>;
}

/// Post-commit cache invalidation issued by the orchestrator.
///
/// Invalidation failures are absorbed and logged by implementations: a
/// committed financial transaction is never rolled back because a cache key
/// could not be dropped.
#[async_trait]
pub trait CacheInvalidation: Send + Sync {
    async fn invalidate_donation(&self, donation: &Donation);
    async fn invalidate_campaign(&self, campaign: &Campaign);
}

/// Events handed to the external notification collaborator.
#[derive(Debug, Clone)]
pub enum Notification {
    DonationCompleted(Donation),
    DonationFailed(Donation),
    DonationRefunded(Donation),
    CampaignGoalReached(Campaign),
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::DonationCompleted(_) => "donation_completed",
            Notification::DonationFailed(_) => "donation_failed",
            Notification::DonationRefunded(_) => "donation_refunded",
            Notification::CampaignGoalReached(_) => "campaign_goal_reached",
        }
    }
}

/// Fire-and-forget notification dispatch. The core neither awaits delivery
/// nor retries; implementations may queue.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(&self, notification: Notification);
}
