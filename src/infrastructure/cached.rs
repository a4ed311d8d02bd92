//! Read-through caching decorators over the store-backed repositories.
//!
//! Composition over inheritance: a decorator holds the inner repository and
//! the cache, both as trait objects, and is wired up at construction time.
//! Reads populate the cache lazily under a bounded TTL; every mutation
//! synchronously drops the entity's id- and natural-key entries and the
//! whole list-key family (over-invalidation is fine, under-invalidation is
//! not). Cache failures are logged and swallowed: they never fail a
//! mutation that already committed.

use crate::domain::campaign::{Campaign, CampaignPatch, CampaignStatus, NewCampaign};
use crate::domain::donation::{CampaignId, Donation, DonationId, DonationStatus, UserId};
use crate::domain::ports::{
    Cache, CacheInvalidation, CacheRef, CampaignRepository, CampaignRepositoryRef,
    DonationRepository, DonationRepositoryRef, Page,
};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

/// Cache key scheme shared by the decorators and the orchestrator's
/// post-settlement invalidation.
pub mod keys {
    use super::*;

    pub const CAMPAIGN_LISTS: &str = "campaigns:list:";
    pub const DONATION_LISTS: &str = "donations:list:";

    pub fn campaign_id(id: CampaignId) -> String {
        format!("campaigns:id:{id}")
    }

    pub fn campaign_slug(slug: &str) -> String {
        format!("campaigns:slug:{slug}")
    }

    pub fn campaigns_active() -> String {
        format!("{CAMPAIGN_LISTS}active")
    }

    pub fn campaigns_featured() -> String {
        format!("{CAMPAIGN_LISTS}featured")
    }

    pub fn campaigns_category(category: &str) -> String {
        format!("{CAMPAIGN_LISTS}category:{category}")
    }

    pub fn campaigns_user(user_id: UserId) -> String {
        format!("{CAMPAIGN_LISTS}user:{user_id}")
    }

    pub fn campaigns_status(status: CampaignStatus) -> String {
        format!("{CAMPAIGN_LISTS}status:{status}")
    }

    pub fn donation_id(id: DonationId) -> String {
        format!("donations:id:{id}")
    }

    pub fn donation_number(number: &str) -> String {
        format!("donations:number:{number}")
    }

    pub fn donations_campaign(campaign_id: CampaignId) -> String {
        format!("{DONATION_LISTS}campaign:{campaign_id}")
    }

    pub fn donations_donor(user_id: UserId) -> String {
        format!("{DONATION_LISTS}donor:{user_id}")
    }

    pub fn donations_status(status: DonationStatus) -> String {
        format!("{DONATION_LISTS}status:{status}")
    }

    pub fn donations_recent(limit: usize) -> String {
        format!("{DONATION_LISTS}recent:{limit}")
    }
}

async fn forget(cache: &CacheRef, key: &str) {
    if let Err(e) = cache.forget(key).await {
        warn!(key, error = %e, "cache invalidation failed");
    }
}

async fn forget_prefix(cache: &CacheRef, prefix: &str) {
    if let Err(e) = cache.forget_prefix(prefix).await {
        warn!(prefix, error = %e, "cache invalidation failed");
    }
}

/// Read-through lookup: serve the cached value when present, otherwise load
/// from the inner repository and populate the cache. Cache errors degrade to
/// a plain load.
async fn remember<T, F, Fut>(cache: &CacheRef, key: &str, ttl: Duration, load: F) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match cache.get(key).await {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(hit) => return Ok(hit),
            Err(e) => warn!(key, error = %e, "discarding undecodable cache entry"),
        },
        Ok(None) => {}
        Err(e) => warn!(key, error = %e, "cache read failed"),
    }

    let fresh = load().await?;
    match serde_json::to_value(&fresh) {
        Ok(value) => {
            if let Err(e) = cache.put(key, value, ttl).await {
                warn!(key, error = %e, "cache write failed");
            }
        }
        Err(e) => warn!(key, error = %e, "cache encode failed"),
    }
    Ok(fresh)
}

const ENTITY_TTL: Duration = Duration::from_secs(3600);
const LIST_TTL: Duration = Duration::from_secs(600);

pub struct CachedCampaignRepository {
    inner: CampaignRepositoryRef,
    cache: CacheRef,
    entity_ttl: Duration,
    list_ttl: Duration,
}

impl CachedCampaignRepository {
    pub fn new(inner: CampaignRepositoryRef, cache: CacheRef) -> Self {
        Self {
            inner,
            cache,
            entity_ttl: ENTITY_TTL,
            list_ttl: LIST_TTL,
        }
    }

    pub fn with_ttls(mut self, entity_ttl: Duration, list_ttl: Duration) -> Self {
        self.entity_ttl = entity_ttl;
        self.list_ttl = list_ttl;
        self
    }

    async fn invalidate_entity(&self, campaign: &Campaign) {
        forget(&self.cache, &keys::campaign_id(campaign.id)).await;
        forget(&self.cache, &keys::campaign_slug(&campaign.slug)).await;
    }

    async fn invalidate_lists(&self) {
        forget_prefix(&self.cache, keys::CAMPAIGN_LISTS).await;
    }
}

#[async_trait]
impl CampaignRepository for CachedCampaignRepository {
    async fn find(&self, id: CampaignId) -> Result<Option<Campaign>> {
        remember(&self.cache, &keys::campaign_id(id), self.entity_ttl, || {
            self.inner.find(id)
        })
        .await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Campaign>> {
        remember(
            &self.cache,
            &keys::campaign_slug(slug),
            self.entity_ttl,
            || self.inner.find_by_slug(slug),
        )
        .await
    }

    async fn active(&self) -> Result<Vec<Campaign>> {
        remember(&self.cache, &keys::campaigns_active(), self.list_ttl, || {
            self.inner.active()
        })
        .await
    }

    async fn featured(&self) -> Result<Vec<Campaign>> {
        remember(
            &self.cache,
            &keys::campaigns_featured(),
            self.list_ttl,
            || self.inner.featured(),
        )
        .await
    }

    async fn by_category(&self, category: &str) -> Result<Vec<Campaign>> {
        remember(
            &self.cache,
            &keys::campaigns_category(category),
            self.list_ttl,
            || self.inner.by_category(category),
        )
        .await
    }

    async fn by_user(&self, user_id: UserId) -> Result<Vec<Campaign>> {
        remember(
            &self.cache,
            &keys::campaigns_user(user_id),
            self.list_ttl,
            || self.inner.by_user(user_id),
        )
        .await
    }

    async fn by_status(&self, status: CampaignStatus) -> Result<Vec<Campaign>> {
        remember(
            &self.cache,
            &keys::campaigns_status(status),
            self.list_ttl,
            || self.inner.by_status(status),
        )
        .await
    }

    async fn paginate(&self, page: usize, per_page: usize) -> Result<Page<Campaign>> {
        // Page windows and search results churn faster than any acceptable
        // staleness window, so they always hit the store.
        self.inner.paginate(page, per_page).await
    }

    async fn search(&self, term: &str) -> Result<Vec<Campaign>> {
        self.inner.search(term).await
    }

    async fn create(&self, new: NewCampaign) -> Result<Campaign> {
        let campaign = self.inner.create(new).await?;
        self.invalidate_entity(&campaign).await;
        self.invalidate_lists().await;
        Ok(campaign)
    }

    async fn update(&self, id: CampaignId, patch: CampaignPatch) -> Result<Campaign> {
        let campaign = self.inner.update(id, patch).await?;
        self.invalidate_entity(&campaign).await;
        self.invalidate_lists().await;
        Ok(campaign)
    }

    async fn delete(&self, id: CampaignId) -> Result<bool> {
        let existing = self.inner.find(id).await?;
        let deleted = self.inner.delete(id).await?;
        if deleted {
            if let Some(campaign) = existing {
                self.invalidate_entity(&campaign).await;
            }
            self.invalidate_lists().await;
            // Deletion cascades to donations, so their caches are stale too.
            forget_prefix(&self.cache, "donations:").await;
        }
        Ok(deleted)
    }

    async fn approve(&self, id: CampaignId, approved_by: UserId) -> Result<Campaign> {
        let campaign = self.inner.approve(id, approved_by).await?;
        self.invalidate_entity(&campaign).await;
        self.invalidate_lists().await;
        Ok(campaign)
    }

    async fn reject(&self, id: CampaignId, reason: Option<String>) -> Result<Campaign> {
        let campaign = self.inner.reject(id, reason).await?;
        self.invalidate_entity(&campaign).await;
        self.invalidate_lists().await;
        Ok(campaign)
    }

    async fn bulk_set_status(&self, ids: &[CampaignId], status: CampaignStatus) -> Result<usize> {
        let updated = self.inner.bulk_set_status(ids, status).await?;
        // Slugs are unknown here; drop the whole campaign keyspace instead.
        forget_prefix(&self.cache, "campaigns:").await;
        Ok(updated)
    }

    async fn increment_views(&self, id: CampaignId) -> Result<()> {
        // The documented exception: view counts tolerate staleness, and
        // invalidating on every page view would thrash the cache.
        self.inner.increment_views(id).await
    }
}

pub struct CachedDonationRepository {
    inner: DonationRepositoryRef,
    cache: CacheRef,
    entity_ttl: Duration,
    list_ttl: Duration,
}

impl CachedDonationRepository {
    pub fn new(inner: DonationRepositoryRef, cache: CacheRef) -> Self {
        Self {
            inner,
            cache,
            entity_ttl: ENTITY_TTL,
            list_ttl: LIST_TTL,
        }
    }

    pub fn with_ttls(mut self, entity_ttl: Duration, list_ttl: Duration) -> Self {
        self.entity_ttl = entity_ttl;
        self.list_ttl = list_ttl;
        self
    }
}

#[async_trait]
impl DonationRepository for CachedDonationRepository {
    async fn find(&self, id: DonationId) -> Result<Option<Donation>> {
        remember(&self.cache, &keys::donation_id(id), self.entity_ttl, || {
            self.inner.find(id)
        })
        .await
    }

    async fn find_by_number(&self, donation_number: &str) -> Result<Option<Donation>> {
        remember(
            &self.cache,
            &keys::donation_number(donation_number),
            self.entity_ttl,
            || self.inner.find_by_number(donation_number),
        )
        .await
    }

    async fn by_campaign(&self, campaign_id: CampaignId) -> Result<Vec<Donation>> {
        remember(
            &self.cache,
            &keys::donations_campaign(campaign_id),
            self.list_ttl,
            || self.inner.by_campaign(campaign_id),
        )
        .await
    }

    async fn by_donor(&self, user_id: UserId) -> Result<Vec<Donation>> {
        remember(
            &self.cache,
            &keys::donations_donor(user_id),
            self.list_ttl,
            || self.inner.by_donor(user_id),
        )
        .await
    }

    async fn by_status(&self, status: DonationStatus) -> Result<Vec<Donation>> {
        remember(
            &self.cache,
            &keys::donations_status(status),
            self.list_ttl,
            || self.inner.by_status(status),
        )
        .await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Donation>> {
        remember(
            &self.cache,
            &keys::donations_recent(limit),
            self.list_ttl,
            || self.inner.recent(limit),
        )
        .await
    }
}

/// Post-commit invalidation used by the orchestrator after every settlement.
/// Shares the key scheme with the decorators above.
pub struct KeyedInvalidation {
    cache: CacheRef,
}

impl KeyedInvalidation {
    pub fn new(cache: CacheRef) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl CacheInvalidation for KeyedInvalidation {
    async fn invalidate_donation(&self, donation: &Donation) {
        forget(&self.cache, &keys::donation_id(donation.id)).await;
        forget(&self.cache, &keys::donation_number(&donation.donation_number)).await;
        forget_prefix(&self.cache, keys::DONATION_LISTS).await;
    }

    async fn invalidate_campaign(&self, campaign: &Campaign) {
        forget(&self.cache, &keys::campaign_id(campaign.id)).await;
        forget(&self.cache, &keys::campaign_slug(&campaign.slug)).await;
        forget_prefix(&self.cache, keys::CAMPAIGN_LISTS).await;
    }
}
