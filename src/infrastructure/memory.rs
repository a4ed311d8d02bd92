use crate::domain::campaign::{
    Campaign, CampaignPatch, CampaignStatus, CampaignTotals, NewCampaign, slugify,
};
use crate::domain::donation::{CampaignId, Donation, DonationId, DonationStatus, UserId};
use crate::domain::ports::{
    CampaignRepository, DonationRepository, LedgerStore, Page, SettledDonation, Settlement,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cap on full-text search results, matching the browse surface.
const SEARCH_LIMIT: usize = 50;

#[derive(Default)]
struct Tables {
    campaigns: HashMap<CampaignId, Campaign>,
    campaign_slugs: HashMap<String, CampaignId>,
    donations: HashMap<DonationId, Donation>,
    donation_numbers: HashMap<String, DonationId>,
    next_campaign_id: CampaignId,
    next_donation_id: DonationId,
}

/// The reference transactional store.
///
/// Every table lives behind one `RwLock`; each compound write takes the
/// write guard exactly once, so a settlement's status transition and the
/// campaign-aggregate recompute land in a single commit, and two concurrent
/// completions serialize. Nothing is visible to readers until the guard
/// drops.
///
/// Implements the repositories and the ledger port together the way the
/// production store would: one database, several access surfaces.
#[derive(Default, Clone)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn insert_pending(&self, mut donation: Donation) -> Result<Donation> {
        let mut tables = self.tables.write().await;

        if !tables.campaigns.contains_key(&donation.campaign_id) {
            return Err(Error::CampaignUnavailable);
        }
        if !donation.is_pending() {
            return Err(Error::ValidationError(
                "Only pending donations can be inserted".to_string(),
            ));
        }
        if tables
            .donation_numbers
            .contains_key(&donation.donation_number)
        {
            return Err(Error::DuplicateDonationNumber(
                donation.donation_number.clone(),
            ));
        }

        tables.next_donation_id += 1;
        donation.id = tables.next_donation_id;
        tables
            .donation_numbers
            .insert(donation.donation_number.clone(), donation.id);
        tables.donations.insert(donation.id, donation.clone());
        Ok(donation)
    }

    async fn apply_settlement(
        &self,
        donation_id: DonationId,
        settlement: Settlement,
    ) -> Result<SettledDonation> {
        let mut tables = self.tables.write().await;

        let mut donation = tables
            .donations
            .get(&donation_id)
            .cloned()
            .ok_or(Error::NotFound("donation", donation_id))?;
        if !tables.campaigns.contains_key(&donation.campaign_id) {
            return Err(Error::NotFound("campaign", donation.campaign_id));
        }

        let now = Utc::now();
        let contribution_changed = match settlement {
            Settlement::Completed {
                transaction_id,
                details,
            } => {
                donation.complete(&transaction_id, details, now)?;
                true
            }
            Settlement::Failed { reason } => {
                donation.fail(&reason, now)?;
                false
            }
            Settlement::Refunded {
                refund_transaction_id,
                amount,
            } => {
                donation.refund(&refund_transaction_id, amount, now)?;
                true
            }
        };
        tables.donations.insert(donation_id, donation.clone());

        let campaign = if contribution_changed {
            let totals = CampaignTotals::of(donation.campaign_id, tables.donations.values());
            let campaign = tables
                .campaigns
                .get_mut(&donation.campaign_id)
                .ok_or(Error::NotFound("campaign", donation.campaign_id))?;
            campaign.apply_totals(totals);
            Some(campaign.clone())
        } else {
            None
        };

        Ok(SettledDonation { donation, campaign })
    }
}

#[async_trait]
impl CampaignRepository for MemoryStore {
    async fn find(&self, id: CampaignId) -> Result<Option<Campaign>> {
        let tables = self.tables.read().await;
        Ok(tables.campaigns.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Campaign>> {
        let tables = self.tables.read().await;
        Ok(tables
            .campaign_slugs
            .get(slug)
            .and_then(|id| tables.campaigns.get(id))
            .cloned())
    }

    async fn active(&self) -> Result<Vec<Campaign>> {
        let now = Utc::now();
        let tables = self.tables.read().await;
        let mut campaigns: Vec<Campaign> = tables
            .campaigns
            .values()
            .filter(|c| c.is_active(now))
            .cloned()
            .collect();
        campaigns.sort_by_key(|c| c.id);
        Ok(campaigns)
    }

    async fn featured(&self) -> Result<Vec<Campaign>> {
        let tables = self.tables.read().await;
        let mut campaigns: Vec<Campaign> = tables
            .campaigns
            .values()
            .filter(|c| c.is_featured)
            .cloned()
            .collect();
        campaigns.sort_by_key(|c| c.id);
        Ok(campaigns)
    }

    async fn by_category(&self, category: &str) -> Result<Vec<Campaign>> {
        let tables = self.tables.read().await;
        let mut campaigns: Vec<Campaign> = tables
            .campaigns
            .values()
            .filter(|c| c.category == category)
            .cloned()
            .collect();
        campaigns.sort_by_key(|c| c.id);
        Ok(campaigns)
    }

    async fn by_user(&self, user_id: UserId) -> Result<Vec<Campaign>> {
        let tables = self.tables.read().await;
        let mut campaigns: Vec<Campaign> = tables
            .campaigns
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        campaigns.sort_by_key(|c| c.id);
        Ok(campaigns)
    }

    async fn by_status(&self, status: CampaignStatus) -> Result<Vec<Campaign>> {
        let tables = self.tables.read().await;
        let mut campaigns: Vec<Campaign> = tables
            .campaigns
            .values()
            .filter(|c| c.status == status)
            .cloned()
            .collect();
        campaigns.sort_by_key(|c| c.id);
        Ok(campaigns)
    }

    async fn paginate(&self, page: usize, per_page: usize) -> Result<Page<Campaign>> {
        let tables = self.tables.read().await;
        let mut campaigns: Vec<Campaign> = tables.campaigns.values().cloned().collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = campaigns.len();
        let page = page.max(1);
        let items = campaigns
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();
        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }

    async fn search(&self, term: &str) -> Result<Vec<Campaign>> {
        let term = term.to_lowercase();
        let tables = self.tables.read().await;
        let mut campaigns: Vec<Campaign> = tables
            .campaigns
            .values()
            .filter(|c| {
                c.title.to_lowercase().contains(&term)
                    || c.description.to_lowercase().contains(&term)
            })
            .cloned()
            .collect();
        campaigns.sort_by_key(|c| c.id);
        campaigns.truncate(SEARCH_LIMIT);
        Ok(campaigns)
    }

    async fn create(&self, new: NewCampaign) -> Result<Campaign> {
        let mut tables = self.tables.write().await;

        let slug = match new.slug {
            Some(slug) => slug,
            None => slugify(&new.title),
        };
        if slug.is_empty() {
            return Err(Error::ValidationError(
                "Campaign slug must not be empty".to_string(),
            ));
        }
        if tables.campaign_slugs.contains_key(&slug) {
            return Err(Error::ValidationError(format!(
                "Campaign slug already in use: {slug}"
            )));
        }

        tables.next_campaign_id += 1;
        let campaign = Campaign {
            id: tables.next_campaign_id,
            title: new.title,
            slug: slug.clone(),
            description: new.description,
            category: new.category,
            user_id: new.user_id,
            goal_amount: new.goal_amount,
            current_amount: Decimal::ZERO,
            donors_count: 0,
            status: new.status,
            start_date: new.start_date,
            end_date: new.end_date,
            is_featured: new.is_featured,
            views_count: 0,
            approved_at: None,
            approved_by: None,
            rejection_reason: None,
            created_at: Utc::now(),
        };
        tables.campaign_slugs.insert(slug, campaign.id);
        tables.campaigns.insert(campaign.id, campaign.clone());
        Ok(campaign)
    }

    async fn update(&self, id: CampaignId, patch: CampaignPatch) -> Result<Campaign> {
        let mut tables = self.tables.write().await;
        let campaign = tables
            .campaigns
            .get_mut(&id)
            .ok_or(Error::NotFound("campaign", id))?;

        if let Some(title) = patch.title {
            campaign.title = title;
        }
        if let Some(description) = patch.description {
            campaign.description = description;
        }
        if let Some(category) = patch.category {
            campaign.category = category;
        }
        if let Some(goal_amount) = patch.goal_amount {
            campaign.goal_amount = goal_amount;
        }
        if let Some(start_date) = patch.start_date {
            campaign.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            campaign.end_date = end_date;
        }
        if let Some(is_featured) = patch.is_featured {
            campaign.is_featured = is_featured;
        }
        Ok(campaign.clone())
    }

    async fn delete(&self, id: CampaignId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(campaign) = tables.campaigns.remove(&id) else {
            return Ok(false);
        };
        tables.campaign_slugs.remove(&campaign.slug);
        // Deletion cascades to the campaign's donations, as the store's
        // foreign keys would.
        let orphaned: Vec<DonationId> = tables
            .donations
            .values()
            .filter(|d| d.campaign_id == id)
            .map(|d| d.id)
            .collect();
        for donation_id in orphaned {
            if let Some(donation) = tables.donations.remove(&donation_id) {
                tables.donation_numbers.remove(&donation.donation_number);
            }
        }
        Ok(true)
    }

    async fn approve(&self, id: CampaignId, approved_by: UserId) -> Result<Campaign> {
        let mut tables = self.tables.write().await;
        let campaign = tables
            .campaigns
            .get_mut(&id)
            .ok_or(Error::NotFound("campaign", id))?;
        campaign.status = CampaignStatus::Active;
        campaign.approved_at = Some(Utc::now());
        campaign.approved_by = Some(approved_by);
        campaign.rejection_reason = None;
        Ok(campaign.clone())
    }

    async fn reject(&self, id: CampaignId, reason: Option<String>) -> Result<Campaign> {
        let mut tables = self.tables.write().await;
        let campaign = tables
            .campaigns
            .get_mut(&id)
            .ok_or(Error::NotFound("campaign", id))?;
        campaign.status = CampaignStatus::Cancelled;
        campaign.rejection_reason = reason;
        Ok(campaign.clone())
    }

    async fn bulk_set_status(&self, ids: &[CampaignId], status: CampaignStatus) -> Result<usize> {
        let mut tables = self.tables.write().await;
        let mut updated = 0;
        for id in ids {
            if let Some(campaign) = tables.campaigns.get_mut(id) {
                campaign.status = status;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn increment_views(&self, id: CampaignId) -> Result<()> {
        let mut tables = self.tables.write().await;
        let campaign = tables
            .campaigns
            .get_mut(&id)
            .ok_or(Error::NotFound("campaign", id))?;
        campaign.views_count += 1;
        Ok(())
    }
}

#[async_trait]
impl DonationRepository for MemoryStore {
    async fn find(&self, id: DonationId) -> Result<Option<Donation>> {
        let tables = self.tables.read().await;
        Ok(tables.donations.get(&id).cloned())
    }

    async fn find_by_number(&self, donation_number: &str) -> Result<Option<Donation>> {
        let tables = self.tables.read().await;
        Ok(tables
            .donation_numbers
            .get(donation_number)
            .and_then(|id| tables.donations.get(id))
            .cloned())
    }

    async fn by_campaign(&self, campaign_id: CampaignId) -> Result<Vec<Donation>> {
        let tables = self.tables.read().await;
        let mut donations: Vec<Donation> = tables
            .donations
            .values()
            .filter(|d| d.campaign_id == campaign_id)
            .cloned()
            .collect();
        donations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(donations)
    }

    async fn by_donor(&self, user_id: UserId) -> Result<Vec<Donation>> {
        let tables = self.tables.read().await;
        let mut donations: Vec<Donation> = tables
            .donations
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        donations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(donations)
    }

    async fn by_status(&self, status: DonationStatus) -> Result<Vec<Donation>> {
        let tables = self.tables.read().await;
        let mut donations: Vec<Donation> = tables
            .donations
            .values()
            .filter(|d| d.status == status)
            .cloned()
            .collect();
        donations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(donations)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Donation>> {
        let mut donations = DonationRepository::by_status(self, DonationStatus::Completed).await?;
        donations.truncate(limit);
        Ok(donations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::donation::PaymentMethod;
    use crate::domain::money::{Amount, Currency};
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn new_campaign(title: &str) -> NewCampaign {
        let now = Utc::now();
        NewCampaign {
            title: title.to_string(),
            slug: None,
            description: "desc".to_string(),
            category: "community".to_string(),
            user_id: 1,
            goal_amount: Amount::new(dec!(1000)).unwrap(),
            status: CampaignStatus::Active,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(30),
            is_featured: false,
        }
    }

    fn pending(campaign_id: CampaignId, user_id: UserId, amount: Decimal, number: &str) -> Donation {
        Donation::pending(
            number.to_string(),
            user_id,
            campaign_id,
            Amount::new(amount).unwrap(),
            Currency::USD,
            PaymentMethod::CreditCard,
            false,
            None,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_slug() {
        let store = MemoryStore::new();
        let campaign = store.create(new_campaign("Clean Water Fund")).await.unwrap();
        assert_eq!(campaign.id, 1);
        assert_eq!(campaign.slug, "clean-water-fund");
        assert_eq!(campaign.current_amount, Decimal::ZERO);

        let by_slug = store.find_by_slug("clean-water-fund").await.unwrap();
        assert_eq!(by_slug.unwrap().id, campaign.id);
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let store = MemoryStore::new();
        store.create(new_campaign("Same Title")).await.unwrap();
        let result = store.create(new_campaign("Same Title")).await;
        assert!(matches!(result, Err(Error::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_insert_pending_enforces_unique_number() {
        let store = MemoryStore::new();
        let campaign = store.create(new_campaign("Books")).await.unwrap();

        let first = store
            .insert_pending(pending(campaign.id, 7, dec!(10), "DON-2026-AAAAAA"))
            .await
            .unwrap();
        assert_eq!(first.id, 1);

        let duplicate = store
            .insert_pending(pending(campaign.id, 8, dec!(10), "DON-2026-AAAAAA"))
            .await;
        assert!(matches!(duplicate, Err(Error::DuplicateDonationNumber(_))));
    }

    #[tokio::test]
    async fn test_insert_pending_requires_campaign() {
        let store = MemoryStore::new();
        let result = store
            .insert_pending(pending(42, 7, dec!(10), "DON-2026-BBBBBB"))
            .await;
        assert!(matches!(result, Err(Error::CampaignUnavailable)));
    }

    #[tokio::test]
    async fn test_settlement_recomputes_totals_in_same_commit() {
        let store = MemoryStore::new();
        let campaign = store.create(new_campaign("Well")).await.unwrap();
        let d1 = store
            .insert_pending(pending(campaign.id, 10, dec!(400), "DON-2026-CCCCC1"))
            .await
            .unwrap();
        let d2 = store
            .insert_pending(pending(campaign.id, 11, dec!(700), "DON-2026-CCCCC2"))
            .await
            .unwrap();

        let settled = store
            .apply_settlement(
                d1.id,
                Settlement::Completed {
                    transaction_id: "MOCK-1".to_string(),
                    details: json!({"provider": "mock"}),
                },
            )
            .await
            .unwrap();
        let campaign_after = settled.campaign.unwrap();
        assert_eq!(campaign_after.current_amount, dec!(400));
        assert_eq!(campaign_after.donors_count, 1);

        let settled = store
            .apply_settlement(
                d2.id,
                Settlement::Completed {
                    transaction_id: "MOCK-2".to_string(),
                    details: json!({"provider": "mock"}),
                },
            )
            .await
            .unwrap();
        let campaign_after = settled.campaign.unwrap();
        assert_eq!(campaign_after.current_amount, dec!(1100));
        assert_eq!(campaign_after.donors_count, 2);
        assert!(campaign_after.has_reached_goal());
    }

    #[tokio::test]
    async fn test_failed_settlement_leaves_totals_untouched() {
        let store = MemoryStore::new();
        let campaign = store.create(new_campaign("Shoes")).await.unwrap();
        let donation = store
            .insert_pending(pending(campaign.id, 10, dec!(666), "DON-2026-DDDDDD"))
            .await
            .unwrap();

        let settled = store
            .apply_settlement(
                donation.id,
                Settlement::Failed {
                    reason: "Payment declined by bank".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(settled.campaign.is_none());
        assert_eq!(settled.donation.status, DonationStatus::Failed);

        let campaign = CampaignRepository::find(&store, campaign.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(campaign.current_amount, Decimal::ZERO);
        assert_eq!(campaign.donors_count, 0);
    }

    #[tokio::test]
    async fn test_refund_settlement_drops_full_contribution() {
        let store = MemoryStore::new();
        let campaign = store.create(new_campaign("Meals")).await.unwrap();
        let donation = store
            .insert_pending(pending(campaign.id, 10, dec!(500), "DON-2026-EEEEEE"))
            .await
            .unwrap();
        store
            .apply_settlement(
                donation.id,
                Settlement::Completed {
                    transaction_id: "MOCK-9".to_string(),
                    details: json!({"provider": "mock"}),
                },
            )
            .await
            .unwrap();

        // Partial refund at the provider still removes the whole donation
        // from the aggregate.
        let settled = store
            .apply_settlement(
                donation.id,
                Settlement::Refunded {
                    refund_transaction_id: "REFUND-1".to_string(),
                    amount: Amount::new(dec!(200)).unwrap(),
                },
            )
            .await
            .unwrap();
        assert_eq!(settled.donation.status, DonationStatus::Refunded);
        let campaign_after = settled.campaign.unwrap();
        assert_eq!(campaign_after.current_amount, Decimal::ZERO);
        assert_eq!(campaign_after.donors_count, 0);
    }

    #[tokio::test]
    async fn test_illegal_settlement_rolls_back_cleanly() {
        let store = MemoryStore::new();
        let campaign = store.create(new_campaign("Trees")).await.unwrap();
        let donation = store
            .insert_pending(pending(campaign.id, 10, dec!(50), "DON-2026-FFFFFF"))
            .await
            .unwrap();
        store
            .apply_settlement(
                donation.id,
                Settlement::Failed {
                    reason: "declined".to_string(),
                },
            )
            .await
            .unwrap();

        // A second settlement of a terminal donation must not change anything.
        let result = store
            .apply_settlement(
                donation.id,
                Settlement::Completed {
                    transaction_id: "MOCK-1".to_string(),
                    details: json!({}),
                },
            )
            .await;
        assert!(matches!(result, Err(Error::InvalidStateTransition { .. })));

        let after = DonationRepository::find(&store, donation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.status, DonationStatus::Failed);
        assert!(after.transaction_id.is_none());
    }

    #[tokio::test]
    async fn test_delete_cascades_to_donations() {
        let store = MemoryStore::new();
        let campaign = store.create(new_campaign("Gone")).await.unwrap();
        store
            .insert_pending(pending(campaign.id, 10, dec!(10), "DON-2026-GGGGGG"))
            .await
            .unwrap();

        assert!(store.delete(campaign.id).await.unwrap());
        assert!(!store.delete(campaign.id).await.unwrap());
        assert!(
            store
                .find_by_number("DON-2026-GGGGGG")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_paginate_windows_newest_first() {
        let store = MemoryStore::new();
        for i in 1..=5 {
            store.create(new_campaign(&format!("Campaign {i}"))).await.unwrap();
        }

        let page = store.paginate(1, 2).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, 5);

        let last = store.paginate(3, 2).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].id, 1);

        let past_end = store.paginate(4, 2).await.unwrap();
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 5);
    }

    #[tokio::test]
    async fn test_search_matches_title_and_description() {
        let store = MemoryStore::new();
        store.create(new_campaign("Clean Water Fund")).await.unwrap();
        let mut other = new_campaign("Library Books");
        other.description = "bringing clean pages to readers".to_string();
        store.create(other).await.unwrap();
        store.create(new_campaign("Marathon")).await.unwrap();

        let hits = store.search("clean").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(store.search("nonexistent").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_returns_completed_only() {
        let store = MemoryStore::new();
        let campaign = store.create(new_campaign("Mixed")).await.unwrap();
        let d1 = store
            .insert_pending(pending(campaign.id, 1, dec!(10), "DON-2026-HHHHH1"))
            .await
            .unwrap();
        store
            .insert_pending(pending(campaign.id, 2, dec!(20), "DON-2026-HHHHH2"))
            .await
            .unwrap();
        store
            .apply_settlement(
                d1.id,
                Settlement::Completed {
                    transaction_id: "MOCK-1".to_string(),
                    details: json!({}),
                },
            )
            .await
            .unwrap();

        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, d1.id);
    }
}
