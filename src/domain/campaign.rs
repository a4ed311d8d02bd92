use crate::domain::donation::{CampaignId, Donation, UserId};
use crate::domain::money::Amount;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Pending => "pending",
            CampaignStatus::Active => "active",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A fundraising campaign.
///
/// `current_amount` and `donors_count` are system-owned aggregates: they are
/// derived from the campaign's completed donations and only change through
/// `apply_totals`, which the ledger store calls inside the same transaction
/// as the donation-status write that made them stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    pub user_id: UserId,
    pub goal_amount: Amount,
    pub current_amount: Decimal,
    pub donors_count: u64,
    pub status: CampaignStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_featured: bool,
    pub views_count: u64,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<UserId>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// A campaign accepts donations while `active` and inside its date window.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == CampaignStatus::Active && self.start_date <= now && now <= self.end_date
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_date < now
    }

    pub fn has_reached_goal(&self) -> bool {
        self.current_amount >= self.goal_amount.value()
    }

    /// Progress toward the goal, capped at 100 and rounded to 2 places.
    pub fn progress_percentage(&self) -> Decimal {
        let percentage = (self.current_amount / self.goal_amount.value()) * dec!(100);
        percentage.round_dp(2).min(dec!(100))
    }

    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        if self.has_ended(now) {
            return 0;
        }
        (self.end_date - now).num_days().max(0)
    }

    pub fn apply_totals(&mut self, totals: CampaignTotals) {
        self.current_amount = totals.current_amount;
        self.donors_count = totals.donors_count;
    }
}

/// The derived aggregate over a campaign's completed donations.
///
/// Always recomputed by full aggregation rather than incremental counters:
/// the recompute is idempotent, so concurrent completions converge to the
/// same totals in either commit order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CampaignTotals {
    pub current_amount: Decimal,
    pub donors_count: u64,
}

impl CampaignTotals {
    pub fn of<'a>(
        campaign_id: CampaignId,
        donations: impl IntoIterator<Item = &'a Donation>,
    ) -> Self {
        let mut current_amount = Decimal::ZERO;
        let mut donors: HashSet<UserId> = HashSet::new();
        for donation in donations {
            if donation.campaign_id == campaign_id && donation.counts_toward_totals() {
                current_amount += donation.amount.value();
                donors.insert(donation.user_id);
            }
        }
        Self {
            current_amount,
            donors_count: donors.len() as u64,
        }
    }
}

/// Turns a campaign title into a URL-safe slug.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Parameters for creating a campaign. The slug defaults to a slugified
/// title when not supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCampaign {
    pub title: String,
    pub slug: Option<String>,
    pub description: String,
    pub category: String,
    pub user_id: UserId,
    pub goal_amount: Amount,
    pub status: CampaignStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_featured: bool,
}

/// Owner-editable fields. Totals and approval metadata are system-owned and
/// deliberately absent.
#[derive(Debug, Clone, Default)]
pub struct CampaignPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub goal_amount: Option<Amount>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_featured: Option<bool>,
}
