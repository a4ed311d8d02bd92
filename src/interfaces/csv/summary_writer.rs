use crate::domain::campaign::Campaign;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct CampaignSummary {
    slug: String,
    goal: Decimal,
    raised: Decimal,
    donors: u64,
    progress: Decimal,
    goal_reached: bool,
}

impl From<&Campaign> for CampaignSummary {
    fn from(campaign: &Campaign) -> Self {
        Self {
            slug: campaign.slug.clone(),
            goal: campaign.goal_amount.value(),
            raised: campaign.current_amount,
            donors: campaign.donors_count,
            progress: campaign.progress_percentage(),
            goal_reached: campaign.has_reached_goal(),
        }
    }
}

/// Writes the per-campaign results as CSV.
pub struct SummaryWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> SummaryWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_campaigns(&mut self, campaigns: &[Campaign]) -> Result<()> {
        for campaign in campaigns {
            self.writer.serialize(CampaignSummary::from(campaign))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
