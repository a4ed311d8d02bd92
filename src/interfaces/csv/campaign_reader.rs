use crate::domain::campaign::{CampaignStatus, NewCampaign};
use crate::domain::donation::UserId;
use crate::domain::money::Amount;
use crate::error::{Error, Result};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of the campaign seed file.
#[derive(Debug, Deserialize)]
pub struct CampaignSeed {
    pub title: String,
    pub owner: UserId,
    pub goal: Decimal,
    pub category: String,
    /// How many days from now the campaign accepts donations.
    pub days: i64,
}

impl CampaignSeed {
    pub fn into_new_campaign(self) -> Result<NewCampaign> {
        let now = Utc::now();
        Ok(NewCampaign {
            title: self.title,
            slug: None,
            description: String::new(),
            category: self.category,
            user_id: self.owner,
            goal_amount: Amount::new(self.goal)?,
            status: CampaignStatus::Active,
            start_date: now - Duration::hours(1),
            end_date: now + Duration::days(self.days.max(1)),
            is_featured: false,
        })
    }
}

/// Reads campaign seeds from a CSV source.
pub struct CampaignSeedReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CampaignSeedReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn seeds(self) -> impl Iterator<Item = Result<CampaignSeed>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(Error::from))
    }
}
