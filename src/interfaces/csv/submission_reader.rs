use crate::application::orchestrator::DonationRequest;
use crate::domain::donation::{CampaignId, PaymentMethod, UserId};
use crate::domain::money::{Amount, Currency};
use crate::error::{Error, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of the donation submissions file. Campaigns are referenced by
/// slug; the id is resolved against the store before submission.
#[derive(Debug, Deserialize)]
pub struct DonationSubmission {
    pub campaign: String,
    pub donor: UserId,
    pub amount: Decimal,
    pub currency: Option<Currency>,
    pub method: PaymentMethod,
    pub provider: Option<String>,
    #[serde(default)]
    pub anonymous: bool,
    pub message: Option<String>,
}

impl DonationSubmission {
    pub fn into_request(self, campaign_id: CampaignId) -> Result<DonationRequest> {
        Ok(DonationRequest {
            campaign_id,
            user_id: self.donor,
            amount: Amount::new(self.amount)?,
            currency: self.currency,
            payment_method: self.method,
            provider: self.provider,
            is_anonymous: self.anonymous,
            message: self.message.filter(|m| !m.is_empty()),
        })
    }
}

/// Reads donation submissions from a CSV source.
///
/// Wraps `csv::Reader` and yields `Result<DonationSubmission>` lazily, so
/// large files stream without loading into memory.
pub struct SubmissionReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> SubmissionReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn submissions(self) -> impl Iterator<Item = Result<DonationSubmission>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(Error::from))
    }
}
