use crate::domain::donation::DonationStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("campaign is not available for donations")]
    CampaignUnavailable,
    #[error("illegal donation transition from {from} to {to}")]
    InvalidStateTransition {
        from: DonationStatus,
        to: DonationStatus,
    },
    #[error("could not generate a unique donation number after {0} attempts")]
    NumberGenerationExhausted(u32),
    #[error("no payment provider available")]
    PaymentProviderUnavailable,
    #[error("payment declined: {0}")]
    PaymentDeclined(String),
    #[error("refund amount exceeds the original donation amount")]
    RefundExceedsOriginal,
    #[error("donation number {0} is already taken")]
    DuplicateDonationNumber(String),
    #[error("{0} {1} not found")]
    NotFound(&'static str, u64),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Cache invalidation error: {0}")]
    CacheInvalidationError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
