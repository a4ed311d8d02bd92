//! The payment-provider contract and its transient wire types.
//!
//! Providers normalize every outcome into [`PaymentResult`]: callers branch
//! on the `success` flag and the normalized `error_code`, never on
//! provider-specific failures.

pub mod mock;
pub mod registry;
pub mod stripe;

use crate::domain::donation::{CampaignId, Donation, DonationId, PaymentMethod, UserId};
use crate::domain::money::{Amount, Currency};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use mock::MockProvider;
pub use registry::ProviderRegistry;
pub use stripe::StripeProvider;

/// A charge request handed to a provider. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Amount,
    pub currency: Currency,
    pub donation_id: DonationId,
    pub user_id: UserId,
    pub campaign_id: CampaignId,
    pub payment_method: PaymentMethod,
    pub metadata: Value,
}

/// The normalized outcome of a charge or refund attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResult {
    pub success: bool,
    pub transaction_id: Option<String>,
    pub status: String,
    pub message: String,
    pub error_code: Option<String>,
    pub data: Value,
}

impl PaymentResult {
    pub fn success(transaction_id: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            transaction_id: Some(transaction_id.into()),
            status: "completed".to_string(),
            message: "Payment processed successfully".to_string(),
            error_code: None,
            data,
        }
    }

    pub fn failure(message: impl Into<String>, error_code: impl Into<String>) -> Self {
        Self {
            success: false,
            transaction_id: None,
            status: "failed".to_string(),
            message: message.into(),
            error_code: Some(error_code.into()),
            data: Value::Null,
        }
    }
}

/// A pre-authorization handle for providers that require client-side
/// confirmation. Best-effort: providers without the concept return `None`
/// from [`PaymentProvider::create_payment_intent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: Amount,
    pub currency: Currency,
    pub status: String,
    pub metadata: Value,
}

/// The outcome of validating an asynchronous payment confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentVerification {
    pub valid: bool,
    pub transaction_id: Option<String>,
    pub status: String,
    pub data: Value,
}

impl PaymentVerification {
    pub fn valid(transaction_id: impl Into<String>, status: impl Into<String>, data: Value) -> Self {
        Self {
            valid: true,
            transaction_id: Some(transaction_id.into()),
            status: status.into(),
            data,
        }
    }

    pub fn invalid(data: Value) -> Self {
        Self {
            valid: false,
            transaction_id: None,
            status: "invalid".to_string(),
            data,
        }
    }
}

/// Uniform contract over payment providers.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn supported_methods(&self) -> &[PaymentMethod];

    /// Performs the charge. At most one call per donation per attempt; the
    /// orchestrator never re-invokes after a terminal result.
    async fn process_payment(&self, request: &PaymentRequest) -> PaymentResult;

    /// Optional pre-authorization step.
    async fn create_payment_intent(&self, donation: &Donation) -> Option<PaymentIntent>;

    /// Validates a confirmation against the provider's own transaction-id
    /// shape. Purely syntactic: unrecognized shapes are rejected without any
    /// network call.
    fn verify_payment(&self, transaction_id: &str, data: &Value) -> PaymentVerification;

    /// Issues a (possibly partial) refund. The returned transaction id is
    /// distinct from the original.
    async fn refund_payment(&self, transaction_id: &str, amount: Amount) -> PaymentResult;
}

/// Uppercase alphanumeric token for simulated provider references.
pub(crate) fn random_token(len: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
