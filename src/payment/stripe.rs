use crate::domain::donation::{Donation, PaymentMethod};
use crate::domain::money::Amount;
use crate::payment::{
    PaymentIntent, PaymentProvider, PaymentRequest, PaymentResult, PaymentVerification,
    random_token,
};
use async_trait::async_trait;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tracing::{info, warn};

const METHODS: &[PaymentMethod] = &[PaymentMethod::CreditCard, PaymentMethod::DebitCard];

/// Stripe-style external gateway driver.
///
/// The network calls are simulated; the id formats, the payment-intent
/// handshake and the refund shape follow the real gateway so the rest of the
/// system exercises the same contract it would in production.
pub struct StripeProvider {
    #[allow(dead_code)]
    secret_key: String,
    publishable_key: String,
}

impl StripeProvider {
    pub fn new(secret_key: impl Into<String>, publishable_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            publishable_key: publishable_key.into(),
        }
    }

    pub fn publishable_key(&self) -> &str {
        &self.publishable_key
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    fn name(&self) -> &'static str {
        "stripe"
    }

    fn supported_methods(&self) -> &[PaymentMethod] {
        METHODS
    }

    async fn process_payment(&self, request: &PaymentRequest) -> PaymentResult {
        // Simulation threshold: charges at or above 1000 are declined.
        if request.amount.value() >= dec!(1000) {
            warn!(
                donation_id = request.donation_id,
                amount = %request.amount,
                "stripe charge declined"
            );
            return PaymentResult::failure("Payment failed", "payment_declined");
        }

        let transaction_id = format!("stripe_{}", random_token(14).to_lowercase());
        info!(
            donation_id = request.donation_id,
            transaction_id = %transaction_id,
            amount = %request.amount,
            "stripe charge settled"
        );
        PaymentResult::success(
            transaction_id,
            json!({
                "provider": "stripe",
                "amount": request.amount.value(),
                "currency": request.currency,
            }),
        )
    }

    async fn create_payment_intent(&self, donation: &Donation) -> Option<PaymentIntent> {
        let id = format!("pi_{}", random_token(14).to_lowercase());
        let client_secret = format!("{id}_secret_{}", random_token(14).to_lowercase());
        Some(PaymentIntent {
            id,
            client_secret,
            amount: donation.amount,
            currency: donation.currency,
            status: "requires_payment_method".to_string(),
            metadata: json!({
                "donation_id": donation.id,
                "campaign_id": donation.campaign_id,
            }),
        })
    }

    fn verify_payment(&self, transaction_id: &str, data: &Value) -> PaymentVerification {
        if transaction_id.starts_with("stripe_") {
            PaymentVerification::valid(transaction_id, "succeeded", data.clone())
        } else {
            PaymentVerification::invalid(data.clone())
        }
    }

    async fn refund_payment(&self, transaction_id: &str, amount: Amount) -> PaymentResult {
        if !transaction_id.starts_with("stripe_") {
            return PaymentResult::failure("Transaction not found", "NOT_FOUND");
        }
        let refund_id = format!("re_{}", random_token(14).to_lowercase());
        info!(
            transaction_id = %transaction_id,
            refund_id = %refund_id,
            amount = %amount,
            "stripe refund settled"
        );
        PaymentResult::success(
            refund_id,
            json!({
                "original_transaction": transaction_id,
                "refund_amount": amount.value(),
            }),
        )
    }
}
