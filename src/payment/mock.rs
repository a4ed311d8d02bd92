use crate::domain::donation::{Donation, PaymentMethod};
use crate::domain::money::Amount;
use crate::payment::{
    PaymentIntent, PaymentProvider, PaymentRequest, PaymentResult, PaymentVerification,
    random_token,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal_macros::dec;
use serde_json::{Value, json};

const METHODS: &[PaymentMethod] = &[
    PaymentMethod::CreditCard,
    PaymentMethod::DebitCard,
    PaymentMethod::Paypal,
    PaymentMethod::BankTransfer,
];

/// Simulated provider used in development and tests.
///
/// Outcomes are keyed off the requested amount so scenarios are
/// reproducible: 666 is declined, anything above 10 000 trips the
/// transaction limit, everything else settles.
#[derive(Debug, Default, Clone)]
pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn supported_methods(&self) -> &[PaymentMethod] {
        METHODS
    }

    async fn process_payment(&self, request: &PaymentRequest) -> PaymentResult {
        if request.amount.value() > dec!(10000) {
            return PaymentResult::failure("Transaction limit exceeded", "LIMIT_EXCEEDED");
        }
        if request.amount.value() == dec!(666) {
            return PaymentResult::failure("Payment declined by bank", "DECLINED");
        }

        let transaction_id = format!("MOCK-{}", random_token(16));
        PaymentResult::success(
            transaction_id,
            json!({
                "gateway": "mock",
                "timestamp": Utc::now(),
                "reference": format!("REF-{}", random_token(8)),
            }),
        )
    }

    async fn create_payment_intent(&self, _donation: &Donation) -> Option<PaymentIntent> {
        // No client-side confirmation step to simulate.
        None
    }

    fn verify_payment(&self, transaction_id: &str, data: &Value) -> PaymentVerification {
        if transaction_id.starts_with("MOCK-") {
            PaymentVerification::valid(
                transaction_id,
                "completed",
                json!({ "verified": true, "received": data }),
            )
        } else {
            PaymentVerification::invalid(data.clone())
        }
    }

    async fn refund_payment(&self, transaction_id: &str, amount: Amount) -> PaymentResult {
        if !transaction_id.starts_with("MOCK-") {
            return PaymentResult::failure("Transaction not found", "NOT_FOUND");
        }
        let refund_id = format!("REFUND-{}", random_token(16));
        PaymentResult::success(
            refund_id,
            json!({
                "original_transaction": transaction_id,
                "refund_amount": amount.value(),
                "refunded_at": Utc::now(),
            }),
        )
    }
}
