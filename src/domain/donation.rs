use crate::domain::money::{Amount, Currency};
use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

pub type DonationId = u64;
pub type CampaignId = u64;
pub type UserId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DonationStatus::Pending => "pending",
            DonationStatus::Completed => "completed",
            DonationStatus::Failed => "failed",
            DonationStatus::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Paypal,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single donation record.
///
/// Created in `pending` by the orchestrator and mutated only through the
/// transition methods below. Terminal rows are immutable apart from the
/// modeled `completed -> refunded` path; the externally visible
/// `donation_number` is assigned exactly once, at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    pub id: DonationId,
    pub donation_number: String,
    pub user_id: UserId,
    pub campaign_id: CampaignId,
    pub amount: Amount,
    pub currency: Currency,
    pub status: DonationStatus,
    pub payment_method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub payment_details: Value,
    pub is_anonymous: bool,
    pub message: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
}

impl Donation {
    /// Builds a new donation in `pending`. The store assigns the surrogate id
    /// on insert; `donation_number` must already be generated.
    #[allow(clippy::too_many_arguments)]
    pub fn pending(
        donation_number: String,
        user_id: UserId,
        campaign_id: CampaignId,
        amount: Amount,
        currency: Currency,
        payment_method: PaymentMethod,
        is_anonymous: bool,
        message: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            donation_number,
            user_id,
            campaign_id,
            amount,
            currency,
            status: DonationStatus::Pending,
            payment_method,
            transaction_id: None,
            payment_details: Value::Null,
            is_anonymous,
            message,
            failure_reason: None,
            created_at,
            paid_at: None,
            failed_at: None,
        }
    }

    /// `pending -> completed`. Requires the provider's transaction id.
    pub fn complete(
        &mut self,
        transaction_id: &str,
        details: Value,
        at: DateTime<Utc>,
    ) -> Result<(), Error> {
        if self.status != DonationStatus::Pending {
            return Err(Error::InvalidStateTransition {
                from: self.status,
                to: DonationStatus::Completed,
            });
        }
        if transaction_id.is_empty() {
            return Err(Error::ValidationError(
                "A transaction id is required to complete a donation".to_string(),
            ));
        }
        self.status = DonationStatus::Completed;
        self.transaction_id = Some(transaction_id.to_string());
        self.payment_details = details;
        self.paid_at = Some(at);
        Ok(())
    }

    /// `pending -> failed`. Requires a failure reason.
    pub fn fail(&mut self, reason: &str, at: DateTime<Utc>) -> Result<(), Error> {
        if self.status != DonationStatus::Pending {
            return Err(Error::InvalidStateTransition {
                from: self.status,
                to: DonationStatus::Failed,
            });
        }
        if reason.is_empty() {
            return Err(Error::ValidationError(
                "A failure reason is required to fail a donation".to_string(),
            ));
        }
        self.status = DonationStatus::Failed;
        self.failure_reason = Some(reason.to_string());
        self.failed_at = Some(at);
        Ok(())
    }

    /// `completed -> refunded`. The refunded amount may be partial at the
    /// provider, but never exceeds the original. The original transaction id
    /// stays in place; the refund id is recorded in `payment_details`.
    pub fn refund(
        &mut self,
        refund_transaction_id: &str,
        amount: Amount,
        at: DateTime<Utc>,
    ) -> Result<(), Error> {
        if self.status != DonationStatus::Completed {
            return Err(Error::InvalidStateTransition {
                from: self.status,
                to: DonationStatus::Refunded,
            });
        }
        if refund_transaction_id.is_empty() {
            return Err(Error::ValidationError(
                "A refund transaction id is required to refund a donation".to_string(),
            ));
        }
        if amount > self.amount {
            return Err(Error::RefundExceedsOriginal);
        }
        self.status = DonationStatus::Refunded;
        let refund = json!({
            "refund_transaction_id": refund_transaction_id,
            "refund_amount": amount.value(),
            "refunded_at": at,
        });
        match (&mut self.payment_details, refund) {
            (Value::Object(details), Value::Object(refund)) => details.extend(refund),
            (details, refund) => *details = refund,
        }
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.status == DonationStatus::Pending
    }

    pub fn is_completed(&self) -> bool {
        self.status == DonationStatus::Completed
    }

    /// Whether this donation contributes to its campaign's aggregates.
    pub fn counts_toward_totals(&self) -> bool {
        self.status == DonationStatus::Completed
    }

    /// The donor identity safe to expose downstream. Anonymous donations
    /// still count toward `donors_count`, but never surface the donor.
    pub fn public_donor(&self) -> Option<UserId> {
        (!self.is_anonymous).then_some(self.user_id)
    }

    /// The name of the provider that settled this donation, recorded in
    /// `payment_details` at settlement time.
    pub fn settled_provider(&self) -> Option<&str> {
        self.payment_details.get("provider").and_then(Value::as_str)
    }
}
