use crate::config::PaymentConfig;
use crate::domain::campaign::Campaign;
use crate::domain::donation::{
    CampaignId, Donation, DonationId, DonationStatus, PaymentMethod, UserId,
};
use crate::domain::money::{Amount, Currency};
use crate::domain::ports::{
    CacheInvalidationRef, CampaignRepositoryRef, DonationRepositoryRef, LedgerStoreRef,
    Notification, NotificationDispatcherRef, SettledDonation, Settlement,
};
use crate::error::{Error, Result};
use crate::payment::{
    PaymentIntent, PaymentRequest, PaymentResult, PaymentVerification, ProviderRegistry,
    random_token,
};
use chrono::{DateTime, Datelike, Utc};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

/// Bounded retries for donation-number generation before giving up.
const MAX_NUMBER_ATTEMPTS: u32 = 5;

/// A validated donation submission. Field syntax is checked upstream; only
/// business invariants are enforced here.
#[derive(Debug, Clone)]
pub struct DonationRequest {
    pub campaign_id: CampaignId,
    pub user_id: UserId,
    pub amount: Amount,
    pub currency: Option<Currency>,
    pub payment_method: PaymentMethod,
    /// Provider to charge through; `None` uses the configured default.
    pub provider: Option<String>,
    pub is_anonymous: bool,
    pub message: Option<String>,
}

/// What a submission or refund produced: the donation after settlement, the
/// campaign when its totals were recomputed, and the provider's normalized
/// result.
#[derive(Debug, Clone)]
pub struct DonationOutcome {
    pub donation: Donation,
    pub campaign: Option<Campaign>,
    pub payment: PaymentResult,
}

/// The transactional workflow that turns donation submissions into durable
/// ledger records.
///
/// Two transaction boundaries per submission: the pending insert commits
/// before the provider is called, and the settlement (status transition plus
/// campaign-aggregate recompute) commits afterwards. The provider call never
/// runs inside either; cache invalidation and notifications run after the
/// settlement commit and cannot roll it back.
pub struct DonationOrchestrator {
    ledger: LedgerStoreRef,
    campaigns: CampaignRepositoryRef,
    donations: DonationRepositoryRef,
    providers: ProviderRegistry,
    invalidation: CacheInvalidationRef,
    notifier: NotificationDispatcherRef,
    config: PaymentConfig,
}

impl DonationOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: LedgerStoreRef,
        campaigns: CampaignRepositoryRef,
        donations: DonationRepositoryRef,
        mut providers: ProviderRegistry,
        invalidation: CacheInvalidationRef,
        notifier: NotificationDispatcherRef,
        config: PaymentConfig,
    ) -> Result<Self> {
        if let Some(name) = &config.default_provider {
            providers.set_default(name)?;
        }
        Ok(Self {
            ledger,
            campaigns,
            donations,
            providers,
            invalidation,
            notifier,
            config,
        })
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Creates a donation and runs it through the payment provider.
    ///
    /// A provider failure is not an `Err`: the donation settles as `failed`
    /// with the normalized reason preserved, and the outcome carries the
    /// provider result. Retrying a failed payment means submitting a new
    /// donation; the failed row stays as the audit trail.
    pub async fn submit_donation(&self, request: DonationRequest) -> Result<DonationOutcome> {
        let currency = request.currency.unwrap_or(self.config.default_currency);
        if !self.config.supports(currency) {
            return Err(Error::ValidationError(format!(
                "Unsupported currency: {currency}"
            )));
        }

        // Resolve the provider before touching the ledger: an unknown name
        // is a configuration error, not a payment failure, and leaves no row.
        let provider = self
            .providers
            .resolve(request.provider.as_deref())
            .ok_or(Error::PaymentProviderUnavailable)?;

        let now = Utc::now();
        let campaign = self
            .campaigns
            .find(request.campaign_id)
            .await?
            .filter(|c| c.is_active(now))
            .ok_or(Error::CampaignUnavailable)?;

        // Durable pending row before any network call.
        let donation = self.insert_with_fresh_number(&request, currency, now).await?;
        info!(
            donation_id = donation.id,
            donation_number = %donation.donation_number,
            campaign_id = campaign.id,
            provider = provider.name(),
            amount = %donation.amount,
            "processing donation payment"
        );

        let payment_request = PaymentRequest {
            amount: donation.amount,
            currency,
            donation_id: donation.id,
            user_id: donation.user_id,
            campaign_id: donation.campaign_id,
            payment_method: donation.payment_method,
            metadata: json!({
                "donation_number": donation.donation_number,
                "campaign_title": campaign.title,
            }),
        };
        let result = provider.process_payment(&payment_request).await;

        let settlement = if result.success {
            match result.transaction_id.as_deref().filter(|id| !id.is_empty()) {
                Some(transaction_id) => Settlement::Completed {
                    transaction_id: transaction_id.to_string(),
                    details: settlement_details(provider.name(), &result.data),
                },
                None => Settlement::Failed {
                    reason: "Payment provider returned no transaction id".to_string(),
                },
            }
        } else {
            warn!(
                donation_id = donation.id,
                provider = provider.name(),
                error_code = result.error_code.as_deref().unwrap_or("unknown"),
                "donation payment failed"
            );
            let reason = if result.message.is_empty() {
                "Payment processing failed".to_string()
            } else {
                result.message.clone()
            };
            Settlement::Failed { reason }
        };

        let settled = self.ledger.apply_settlement(donation.id, settlement).await?;
        self.after_settlement(&settled).await;

        Ok(DonationOutcome {
            donation: settled.donation,
            campaign: settled.campaign,
            payment: result,
        })
    }

    /// Refunds a completed donation. The provider may honor a partial
    /// amount, but the campaign aggregate drops the donation entirely.
    pub async fn refund_donation(
        &self,
        donation_id: DonationId,
        amount: Amount,
    ) -> Result<DonationOutcome> {
        let donation = self
            .donations
            .find(donation_id)
            .await?
            .ok_or(Error::NotFound("donation", donation_id))?;
        if donation.status != DonationStatus::Completed {
            return Err(Error::InvalidStateTransition {
                from: donation.status,
                to: DonationStatus::Refunded,
            });
        }
        if amount > donation.amount {
            return Err(Error::RefundExceedsOriginal);
        }
        let transaction_id = donation.transaction_id.clone().ok_or_else(|| {
            Error::ValidationError("Completed donation has no transaction id".to_string())
        })?;

        // Prefer the provider recorded at settlement; fall back to matching
        // the transaction-id shape for rows settled before it was recorded.
        let provider = donation
            .settled_provider()
            .and_then(|name| self.providers.get(name))
            .or_else(|| self.providers.resolve_for_transaction(&transaction_id))
            .ok_or(Error::PaymentProviderUnavailable)?;

        let result = provider.refund_payment(&transaction_id, amount).await;
        if !result.success {
            warn!(
                donation_id,
                provider = provider.name(),
                error_code = result.error_code.as_deref().unwrap_or("unknown"),
                "refund failed"
            );
            return Err(Error::PaymentDeclined(result.message));
        }
        let refund_transaction_id = result
            .transaction_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                Error::PaymentDeclined("Refund returned no transaction id".to_string())
            })?;

        let settled = self
            .ledger
            .apply_settlement(
                donation_id,
                Settlement::Refunded {
                    refund_transaction_id,
                    amount,
                },
            )
            .await?;
        self.after_settlement(&settled).await;

        Ok(DonationOutcome {
            donation: settled.donation,
            campaign: settled.campaign,
            payment: result,
        })
    }

    /// Best-effort pre-authorization for providers with a client-side
    /// confirmation step.
    pub async fn create_payment_intent(
        &self,
        donation_id: DonationId,
        provider: Option<&str>,
    ) -> Result<Option<PaymentIntent>> {
        let donation = self
            .donations
            .find(donation_id)
            .await?
            .ok_or(Error::NotFound("donation", donation_id))?;
        let provider = self
            .providers
            .resolve(provider)
            .ok_or(Error::PaymentProviderUnavailable)?;
        Ok(provider.create_payment_intent(&donation).await)
    }

    /// Validates an asynchronous confirmation against the provider whose
    /// transaction-id shape matches.
    pub fn verify_payment(&self, transaction_id: &str, data: &Value) -> Result<PaymentVerification> {
        let provider = self
            .providers
            .resolve_for_transaction(transaction_id)
            .ok_or(Error::PaymentProviderUnavailable)?;
        Ok(provider.verify_payment(transaction_id, data))
    }

    async fn insert_with_fresh_number(
        &self,
        request: &DonationRequest,
        currency: Currency,
        now: DateTime<Utc>,
    ) -> Result<Donation> {
        for attempt in 1..=MAX_NUMBER_ATTEMPTS {
            let donation = Donation::pending(
                generate_donation_number(now),
                request.user_id,
                request.campaign_id,
                request.amount,
                currency,
                request.payment_method,
                request.is_anonymous,
                request.message.clone(),
                now,
            );
            match self.ledger.insert_pending(donation).await {
                Ok(donation) => return Ok(donation),
                Err(Error::DuplicateDonationNumber(number)) => {
                    debug!(attempt, number, "donation number collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::NumberGenerationExhausted(MAX_NUMBER_ATTEMPTS))
    }

    /// Post-commit side effects. Neither can undo the settlement: cache
    /// failures are absorbed by the invalidation port, and notification
    /// delivery is fire-and-forget.
    async fn after_settlement(&self, settled: &SettledDonation) {
        self.invalidation.invalidate_donation(&settled.donation).await;
        if let Some(campaign) = &settled.campaign {
            self.invalidation.invalidate_campaign(campaign).await;
        }

        let notification = match settled.donation.status {
            DonationStatus::Completed => Notification::DonationCompleted(settled.donation.clone()),
            DonationStatus::Failed => Notification::DonationFailed(settled.donation.clone()),
            DonationStatus::Refunded => Notification::DonationRefunded(settled.donation.clone()),
            DonationStatus::Pending => return,
        };
        self.notifier.notify(notification).await;

        if settled.donation.status == DonationStatus::Completed
            && let Some(campaign) = &settled.campaign
            && campaign.has_reached_goal()
        {
            self.notifier
                .notify(Notification::CampaignGoalReached(campaign.clone()))
                .await;
        }
    }
}

/// `DON-<year>-<6 random uppercase alphanumerics>`, unique per the store's
/// index; collisions are retried by the caller.
fn generate_donation_number(now: DateTime<Utc>) -> String {
    format!("DON-{}-{}", now.year(), random_token(6))
}

/// Provider result data enriched with the provider's name, so refunds can
/// route without parsing transaction-id prefixes.
fn settlement_details(provider: &'static str, data: &Value) -> Value {
    let mut details = match data {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other.clone());
            map
        }
    };
    details.insert("provider".to_string(), Value::String(provider.to_string()));
    Value::Object(details)
}
