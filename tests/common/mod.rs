use chrono::{Duration, Utc};
use givehub::application::orchestrator::{DonationOrchestrator, DonationRequest};
use givehub::config::PaymentConfig;
use givehub::domain::campaign::{Campaign, CampaignStatus, NewCampaign};
use givehub::domain::donation::{CampaignId, PaymentMethod, UserId};
use givehub::domain::money::Amount;
use givehub::domain::ports::CampaignRepository;
use givehub::infrastructure::cache::MemoryCache;
use givehub::infrastructure::cached::KeyedInvalidation;
use givehub::infrastructure::memory::MemoryStore;
use givehub::infrastructure::notify::LogNotifier;
use givehub::payment::{MockProvider, ProviderRegistry};
use rust_decimal::Decimal;
use std::sync::Arc;

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
    pub orchestrator: DonationOrchestrator,
}

/// Wires the full stack with the mock provider, the way `main` does.
pub fn app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryCache::new());
    let mut providers = ProviderRegistry::new();
    providers.register(Arc::new(MockProvider::new()));

    let orchestrator = DonationOrchestrator::new(
        store.clone(),
        store.clone(),
        store.clone(),
        providers,
        Arc::new(KeyedInvalidation::new(cache.clone())),
        Arc::new(LogNotifier::new()),
        PaymentConfig::default(),
    )
    .expect("orchestrator construction");

    TestApp {
        store,
        cache,
        orchestrator,
    }
}

pub async fn seed_campaign(store: &MemoryStore, title: &str, goal: Decimal) -> Campaign {
    let now = Utc::now();
    store
        .create(NewCampaign {
            title: title.to_string(),
            slug: None,
            description: String::new(),
            category: "community".to_string(),
            user_id: 1,
            goal_amount: Amount::new(goal).expect("goal amount"),
            status: CampaignStatus::Active,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(30),
            is_featured: false,
        })
        .await
        .expect("campaign seed")
}

pub fn donation_request(
    campaign_id: CampaignId,
    donor: UserId,
    amount: Decimal,
) -> DonationRequest {
    DonationRequest {
        campaign_id,
        user_id: donor,
        amount: Amount::new(amount).expect("donation amount"),
        currency: None,
        payment_method: PaymentMethod::CreditCard,
        provider: None,
        is_anonymous: false,
        message: None,
    }
}
