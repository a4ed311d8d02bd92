use clap::Parser;
use givehub::application::orchestrator::DonationOrchestrator;
use givehub::config::PaymentConfig;
use givehub::domain::ports::CampaignRepository;
use givehub::infrastructure::cache::MemoryCache;
use givehub::infrastructure::cached::{CachedCampaignRepository, KeyedInvalidation};
use givehub::infrastructure::memory::MemoryStore;
use givehub::infrastructure::notify::LogNotifier;
use givehub::interfaces::csv::{CampaignSeedReader, SubmissionReader, SummaryWriter};
use givehub::payment::{MockProvider, ProviderRegistry, StripeProvider};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Replays a batch of donation submissions against seeded campaigns and
/// prints the resulting campaign totals as CSV.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Campaign seed CSV (title, owner, goal, category, days)
    campaigns: PathBuf,

    /// Donation submissions CSV (campaign, donor, amount, currency, method,
    /// provider, anonymous, message)
    donations: PathBuf,

    /// Default payment provider name
    #[arg(long, env = "PAYMENT_DEFAULT_PROVIDER")]
    provider: Option<String>,

    /// Registers the stripe driver when set
    #[arg(long, env = "STRIPE_SECRET_KEY")]
    stripe_secret_key: Option<String>,

    #[arg(long, env = "STRIPE_PUBLISHABLE_KEY", default_value = "pk_test_local")]
    stripe_publishable_key: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = PaymentConfig::from_env().into_diagnostic()?;
    if cli.provider.is_some() {
        config.default_provider = cli.provider.clone();
    }

    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryCache::new());

    let mut providers = ProviderRegistry::new();
    providers.register(Arc::new(MockProvider::new()));
    if let Some(secret_key) = &cli.stripe_secret_key {
        providers.register(Arc::new(StripeProvider::new(
            secret_key,
            &cli.stripe_publishable_key,
        )));
    }

    let orchestrator = DonationOrchestrator::new(
        store.clone(),
        store.clone(),
        store.clone(),
        providers,
        Arc::new(KeyedInvalidation::new(cache.clone())),
        Arc::new(LogNotifier::new()),
        config,
    )
    .into_diagnostic()?;

    // Reads go through the cache decorator, the same composition the HTTP
    // layer would use.
    let campaigns = CachedCampaignRepository::new(store.clone(), cache.clone());

    let mut seeded = Vec::new();
    let file = File::open(&cli.campaigns).into_diagnostic()?;
    for seed in CampaignSeedReader::new(file).seeds() {
        match seed.and_then(|s| s.into_new_campaign()) {
            Ok(new) => match campaigns.create(new).await {
                Ok(campaign) => seeded.push(campaign.id),
                Err(e) => eprintln!("Error seeding campaign: {e}"),
            },
            Err(e) => eprintln!("Error reading campaign seed: {e}"),
        }
    }

    let file = File::open(&cli.donations).into_diagnostic()?;
    for submission in SubmissionReader::new(file).submissions() {
        let submission = match submission {
            Ok(submission) => submission,
            Err(e) => {
                eprintln!("Error reading donation submission: {e}");
                continue;
            }
        };
        let campaign = match campaigns.find_by_slug(&submission.campaign).await {
            Ok(Some(campaign)) => campaign,
            Ok(None) => {
                eprintln!("Unknown campaign slug: {}", submission.campaign);
                continue;
            }
            Err(e) => {
                eprintln!("Error looking up campaign: {e}");
                continue;
            }
        };
        match submission.into_request(campaign.id) {
            Ok(request) => {
                if let Err(e) = orchestrator.submit_donation(request).await {
                    eprintln!("Error processing donation: {e}");
                }
            }
            Err(e) => eprintln!("Invalid donation submission: {e}"),
        }
    }

    // Collect final campaign state, bypassing the cache for fresh totals.
    let mut final_campaigns = Vec::with_capacity(seeded.len());
    for id in seeded {
        if let Some(campaign) = CampaignRepository::find(store.as_ref(), id)
            .await
            .into_diagnostic()?
        {
            final_campaigns.push(campaign);
        }
    }

    let stdout = io::stdout();
    let mut writer = SummaryWriter::new(stdout.lock());
    writer.write_campaigns(&final_campaigns).into_diagnostic()?;

    Ok(())
}
