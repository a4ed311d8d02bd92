mod common;

use common::{app, donation_request, seed_campaign};
use givehub::domain::donation::DonationStatus;
use givehub::domain::money::Amount;
use givehub::domain::ports::{Cache, CampaignRepository, DonationRepository};
use givehub::infrastructure::cached::{
    CachedCampaignRepository, CachedDonationRepository, keys,
};
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_settlement_never_leaves_stale_campaign_reads() {
    let app = app();
    let campaign = seed_campaign(&app.store, "Well", dec!(1000)).await;
    let cached = CachedCampaignRepository::new(app.store.clone(), app.cache.clone());

    // Warm the cache with the pre-donation totals.
    let before = cached.find(campaign.id).await.unwrap().unwrap();
    assert_eq!(before.current_amount, dec!(0));

    app.orchestrator
        .submit_donation(donation_request(campaign.id, 10, dec!(300)))
        .await
        .unwrap();

    // The settlement invalidated the entry, so the next read-through sees
    // the committed totals.
    let after = cached.find(campaign.id).await.unwrap().unwrap();
    assert_eq!(after.current_amount, dec!(300));
    assert_eq!(after.donors_count, 1);

    let by_slug = cached.find_by_slug(&campaign.slug).await.unwrap().unwrap();
    assert_eq!(by_slug.current_amount, dec!(300));
}

#[tokio::test]
async fn test_settlement_invalidates_donation_lists() {
    let app = app();
    let campaign = seed_campaign(&app.store, "Library", dec!(1000)).await;
    let cached = CachedDonationRepository::new(app.store.clone(), app.cache.clone());

    let outcome = app
        .orchestrator
        .submit_donation(donation_request(campaign.id, 10, dec!(500)))
        .await
        .unwrap();

    // Warm list and entity caches with the completed donation.
    let listed = cached.by_campaign(campaign.id).await.unwrap();
    assert_eq!(listed[0].status, DonationStatus::Completed);
    cached.find(outcome.donation.id).await.unwrap().unwrap();

    app.orchestrator
        .refund_donation(outcome.donation.id, Amount::new(dec!(500)).unwrap())
        .await
        .unwrap();

    let listed = cached.by_campaign(campaign.id).await.unwrap();
    assert_eq!(listed[0].status, DonationStatus::Refunded);
    let entity = cached.find(outcome.donation.id).await.unwrap().unwrap();
    assert_eq!(entity.status, DonationStatus::Refunded);
}

#[tokio::test]
async fn test_double_invalidation_is_idempotent() {
    let app = app();
    let campaign = seed_campaign(&app.store, "Park", dec!(1000)).await;
    let cached = CachedCampaignRepository::new(app.store.clone(), app.cache.clone());

    cached.find(campaign.id).await.unwrap();
    let key = keys::campaign_id(campaign.id);

    app.cache.forget(&key).await.unwrap();
    let after_once = cached.find(campaign.id).await.unwrap().unwrap();
    app.cache.forget(&key).await.unwrap();
    app.cache.forget(&key).await.unwrap();
    let after_twice = cached.find(campaign.id).await.unwrap().unwrap();

    assert_eq!(after_once, after_twice);
}

#[tokio::test]
async fn test_negative_slug_lookup_is_invalidated_by_create() {
    let app = app();
    let cached = CachedCampaignRepository::new(app.store.clone(), app.cache.clone());

    // Cache the miss first.
    assert!(cached.find_by_slug("winter-coats").await.unwrap().is_none());

    let created = cached
        .create(givehub::domain::campaign::NewCampaign {
            title: "Winter Coats".to_string(),
            slug: None,
            description: String::new(),
            category: "community".to_string(),
            user_id: 1,
            goal_amount: Amount::new(dec!(100)).unwrap(),
            status: givehub::domain::campaign::CampaignStatus::Active,
            start_date: chrono::Utc::now() - chrono::Duration::days(1),
            end_date: chrono::Utc::now() + chrono::Duration::days(7),
            is_featured: false,
        })
        .await
        .unwrap();

    let found = cached.find_by_slug("winter-coats").await.unwrap();
    assert_eq!(found.unwrap().id, created.id);
}

#[tokio::test]
async fn test_view_increments_bypass_invalidation() {
    let app = app();
    let campaign = seed_campaign(&app.store, "Museum", dec!(1000)).await;
    let cached = CachedCampaignRepository::new(app.store.clone(), app.cache.clone());

    cached.find(campaign.id).await.unwrap();
    cached.increment_views(campaign.id).await.unwrap();
    cached.increment_views(campaign.id).await.unwrap();

    // Cached reads may stay stale for views...
    let via_cache = cached.find(campaign.id).await.unwrap().unwrap();
    assert_eq!(via_cache.views_count, 0);
    // ...but the store is current, and financial fields were never stale.
    let stored = CampaignRepository::find(app.store.as_ref(), campaign.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.views_count, 2);
    assert_eq!(stored.current_amount, via_cache.current_amount);
}

#[tokio::test]
async fn test_failed_settlement_still_invalidates_donation_keys() {
    let app = app();
    let campaign = seed_campaign(&app.store, "Harbor", dec!(1000)).await;
    let cached = CachedDonationRepository::new(app.store.clone(), app.cache.clone());

    // Cache the empty donor history, then fail a donation for that donor.
    assert!(cached.by_donor(10).await.unwrap().is_empty());

    app.orchestrator
        .submit_donation(donation_request(campaign.id, 10, dec!(666)))
        .await
        .unwrap();

    let history = cached.by_donor(10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, DonationStatus::Failed);
}
