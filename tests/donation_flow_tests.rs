mod common;

use common::{app, donation_request, seed_campaign};
use givehub::domain::donation::DonationStatus;
use givehub::domain::money::Amount;
use givehub::domain::ports::{CampaignRepository, DonationRepository};
use givehub::error::Error;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_two_donations_reach_goal() {
    let app = app();
    let campaign = seed_campaign(&app.store, "Community Well", dec!(1000)).await;

    let first = app
        .orchestrator
        .submit_donation(donation_request(campaign.id, 10, dec!(400)))
        .await
        .unwrap();
    let second = app
        .orchestrator
        .submit_donation(donation_request(campaign.id, 11, dec!(700)))
        .await
        .unwrap();

    assert_eq!(first.donation.status, DonationStatus::Completed);
    assert_eq!(second.donation.status, DonationStatus::Completed);

    let campaign = second.campaign.unwrap();
    assert_eq!(campaign.current_amount, dec!(1100));
    assert_eq!(campaign.donors_count, 2);
    assert!(campaign.has_reached_goal());
}

#[tokio::test]
async fn test_declined_donation_fails_and_totals_unchanged() {
    let app = app();
    let campaign = seed_campaign(&app.store, "Book Drive", dec!(1000)).await;

    let outcome = app
        .orchestrator
        .submit_donation(donation_request(campaign.id, 10, dec!(666)))
        .await
        .unwrap();

    assert_eq!(outcome.donation.status, DonationStatus::Failed);
    let reason = outcome.donation.failure_reason.unwrap();
    assert!(!reason.is_empty());
    assert_eq!(reason, "Payment declined by bank");

    let stored = CampaignRepository::find(app.store.as_ref(), campaign.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.current_amount, dec!(0));
    assert_eq!(stored.donors_count, 0);
}

#[tokio::test]
async fn test_limit_exceeded_fails_and_totals_unchanged() {
    let app = app();
    let campaign = seed_campaign(&app.store, "Marathon", dec!(50000)).await;

    let outcome = app
        .orchestrator
        .submit_donation(donation_request(campaign.id, 10, dec!(12000)))
        .await
        .unwrap();

    assert_eq!(outcome.donation.status, DonationStatus::Failed);
    assert_eq!(
        outcome.donation.failure_reason.as_deref(),
        Some("Transaction limit exceeded")
    );

    let stored = CampaignRepository::find(app.store.as_ref(), campaign.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.current_amount, dec!(0));
}

#[tokio::test]
async fn test_donation_number_is_stable_across_reads() {
    let app = app();
    let campaign = seed_campaign(&app.store, "Garden", dec!(500)).await;

    let outcome = app
        .orchestrator
        .submit_donation(donation_request(campaign.id, 10, dec!(25)))
        .await
        .unwrap();
    let number = outcome.donation.donation_number.clone();
    assert!(number.starts_with("DON-"));
    assert_eq!(number.split('-').count(), 3);

    let by_id = DonationRepository::find(app.store.as_ref(), outcome.donation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_id.donation_number, number);

    let by_number = app
        .store
        .find_by_number(&number)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_number.id, outcome.donation.id);

    // Still the same after settlement mutated the row.
    assert_eq!(by_number.donation_number, number);
    assert_eq!(by_number.status, DonationStatus::Completed);
}

#[tokio::test]
async fn test_refund_drops_full_contribution_from_aggregate() {
    let app = app();
    let campaign = seed_campaign(&app.store, "Meals", dec!(1000)).await;

    let donated = app
        .orchestrator
        .submit_donation(donation_request(campaign.id, 10, dec!(500)))
        .await
        .unwrap();
    assert_eq!(donated.campaign.as_ref().unwrap().current_amount, dec!(500));

    // A partial refund of 200 still excludes the whole 500 from the totals.
    let refunded = app
        .orchestrator
        .refund_donation(donated.donation.id, Amount::new(dec!(200)).unwrap())
        .await
        .unwrap();

    assert_eq!(refunded.donation.status, DonationStatus::Refunded);
    let refund_id = refunded.payment.transaction_id.unwrap();
    assert_ne!(
        Some(refund_id.as_str()),
        refunded.donation.transaction_id.as_deref()
    );

    let campaign = refunded.campaign.unwrap();
    assert_eq!(campaign.current_amount, dec!(0));
    assert_eq!(campaign.donors_count, 0);
}

#[tokio::test]
async fn test_refund_of_pending_or_failed_is_illegal() {
    let app = app();
    let campaign = seed_campaign(&app.store, "Tools", dec!(1000)).await;

    let failed = app
        .orchestrator
        .submit_donation(donation_request(campaign.id, 10, dec!(666)))
        .await
        .unwrap();

    let result = app
        .orchestrator
        .refund_donation(failed.donation.id, Amount::new(dec!(10)).unwrap())
        .await;
    assert!(matches!(result, Err(Error::InvalidStateTransition { .. })));
}

#[tokio::test]
async fn test_retry_is_a_new_donation_not_an_overwrite() {
    let app = app();
    let campaign = seed_campaign(&app.store, "Choir", dec!(1000)).await;

    let failed = app
        .orchestrator
        .submit_donation(donation_request(campaign.id, 10, dec!(666)))
        .await
        .unwrap();
    let retried = app
        .orchestrator
        .submit_donation(donation_request(campaign.id, 10, dec!(60)))
        .await
        .unwrap();

    assert_ne!(failed.donation.id, retried.donation.id);
    assert_ne!(
        failed.donation.donation_number,
        retried.donation.donation_number
    );

    // The failed attempt survives as the audit trail.
    let first = DonationRepository::find(app.store.as_ref(), failed.donation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.status, DonationStatus::Failed);

    let rows = DonationRepository::by_campaign(app.store.as_ref(), campaign.id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_anonymous_donation_counts_but_hides_donor() {
    let app = app();
    let campaign = seed_campaign(&app.store, "Shelter", dec!(1000)).await;

    let mut request = donation_request(campaign.id, 42, dec!(75));
    request.is_anonymous = true;
    let outcome = app.orchestrator.submit_donation(request).await.unwrap();

    assert_eq!(outcome.donation.public_donor(), None);
    assert_eq!(outcome.campaign.unwrap().donors_count, 1);
}
