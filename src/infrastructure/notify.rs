use crate::domain::ports::{Notification, NotificationDispatcher};
use async_trait::async_trait;
use tracing::info;

/// Notification sink that writes structured log lines.
///
/// Stands in for the external delivery pipeline (email, chat hooks). The
/// orchestrator treats dispatch as fire-and-forget either way.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationDispatcher for LogNotifier {
    async fn notify(&self, notification: Notification) {
        match &notification {
            Notification::DonationCompleted(donation)
            | Notification::DonationFailed(donation)
            | Notification::DonationRefunded(donation) => {
                info!(
                    kind = notification.kind(),
                    donation_number = %donation.donation_number,
                    campaign_id = donation.campaign_id,
                    amount = %donation.amount,
                    "notification dispatched"
                );
            }
            Notification::CampaignGoalReached(campaign) => {
                info!(
                    kind = notification.kind(),
                    campaign_id = campaign.id,
                    slug = %campaign.slug,
                    current_amount = %campaign.current_amount,
                    "notification dispatched"
                );
            }
        }
    }
}
