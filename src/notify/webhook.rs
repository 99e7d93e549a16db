//! Notifier implementations: HTTP webhook and log-only.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{ApprovalNotification, Notifier, NotifyError};

/// Body posted to the messaging gateway.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    to: Option<&'a str>,
    message: String,
    approval: &'a ApprovalNotification,
}

/// Posts approval requests as JSON to a messaging gateway (WhatsApp bridge
/// or similar).
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    recipient: Option<String>,
}

impl WebhookNotifier {
    /// Creates a notifier posting to `url` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        url: impl Into<String>,
        recipient: Option<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            recipient,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &ApprovalNotification) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            to: self.recipient.as_deref(),
            message: notification.message(),
            approval: notification,
        };
        let response = self.client.post(&self.url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        tracing::debug!(approval_id = %notification.approval_id, "approval notification delivered");
        Ok(())
    }
}

/// Writes approval requests to the log; used when no gateway is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &ApprovalNotification) -> Result<(), NotifyError> {
        tracing::info!(
            approval_id = %notification.approval_id,
            room_id = %notification.room_id,
            message = %notification.message(),
            "approval notification (no gateway configured)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tokio_test::{assert_err, assert_ok};

    use crate::domain::RoomId;
    use crate::notify::PriceDirection;

    fn notification() -> ApprovalNotification {
        ApprovalNotification {
            approval_id: uuid::Uuid::new_v4(),
            room_id: RoomId::new(),
            room_name: "Standard Twin".into(),
            old_price: dec!(400000),
            new_price: dec!(340000),
            change_pct: dec!(15),
            direction: PriceDirection::Decrease,
            occupancy_rate: 20.0,
            booked_units: 2,
            total_allotment: 10,
            expires_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn log_notifier_never_fails() {
        assert_ok!(LogNotifier.notify(&notification()).await);
    }

    #[tokio::test]
    async fn webhook_reports_unreachable_gateway() {
        let Ok(notifier) =
            WebhookNotifier::new("http://127.0.0.1:1/notify", None, Duration::from_millis(300))
        else {
            return;
        };
        assert_err!(notifier.notify(&notification()).await);
    }
}
