//! Outbound approval notifications.
//!
//! The engine hands an [`ApprovalNotification`] to an injected [`Notifier`]
//! whenever a price change needs human sign-off. Delivery is best-effort:
//! the engine logs a [`NotifyError`] and carries on.

pub mod webhook;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::RoomId;

pub use webhook::{LogNotifier, WebhookNotifier};

/// Delivery failure.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Transport-level failure.
    #[error("notification transport error: {0}")]
    Transport(String),

    /// Remote side rejected the message.
    #[error("notification rejected with status {0}")]
    Rejected(u16),
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Direction of a proposed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceDirection {
    /// New price is higher.
    Increase,
    /// New price is lower.
    Decrease,
}

impl fmt::Display for PriceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increase => f.write_str("increase"),
            Self::Decrease => f.write_str("decrease"),
        }
    }
}

/// Everything an approver needs to decide on a price change.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalNotification {
    /// Approval row the reply resolves.
    pub approval_id: Uuid,
    /// Room being repriced.
    pub room_id: RoomId,
    /// Room display name.
    pub room_name: String,
    /// Current price.
    pub old_price: Decimal,
    /// Proposed price.
    pub new_price: Decimal,
    /// Absolute change in percent.
    pub change_pct: Decimal,
    /// Up or down.
    pub direction: PriceDirection,
    /// Occupancy rate behind the proposal.
    pub occupancy_rate: f64,
    /// Units booked.
    pub booked_units: i32,
    /// Units offered.
    pub total_allotment: i32,
    /// Decision deadline.
    pub expires_at: DateTime<Utc>,
}

impl ApprovalNotification {
    /// Renders the free-form text message sent to approvers.
    #[must_use]
    pub fn message(&self) -> String {
        let sign = match self.direction {
            PriceDirection::Increase => '+',
            PriceDirection::Decrease => '-',
        };
        format!(
            "PRICE APPROVAL REQUIRED\n\
             Room: {name}\n\
             Current price: {old}\n\
             Proposed price: {new}\n\
             Change: {sign}{pct:.1}% ({direction})\n\
             Occupancy: {rate:.1}% ({booked}/{total} booked)\n\
             Expires: {expires} UTC\n\
             \n\
             Reply APPROVE {room_id} to apply, or REJECT {room_id} [reason] to keep the current price.",
            name = self.room_name,
            old = format_price(self.old_price),
            new = format_price(self.new_price),
            pct = self
                .change_pct
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero),
            direction = self.direction,
            rate = self.occupancy_rate,
            booked = self.booked_units,
            total = self.total_allotment,
            expires = self.expires_at.format("%Y-%m-%d %H:%M"),
            room_id = self.room_id,
        )
    }
}

/// Formats a price as whole currency units with `.` thousands separators,
/// e.g. `Rp 1.250.000`.
#[must_use]
pub fn format_price(price: Decimal) -> String {
    let whole = price
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .abs()
        .trunc()
        .to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if price.is_sign_negative() && !price.is_zero() {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

/// Fire-and-forget delivery capability.
#[async_trait]
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Delivers one approval request.
    async fn notify(&self, notification: &ApprovalNotification) -> Result<(), NotifyError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use super::*;

    /// Records every notification; optionally fails each delivery.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingNotifier {
        pub(crate) sent: Mutex<Vec<ApprovalNotification>>,
        pub(crate) fail: bool,
    }

    impl RecordingNotifier {
        pub(crate) fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub(crate) fn count(&self) -> usize {
            self.sent.lock().len()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, notification: &ApprovalNotification) -> Result<(), NotifyError> {
            self.sent.lock().push(notification.clone());
            if self.fail {
                return Err(NotifyError::Transport("gateway unreachable".to_string()));
            }
            Ok(())
        }
    }
}
