//! Notification formatting and delivery.
//!
//! [`format_notification`] turns a matched [`Item`] into a
//! [`NotificationPayload`]; a [`NotificationSink`] delivers it.  The only
//! sink shipped is [`WebhookSink`], which POSTs the payload as JSON.

mod format;
mod webhook;

pub use format::{format_notification, NotificationPayload};
pub use webhook::WebhookSink;

use chrono::{DateTime, Utc};

use crate::source::Item;

/// An item that matched at least one keyword.  Lives only for the duration
/// of one notify call.
#[derive(Debug, Clone)]
pub struct MatchResult<'a> {
    pub item: &'a Item,
    /// Non-empty, in keyword-list order.
    pub keywords: Vec<String>,
    pub detected_at: DateTime<Utc>,
}

impl MatchResult<'_> {
    pub fn payload(&self) -> NotificationPayload {
        format_notification(self.item, &self.keywords, &self.item.channel)
    }
}

/// Result of a single delivery attempt.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

/// Anything that can deliver a [`NotificationPayload`].
///
/// Delivery never returns an error: transport problems and rejected
/// requests are both reported as [`DeliveryOutcome::Failed`].
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, payload: &NotificationPayload) -> DeliveryOutcome;
}
