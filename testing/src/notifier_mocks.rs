//! Notifier that records what it was asked to deliver.

use signup_ledger_core::notification::{
    Notification, NotificationError, NotificationKind, Notifier, NotifyFuture,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Recording notifier for tests.
///
/// Every call is recorded, including the ones it is told to fail, so tests
/// can assert both on what was attempted and on how failures were handled.
///
/// # Example
///
/// ```
/// use signup_ledger_testing::RecordingNotifier;
///
/// let notifier = RecordingNotifier::new();
/// notifier.set_failing(true);
/// assert!(notifier.sent().is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    failing: Arc<AtomicBool>,
    delay: Option<Duration>,
}

impl RecordingNotifier {
    /// Create a notifier that accepts everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a notifier that rejects everything
    #[must_use]
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.set_failing(true);
        notifier
    }

    /// Delay every delivery by `delay` before recording it.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Toggle failure mode
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every notification attempted so far, in call order.
    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Attempted notifications for one recipient address.
    #[must_use]
    pub fn sent_to(&self, recipient: &str) -> Vec<Notification> {
        self.sent()
            .into_iter()
            .filter(|n| n.recipient == recipient)
            .collect()
    }

    /// Kinds of every attempted notification, in call order.
    #[must_use]
    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.sent().into_iter().map(|n| n.kind).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) -> NotifyFuture<'_> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let recipient = notification.recipient.clone();
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(notification);

            if self.failing.load(Ordering::SeqCst) {
                return Err(NotificationError::Delivery(format!(
                    "recording notifier rejected message to {recipient}"
                )));
            }
            Ok(())
        })
    }
}
