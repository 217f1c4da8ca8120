//! Notification collaborator.
//!
//! The engine decides *that* a user should hear about a transition; a
//! [`Notifier`] decides *how*. Delivery is best-effort: the caller logs and
//! counts failures but never lets them affect a registration outcome.

use crate::catalog::EventDetails;
use crate::registration::{EventId, UserId};
use std::fmt::Write as _;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by [`Notifier::notify`].
pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + 'a>>;

/// Errors a notifier can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// The recipient address is unusable.
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The delivery channel failed.
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Which transition a notification reports.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    /// The user got a seat.
    Confirmed,
    /// The user was queued.
    Waitlisted {
        /// 1-based position at the time of queueing
        position: usize,
    },
    /// The user moved from the waitlist into a seat.
    Promoted,
    /// The user's registration was withdrawn.
    Cancelled,
}

impl NotificationKind {
    /// Short label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Waitlisted { .. } => "waitlisted",
            Self::Promoted => "promoted",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A message to one user about one event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// What happened
    pub kind: NotificationKind,
    /// Recipient address
    pub recipient: String,
    /// Recipient user
    pub user_id: UserId,
    /// Event concerned
    pub event_id: EventId,
    /// Event title as recorded on the registration
    pub event_title: String,
    /// Catalog metadata, when known
    pub details: Option<EventDetails>,
}

impl Notification {
    /// Subject line.
    ///
    /// ```
    /// use signup_ledger_core::notification::{Notification, NotificationKind};
    /// use signup_ledger_core::registration::{EventId, UserId};
    ///
    /// let notification = Notification {
    ///     kind: NotificationKind::Waitlisted { position: 2 },
    ///     recipient: "anna@example.com".to_string(),
    ///     user_id: UserId::new("anna"),
    ///     event_id: EventId::new("73"),
    ///     event_title: "Yoga & Mindfulness".to_string(),
    ///     details: None,
    /// };
    /// assert_eq!(notification.subject(), "Waitlist Confirmation: Yoga & Mindfulness");
    /// ```
    #[must_use]
    pub fn subject(&self) -> String {
        let title = &self.event_title;
        match self.kind {
            NotificationKind::Confirmed => format!("Registration Confirmed: {title}"),
            NotificationKind::Waitlisted { .. } => format!("Waitlist Confirmation: {title}"),
            NotificationKind::Promoted => format!("You Got a Spot: {title}"),
            NotificationKind::Cancelled => format!("Registration Cancelled: {title}"),
        }
    }

    /// Plain-text body.
    #[must_use]
    pub fn body(&self) -> String {
        let mut body = String::new();
        let lead = match self.kind {
            NotificationKind::Confirmed => {
                "You have successfully registered for the following event."
            }
            NotificationKind::Waitlisted { .. } => {
                "The event is currently full, but you have been added to the waitlist."
            }
            NotificationKind::Promoted => {
                "A spot opened up and you have been moved from the waitlist to the attendee list."
            }
            NotificationKind::Cancelled => "Your registration has been cancelled for the following event.",
        };
        let _ = writeln!(body, "{lead}");
        let _ = writeln!(body);
        let _ = writeln!(body, "Event: {}", self.event_title);

        if let Some(details) = &self.details {
            let _ = writeln!(
                body,
                "When: {} - {}",
                details.start_time.format("%Y-%m-%d %H:%M"),
                details.end_time.format("%H:%M UTC")
            );
            if !details.location.is_empty() {
                let _ = writeln!(body, "Where: {}", details.location);
            }
        }

        match self.kind {
            NotificationKind::Waitlisted { position } => {
                let _ = writeln!(body, "Your position: #{position}");
                let _ = writeln!(body);
                let _ = writeln!(
                    body,
                    "If a spot becomes available you will be registered automatically and notified."
                );
            }
            NotificationKind::Promoted => {
                let _ = writeln!(body);
                let _ = writeln!(
                    body,
                    "If you can no longer attend, please cancel so someone else from the waitlist can take your spot."
                );
            }
            NotificationKind::Cancelled => {
                let _ = writeln!(body);
                let _ = writeln!(body, "You can sign up again at any time.");
            }
            NotificationKind::Confirmed => {}
        }

        body
    }
}

/// Best-effort delivery of user notifications.
///
/// Returns a boxed future so notifiers can be shared as `Arc<dyn Notifier>`.
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// Returns a [`NotificationError`] if delivery failed. Callers log it and
    /// carry on.
    fn notify(&self, notification: Notification) -> NotifyFuture<'_>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Category;
    use chrono::{TimeZone, Utc};

    fn notification(kind: NotificationKind) -> Notification {
        Notification {
            kind,
            recipient: "erik@example.com".to_string(),
            user_id: UserId::new("erik"),
            event_id: EventId::new("42"),
            event_title: "Tech Talk".to_string(),
            details: None,
        }
    }

    #[test]
    fn subjects_name_the_event() {
        assert_eq!(
            notification(NotificationKind::Confirmed).subject(),
            "Registration Confirmed: Tech Talk"
        );
        assert_eq!(
            notification(NotificationKind::Promoted).subject(),
            "You Got a Spot: Tech Talk"
        );
        assert_eq!(
            notification(NotificationKind::Cancelled).subject(),
            "Registration Cancelled: Tech Talk"
        );
    }

    #[test]
    fn waitlist_body_includes_position() {
        let body = notification(NotificationKind::Waitlisted { position: 3 }).body();
        assert!(body.contains("#3"));
        assert!(body.contains("Event: Tech Talk"));
    }

    #[test]
    fn body_includes_catalog_details_when_known() {
        let start = Utc.with_ymd_and_hms(2025, 11, 20, 17, 0, 0).single();
        let end = Utc.with_ymd_and_hms(2025, 11, 20, 18, 0, 0).single();
        let (Some(start_time), Some(end_time)) = (start, end) else {
            return;
        };

        let mut message = notification(NotificationKind::Confirmed);
        message.details = Some(EventDetails {
            id: EventId::new("42"),
            title: "Tech Talk".to_string(),
            start_time,
            end_time,
            location: "Auditorium".to_string(),
            category: Category::Social,
            max_seats: None,
        });

        let body = message.body();
        assert!(body.contains("When: 2025-11-20 17:00 - 18:00 UTC"));
        assert!(body.contains("Where: Auditorium"));
    }

    #[test]
    fn kind_labels() {
        assert_eq!(NotificationKind::Waitlisted { position: 1 }.as_str(), "waitlisted");
        assert_eq!(NotificationKind::Cancelled.as_str(), "cancelled");
    }
}
