//! Notifiers used by the server.
//!
//! [`ConsoleNotifier`] writes messages to the log and is the default.
//! [`SmtpNotifier`] sends them as plain-text email through an SMTP relay
//! and is selected with `NOTIFIER=smtp`.

use crate::config::{SmtpConfig, SmtpSecurity};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, Message, SmtpTransport, Transport};
use signup_ledger_core::notification::{Notification, NotificationError, Notifier, NotifyFuture};
use thiserror::Error;

/// Logs every notification through `tracing`.
///
/// Used when no delivery channel is configured. Recipients without an `@`
/// are rejected so that bad addresses show up as notification failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    /// Create a console notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) -> NotifyFuture<'_> {
        Box::pin(async move {
            if !notification.recipient.contains('@') {
                return Err(NotificationError::InvalidRecipient(notification.recipient));
            }

            tracing::info!(
                kind = notification.kind.as_str(),
                to = %notification.recipient,
                event_id = %notification.event_id,
                subject = %notification.subject(),
                "Notification"
            );
            tracing::debug!(body = %notification.body(), "Notification body");
            Ok(())
        })
    }
}

/// Errors raised while setting up the SMTP notifier.
#[derive(Error, Debug)]
pub enum SmtpSetupError {
    /// `SMTP_FROM_EMAIL` is not a valid address.
    #[error("Invalid sender address {address:?}: {reason}")]
    InvalidSender {
        /// Configured address
        address: String,
        /// Parser message
        reason: String,
    },

    /// The relay host cannot be used for TLS.
    #[error("SMTP relay error for {host}: {reason}")]
    Relay {
        /// Configured host
        host: String,
        /// Transport message
        reason: String,
    },
}

/// Sends notifications as plain-text email.
///
/// Each delivery runs the blocking lettre transport on the blocking pool.
/// Recipients that do not parse as a mailbox fail with
/// [`NotificationError::InvalidRecipient`], relay failures with
/// [`NotificationError::Delivery`].
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: SmtpTransport,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Build the transport and sender mailbox. No connection is opened.
    ///
    /// # Errors
    ///
    /// Returns [`SmtpSetupError`] if the sender address is invalid or the
    /// relay host cannot be used for TLS.
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpSetupError> {
        let address: Address =
            config
                .from_email
                .parse()
                .map_err(|e: lettre::address::AddressError| SmtpSetupError::InvalidSender {
                    address: config.from_email.clone(),
                    reason: e.to_string(),
                })?;
        let from = Mailbox::new(Some(config.from_name.clone()), address);

        let relay_error = |e: lettre::transport::smtp::Error| SmtpSetupError::Relay {
            host: config.host.clone(),
            reason: e.to_string(),
        };
        let mut builder = match config.security {
            SmtpSecurity::StartTls => {
                SmtpTransport::starttls_relay(&config.host).map_err(relay_error)?
            }
            SmtpSecurity::Tls => SmtpTransport::relay(&config.host).map_err(relay_error)?,
            SmtpSecurity::None => SmtpTransport::builder_dangerous(&config.host),
        }
        .port(config.port)
        .timeout(Some(config.timeout));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        } else {
            tracing::info!(host = %config.host, "SMTP relay configured without credentials");
        }

        Ok(Self {
            mailer: builder.build(),
            from,
        })
    }

    fn message(&self, notification: &Notification) -> Result<Message, NotificationError> {
        let to: Mailbox = notification
            .recipient
            .parse()
            .map_err(|_| NotificationError::InvalidRecipient(notification.recipient.clone()))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notification.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body())
            .map_err(|e| NotificationError::Delivery(format!("Failed to build email: {e}")))
    }
}

impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("from", &self.from.to_string())
            .finish_non_exhaustive()
    }
}

impl Notifier for SmtpNotifier {
    fn notify(&self, notification: Notification) -> NotifyFuture<'_> {
        Box::pin(async move {
            let email = self.message(&notification)?;
            let mailer = self.mailer.clone();

            tokio::task::spawn_blocking(move || mailer.send(&email))
                .await
                .map_err(|e| NotificationError::Delivery(format!("Email task failed: {e}")))?
                .map_err(|e| NotificationError::Delivery(format!("Failed to send email: {e}")))?;

            tracing::info!(
                kind = notification.kind.as_str(),
                to = %notification.recipient,
                event_id = %notification.event_id,
                "Notification email sent"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use signup_ledger_core::notification::NotificationKind;
    use signup_ledger_core::registration::{EventId, UserId};

    fn notification(recipient: &str) -> Notification {
        Notification {
            kind: NotificationKind::Confirmed,
            recipient: recipient.to_string(),
            user_id: UserId::new("anna"),
            event_id: EventId::new("73"),
            event_title: "Yoga & Mindfulness".to_string(),
            details: None,
        }
    }

    #[tokio::test]
    async fn valid_recipient_is_accepted() {
        let result = ConsoleNotifier::new().notify(notification("anna@example.com")).await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn address_without_at_sign_is_rejected() {
        let result = ConsoleNotifier::new().notify(notification("anna")).await;
        assert_eq!(
            result,
            Err(NotificationError::InvalidRecipient("anna".to_string()))
        );
    }

    fn smtp_config(port: u16) -> SmtpConfig {
        SmtpConfig {
            host: "127.0.0.1".to_string(),
            port,
            security: SmtpSecurity::None,
            username: None,
            password: None,
            from_email: "noreply@example.com".to_string(),
            from_name: "Event Sign-up".to_string(),
            timeout: std::time::Duration::from_secs(2),
        }
    }

    #[test]
    fn email_carries_subject_and_addresses() {
        let notifier = SmtpNotifier::new(&smtp_config(2525)).unwrap();
        let email = notifier.message(&notification("anna@example.com")).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();

        assert!(raw.contains("Subject: Registration Confirmed: Yoga & Mindfulness"));
        assert!(raw.contains("To: anna@example.com"));
        assert!(raw.contains("<noreply@example.com>"));
        assert!(raw.contains("text/plain"));
    }

    #[tokio::test]
    async fn smtp_rejects_unparseable_recipient() {
        let notifier = SmtpNotifier::new(&smtp_config(2525)).unwrap();
        let result = notifier.notify(notification("anna")).await;
        assert_eq!(
            result,
            Err(NotificationError::InvalidRecipient("anna".to_string()))
        );
    }

    #[tokio::test]
    async fn unreachable_relay_is_a_delivery_failure() {
        // Bind then drop to get a local port with nothing listening.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let notifier = SmtpNotifier::new(&smtp_config(port)).unwrap();

        let result = notifier.notify(notification("anna@example.com")).await;
        assert!(matches!(result, Err(NotificationError::Delivery(_))));
    }

    #[test]
    fn invalid_sender_fails_setup() {
        let mut config = smtp_config(2525);
        config.from_email = "not an address".to_string();
        assert!(matches!(
            SmtpNotifier::new(&config),
            Err(SmtpSetupError::InvalidSender { .. })
        ));
    }
}
