//! The registration service: admission, withdrawal and promotion.
//!
//! # Critical Sections
//!
//! Every decision is a read-decide-append sequence:
//!
//! 1. Snapshot the event's records (and, for priorities, the user's records)
//! 2. Decide from the projections
//! 3. Append conditionally against the snapshot's head
//!
//! Within one process the per-event lock makes step 3 succeed on the first
//! try. Across processes the conditional append detects a lost race, and the
//! sequence is re-run from a fresh snapshot under the retry policy.
//!
//! Sign-up takes the user lock and then the event lock; withdrawal takes the
//! event lock only. Notifications go out after both are released.

use crate::admission::{Admission, check_priority, decide};
use crate::error::{RegistrationError, Result};
use crate::locks::KeyedLocks;
use crate::metrics::{LedgerMetrics, NotificationMetrics, RegistrationMetrics};
use crate::promotion::select_promotion;
use crate::retry::{RetryPolicy, retry_on_conflict};
use futures::future::join_all;
use signup_ledger_core::catalog::{Category, EventCatalog, EventDetails};
use signup_ledger_core::environment::{Clock, SystemClock};
use signup_ledger_core::ledger::LedgerStore;
use signup_ledger_core::notification::{Notification, NotificationKind, Notifier};
use signup_ledger_core::projection::{ActiveRegistrations, Roster};
use signup_ledger_core::registration::{
    EventId, NewRegistration, Priority, RegistrationAction, RegistrationRecord, Sequence, UserId,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Event id queried by [`RegistrationService::probe`].
const PROBE_EVENT_ID: &str = "__readiness_probe__";

/// Tunables for [`RegistrationService`].
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// How often a decision is re-run after losing a conditional append
    pub conflict_retry: RetryPolicy,
    /// Upper bound for a single notification delivery
    pub notification_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            conflict_retry: RetryPolicy::default(),
            notification_timeout: Duration::from_secs(5),
        }
    }
}

/// Raw sign-up input as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupRequest {
    /// Event to sign up for
    pub event_id: String,
    /// Signing-up user
    pub user_id: String,
    /// Address for notifications
    pub user_email: String,
    /// Event title as shown to the user
    pub event_title: String,
    /// Optional priority within the event's category (must be >= 1)
    pub priority: Option<i64>,
}

/// Validated admission input with capacity and category already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionRequest {
    /// Event to sign up for
    pub event_id: EventId,
    /// Signing-up user
    pub user_id: UserId,
    /// Address for notifications
    pub user_email: String,
    /// Event title recorded on the registration
    pub event_title: String,
    /// Seat capacity; `None` means unlimited
    pub capacity: Option<u32>,
    /// Priority within `category`
    pub priority: Option<Priority>,
    /// Category scoping priority uniqueness
    pub category: Category,
}

/// Result of a successful sign-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupOutcome {
    /// Seat or waitlist
    pub admission: Admission,
    /// The appended record
    pub record: RegistrationRecord,
    /// Human-readable summary
    pub message: String,
}

impl SignupOutcome {
    /// `signup` or `waitlist`.
    #[must_use]
    pub const fn status(&self) -> RegistrationAction {
        self.admission.action()
    }
}

/// Raw withdrawal input as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WithdrawRequest {
    /// Event to withdraw from
    pub event_id: String,
    /// Withdrawing user
    pub user_id: String,
}

/// Result of a successful withdrawal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawOutcome {
    /// The appended dropout record
    pub dropout: RegistrationRecord,
    /// The `signup` record appended for the promoted user, if any
    pub promoted: Option<RegistrationRecord>,
    /// Human-readable summary
    pub message: String,
}

/// Entry point for every registration operation.
///
/// # Example
///
/// ```
/// use signup_ledger_core::catalog::Category;
/// use signup_ledger_runtime::{RegistrationService, SignupRequest};
/// use signup_ledger_testing::{InMemoryEventCatalog, InMemoryLedgerStore, RecordingNotifier};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let catalog = InMemoryEventCatalog::new().with_event("73", "Yoga", Category::Health, Some(1));
/// let service = RegistrationService::new(
///     Arc::new(InMemoryLedgerStore::new()),
///     Arc::new(catalog),
///     Arc::new(RecordingNotifier::new()),
/// );
///
/// let outcome = service
///     .sign_up(SignupRequest {
///         event_id: "73".into(),
///         user_id: "anna".into(),
///         user_email: "anna@example.com".into(),
///         event_title: "Yoga".into(),
///         priority: Some(1),
///     })
///     .await;
/// assert_eq!(outcome.map(|o| o.status().as_str()), Ok("signup"));
/// # });
/// ```
pub struct RegistrationService {
    ledger: Arc<dyn LedgerStore>,
    catalog: Arc<dyn EventCatalog>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
    event_locks: KeyedLocks<EventId>,
    user_locks: KeyedLocks<UserId>,
}

impl std::fmt::Debug for RegistrationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RegistrationService {
    /// Create a service with the system clock and default configuration.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        catalog: Arc<dyn EventCatalog>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            ledger,
            catalog,
            notifier,
            clock: Arc::new(SystemClock),
            config: ServiceConfig::default(),
            event_locks: KeyedLocks::new(),
            user_locks: KeyedLocks::new(),
        }
    }

    /// Replace the clock used for record timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The event catalog this service resolves events against.
    #[must_use]
    pub fn catalog(&self) -> &dyn EventCatalog {
        self.catalog.as_ref()
    }

    /// Validate a raw request, resolve the event, and admit the user.
    ///
    /// # Errors
    ///
    /// - `Validation`: a required field is empty or the priority is not >= 1
    /// - `UnknownEvent`: the catalog does not know the event
    /// - `DuplicatePriority`: see [`admit`](Self::admit)
    /// - `Store`: the ledger failed; nothing was appended
    pub async fn sign_up(&self, request: SignupRequest) -> Result<SignupOutcome> {
        let validated = validate_signup(&request).inspect_err(|e| {
            RegistrationMetrics::record_rejected(e.reason());
        })?;

        let Some(details) = self.catalog.get_event(&validated.event_id) else {
            RegistrationMetrics::record_rejected("unknown_event");
            tracing::info!(event_id = %validated.event_id, "Sign-up for unknown event rejected");
            return Err(RegistrationError::UnknownEvent(validated.event_id));
        };

        let request = AdmissionRequest {
            capacity: details.max_seats,
            category: details.category,
            ..validated
        };
        self.admit_with_details(request, Some(details)).await
    }

    /// Admit a user given an already resolved capacity and category.
    ///
    /// Checks priority uniqueness, decides seat or waitlist from the current
    /// roster, appends the record, then notifies the user.
    ///
    /// # Errors
    ///
    /// - `DuplicatePriority`: the user holds the priority on another event of
    ///   the same category; nothing was appended
    /// - `Store`: the ledger failed or conflicts persisted past the retry
    ///   policy; nothing was appended
    pub async fn admit(&self, request: AdmissionRequest) -> Result<SignupOutcome> {
        let details = self.catalog.get_event(&request.event_id);
        self.admit_with_details(request, details).await
    }

    #[tracing::instrument(
        skip_all,
        name = "admit",
        fields(event_id = %request.event_id, user_id = %request.user_id)
    )]
    async fn admit_with_details(
        &self,
        request: AdmissionRequest,
        details: Option<EventDetails>,
    ) -> Result<SignupOutcome> {
        let result = {
            let _user_guard = self.user_locks.lock(&request.user_id).await;
            let _event_guard = self.event_locks.lock(&request.event_id).await;

            retry_on_conflict(
                &self.config.conflict_retry,
                |_| self.try_admit(&request),
                RegistrationError::is_conflict,
            )
            .await
        };

        let (admission, record) = result.inspect_err(|e| {
            RegistrationMetrics::record_rejected(e.reason());
            tracing::info!(error = %e, "Sign-up rejected");
        })?;

        RegistrationMetrics::record_admitted(admission.action().as_str());
        let (kind, message) = match admission {
            Admission::Seat => {
                tracing::info!(sequence = %record.sequence, "User admitted");
                (
                    NotificationKind::Confirmed,
                    "Successfully signed up for event".to_string(),
                )
            }
            Admission::Waitlist { position } => {
                tracing::info!(sequence = %record.sequence, position, "User waitlisted");
                (
                    NotificationKind::Waitlisted { position },
                    format!("Event is full. You have been added to the waitlist at position {position}"),
                )
            }
        };

        self.dispatch(vec![notification(kind, &record, details)]).await;

        Ok(SignupOutcome {
            admission,
            record,
            message,
        })
    }

    async fn try_admit(&self, request: &AdmissionRequest) -> Result<(Admission, RegistrationRecord)> {
        if let Some(priority) = request.priority {
            let records = self.ledger.query_by_user(&request.user_id).await?;
            let active = ActiveRegistrations::from_records(&records);
            check_priority(
                &active,
                &request.event_id,
                request.category,
                priority,
                self.catalog.as_ref(),
            )?;
        }

        let roster = Roster::from_records(&self.ledger.query_by_event(&request.event_id).await?);
        let admission = decide(&roster, &request.user_id, request.capacity);

        let draft = NewRegistration {
            event_id: request.event_id.clone(),
            user_id: request.user_id.clone(),
            user_email: request.user_email.clone(),
            event_title: request.event_title.clone(),
            action: admission.action(),
            priority: request.priority,
            timestamp: self.clock.now(),
        };
        let record = self.append_if(draft, roster.head()).await?;

        Ok((admission, record))
    }

    /// Withdraw a user from an event, promoting the waitlist head if a seat
    /// was freed.
    ///
    /// # Errors
    ///
    /// - `Validation`: a required field is empty
    /// - `NotRegistered`: the user holds no seat or waitlist slot; nothing
    ///   was appended
    /// - `Store`: the dropout could not be appended
    #[tracing::instrument(
        skip_all,
        name = "withdraw",
        fields(event_id = %request.event_id, user_id = %request.user_id)
    )]
    pub async fn withdraw(&self, request: WithdrawRequest) -> Result<WithdrawOutcome> {
        let event_id = parse_id::<EventId>(&request.event_id, "eventId")?;
        let user_id = parse_id::<UserId>(&request.user_id, "userId")?;
        let details = self.catalog.get_event(&event_id);
        let capacity = details.as_ref().and_then(|d| d.max_seats);

        let (dropout, held_seat, promoted) = {
            let _event_guard = self.event_locks.lock(&event_id).await;

            let (dropout, held_seat) = retry_on_conflict(
                &self.config.conflict_retry,
                |_| self.try_dropout(&event_id, &user_id),
                RegistrationError::is_conflict,
            )
            .await
            .inspect_err(|e| {
                RegistrationMetrics::record_rejected(e.reason());
                tracing::info!(error = %e, "Withdrawal rejected");
            })?;

            let promoted = if held_seat {
                self.promote(&event_id, capacity).await
            } else {
                None
            };
            (dropout, held_seat, promoted)
        };

        RegistrationMetrics::record_withdrawal();
        tracing::info!(sequence = %dropout.sequence, held_seat, "User withdrew");

        let mut notifications = vec![notification(
            NotificationKind::Cancelled,
            &dropout,
            details.clone(),
        )];
        if let Some(record) = &promoted {
            notifications.push(notification(NotificationKind::Promoted, record, details));
        }
        self.dispatch(notifications).await;

        Ok(WithdrawOutcome {
            dropout,
            promoted,
            message: "Successfully dropped out from event".to_string(),
        })
    }

    async fn try_dropout(
        &self,
        event_id: &EventId,
        user_id: &UserId,
    ) -> Result<(RegistrationRecord, bool)> {
        let roster = Roster::from_records(&self.ledger.query_by_event(event_id).await?);
        let Some(entry) = roster.entry_of(user_id) else {
            return Err(RegistrationError::NotRegistered {
                event_id: event_id.clone(),
                user_id: user_id.clone(),
            });
        };

        let held_seat = entry.action == RegistrationAction::Signup;
        let draft = NewRegistration {
            event_id: event_id.clone(),
            user_id: user_id.clone(),
            user_email: entry.user_email.clone(),
            event_title: entry.event_title.clone(),
            action: RegistrationAction::Dropout,
            priority: None,
            timestamp: self.clock.now(),
        };
        let dropout = self.append_if(draft, roster.head()).await?;

        Ok((dropout, held_seat))
    }

    /// Fill one freed seat from the waitlist.
    ///
    /// The dropout is already durable at this point, so a failure here is
    /// logged and reported as "nobody promoted" rather than failing the
    /// withdrawal.
    async fn promote(&self, event_id: &EventId, capacity: Option<u32>) -> Option<RegistrationRecord> {
        let result = retry_on_conflict(
            &self.config.conflict_retry,
            |_| self.try_promote(event_id, capacity),
            RegistrationError::is_conflict,
        )
        .await;

        match result {
            Ok(Some(record)) => {
                RegistrationMetrics::record_promotion();
                tracing::info!(
                    promoted_user = %record.user_id,
                    sequence = %record.sequence,
                    "Waitlisted user promoted"
                );
                Some(record)
            }
            Ok(None) => {
                tracing::debug!("No promotion: waitlist empty or no free seat");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "Promotion failed after dropout was recorded");
                None
            }
        }
    }

    async fn try_promote(
        &self,
        event_id: &EventId,
        capacity: Option<u32>,
    ) -> Result<Option<RegistrationRecord>> {
        let roster = Roster::from_records(&self.ledger.query_by_event(event_id).await?);
        let Some(head) = select_promotion(&roster, capacity) else {
            return Ok(None);
        };

        let draft = NewRegistration {
            event_id: event_id.clone(),
            user_id: head.user_id.clone(),
            user_email: head.user_email.clone(),
            event_title: head.event_title.clone(),
            action: RegistrationAction::Signup,
            priority: head.priority,
            timestamp: self.clock.now(),
        };
        Ok(Some(self.append_if(draft, roster.head()).await?))
    }

    /// Current attendees and waitlist of an event.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the ledger cannot be read.
    pub async fn roster(&self, event_id: &EventId) -> Result<Roster> {
        let records = self.ledger.query_by_event(event_id).await?;
        Ok(Roster::from_records(&records))
    }

    /// A user's active registrations, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the ledger cannot be read.
    pub async fn registrations_of(&self, user_id: &UserId) -> Result<Vec<RegistrationRecord>> {
        let records = self.ledger.query_by_user(user_id).await?;
        Ok(ActiveRegistrations::from_records(&records).into_chronological())
    }

    /// Check that the ledger answers queries.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the ledger cannot be read.
    pub async fn probe(&self) -> Result<()> {
        self.ledger
            .query_by_event(&EventId::new(PROBE_EVENT_ID))
            .await?;
        Ok(())
    }

    async fn append_if(
        &self,
        draft: NewRegistration,
        expected_head: Option<Sequence>,
    ) -> Result<RegistrationRecord> {
        let action = draft.action.as_str();
        let started = Instant::now();
        let result = self.ledger.append_if(draft, expected_head).await;
        LedgerMetrics::record_append(action, started.elapsed());

        result.map_err(|e| {
            if e.is_conflict() {
                LedgerMetrics::record_conflict();
                tracing::debug!(error = %e, "Lost conditional append, re-deciding");
            }
            RegistrationError::Store(e)
        })
    }

    async fn dispatch(&self, notifications: Vec<Notification>) {
        let timeout = self.config.notification_timeout;
        let sends = notifications.into_iter().map(|message| async move {
            let kind = message.kind.as_str();
            let recipient = message.recipient.clone();

            match tokio::time::timeout(timeout, self.notifier.notify(message)).await {
                Ok(Ok(())) => tracing::debug!(kind, %recipient, "Notification sent"),
                Ok(Err(e)) => {
                    NotificationMetrics::record_failure(kind);
                    tracing::warn!(kind, %recipient, error = %e, "Notification failed");
                }
                Err(_) => {
                    NotificationMetrics::record_failure(kind);
                    tracing::warn!(
                        kind,
                        %recipient,
                        timeout_ms = timeout.as_millis(),
                        "Notification timed out"
                    );
                }
            }
        });

        join_all(sends).await;
    }
}

fn notification(
    kind: NotificationKind,
    record: &RegistrationRecord,
    details: Option<EventDetails>,
) -> Notification {
    Notification {
        kind,
        recipient: record.user_email.clone(),
        user_id: record.user_id.clone(),
        event_id: record.event_id.clone(),
        event_title: record.event_title.clone(),
        details,
    }
}

fn parse_id<T>(raw: &str, field: &str) -> Result<T>
where
    T: std::str::FromStr,
{
    raw.parse()
        .map_err(|_| RegistrationError::Validation(format!("{field} is required")))
}

fn required(raw: &str, field: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RegistrationError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Validate raw sign-up input. Capacity and category are filled in later.
fn validate_signup(request: &SignupRequest) -> Result<AdmissionRequest> {
    let event_id = parse_id::<EventId>(&request.event_id, "eventId")?;
    let user_id = parse_id::<UserId>(&request.user_id, "userId")?;
    let user_email = required(&request.user_email, "userEmail")?;
    let event_title = required(&request.event_title, "eventTitle")?;

    let priority = request
        .priority
        .map(|value| {
            u32::try_from(value)
                .ok()
                .and_then(|value| Priority::new(value).ok())
                .ok_or_else(|| {
                    RegistrationError::Validation(format!(
                        "priority must be between 1 and {}, got {value}",
                        Priority::MAX
                    ))
                })
        })
        .transpose()?;

    Ok(AdmissionRequest {
        event_id,
        user_id,
        user_email,
        event_title,
        capacity: None,
        priority,
        category: Category::Social,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SignupRequest {
        SignupRequest {
            event_id: "73".into(),
            user_id: "anna".into(),
            user_email: "anna@example.com".into(),
            event_title: "Yoga".into(),
            priority: None,
        }
    }

    #[test]
    fn validation_names_missing_field() {
        let missing_email = validate_signup(&SignupRequest {
            user_email: "  ".into(),
            ..request()
        });
        assert_eq!(
            missing_email,
            Err(RegistrationError::Validation("userEmail is required".into()))
        );

        let missing_event = validate_signup(&SignupRequest {
            event_id: String::new(),
            ..request()
        });
        assert_eq!(
            missing_event,
            Err(RegistrationError::Validation("eventId is required".into()))
        );
    }

    #[test]
    fn validation_rejects_non_positive_priority() {
        for priority in [0, -1, i64::from(u32::MAX) + 1] {
            let result = validate_signup(&SignupRequest {
                priority: Some(priority),
                ..request()
            });
            assert!(matches!(result, Err(RegistrationError::Validation(_))));
        }
    }

    #[test]
    fn validation_trims_and_keeps_priority() {
        let validated = validate_signup(&SignupRequest {
            user_id: " anna ".into(),
            priority: Some(2),
            ..request()
        });
        let Ok(validated) = validated else {
            unreachable!("valid request rejected");
        };
        assert_eq!(validated.user_id, UserId::new("anna"));
        assert_eq!(validated.priority.map(Priority::value), Some(2));
    }
}
