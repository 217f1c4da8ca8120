//! Admission decisions.
//!
//! Pure functions over projections; the service supplies snapshots and
//! performs the append.

use crate::error::RegistrationError;
use signup_ledger_core::catalog::{Category, EventCatalog};
use signup_ledger_core::projection::{ActiveRegistrations, Roster};
use signup_ledger_core::registration::{EventId, Priority, RegistrationAction, UserId};

/// Where a sign-up lands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    /// A seat is free.
    Seat,
    /// The event is full; queued at this 1-based position.
    Waitlist {
        /// Position the user will hold in the waitlist
        position: usize,
    },
}

impl Admission {
    /// The ledger action recording this admission.
    #[must_use]
    pub const fn action(&self) -> RegistrationAction {
        match self {
            Self::Seat => RegistrationAction::Signup,
            Self::Waitlist { .. } => RegistrationAction::Waitlist,
        }
    }
}

/// Decide between a seat and the waitlist.
///
/// The requesting user is taken out of the roster first, so a user who is
/// already active re-decides against everybody else instead of competing
/// with their own entry.
///
/// ```
/// use signup_ledger_core::projection::Roster;
/// use signup_ledger_core::registration::UserId;
/// use signup_ledger_runtime::admission::{decide, Admission};
///
/// let empty = Roster::from_records(&[]);
/// assert_eq!(decide(&empty, &UserId::new("u"), Some(0)), Admission::Waitlist { position: 1 });
/// assert_eq!(decide(&empty, &UserId::new("u"), None), Admission::Seat);
/// ```
#[must_use]
pub fn decide(roster: &Roster, user_id: &UserId, capacity: Option<u32>) -> Admission {
    let others = roster.without(user_id);
    if others.has_free_seat(capacity) {
        Admission::Seat
    } else {
        Admission::Waitlist {
            position: others.waitlist().len() + 1,
        }
    }
}

/// Reject a priority the user already holds in the same category.
///
/// Only the user's *other* events are compared; re-submitting for the same
/// event may keep its priority. Active registrations on events the catalog
/// no longer knows cannot be categorised and never collide.
///
/// # Errors
///
/// Returns [`RegistrationError::DuplicatePriority`] on a collision.
pub fn check_priority(
    active: &ActiveRegistrations,
    event_id: &EventId,
    category: Category,
    priority: Priority,
    catalog: &dyn EventCatalog,
) -> Result<(), RegistrationError> {
    let conflict = active
        .iter()
        .filter(|record| &record.event_id != event_id)
        .filter(|record| record.priority == Some(priority))
        .find(|record| {
            catalog
                .get_event(&record.event_id)
                .is_some_and(|details| details.category == category)
        });

    match conflict {
        Some(record) => Err(RegistrationError::DuplicatePriority {
            priority,
            category,
            conflicting_event: record.event_id.clone(),
        }),
        None => Ok(()),
    }
}
