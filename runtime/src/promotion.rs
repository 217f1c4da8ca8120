//! Promotion selection.

use signup_ledger_core::projection::Roster;
use signup_ledger_core::registration::RegistrationRecord;

/// Pick the waitlisted user who takes a freed seat.
///
/// Returns the waitlist head (earliest by timestamp, then sequence) when a
/// seat is actually free under `capacity`, otherwise `None`. Never more than
/// one user: each withdrawal frees at most one seat.
#[must_use]
pub fn select_promotion(roster: &Roster, capacity: Option<u32>) -> Option<&RegistrationRecord> {
    if !roster.has_free_seat(capacity) {
        return None;
    }
    roster.waitlist().first()
}
