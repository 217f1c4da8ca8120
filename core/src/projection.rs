//! Pure projections from ledger records to current registration state.
//!
//! Every decision re-derives state from the ledger through these functions;
//! there is no separately maintained "current registration" record.
//!
//! # Reduction Rule
//!
//! For each `(event, user)` pair only the record with the greatest
//! `(timestamp, sequence)` counts. Pairs whose latest record is `dropout`
//! hold nothing.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use signup_ledger_core::projection::Roster;
//! use signup_ledger_core::registration::*;
//!
//! let now = Utc::now();
//! let record = |seq: u64, user: &str, action| NewRegistration {
//!     event_id: EventId::new("73"),
//!     user_id: UserId::new(user),
//!     user_email: format!("{user}@example.com"),
//!     event_title: "Yoga".to_string(),
//!     action,
//!     priority: None,
//!     timestamp: now,
//! }
//! .into_record(Sequence::new(seq));
//!
//! let records = vec![
//!     record(1, "alice", RegistrationAction::Signup),
//!     record(2, "bob", RegistrationAction::Waitlist),
//!     record(3, "alice", RegistrationAction::Dropout),
//! ];
//!
//! let roster = Roster::from_records(&records);
//! assert!(roster.attendees().is_empty());
//! assert_eq!(roster.waitlist()[0].user_id, UserId::new("bob"));
//! ```

use crate::registration::{EventId, RegistrationAction, RegistrationRecord, Sequence, UserId};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Keep the latest record per key.
fn latest_by<'a, K, F>(records: &'a [RegistrationRecord], key: F) -> HashMap<K, &'a RegistrationRecord>
where
    K: Eq + Hash,
    F: Fn(&RegistrationRecord) -> K,
{
    let mut latest: HashMap<K, &RegistrationRecord> = HashMap::new();
    for record in records {
        latest
            .entry(key(record))
            .and_modify(|current| {
                if record.ordering_key() > current.ordering_key() {
                    *current = record;
                }
            })
            .or_insert(record);
    }
    latest
}

/// Effective state of one `(event, user)` pair.
///
/// Returns the action of the latest matching record, or `None` when the pair
/// has no records at all. Insertion order of `records` does not matter.
#[must_use]
pub fn effective_state(
    records: &[RegistrationRecord],
    event_id: &EventId,
    user_id: &UserId,
) -> Option<RegistrationAction> {
    records
        .iter()
        .filter(|r| &r.event_id == event_id && &r.user_id == user_id)
        .max_by_key(|r| r.ordering_key())
        .map(|r| r.action)
}

/// Where a user stands on an event roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// Holds a seat
    Attendee,
    /// Queued at the given 1-based position
    Waitlisted {
        /// Position in the waitlist (1 = next to be promoted)
        position: usize,
    },
}

/// Attendee and waitlist lists of one event at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    attendees: Vec<RegistrationRecord>,
    waitlist: Vec<RegistrationRecord>,
    head: Option<Sequence>,
}

impl Roster {
    /// Reduce an event's records into its roster.
    ///
    /// `records` are expected to belong to a single event. Both lists are
    /// ordered by the `(timestamp, sequence)` of each user's latest record, so
    /// equal timestamps fall back to ledger order.
    #[must_use]
    pub fn from_records(records: &[RegistrationRecord]) -> Self {
        let head = records.iter().map(|r| r.sequence).max();

        let mut active: Vec<&RegistrationRecord> = latest_by(records, |r| r.user_id.clone())
            .into_values()
            .filter(|r| r.action.is_active())
            .collect();
        active.sort_by_key(|r| r.ordering_key());

        let (attendees, waitlist): (Vec<_>, Vec<_>) = active
            .into_iter()
            .cloned()
            .partition(|r| r.action == RegistrationAction::Signup);

        Self {
            attendees,
            waitlist,
            head,
        }
    }

    /// Users holding a seat, in registration order.
    #[must_use]
    pub fn attendees(&self) -> &[RegistrationRecord] {
        &self.attendees
    }

    /// Users queued for a seat, in promotion order.
    #[must_use]
    pub fn waitlist(&self) -> &[RegistrationRecord] {
        &self.waitlist
    }

    /// Highest sequence among the records this roster was built from.
    ///
    /// Used as the expected head for a conditional append.
    #[must_use]
    pub const fn head(&self) -> Option<Sequence> {
        self.head
    }

    /// The user's active record on this roster, if any.
    #[must_use]
    pub fn entry_of(&self, user_id: &UserId) -> Option<&RegistrationRecord> {
        self.attendees
            .iter()
            .chain(self.waitlist.iter())
            .find(|r| &r.user_id == user_id)
    }

    /// Where the user stands, if they are active on this roster.
    #[must_use]
    pub fn membership_of(&self, user_id: &UserId) -> Option<Membership> {
        if self.attendees.iter().any(|r| &r.user_id == user_id) {
            return Some(Membership::Attendee);
        }
        self.waitlist
            .iter()
            .position(|r| &r.user_id == user_id)
            .map(|index| Membership::Waitlisted { position: index + 1 })
    }

    /// 1-based waitlist position of the user, if queued.
    #[must_use]
    pub fn position_of(&self, user_id: &UserId) -> Option<usize> {
        match self.membership_of(user_id) {
            Some(Membership::Waitlisted { position }) => Some(position),
            _ => None,
        }
    }

    /// The roster as it would look without this user.
    ///
    /// Admission uses this to re-decide for a user who is already active
    /// without counting their own seat or queue slot.
    #[must_use]
    pub fn without(&self, user_id: &UserId) -> Self {
        Self {
            attendees: self
                .attendees
                .iter()
                .filter(|r| &r.user_id != user_id)
                .cloned()
                .collect(),
            waitlist: self
                .waitlist
                .iter()
                .filter(|r| &r.user_id != user_id)
                .cloned()
                .collect(),
            head: self.head,
        }
    }

    /// Whether another attendee fits under `capacity` (`None` = unlimited).
    #[must_use]
    pub fn has_free_seat(&self, capacity: Option<u32>) -> bool {
        capacity.is_none_or(|max| self.attendees.len() < max as usize)
    }
}

/// A user's active registrations, keyed by event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveRegistrations {
    by_event: BTreeMap<EventId, RegistrationRecord>,
}

impl ActiveRegistrations {
    /// Reduce a user's records into their latest active record per event.
    #[must_use]
    pub fn from_records(records: &[RegistrationRecord]) -> Self {
        let by_event = latest_by(records, |r| r.event_id.clone())
            .into_iter()
            .filter(|(_, r)| r.action.is_active())
            .map(|(event_id, r)| (event_id, r.clone()))
            .collect();
        Self { by_event }
    }

    /// The active record for an event, if any.
    #[must_use]
    pub fn get(&self, event_id: &EventId) -> Option<&RegistrationRecord> {
        self.by_event.get(event_id)
    }

    /// Iterate over active records in event id order.
    pub fn iter(&self) -> impl Iterator<Item = &RegistrationRecord> {
        self.by_event.values()
    }

    /// Number of events the user is active on.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_event.len()
    }

    /// Whether the user has no active registrations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_event.is_empty()
    }

    /// Active records ordered by `(timestamp, sequence)`.
    #[must_use]
    pub fn into_chronological(self) -> Vec<RegistrationRecord> {
        let mut records: Vec<_> = self.by_event.into_values().collect();
        records.sort_by_key(RegistrationRecord::ordering_key);
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::{NewRegistration, Priority};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 1, 9, 0, 0)
            .single()
            .unwrap_or_default()
    }

    fn record(
        seq: u64,
        event: &str,
        user: &str,
        action: RegistrationAction,
        offset_secs: i64,
    ) -> RegistrationRecord {
        NewRegistration {
            event_id: EventId::new(event),
            user_id: UserId::new(user),
            user_email: format!("{user}@example.com"),
            event_title: format!("Event {event}"),
            action,
            priority: None,
            timestamp: base_time() + Duration::seconds(offset_secs),
        }
        .into_record(Sequence::new(seq))
    }

    fn users(records: &[RegistrationRecord]) -> Vec<&str> {
        records.iter().map(|r| r.user_id.as_str()).collect()
    }

    #[test]
    fn roster_splits_latest_records_by_action() {
        let records = vec![
            record(1, "e1", "a", RegistrationAction::Signup, 0),
            record(2, "e1", "b", RegistrationAction::Signup, 1),
            record(3, "e1", "c", RegistrationAction::Waitlist, 2),
            record(4, "e1", "d", RegistrationAction::Waitlist, 3),
        ];

        let roster = Roster::from_records(&records);
        assert_eq!(users(roster.attendees()), vec!["a", "b"]);
        assert_eq!(users(roster.waitlist()), vec!["c", "d"]);
        assert_eq!(roster.head(), Some(Sequence::new(4)));
    }

    #[test]
    fn dropout_removes_user_from_roster() {
        let records = vec![
            record(1, "e1", "a", RegistrationAction::Signup, 0),
            record(2, "e1", "a", RegistrationAction::Dropout, 5),
        ];

        let roster = Roster::from_records(&records);
        assert!(roster.attendees().is_empty());
        assert!(roster.entry_of(&UserId::new("a")).is_none());
    }

    #[test]
    fn latest_timestamp_wins_over_insertion_order() {
        // Dropout was inserted first but carries the earlier timestamp
        let records = vec![
            record(2, "e1", "a", RegistrationAction::Dropout, 0),
            record(1, "e1", "a", RegistrationAction::Signup, 10),
        ];

        assert_eq!(
            effective_state(&records, &EventId::new("e1"), &UserId::new("a")),
            Some(RegistrationAction::Signup)
        );
    }

    #[test]
    fn equal_timestamps_fall_back_to_sequence() {
        let records = vec![
            record(7, "e1", "late", RegistrationAction::Waitlist, 0),
            record(3, "e1", "early", RegistrationAction::Waitlist, 0),
            record(5, "e1", "middle", RegistrationAction::Waitlist, 0),
        ];

        let roster = Roster::from_records(&records);
        assert_eq!(users(roster.waitlist()), vec!["early", "middle", "late"]);
    }

    #[test]
    fn re_signup_keeps_single_entry_per_user() {
        let records = vec![
            record(1, "e1", "a", RegistrationAction::Signup, 0),
            record(2, "e1", "a", RegistrationAction::Signup, 1),
        ];

        let roster = Roster::from_records(&records);
        assert_eq!(roster.attendees().len(), 1);
        assert_eq!(roster.attendees()[0].sequence, Sequence::new(2));
    }

    #[test]
    fn membership_reports_waitlist_position() {
        let records = vec![
            record(1, "e1", "a", RegistrationAction::Signup, 0),
            record(2, "e1", "b", RegistrationAction::Waitlist, 1),
            record(3, "e1", "c", RegistrationAction::Waitlist, 2),
        ];

        let roster = Roster::from_records(&records);
        assert_eq!(roster.membership_of(&UserId::new("a")), Some(Membership::Attendee));
        assert_eq!(
            roster.membership_of(&UserId::new("c")),
            Some(Membership::Waitlisted { position: 2 })
        );
        assert_eq!(roster.membership_of(&UserId::new("z")), None);
        assert_eq!(roster.position_of(&UserId::new("b")), Some(1));
        assert_eq!(roster.position_of(&UserId::new("a")), None);
    }

    #[test]
    fn without_excludes_user_but_keeps_head() {
        let records = vec![
            record(1, "e1", "a", RegistrationAction::Signup, 0),
            record(2, "e1", "b", RegistrationAction::Signup, 1),
        ];

        let roster = Roster::from_records(&records).without(&UserId::new("a"));
        assert_eq!(users(roster.attendees()), vec!["b"]);
        assert_eq!(roster.head(), Some(Sequence::new(2)));
    }

    #[test]
    fn free_seat_respects_capacity() {
        let records = vec![
            record(1, "e1", "a", RegistrationAction::Signup, 0),
            record(2, "e1", "b", RegistrationAction::Signup, 1),
        ];
        let roster = Roster::from_records(&records);

        assert!(roster.has_free_seat(None));
        assert!(roster.has_free_seat(Some(3)));
        assert!(!roster.has_free_seat(Some(2)));
    }

    #[test]
    fn active_registrations_keep_latest_active_record_per_event() {
        let mut yoga = record(1, "yoga", "u", RegistrationAction::Signup, 0);
        yoga.priority = Priority::new(1).ok();
        let records = vec![
            yoga,
            record(2, "party", "u", RegistrationAction::Waitlist, 1),
            record(3, "crossfit", "u", RegistrationAction::Signup, 2),
            record(4, "crossfit", "u", RegistrationAction::Dropout, 3),
        ];

        let active = ActiveRegistrations::from_records(&records);
        assert_eq!(active.len(), 2);
        assert!(active.get(&EventId::new("crossfit")).is_none());
        assert_eq!(
            active.get(&EventId::new("yoga")).and_then(|r| r.priority),
            Priority::new(1).ok()
        );

        let chronological = active.into_chronological();
        assert_eq!(chronological[0].event_id, EventId::new("yoga"));
        assert_eq!(chronological[1].event_id, EventId::new("party"));
    }

    fn action_strategy() -> impl Strategy<Value = RegistrationAction> {
        prop_oneof![
            Just(RegistrationAction::Signup),
            Just(RegistrationAction::Waitlist),
            Just(RegistrationAction::Dropout),
        ]
    }

    proptest! {
        #[test]
        fn effective_state_ignores_insertion_order(
            history in prop::collection::vec((action_strategy(), 0_i64..20), 1..12)
                .prop_flat_map(|history| Just(history).prop_shuffle())
        ) {
            let records: Vec<_> = history
                .iter()
                .enumerate()
                .map(|(index, (action, offset))| {
                    record(index as u64 + 1, "e1", "u", *action, *offset)
                })
                .collect();

            let latest = records
                .iter()
                .max_by_key(|r| r.ordering_key())
                .map(|r| r.action);

            let mut reversed = records.clone();
            reversed.reverse();

            let event_id = EventId::new("e1");
            let user_id = UserId::new("u");
            prop_assert_eq!(effective_state(&records, &event_id, &user_id), latest);
            prop_assert_eq!(effective_state(&reversed, &event_id, &user_id), latest);

            let roster = Roster::from_records(&reversed);
            let on_roster = roster.entry_of(&user_id).map(|r| r.action);
            prop_assert_eq!(on_roster, latest.filter(RegistrationAction::is_active));
        }
    }
}
