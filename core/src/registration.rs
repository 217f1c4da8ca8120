//! Registration records and their identifying types.
//!
//! A [`RegistrationRecord`] is the unit of the ledger: one record per user
//! action, created once and never updated. The store assigns each record a
//! [`Sequence`] on append; together with the record timestamp it forms the
//! ordering key for "latest action wins".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for identifier and priority parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// An identifier was empty or whitespace only.
    #[error("{0} cannot be empty")]
    EmptyId(&'static str),

    /// A priority was zero, too large, or not a number.
    #[error("Invalid priority: {0} (must be between 1 and 2147483647)")]
    InvalidPriority(String),

    /// An action string did not name a known action.
    #[error("Invalid registration action: {0}")]
    InvalidAction(String),
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from trusted input (no validation).
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Convert into the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ParseError::EmptyId($label));
                }
                Ok(Self(trimmed.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a catalog event.
    ///
    /// ```
    /// use signup_ledger_core::registration::EventId;
    ///
    /// let id: EventId = "73".parse().unwrap();
    /// assert_eq!(id.as_str(), "73");
    /// assert!("  ".parse::<EventId>().is_err());
    /// ```
    EventId,
    "Event ID"
);

string_id!(
    /// Stable user identifier supplied by the identity collaborator.
    UserId,
    "User ID"
);

/// Store-assigned position of a record in the ledger.
///
/// Sequences are strictly increasing across the whole ledger, so two records
/// with equal timestamps still have a deterministic order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence(u64);

impl Sequence {
    /// Create a sequence from its numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The sequence following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Sequence {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A user's declared priority for an event within its category.
///
/// Always between `1` and [`Priority::MAX`]; `1` is the most preferred.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Priority(u32);

impl Priority {
    /// Largest accepted priority; every ledger backend stores it as a signed
    /// 32-bit integer.
    pub const MAX: u32 = 2_147_483_647;

    /// Create a priority, rejecting zero and values above [`Priority::MAX`].
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidPriority`] if `value` is out of range.
    pub fn new(value: u32) -> Result<Self, ParseError> {
        if value == 0 || value > Self::MAX {
            return Err(ParseError::InvalidPriority(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Get the numeric value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Priority {
    type Error = ParseError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Priority> for u32 {
    fn from(priority: Priority) -> Self {
        priority.0
    }
}

impl FromStr for Priority {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidPriority(s.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The action a record captures.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationAction {
    /// The user holds a seat.
    Signup,
    /// The user is queued for a seat.
    Waitlist,
    /// The user withdrew; they hold nothing.
    Dropout,
}

impl RegistrationAction {
    /// Convert to the stored string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Waitlist => "waitlist",
            Self::Dropout => "dropout",
        }
    }

    /// Parse from the stored string representation.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidAction`] for unknown strings.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        match s {
            "signup" => Ok(Self::Signup),
            "waitlist" => Ok(Self::Waitlist),
            "dropout" => Ok(Self::Dropout),
            other => Err(ParseError::InvalidAction(other.to_string())),
        }
    }

    /// Whether this action leaves the user actively registered.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Signup | Self::Waitlist)
    }
}

impl fmt::Display for RegistrationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record that has not been appended yet.
///
/// The store turns it into a [`RegistrationRecord`] by assigning a sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRegistration {
    /// Event the action applies to
    pub event_id: EventId,
    /// Acting user
    pub user_id: UserId,
    /// User's email address (empty for dropouts when unknown)
    pub user_email: String,
    /// Event title at the time of the action
    pub event_title: String,
    /// The action taken
    pub action: RegistrationAction,
    /// Declared priority, only meaningful for `signup`/`waitlist`
    pub priority: Option<Priority>,
    /// Record creation time
    pub timestamp: DateTime<Utc>,
}

impl NewRegistration {
    /// Attach the store-assigned sequence.
    #[must_use]
    pub fn into_record(self, sequence: Sequence) -> RegistrationRecord {
        RegistrationRecord {
            sequence,
            event_id: self.event_id,
            user_id: self.user_id,
            user_email: self.user_email,
            event_title: self.event_title,
            action: self.action,
            priority: self.priority,
            timestamp: self.timestamp,
        }
    }
}

/// An appended, immutable ledger record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRecord {
    /// Store-assigned ledger position
    pub sequence: Sequence,
    /// Event the action applies to
    pub event_id: EventId,
    /// Acting user
    pub user_id: UserId,
    /// User's email address
    pub user_email: String,
    /// Event title at the time of the action
    pub event_title: String,
    /// The action taken
    pub action: RegistrationAction,
    /// Declared priority
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Record creation time
    pub timestamp: DateTime<Utc>,
}

impl RegistrationRecord {
    /// Ordering key for "latest action wins": timestamp first, then sequence.
    #[must_use]
    pub const fn ordering_key(&self) -> (DateTime<Utc>, Sequence) {
        (self.timestamp, self.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_reject_blank_input() {
        assert_eq!(
            "".parse::<EventId>(),
            Err(ParseError::EmptyId("Event ID"))
        );
        assert_eq!(
            "   ".parse::<UserId>(),
            Err(ParseError::EmptyId("User ID"))
        );
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn ids_trim_parsed_input() {
        let id: UserId = " user-1 ".parse().expect("non-blank id should parse");
        assert_eq!(id.as_str(), "user-1");
    }

    #[test]
    fn priority_rejects_zero() {
        assert!(Priority::new(0).is_err());
        assert!(Priority::new(Priority::MAX).is_ok());
        assert!(Priority::new(Priority::MAX + 1).is_err());
        assert!("3000000000".parse::<Priority>().is_err());
        assert!("0".parse::<Priority>().is_err());
        assert!("abc".parse::<Priority>().is_err());
        assert_eq!("3".parse::<Priority>().map(Priority::value), Ok(3));
    }

    #[test]
    fn action_string_round_trip() {
        for action in [
            RegistrationAction::Signup,
            RegistrationAction::Waitlist,
            RegistrationAction::Dropout,
        ] {
            assert_eq!(RegistrationAction::parse(action.as_str()), Ok(action));
        }
        assert!(RegistrationAction::parse("cancelled").is_err());
    }

    #[test]
    fn only_signup_and_waitlist_are_active() {
        assert!(RegistrationAction::Signup.is_active());
        assert!(RegistrationAction::Waitlist.is_active());
        assert!(!RegistrationAction::Dropout.is_active());
    }

    #[test]
    fn sequence_orders_records_with_equal_timestamps() {
        let now = Utc::now();
        let draft = NewRegistration {
            event_id: EventId::new("e1"),
            user_id: UserId::new("u1"),
            user_email: "u1@example.com".to_string(),
            event_title: "Yoga".to_string(),
            action: RegistrationAction::Signup,
            priority: None,
            timestamp: now,
        };
        let first = draft.clone().into_record(Sequence::new(1));
        let second = draft.into_record(Sequence::new(2));
        assert!(first.ordering_key() < second.ordering_key());
    }
}
