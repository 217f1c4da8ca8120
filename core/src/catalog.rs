//! Event catalog collaborator.
//!
//! The catalog is read-only event metadata owned by someone else. The engine
//! only needs a title, capacity and category from it; start/end time and
//! location flow into notifications and the public event listing.

use crate::registration::EventId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category an event belongs to, used to scope priority uniqueness.
///
/// Resolved once at the catalog boundary from free-text metadata; the engine
/// never string-matches categories itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// Health and fitness activities
    Health,
    /// Everything else
    Social,
}

impl Category {
    /// Classify a raw category label.
    ///
    /// ```
    /// use signup_ledger_core::catalog::Category;
    ///
    /// assert_eq!(Category::from_raw("Health@VASS"), Category::Health);
    /// assert_eq!(Category::from_raw("Social@VASS"), Category::Social);
    /// ```
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        if raw.to_lowercase().contains("health") {
            Self::Health
        } else {
            Self::Social
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Social => "social",
        }
    }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        Self::from_raw(&raw)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of one catalog event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    /// Catalog identifier
    pub id: EventId,
    /// Display title
    pub title: String,
    /// Start time
    pub start_time: DateTime<Utc>,
    /// End time
    pub end_time: DateTime<Utc>,
    /// Where the event takes place
    pub location: String,
    /// Category used for priority uniqueness
    pub category: Category,
    /// Seat capacity; `None` means unlimited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_seats: Option<u32>,
}

/// Read-only lookup of event metadata.
pub trait EventCatalog: Send + Sync {
    /// Metadata for one event, or `None` if the catalog does not know it.
    fn get_event(&self, event_id: &EventId) -> Option<EventDetails>;

    /// All known events, ordered by start time.
    fn list_events(&self) -> Vec<EventDetails>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_matching_is_case_insensitive() {
        assert_eq!(Category::from_raw("HEALTH"), Category::Health);
        assert_eq!(Category::from_raw("Mental health week"), Category::Health);
        assert_eq!(Category::from_raw(""), Category::Social);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn event_details_use_camel_case_and_raw_categories() {
        let json = r#"{
            "id": "42",
            "title": "Funktionell träning - Crossfit",
            "startTime": "2025-11-20T17:00:00Z",
            "endTime": "2025-11-20T18:00:00Z",
            "location": "Gym",
            "category": "Health@VASS",
            "maxSeats": 12
        }"#;

        let details: EventDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.category, Category::Health);
        assert_eq!(details.max_seats, Some(12));

        let value = serde_json::to_value(&details).unwrap();
        assert_eq!(value["category"], "health");
        assert_eq!(value["maxSeats"], 12);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn missing_max_seats_means_unlimited() {
        let json = r#"{
            "id": "7",
            "title": "Julafton Firande 2025",
            "startTime": "2025-12-24T15:00:00Z",
            "endTime": "2025-12-24T20:00:00Z",
            "location": "Office",
            "category": "Social@VASS"
        }"#;

        let details: EventDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.max_seats, None);
        assert_eq!(details.category, Category::Social);
    }
}
