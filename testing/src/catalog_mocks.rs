//! In-memory event catalog.

use crate::mocks::test_epoch;
use chrono::Duration;
use signup_ledger_core::catalog::{Category, EventCatalog, EventDetails};
use signup_ledger_core::registration::EventId;
use std::collections::HashMap;
use std::sync::Arc;

/// Build catalog metadata with fixed, test-friendly times.
///
/// Events start one week after the test epoch and last an hour.
#[must_use]
pub fn event_details(
    id: &str,
    title: &str,
    category: Category,
    max_seats: Option<u32>,
) -> EventDetails {
    let start_time = test_epoch() + Duration::days(7);
    EventDetails {
        id: EventId::new(id),
        title: title.to_string(),
        start_time,
        end_time: start_time + Duration::hours(1),
        location: "Main office".to_string(),
        category,
        max_seats,
    }
}

/// Catalog backed by a map, filled through a builder.
///
/// # Example
///
/// ```
/// use signup_ledger_core::catalog::{Category, EventCatalog};
/// use signup_ledger_core::registration::EventId;
/// use signup_ledger_testing::InMemoryEventCatalog;
///
/// let catalog = InMemoryEventCatalog::new()
///     .with_event("yoga", "Yoga & Mindfulness", Category::Health, Some(2))
///     .with_event("party", "Holiday Party", Category::Social, None);
///
/// assert_eq!(catalog.get_event(&EventId::new("yoga")).and_then(|e| e.max_seats), Some(2));
/// assert_eq!(catalog.list_events().len(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryEventCatalog {
    events: Arc<HashMap<EventId, EventDetails>>,
}

impl InMemoryEventCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event built with [`event_details`].
    #[must_use]
    pub fn with_event(
        self,
        id: &str,
        title: &str,
        category: Category,
        max_seats: Option<u32>,
    ) -> Self {
        self.with_details(event_details(id, title, category, max_seats))
    }

    /// Add fully specified event metadata.
    #[must_use]
    pub fn with_details(self, details: EventDetails) -> Self {
        let mut events = Arc::unwrap_or_clone(self.events);
        events.insert(details.id.clone(), details);
        Self {
            events: Arc::new(events),
        }
    }
}

impl EventCatalog for InMemoryEventCatalog {
    fn get_event(&self, event_id: &EventId) -> Option<EventDetails> {
        self.events.get(event_id).cloned()
    }

    fn list_events(&self) -> Vec<EventDetails> {
        let mut events: Vec<_> = self.events.values().cloned().collect();
        events.sort_by(|a, b| (a.start_time, &a.id).cmp(&(b.start_time, &b.id)));
        events
    }
}
