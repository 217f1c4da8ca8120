//! Event catalog backed by a JSON file.
//!
//! The file holds an array of events in the public listing shape:
//!
//! ```json
//! [
//!   {
//!     "id": "73",
//!     "title": "Yoga & Mindfulness",
//!     "startTime": "2025-12-10T12:00:00Z",
//!     "endTime": "2025-12-10T13:00:00Z",
//!     "location": "Studio Kungsholmen",
//!     "category": "Health@VASS",
//!     "maxSeats": 12
//!   }
//! ]
//! ```
//!
//! Free-text categories are classified while loading, so the rest of the
//! system only ever sees [`Category`](signup_ledger_core::catalog::Category).

use signup_ledger_core::catalog::{EventCatalog, EventDetails};
use signup_ledger_core::registration::EventId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a catalog file.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The file could not be read.
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        /// Catalog path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The file is not a valid event list.
    #[error("Invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two events share an id.
    #[error("Duplicate event id in catalog: {0}")]
    DuplicateEvent(EventId),
}

/// Immutable catalog loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct JsonFileCatalog {
    events: HashMap<EventId, EventDetails>,
}

impl JsonFileCatalog {
    /// Load a catalog from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the file is unreadable, malformed, or
    /// repeats an event id.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&raw)?;
        tracing::info!(path = %path.display(), events = catalog.len(), "Event catalog loaded");
        Ok(catalog)
    }

    /// Parse a catalog from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the JSON is malformed or repeats an event id.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let entries: Vec<EventDetails> = serde_json::from_str(raw)?;

        let mut events = HashMap::with_capacity(entries.len());
        for event in entries {
            if let Some(previous) = events.insert(event.id.clone(), event) {
                return Err(CatalogError::DuplicateEvent(previous.id));
            }
        }
        Ok(Self { events })
    }

    /// Number of events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the catalog has no events
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventCatalog for JsonFileCatalog {
    fn get_event(&self, event_id: &EventId) -> Option<EventDetails> {
        self.events.get(event_id).cloned()
    }

    fn list_events(&self) -> Vec<EventDetails> {
        let mut events: Vec<_> = self.events.values().cloned().collect();
        events.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
        events
    }
}
