//! HTTP request handlers.

pub mod events;
pub mod health;
pub mod registrations;

pub use events::{list_attendees, list_events};
pub use health::{health_check, readiness_check};
pub use registrations::{drop_out, list_registrations, sign_up};
