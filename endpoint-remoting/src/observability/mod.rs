//! Canonical structured event names and field values shared by library components.

pub mod events;
pub mod fields;
