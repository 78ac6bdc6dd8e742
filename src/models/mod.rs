//! Data models for the slotting backend.
//!
//! Field names serialize in camelCase to match the web client.

mod event;

pub use event::*;
