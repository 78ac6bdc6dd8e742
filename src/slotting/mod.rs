//! Event role slotting.
//!
//! `policy` answers questions about a roster, `engine` applies slot, unslot
//! and kick to one, and `service` wraps both in versioned persistence and
//! role notifications.

pub mod engine;
pub mod policy;
mod service;

pub use service::{Mutation, SlotService};
