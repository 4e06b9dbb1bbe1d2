//! Core record types and storage abstractions for the Wild Oasis booking data layer
//!
//! This crate provides the typed shapes of the four stored tables (cabins,
//! guests, bookings, settings), the `Store` query-builder trait every backend
//! implements, an in-memory store, and the calendar helpers used to turn
//! bookings into unavailable dates.

pub mod availability;
pub mod memory;
pub mod schema;
pub mod store;
pub mod types;

pub use availability::*;
pub use memory::MemoryStore;
pub use store::*;
pub use types::*;
