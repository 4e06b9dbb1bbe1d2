//! Booking & availability data service
//!
//! Every read and write the booking application performs against cabins,
//! guests, bookings and settings goes through [`DataService`]. Store faults
//! are logged here and surfaced as coarse [`DataError`]s naming the entity
//! and action; the underlying detail never leaves the log.

pub mod availability;
pub mod countries;
pub mod read;
pub mod write;

pub use availability::still_occupying;
pub use countries::*;

use std::sync::Arc;

use oasis_core::{from_row, BookingRuleViolation, RecordId, Row, Store};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("Cabins could not be loaded")]
    CabinsNotLoaded,

    #[error("Booking could not get loaded")]
    BookingNotLoaded,

    #[error("Bookings could not get loaded")]
    BookingsNotLoaded,

    #[error("Settings could not be loaded")]
    SettingsNotLoaded,

    #[error("Guest could not be created")]
    GuestNotCreated,

    #[error("Guest could not be updated")]
    GuestNotUpdated,

    #[error("Booking could not be created")]
    BookingNotCreated,

    #[error("Booking could not be updated")]
    BookingNotUpdated,

    #[error("Booking could not be deleted")]
    BookingNotDeleted,

    #[error("Invalid booking: {0}")]
    InvalidBooking(#[from] BookingRuleViolation),

    #[error("Cabin {cabin_id} is already booked for part of that stay")]
    BookingOverlap {
        cabin_id: RecordId,
        conflicting: RecordId,
    },

    #[error("Could not fetch countries")]
    CountriesNotFetched,
}

pub type DataResult<T> = Result<T, DataError>;

/// Outcome of a lookup where absence is a normal answer
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    /// No row matched
    NotFound,
    /// The store failed; details were logged
    Fault,
}

impl<T> Lookup<T> {
    /// Null-tolerant view: both absence and faults become `None`
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound | Lookup::Fault => None,
        }
    }
}

impl<T> From<Lookup<T>> for Option<T> {
    fn from(lookup: Lookup<T>) -> Self {
        lookup.into_option()
    }
}

/// Data access for the booking application.
///
/// Holds one shared store handle; clones share it.
#[derive(Clone)]
pub struct DataService {
    store: Arc<dyn Store>,
}

impl DataService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

/// The only row of `rows`, or how many there were
pub(crate) fn exactly_one(mut rows: Vec<Row>) -> Result<Row, usize> {
    match rows.len() {
        1 => Ok(rows.remove(0)),
        n => Err(n),
    }
}

/// Decode the single row a write returned
pub(crate) fn decode_single<T: DeserializeOwned>(
    rows: Vec<Row>,
    table: &str,
    failure: DataError,
) -> DataResult<T> {
    let decoded = match exactly_one(rows) {
        Ok(row) => from_row(row)
            .map_err(|e| error!(table, error = %e, "Affected row could not be decoded"))
            .ok(),
        Err(count) => {
            error!(table, rows = count, "Expected exactly one affected row");
            None
        }
    };

    decoded.ok_or(failure)
}
