//! Read accessors
//!
//! Each accessor issues exactly one filtered select. Lookups where absence
//! is meaningful return [`Lookup`]; everything else fails loudly.

use oasis_core::schema::{
    columns, tables, BOOKING_CABIN_COLUMNS, CABIN_PRICE_COLUMNS, CABIN_SUMMARY_COLUMNS,
    GUEST_BOOKING_COLUMNS,
};
use oasis_core::{
    by_id, from_row, Booking, Cabin, CabinPrice, CabinSummary, Guest, GuestBooking, RecordId,
    Select, Settings,
};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};

use crate::{exactly_one, DataError, DataResult, DataService, Lookup};

impl DataService {
    /// Cabin by primary key
    #[instrument(skip(self))]
    pub async fn get_cabin(&self, id: RecordId) -> Lookup<Cabin> {
        let query = Select::from(tables::CABINS).filter(by_id(id));
        self.lookup(&query).await
    }

    /// Only the pricing columns of a cabin
    #[instrument(skip(self))]
    pub async fn get_cabin_price(&self, id: RecordId) -> Lookup<CabinPrice> {
        let query = Select::from(tables::CABINS)
            .columns(&CABIN_PRICE_COLUMNS)
            .filter(by_id(id));
        self.lookup(&query).await
    }

    /// Every cabin, ordered by name
    #[instrument(skip(self))]
    pub async fn get_cabins(&self) -> DataResult<Vec<CabinSummary>> {
        let query = Select::from(tables::CABINS)
            .columns(&CABIN_SUMMARY_COLUMNS)
            .order_by(columns::NAME);
        self.fetch_all(&query, DataError::CabinsNotLoaded).await
    }

    /// Guest by email.
    ///
    /// A missing guest is an expected answer (sign-in creates one), so this
    /// never fails; store faults come back as `Lookup::Fault`.
    #[instrument(skip(self))]
    pub async fn get_guest(&self, email: &str) -> Lookup<Guest> {
        let query = Select::from(tables::GUESTS).eq(columns::EMAIL, email);
        self.lookup(&query).await
    }

    /// Booking by primary key
    #[instrument(skip(self))]
    pub async fn get_booking(&self, id: RecordId) -> DataResult<Booking> {
        let query = Select::from(tables::BOOKINGS).filter(by_id(id));
        self.fetch_one(&query, DataError::BookingNotLoaded).await
    }

    /// A guest's bookings with their cabin's name and image, earliest first
    #[instrument(skip(self))]
    pub async fn get_bookings(&self, guest_id: RecordId) -> DataResult<Vec<GuestBooking>> {
        let query = Select::from(tables::BOOKINGS)
            .columns(&GUEST_BOOKING_COLUMNS)
            .embed(tables::CABINS, &BOOKING_CABIN_COLUMNS, columns::CABIN_ID)
            .eq(columns::GUEST_ID, guest_id)
            .order_by(columns::START_DATE);
        self.fetch_all(&query, DataError::BookingsNotLoaded).await
    }

    /// The settings row; nothing works without it
    #[instrument(skip(self))]
    pub async fn get_settings(&self) -> DataResult<Settings> {
        let query = Select::from(tables::SETTINGS);
        self.fetch_one(&query, DataError::SettingsNotLoaded).await
    }

    /// At most one row. Absence is reported, not logged as a failure.
    pub(crate) async fn lookup<T: DeserializeOwned>(&self, query: &Select) -> Lookup<T> {
        let table = query.table;
        let rows = match self.store.select(query).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(table, error = %e, "Lookup failed");
                return Lookup::Fault;
            }
        };

        match exactly_one(rows) {
            Ok(row) => match from_row(row) {
                Ok(record) => Lookup::Found(record),
                Err(e) => {
                    error!(table, error = %e, "Row could not be decoded");
                    Lookup::Fault
                }
            },
            Err(0) => {
                debug!(table, "No matching row");
                Lookup::NotFound
            }
            Err(count) => {
                error!(table, rows = count, "Expected a single row");
                Lookup::Fault
            }
        }
    }

    /// Exactly one row, or `failure`
    pub(crate) async fn fetch_one<T: DeserializeOwned>(
        &self,
        query: &Select,
        failure: DataError,
    ) -> DataResult<T> {
        match self.lookup(query).await {
            Lookup::Found(record) => Ok(record),
            Lookup::NotFound => {
                error!(table = query.table, "Required row is missing");
                Err(failure)
            }
            Lookup::Fault => Err(failure),
        }
    }

    /// Every matching row; one bad row fails the whole read
    pub(crate) async fn fetch_all<T: DeserializeOwned>(
        &self,
        query: &Select,
        failure: DataError,
    ) -> DataResult<Vec<T>> {
        let table = query.table;
        let rows = match self.store.select(query).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(table, error = %e, "Select failed");
                return Err(failure);
            }
        };

        let count = rows.len();
        let records = match rows.into_iter().map(from_row).collect::<Result<Vec<T>, _>>() {
            Ok(records) => records,
            Err(e) => {
                error!(table, error = %e, "Row could not be decoded");
                return Err(failure);
            }
        };

        debug!("Loaded {} rows from {}", count, table);
        Ok(records)
    }
}
