//! Write accessors for guests and bookings
//!
//! Updates send only the fields the caller set, never a full record, so
//! concurrent edits to other columns survive.

use oasis_core::schema::{columns, tables};
use oasis_core::{
    from_row, to_row, Booking, BookingStatus, BookingUpdate, Delete, Guest, GuestUpdate, Insert,
    NewBooking, NewGuest, Predicate, RecordId, Row, Select, Update,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::{decode_single, DataError, DataResult, DataService};

/// Id of an active booking standing in the way of a new one
#[derive(Deserialize)]
struct ConflictingBooking {
    id: RecordId,
}

/// Serialize a payload, mapping failure to `failure`
fn encode<T: Serialize>(payload: &T, failure: DataError) -> DataResult<Row> {
    to_row(payload).map_err(|e| {
        error!(error = %e, "Payload could not be encoded");
        failure
    })
}

impl DataService {
    /// Insert a guest and return the stored row
    #[instrument(skip(self, guest), fields(email = %guest.email))]
    pub async fn create_guest(&self, guest: NewGuest) -> DataResult<Guest> {
        let row = encode(&guest, DataError::GuestNotCreated)?;
        let insert = Insert::into_table(tables::GUESTS).row(row);
        let created: Guest = self.insert_one(&insert, DataError::GuestNotCreated).await?;

        info!(guest_id = created.id, "Guest created");
        Ok(created)
    }

    /// Insert a booking and return the stored row with its id and created_at.
    ///
    /// Rejects stays that are empty, whose night count disagrees with the
    /// dates, or that overlap an active booking of the same cabin. The
    /// overlap check and the insert are separate statements.
    #[instrument(skip(self, booking), fields(cabin_id = booking.cabin_id, guest_id = booking.guest_id))]
    pub async fn create_booking(&self, booking: NewBooking) -> DataResult<Booking> {
        booking.validate()?;
        self.ensure_cabin_free(&booking).await?;

        let row = encode(&booking, DataError::BookingNotCreated)?;
        let insert = Insert::into_table(tables::BOOKINGS).row(row);
        let created: Booking = self.insert_one(&insert, DataError::BookingNotCreated).await?;

        info!(booking_id = created.id, "Booking created");
        Ok(created)
    }

    /// Apply the set fields of `changes` to guest `id`
    #[instrument(skip(self, changes))]
    pub async fn update_guest(&self, id: RecordId, changes: GuestUpdate) -> DataResult<Guest> {
        let fields = encode(&changes, DataError::GuestNotUpdated)?;
        self.update_one(tables::GUESTS, id, fields, DataError::GuestNotUpdated)
            .await
    }

    /// Apply the set fields of `changes` to booking `id`.
    ///
    /// When the dates or night count change, the stay that results from
    /// merging them into the stored row must still be valid.
    #[instrument(skip(self, changes))]
    pub async fn update_booking(
        &self,
        id: RecordId,
        changes: BookingUpdate,
    ) -> DataResult<Booking> {
        if changes.changes_stay() {
            let current = match self.get_booking(id).await {
                Ok(current) => current,
                Err(_) => return Err(DataError::BookingNotUpdated),
            };
            changes.validate_against(&current)?;
        }

        let fields = encode(&changes, DataError::BookingNotUpdated)?;
        self.update_one(tables::BOOKINGS, id, fields, DataError::BookingNotUpdated)
            .await
    }

    /// Remove booking `id` and return what it was
    #[instrument(skip(self))]
    pub async fn delete_booking(&self, id: RecordId) -> DataResult<Booking> {
        let delete = Delete::from(tables::BOOKINGS).eq(columns::ID, id);
        let rows = match self.store.delete(&delete).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "Delete failed");
                return Err(DataError::BookingNotDeleted);
            }
        };

        let deleted: Booking = decode_single(rows, tables::BOOKINGS, DataError::BookingNotDeleted)?;
        info!("Booking deleted");
        Ok(deleted)
    }

    async fn ensure_cabin_free(&self, booking: &NewBooking) -> DataResult<()> {
        if !booking.status.is_active() {
            return Ok(());
        }

        let query = Select::from(tables::BOOKINGS)
            .columns(&[columns::ID])
            .eq(columns::CABIN_ID, booking.cabin_id)
            .filter(Predicate::lt(columns::START_DATE, booking.end_date))
            .filter(Predicate::gt(columns::END_DATE, booking.start_date))
            .filter(Predicate::or([
                Predicate::eq(columns::STATUS, BookingStatus::Unconfirmed),
                Predicate::eq(columns::STATUS, BookingStatus::CheckedIn),
            ]));

        let rows = match self.store.select(&query).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "Overlap check failed");
                return Err(DataError::BookingNotCreated);
            }
        };

        let Some(row) = rows.into_iter().next() else {
            return Ok(());
        };

        match from_row::<ConflictingBooking>(row) {
            Ok(conflict) => {
                warn!(
                    conflicting = conflict.id,
                    "Requested stay overlaps an active booking"
                );
                Err(DataError::BookingOverlap {
                    cabin_id: booking.cabin_id,
                    conflicting: conflict.id,
                })
            }
            Err(e) => {
                error!(error = %e, "Overlapping booking could not be decoded");
                Err(DataError::BookingNotCreated)
            }
        }
    }

    async fn insert_one<T: DeserializeOwned>(
        &self,
        insert: &Insert,
        failure: DataError,
    ) -> DataResult<T> {
        match self.store.insert(insert).await {
            Ok(rows) => decode_single(rows, insert.table, failure),
            Err(e) => {
                error!(table = insert.table, error = %e, "Insert failed");
                Err(failure)
            }
        }
    }

    async fn update_one<T: DeserializeOwned>(
        &self,
        table: &'static str,
        id: RecordId,
        fields: Row,
        failure: DataError,
    ) -> DataResult<T> {
        if fields.is_empty() {
            error!(table, "Update without any changed field");
            return Err(failure);
        }

        let update = Update::table(table, fields).eq(columns::ID, id);
        match self.store.update(&update).await {
            Ok(rows) => decode_single(rows, table, failure),
            Err(e) => {
                error!(table, error = %e, "Update failed");
                Err(failure)
            }
        }
    }
}
