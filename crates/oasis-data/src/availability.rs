//! Unavailable dates of a cabin, as consumed by the booking date picker

use chrono::{NaiveDate, Utc};
use oasis_core::schema::{columns, tables};
use oasis_core::{Booking, BookingStatus, Predicate, RecordId, Select};
use tracing::{debug, instrument, warn};

use crate::{DataError, DataResult, DataService};

/// Bookings starting today or later, plus stays that are checked in but
/// began before today
pub fn still_occupying(today: NaiveDate) -> Predicate {
    Predicate::or([
        Predicate::gte(columns::START_DATE, today),
        Predicate::eq(columns::STATUS, BookingStatus::CheckedIn),
    ])
}

impl DataService {
    /// Every date the cabin is booked from today (UTC) on
    pub async fn get_booked_dates_by_cabin_id(
        &self,
        cabin_id: RecordId,
    ) -> DataResult<Vec<NaiveDate>> {
        let today = Utc::now().date_naive();
        self.booked_dates_as_of(cabin_id, today).await
    }

    /// Every date the cabin is booked, relative to `today`.
    ///
    /// Each stay contributes every day from its start to its end date
    /// inclusive, in row order. Dates shared by two bookings appear twice.
    #[instrument(skip(self))]
    pub async fn booked_dates_as_of(
        &self,
        cabin_id: RecordId,
        today: NaiveDate,
    ) -> DataResult<Vec<NaiveDate>> {
        let query = Select::from(tables::BOOKINGS)
            .eq(columns::CABIN_ID, cabin_id)
            .filter(still_occupying(today));

        let bookings: Vec<Booking> = self
            .fetch_all(&query, DataError::BookingsNotLoaded)
            .await?;

        let dates: Vec<NaiveDate> = bookings
            .iter()
            .flat_map(|booking| {
                if booking.end_date < booking.start_date {
                    warn!(
                        booking_id = booking.id,
                        "Booking ends before it starts; contributes no dates"
                    );
                }
                booking.days()
            })
            .collect();

        debug!(
            "Cabin {} has {} booked dates from {} bookings",
            cabin_id,
            dates.len(),
            bookings.len()
        );
        Ok(dates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_still_occupying_shape() {
        let today: NaiveDate = "2024-03-10".parse().unwrap();
        assert_eq!(
            still_occupying(today),
            Predicate::Or(vec![
                Predicate::Gte("startDate", oasis_core::Value::Date(today)),
                Predicate::Eq("status", oasis_core::Value::Text("checked-in".into())),
            ])
        );
    }
}
