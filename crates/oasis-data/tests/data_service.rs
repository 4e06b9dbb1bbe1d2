use std::sync::Arc;

use chrono::NaiveDate;
use oasis_core::schema::tables;
use oasis_core::{
    BookingRuleViolation, BookingStatus, BookingUpdate, GuestUpdate, MemoryStore, NewBooking,
    NewGuest,
};
use oasis_data::{DataError, DataService, Lookup};
use serde_json::{json, Value};

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn booking_row(id: i64, cabin_id: i64, start: &str, end: &str, status: &str) -> Value {
    json!({
        "id": id,
        "created_at": "2024-01-01T09:00:00+00:00",
        "startDate": start,
        "endDate": end,
        "numNights": 1,
        "numGuests": 2,
        "totalPrice": 500.0,
        "status": status,
        "cabinId": cabin_id,
        "guestId": 1
    })
}

fn new_booking(cabin_id: i64, start: &str, end: &str, nights: i32) -> NewBooking {
    NewBooking {
        start_date: date(start),
        end_date: date(end),
        num_nights: nights,
        num_guests: 2,
        cabin_price: Some(250.0 * f64::from(nights)),
        extras_price: None,
        total_price: 250.0 * f64::from(nights),
        status: BookingStatus::Unconfirmed,
        has_breakfast: Some(false),
        is_paid: Some(false),
        observations: None,
        cabin_id,
        guest_id: 1,
    }
}

fn seeded() -> (Arc<MemoryStore>, DataService) {
    let store = Arc::new(MemoryStore::new());
    store
        .seed(
            tables::CABINS,
            [
                json!({
                    "id": 1, "created_at": "2023-12-01T00:00:00+00:00", "name": "008",
                    "maxCapacity": 8, "regularPrice": 500.0, "discount": 50.0,
                    "image": "cabin-008.jpg", "description": "Big one"
                }),
                json!({
                    "id": 2, "created_at": "2023-12-01T00:00:00+00:00", "name": "001",
                    "maxCapacity": 2, "regularPrice": 250.0, "discount": 0.0,
                    "image": "cabin-001.jpg", "description": null
                }),
            ],
        )
        .unwrap();
    store
        .seed(
            tables::GUESTS,
            [json!({
                "id": 1, "created_at": "2023-12-15T00:00:00+00:00",
                "fullName": "Jonas Schmedtmann", "email": "jonas@example.com",
                "nationality": "Portugal", "nationalID": "PT12345", "countryFlag": null
            })],
        )
        .unwrap();

    let service = DataService::new(store.clone());
    (store, service)
}

fn seed_settings(store: &MemoryStore) {
    store
        .seed(
            tables::SETTINGS,
            [json!({
                "id": 1, "created_at": "2023-12-01T00:00:00+00:00",
                "minBookingLength": 3, "maxBookingLength": 30,
                "maxGuestsPerBooking": 8, "breakfastPrice": 15.0
            })],
        )
        .unwrap();
}

#[tokio::test]
async fn test_created_guest_is_found_by_email() {
    let (_store, service) = seeded();

    let created = service
        .create_guest(NewGuest::new("Ana Lima", "ana@example.com"))
        .await
        .unwrap();
    assert_eq!(created.id, 2);

    let Lookup::Found(guest) = service.get_guest("ana@example.com").await else {
        panic!("guest should be found");
    };
    assert_eq!(guest, created);
}

#[tokio::test]
async fn test_duplicate_guest_email_is_rejected() {
    let (store, service) = seeded();

    let err = service
        .create_guest(NewGuest::new("Someone Else", "jonas@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::GuestNotCreated));
    assert_eq!(err.to_string(), "Guest could not be created");
    assert_eq!(store.count(tables::GUESTS), 1);
}

#[tokio::test]
async fn test_missing_guest_is_not_a_fault() {
    let (store, service) = seeded();

    assert_eq!(service.get_guest("nobody@example.com").await, Lookup::NotFound);

    store.fail_table(tables::GUESTS);
    assert_eq!(service.get_guest("jonas@example.com").await, Lookup::Fault);
    assert_eq!(service.get_guest("jonas@example.com").await.into_option(), None);
}

#[tokio::test]
async fn test_booked_dates_expand_each_stay() {
    let (store, service) = seeded();
    store
        .seed(
            tables::BOOKINGS,
            [booking_row(1, 1, "2024-03-10", "2024-03-13", "unconfirmed")],
        )
        .unwrap();

    let dates = service
        .booked_dates_as_of(1, date("2024-03-01"))
        .await
        .unwrap();
    assert_eq!(
        dates,
        vec![
            date("2024-03-10"),
            date("2024-03-11"),
            date("2024-03-12"),
            date("2024-03-13"),
        ]
    );
}

#[tokio::test]
async fn test_booked_dates_skip_finished_stays() {
    let (store, service) = seeded();
    store
        .seed(
            tables::BOOKINGS,
            [
                // Already over
                booking_row(1, 1, "2024-02-01", "2024-02-03", "checked-out"),
                // Started before today, guest still there
                booking_row(2, 1, "2024-02-28", "2024-03-02", "checked-in"),
                // Upcoming
                booking_row(3, 1, "2024-03-05", "2024-03-06", "unconfirmed"),
                // Other cabin
                booking_row(4, 2, "2024-03-05", "2024-03-06", "unconfirmed"),
            ],
        )
        .unwrap();

    let dates = service
        .booked_dates_as_of(1, date("2024-03-01"))
        .await
        .unwrap();
    assert_eq!(
        dates,
        vec![
            date("2024-02-28"),
            date("2024-02-29"),
            date("2024-03-01"),
            date("2024-03-02"),
            date("2024-03-05"),
            date("2024-03-06"),
        ]
    );
}

#[tokio::test]
async fn test_booked_dates_keep_duplicates_and_drop_inverted_stays() {
    let (store, service) = seeded();
    store
        .seed(
            tables::BOOKINGS,
            [
                booking_row(1, 1, "2024-03-10", "2024-03-11", "unconfirmed"),
                booking_row(2, 1, "2024-03-11", "2024-03-12", "unconfirmed"),
                booking_row(3, 1, "2024-03-20", "2024-03-18", "unconfirmed"),
            ],
        )
        .unwrap();

    let dates = service
        .booked_dates_as_of(1, date("2024-03-01"))
        .await
        .unwrap();
    assert_eq!(dates.len(), 4);
    assert_eq!(dates.iter().filter(|d| **d == date("2024-03-11")).count(), 2);
}

#[tokio::test]
async fn test_booked_dates_fault_is_an_error() {
    let (store, service) = seeded();
    store.fail_table(tables::BOOKINGS);

    let err = service.get_booked_dates_by_cabin_id(1).await.unwrap_err();
    assert_eq!(err.to_string(), "Bookings could not get loaded");
}

#[tokio::test]
async fn test_create_booking_assigns_id_and_timestamp() {
    let (store, service) = seeded();

    let created = service
        .create_booking(new_booking(1, "2024-03-10", "2024-03-13", 3))
        .await
        .unwrap();

    assert_eq!(created.id, 1);
    assert_eq!(created.status, BookingStatus::Unconfirmed);
    assert_eq!(created.num_nights, 3);
    assert_eq!(store.count(tables::BOOKINGS), 1);

    let loaded = service.get_booking(created.id).await.unwrap();
    assert_eq!(loaded, created);
}

#[tokio::test]
async fn test_create_booking_rejects_overlap() {
    let (store, service) = seeded();
    store
        .seed(
            tables::BOOKINGS,
            [booking_row(7, 1, "2024-03-10", "2024-03-13", "unconfirmed")],
        )
        .unwrap();

    let err = service
        .create_booking(new_booking(1, "2024-03-12", "2024-03-14", 2))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DataError::BookingOverlap {
            cabin_id: 1,
            conflicting: 7
        }
    ));

    // Checking in on the day the previous guest leaves is fine
    service
        .create_booking(new_booking(1, "2024-03-13", "2024-03-15", 2))
        .await
        .unwrap();

    // So is the same stay in another cabin
    service
        .create_booking(new_booking(2, "2024-03-10", "2024-03-13", 3))
        .await
        .unwrap();
    assert_eq!(store.count(tables::BOOKINGS), 3);
}

#[tokio::test]
async fn test_checked_out_stays_do_not_block_new_bookings() {
    let (store, service) = seeded();
    store
        .seed(
            tables::BOOKINGS,
            [booking_row(1, 1, "2024-03-10", "2024-03-13", "checked-out")],
        )
        .unwrap();

    service
        .create_booking(new_booking(1, "2024-03-11", "2024-03-12", 1))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_booking_rejects_invalid_payload() {
    let (store, service) = seeded();

    let err = service
        .create_booking(new_booking(1, "2024-03-13", "2024-03-10", 3))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DataError::InvalidBooking(BookingRuleViolation::EmptyStay { .. })
    ));

    let err = service
        .create_booking(new_booking(1, "2024-03-10", "2024-03-13", 5))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DataError::InvalidBooking(BookingRuleViolation::NightsMismatch { .. })
    ));
    assert_eq!(store.count(tables::BOOKINGS), 0);
}

#[tokio::test]
async fn test_update_booking_changes_only_given_fields() {
    let (_store, service) = seeded();
    let created = service
        .create_booking(new_booking(1, "2024-03-10", "2024-03-13", 3))
        .await
        .unwrap();

    let updated = service
        .update_booking(
            created.id,
            BookingUpdate {
                num_guests: Some(4),
                observations: Some("Late arrival".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.num_guests, 4);
    assert_eq!(updated.observations.as_deref(), Some("Late arrival"));
    assert_eq!(updated.start_date, created.start_date);
    assert_eq!(updated.total_price, created.total_price);
    assert_eq!(updated.created_at, created.created_at);
}

#[tokio::test]
async fn test_update_errors() {
    let (_store, service) = seeded();

    let missing = service
        .update_booking(
            99,
            BookingUpdate {
                num_guests: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(missing.to_string(), "Booking could not be updated");

    let empty = service
        .update_guest(1, GuestUpdate::default())
        .await
        .unwrap_err();
    assert_eq!(empty.to_string(), "Guest could not be updated");

    let missing_dates = service
        .update_booking(
            99,
            BookingUpdate {
                end_date: Some(date("2024-03-20")),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(missing_dates.to_string(), "Booking could not be updated");
}

#[tokio::test]
async fn test_update_booking_checks_stay_against_stored_row() {
    let (store, service) = seeded();
    let created = service
        .create_booking(new_booking(1, "2024-03-10", "2024-03-13", 3))
        .await
        .unwrap();

    // Moving only the end date before the start would invert the stay
    let err = service
        .update_booking(
            created.id,
            BookingUpdate {
                end_date: Some(date("2024-03-05")),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DataError::InvalidBooking(BookingRuleViolation::EmptyStay { .. })
    ));

    // Extending the stay without restating the nights
    let err = service
        .update_booking(
            created.id,
            BookingUpdate {
                end_date: Some(date("2024-03-15")),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DataError::InvalidBooking(BookingRuleViolation::NightsMismatch {
            stated: 3,
            actual: 5
        })
    ));

    let unchanged = service
        .booked_dates_as_of(1, date("2024-03-01"))
        .await
        .unwrap();
    assert_eq!(unchanged.len(), 4);

    let updated = service
        .update_booking(
            created.id,
            BookingUpdate {
                end_date: Some(date("2024-03-15")),
                num_nights: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.end_date, date("2024-03-15"));
    assert_eq!(updated.num_nights, 5);
    assert_eq!(store.count(tables::BOOKINGS), 1);
}

#[tokio::test]
async fn test_create_booking_store_faults() {
    let (store, service) = seeded();
    store.fail_table(tables::BOOKINGS);

    // Active bookings fail on the overlap check
    let err = service
        .create_booking(new_booking(1, "2024-03-10", "2024-03-13", 3))
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::BookingNotCreated));
    assert_eq!(err.to_string(), "Booking could not be created");

    // Checked-out bookings skip it and fail on the insert
    let mut finished = new_booking(1, "2024-03-10", "2024-03-13", 3);
    finished.status = BookingStatus::CheckedOut;
    let err = service.create_booking(finished).await.unwrap_err();
    assert!(matches!(err, DataError::BookingNotCreated));

    store.heal_table(tables::BOOKINGS);
    assert_eq!(store.count(tables::BOOKINGS), 0);
}

#[tokio::test]
async fn test_update_guest_errors() {
    let (_store, service) = seeded();
    service
        .create_guest(NewGuest::new("Ana Lima", "ana@example.com"))
        .await
        .unwrap();

    let missing = service
        .update_guest(
            42,
            GuestUpdate {
                nationality: Some("Spain".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(missing, DataError::GuestNotUpdated));
    assert_eq!(missing.to_string(), "Guest could not be updated");

    let taken = service
        .update_guest(
            2,
            GuestUpdate {
                email: Some("jonas@example.com".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(taken, DataError::GuestNotUpdated));

    let Lookup::Found(guest) = service.get_guest("ana@example.com").await else {
        panic!("guest should keep the original email");
    };
    assert_eq!(guest.id, 2);
}

#[tokio::test]
async fn test_update_guest_profile() {
    let (_store, service) = seeded();

    let guest = service
        .update_guest(
            1,
            GuestUpdate {
                nationality: Some("Spain".into()),
                country_flag: Some("https://flagcdn.com/es.svg".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(guest.nationality.as_deref(), Some("Spain"));
    assert_eq!(guest.national_id.as_deref(), Some("PT12345"));
    assert_eq!(guest.email, "jonas@example.com");
}

#[tokio::test]
async fn test_delete_booking() {
    let (store, service) = seeded();
    store
        .seed(
            tables::BOOKINGS,
            [booking_row(3, 1, "2024-03-10", "2024-03-11", "unconfirmed")],
        )
        .unwrap();

    let err = service.delete_booking(42).await.unwrap_err();
    assert_eq!(err.to_string(), "Booking could not be deleted");
    assert_eq!(store.count(tables::BOOKINGS), 1);

    let deleted = service.delete_booking(3).await.unwrap();
    assert_eq!(deleted.id, 3);
    assert_eq!(store.count(tables::BOOKINGS), 0);

    let err = service.get_booking(3).await.unwrap_err();
    assert_eq!(err.to_string(), "Booking could not get loaded");
}

#[tokio::test]
async fn test_guest_bookings_embed_cabin() {
    let (store, service) = seeded();
    store
        .seed(
            tables::BOOKINGS,
            [
                booking_row(1, 1, "2024-06-01", "2024-06-02", "unconfirmed"),
                booking_row(2, 2, "2024-04-01", "2024-04-02", "checked-out"),
                booking_row(3, 9, "2024-05-01", "2024-05-02", "unconfirmed"),
            ],
        )
        .unwrap();

    let bookings = service.get_bookings(1).await.unwrap();
    let ids: Vec<i64> = bookings.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![2, 3, 1]);

    let cabin = bookings[0].cabin.as_ref().unwrap();
    assert_eq!(cabin.name, "001");
    assert_eq!(cabin.image.as_deref(), Some("cabin-001.jpg"));
    assert_eq!(bookings[1].cabin, None);

    assert!(service.get_bookings(2).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cabins_listing_and_price() {
    let (store, service) = seeded();

    let cabins = service.get_cabins().await.unwrap();
    let names: Vec<&str> = cabins.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["001", "008"]);

    let Lookup::Found(price) = service.get_cabin_price(1).await else {
        panic!("cabin 1 should have a price");
    };
    assert_eq!(price.nightly_price(), 450.0);

    let Lookup::Found(cabin) = service.get_cabin(1).await else {
        panic!("cabin 1 should exist");
    };
    assert_eq!(cabin.description.as_deref(), Some("Big one"));
    assert_eq!(service.get_cabin(5).await, Lookup::NotFound);

    store.fail_table(tables::CABINS);
    let err = service.get_cabins().await.unwrap_err();
    assert_eq!(err.to_string(), "Cabins could not be loaded");
}

#[tokio::test]
async fn test_settings_row_is_required() {
    let (store, service) = seeded();

    let err = service.get_settings().await.unwrap_err();
    assert_eq!(err.to_string(), "Settings could not be loaded");

    seed_settings(&store);
    let settings = service.get_settings().await.unwrap();
    assert_eq!(settings.min_booking_length, 3);
    assert_eq!(settings.breakfast_price, 15.0);
}

#[tokio::test]
async fn test_reads_are_repeatable() {
    let (store, service) = seeded();
    seed_settings(&store);
    store
        .seed(
            tables::BOOKINGS,
            [booking_row(1, 1, "2024-03-10", "2024-03-13", "unconfirmed")],
        )
        .unwrap();

    let today = date("2024-03-01");
    assert_eq!(
        service.booked_dates_as_of(1, today).await.unwrap(),
        service.booked_dates_as_of(1, today).await.unwrap()
    );
    assert_eq!(
        service.get_settings().await.unwrap(),
        service.get_settings().await.unwrap()
    );
    assert_eq!(service.get_cabin(2).await, service.get_cabin(2).await);
}

#[tokio::test]
async fn test_store_recovers_after_fault() {
    let (store, service) = seeded();
    store.fail_table(tables::BOOKINGS);
    assert!(service.get_bookings(1).await.is_err());

    store.heal_table(tables::BOOKINGS);
    assert!(service.get_bookings(1).await.unwrap().is_empty());
}
