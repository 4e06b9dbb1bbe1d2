//! Table and column names of the booking backend
//!
//! Column names keep the backend's camelCase spelling. Do not rename them
//! without migrating the stored tables.

/// Table names
pub mod tables {
    pub const CABINS: &str = "cabins";
    pub const GUESTS: &str = "guests";
    pub const BOOKINGS: &str = "bookings";
    pub const SETTINGS: &str = "settings";

    pub const ALL: [&str; 4] = [CABINS, GUESTS, BOOKINGS, SETTINGS];
}

/// Column names shared by several tables
pub mod columns {
    pub const ID: &str = "id";
    pub const CREATED_AT: &str = "created_at";

    // cabins
    pub const NAME: &str = "name";
    pub const MAX_CAPACITY: &str = "maxCapacity";
    pub const REGULAR_PRICE: &str = "regularPrice";
    pub const DISCOUNT: &str = "discount";
    pub const IMAGE: &str = "image";

    // guests
    pub const EMAIL: &str = "email";

    // bookings
    pub const START_DATE: &str = "startDate";
    pub const END_DATE: &str = "endDate";
    pub const NUM_NIGHTS: &str = "numNights";
    pub const NUM_GUESTS: &str = "numGuests";
    pub const TOTAL_PRICE: &str = "totalPrice";
    pub const STATUS: &str = "status";
    pub const GUEST_ID: &str = "guestId";
    pub const CABIN_ID: &str = "cabinId";
}

/// Columns fetched for price-sensitive paths (checkout summaries)
pub const CABIN_PRICE_COLUMNS: [&str; 2] = [columns::REGULAR_PRICE, columns::DISCOUNT];

/// Columns fetched for the cabin listing
pub const CABIN_SUMMARY_COLUMNS: [&str; 6] = [
    columns::ID,
    columns::NAME,
    columns::MAX_CAPACITY,
    columns::REGULAR_PRICE,
    columns::DISCOUNT,
    columns::IMAGE,
];

/// Booking columns listed on a guest's reservations page
pub const GUEST_BOOKING_COLUMNS: [&str; 9] = [
    columns::ID,
    columns::CREATED_AT,
    columns::START_DATE,
    columns::END_DATE,
    columns::NUM_NIGHTS,
    columns::NUM_GUESTS,
    columns::TOTAL_PRICE,
    columns::GUEST_ID,
    columns::CABIN_ID,
];

/// Cabin columns embedded into each guest booking
pub const BOOKING_CABIN_COLUMNS: [&str; 2] = [columns::NAME, columns::IMAGE];
