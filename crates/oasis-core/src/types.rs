//! Record types for cabins, guests, bookings and settings

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::availability::{each_day_of_interval, nights_between};

/// Primary key type shared by every table
pub type RecordId = i64;

/// Cabin row (read-only from this layer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cabin {
    pub id: RecordId,

    #[serde(rename = "created_at")]
    pub created_at: DateTime<Utc>,

    pub name: String,

    /// Maximum number of guests per booking
    pub max_capacity: i32,

    /// Nightly price before discount
    pub regular_price: f64,

    /// Nightly discount, never above `regular_price`
    #[serde(default)]
    pub discount: f64,

    /// Public image URL
    pub image: Option<String>,

    pub description: Option<String>,
}

/// Pricing projection of a cabin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CabinPrice {
    pub regular_price: f64,
    #[serde(default)]
    pub discount: f64,
}

impl CabinPrice {
    /// Price per night after discount
    pub fn nightly_price(&self) -> f64 {
        self.regular_price - self.discount
    }
}

/// Listing projection of a cabin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CabinSummary {
    pub id: RecordId,
    pub name: String,
    pub max_capacity: i32,
    pub regular_price: f64,
    #[serde(default)]
    pub discount: f64,
    pub image: Option<String>,
}

/// Guest row, identified by its unique email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub id: RecordId,

    #[serde(rename = "created_at")]
    pub created_at: DateTime<Utc>,

    pub full_name: String,
    pub email: String,
    pub nationality: Option<String>,

    #[serde(rename = "nationalID")]
    pub national_id: Option<String>,

    pub country_flag: Option<String>,
}

/// Insert payload for a guest (id and created_at are assigned by the store)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGuest {
    pub full_name: String,
    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,

    #[serde(rename = "nationalID", skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_flag: Option<String>,
}

impl NewGuest {
    pub fn new(full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            email: email.into(),
            nationality: None,
            national_id: None,
            country_flag: None,
        }
    }
}

/// Partial guest update. Only `Some` fields reach the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,

    #[serde(rename = "nationalID", skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_flag: Option<String>,
}

/// Booking lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    #[default]
    Unconfirmed,
    CheckedIn,
    CheckedOut,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Unconfirmed => "unconfirmed",
            BookingStatus::CheckedIn => "checked-in",
            BookingStatus::CheckedOut => "checked-out",
        }
    }

    /// Whether a booking in this state still holds its cabin
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Unconfirmed | BookingStatus::CheckedIn)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Booking row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: RecordId,

    #[serde(rename = "created_at")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "calendar_date")]
    pub start_date: NaiveDate,

    #[serde(with = "calendar_date")]
    pub end_date: NaiveDate,

    pub num_nights: i32,
    pub num_guests: i32,
    pub cabin_price: Option<f64>,
    pub extras_price: Option<f64>,
    pub total_price: f64,
    pub status: BookingStatus,
    pub has_breakfast: Option<bool>,
    pub is_paid: Option<bool>,
    pub observations: Option<String>,
    pub cabin_id: RecordId,
    pub guest_id: RecordId,
}

impl Booking {
    /// Every calendar day of the stay, both endpoints included
    pub fn days(&self) -> Vec<NaiveDate> {
        each_day_of_interval(self.start_date, self.end_date)
    }
}

/// Insert payload for a booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub num_nights: i32,
    pub num_guests: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cabin_price: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras_price: Option<f64>,

    pub total_price: f64,

    #[serde(default)]
    pub status: BookingStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_breakfast: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_paid: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,

    pub cabin_id: RecordId,
    pub guest_id: RecordId,
}

/// A booking payload that cannot describe a real stay
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingRuleViolation {
    #[error("end date {end} must be after start date {start}")]
    EmptyStay { start: NaiveDate, end: NaiveDate },

    #[error("numNights is {stated} but the stay lasts {actual} nights")]
    NightsMismatch { stated: i32, actual: i64 },

    #[error("a booking needs at least one guest")]
    NoGuests,
}

impl NewBooking {
    /// Check the payload describes a contiguous, non-empty stay
    pub fn validate(&self) -> Result<(), BookingRuleViolation> {
        check_stay(self.start_date, self.end_date, self.num_nights)?;

        if self.num_guests < 1 {
            return Err(BookingRuleViolation::NoGuests);
        }

        Ok(())
    }
}

/// A stay is non-empty and its night count matches its dates
fn check_stay(
    start: NaiveDate,
    end: NaiveDate,
    num_nights: i32,
) -> Result<(), BookingRuleViolation> {
    if end <= start {
        return Err(BookingRuleViolation::EmptyStay { start, end });
    }

    let actual = nights_between(start, end);
    if i64::from(num_nights) != actual {
        return Err(BookingRuleViolation::NightsMismatch {
            stated: num_nights,
            actual,
        });
    }

    Ok(())
}

/// Partial booking update. Only `Some` fields reach the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_nights: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_guests: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cabin_price: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras_price: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BookingStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_breakfast: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_paid: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
}

impl BookingUpdate {
    /// Whether the update touches the dates or the night count
    pub fn changes_stay(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some() || self.num_nights.is_some()
    }

    /// Check the stay that results from applying this update to `current`
    pub fn validate_against(&self, current: &Booking) -> Result<(), BookingRuleViolation> {
        if let Some(guests) = self.num_guests {
            if guests < 1 {
                return Err(BookingRuleViolation::NoGuests);
            }
        }

        check_stay(
            self.start_date.unwrap_or(current.start_date),
            self.end_date.unwrap_or(current.end_date),
            self.num_nights.unwrap_or(current.num_nights),
        )
    }
}

/// Cabin fields embedded into a guest's booking list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CabinThumbnail {
    pub name: String,
    pub image: Option<String>,
}

/// Booking as listed on a guest's reservations page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestBooking {
    pub id: RecordId,

    #[serde(rename = "created_at")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "calendar_date")]
    pub start_date: NaiveDate,

    #[serde(with = "calendar_date")]
    pub end_date: NaiveDate,

    pub num_nights: i32,
    pub num_guests: i32,
    pub total_price: f64,
    pub guest_id: RecordId,
    pub cabin_id: RecordId,

    /// Joined cabin, absent when the cabin row is gone
    #[serde(rename = "cabins")]
    pub cabin: Option<CabinThumbnail>,
}

/// Global booking policy (single row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub id: RecordId,

    #[serde(rename = "created_at")]
    pub created_at: DateTime<Utc>,

    pub min_booking_length: i32,
    pub max_booking_length: i32,
    pub max_guests_per_booking: i32,
    pub breakfast_price: f64,
}

/// Public endpoint listing every country's name and flag image
pub const DEFAULT_COUNTRIES_URL: &str = "https://restcountries.com/v2/all?fields=name,flag";

/// Entry of the public country list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    pub flag: String,
}

/// Parse a stored date column.
///
/// Accepts `YYYY-MM-DD`, or a timestamp whose first ten characters are the
/// calendar date (`2024-03-10T00:00:00+00:00`, `2024-03-10 00:00:00`).
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }

    let separator = raw.as_bytes().get(10)?;
    if *separator != b'T' && *separator != b' ' {
        return None;
    }
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
}

/// Serde adapter for date columns that may come back as timestamps
pub mod calendar_date {
    use super::parse_calendar_date;
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format("%Y-%m-%d"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_calendar_date(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid calendar date: {raw}")))
    }
}
