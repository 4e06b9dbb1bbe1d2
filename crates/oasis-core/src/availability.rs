//! Calendar-day arithmetic for stays

use chrono::NaiveDate;

/// Every calendar day in the closed interval `[start, end]`.
///
/// Steps by calendar day, so a stay crossing a daylight-saving change still
/// yields one entry per date. An inverted interval yields nothing.
pub fn each_day_of_interval(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|day| *day <= end).collect()
}

/// Number of nights between check-in and check-out
pub fn nights_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}
