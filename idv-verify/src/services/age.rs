//! Age from a textual birthdate
//!
//! Birthdates arrive as three numeric components (`01/01/1990`). The component
//! order is configurable because the same literal reads differently per locale.

use chrono::{Datelike, Local, NaiveDate};
use idv_common::config::DateOrder;
use thiserror::Error;

/// Age computation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgeError {
    #[error("Invalid date format: {0:?}")]
    InvalidDateFormat(String),

    #[error("Birthdate {0} is after the reference date")]
    FutureBirthdate(NaiveDate),
}

/// Parse a birthdate written in `order`
///
/// Accepts `/`, `-` or `.` as separator. Components out of calendar range
/// (month 13, February 30) are rejected rather than wrapped. A one- or
/// two-digit year is read as 19xx; any other length than four is rejected.
pub fn parse_birthdate(text: &str, order: DateOrder) -> Result<NaiveDate, AgeError> {
    let invalid = || AgeError::InvalidDateFormat(text.to_string());

    let parts: Vec<&str> = text
        .trim()
        .split(&['/', '-', '.'][..])
        .map(str::trim)
        .collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
        return Err(invalid());
    }

    let nums: Vec<u32> = parts
        .iter()
        .map(|p| p.parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|_| invalid())?;

    let (year_at, month_at, day_at) = match order {
        DateOrder::MonthDayYear => (2, 0, 1),
        DateOrder::DayMonthYear => (2, 1, 0),
        DateOrder::YearMonthDay => (0, 1, 2),
    };
    let (month, day) = (nums[month_at], nums[day_at]);

    // Two-digit years are 19xx; three-digit years are never meant literally
    let year = match parts[year_at].len() {
        1 | 2 => 1900 + nums[year_at],
        4 => nums[year_at],
        _ => return Err(invalid()),
    };
    let year = i32::try_from(year).map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Whole years between `birthdate` and `today`
///
/// One year is subtracted when today's month/day is strictly before the birth month/day.
pub fn age_between(birthdate: NaiveDate, today: NaiveDate) -> Result<i64, AgeError> {
    if birthdate > today {
        return Err(AgeError::FutureBirthdate(birthdate));
    }

    let mut age = (today.year() - birthdate.year()) as i64;
    if (today.month(), today.day()) < (birthdate.month(), birthdate.day()) {
        age -= 1;
    }
    Ok(age)
}

/// Age on `today` of someone born on the textual `birthdate`
pub fn age_on(birthdate: &str, order: DateOrder, today: NaiveDate) -> Result<i64, AgeError> {
    age_between(parse_birthdate(birthdate, order)?, today)
}

/// Age as of the current local date
pub fn age_from_birthdate(birthdate: &str, order: DateOrder) -> Result<i64, AgeError> {
    age_on(birthdate, order, Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_before_and_on_anniversary() {
        let mdy = DateOrder::MonthDayYear;
        assert_eq!(age_on("06/15/1990", mdy, date(2025, 6, 14)), Ok(34));
        assert_eq!(age_on("06/15/1990", mdy, date(2025, 6, 15)), Ok(35));
        assert_eq!(age_on("06/15/1990", mdy, date(2025, 12, 31)), Ok(35));
    }

    #[test]
    fn test_new_years_birthday() {
        // Jan 1 birthday: any day of the year is on/after the anniversary
        assert_eq!(age_on("01/01/1990", DateOrder::MonthDayYear, date(2025, 1, 1)), Ok(35));
        assert_eq!(age_on("01/01/1990", DateOrder::MonthDayYear, date(2024, 12, 31)), Ok(34));
    }

    #[test]
    fn test_ambiguous_literal_follows_order() {
        let today = date(2025, 11, 1);
        // Oct 12 has passed on Nov 1, Dec 10 has not
        assert_eq!(age_on("10/12/2001", DateOrder::MonthDayYear, today), Ok(24));
        assert_eq!(age_on("10/12/2001", DateOrder::DayMonthYear, today), Ok(23));
        assert_eq!(age_on("2001-12-10", DateOrder::YearMonthDay, today), Ok(23));
    }

    #[test]
    fn test_leap_day_birthday() {
        let mdy = DateOrder::MonthDayYear;
        assert_eq!(age_on("02/29/2000", mdy, date(2025, 2, 28)), Ok(24));
        assert_eq!(age_on("02/29/2000", mdy, date(2025, 3, 1)), Ok(25));
    }

    #[test]
    fn test_invalid_formats() {
        let mdy = DateOrder::MonthDayYear;
        let today = date(2025, 1, 1);
        for bad in ["", "1990", "01/01", "01/01/1990/5", "aa/bb/cccc", "13/01/1990", "02/30/1990", "-1/01/1990"] {
            assert!(
                matches!(age_on(bad, mdy, today), Err(AgeError::InvalidDateFormat(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_two_digit_year_is_nineteen_hundreds() {
        let mdy = DateOrder::MonthDayYear;
        assert_eq!(parse_birthdate("01/01/90", mdy), Ok(date(1990, 1, 1)));
        assert_eq!(age_on("01/01/90", mdy, date(2025, 6, 1)), Ok(35));
        assert_eq!(parse_birthdate("90-01-01", DateOrder::YearMonthDay), Ok(date(1990, 1, 1)));
        assert_eq!(parse_birthdate("5/6/7", mdy), Ok(date(1907, 5, 6)));
    }

    #[test]
    fn test_odd_length_years_rejected() {
        let mdy = DateOrder::MonthDayYear;
        for bad in ["01/01/990", "01/01/01990"] {
            assert!(
                matches!(parse_birthdate(bad, mdy), Err(AgeError::InvalidDateFormat(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_future_birthdate() {
        assert!(matches!(
            age_on("01/01/2030", DateOrder::MonthDayYear, date(2025, 1, 1)),
            Err(AgeError::FutureBirthdate(_))
        ));
    }

    #[test]
    fn test_current_date_variant() {
        let today = Local::now().date_naive();
        let expected = today.year() as i64 - 1990;
        // Jan 1 anniversary has always passed
        assert_eq!(age_from_birthdate("01/01/1990", DateOrder::MonthDayYear), Ok(expected));
    }
}
