use chrono::{Duration, Local, NaiveDate};

use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// Substring by character position, 0-based, clamped to the string.
pub fn substring(s: &str, start: f64, len: f64) -> Result<String> {
    if start < 0.0 || start.fract() != 0.0 || len < 0.0 || len.fract() != 0.0 {
        return Err(error!(TypeMismatch; "substr needs a 0-based start and a length"));
    }
    Ok(s.chars().skip(start as usize).take(len as usize).collect())
}

pub fn reverse(s: &str) -> String {
    s.chars().rev().collect()
}

/// Renders the integer part of a real as a string.
pub fn int_to_string(x: f64) -> String {
    format!("{}", x.trunc() as i64)
}

/// Dates travel on the stack as `DD.MM.YYYY` strings.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%d.%m.%Y")
        .map_err(|_| error!(FormatError; format!("bad date '{}', want DD.MM.YYYY", s)))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

pub fn today() -> String {
    format_date(Local::now().date_naive())
}

pub fn date_plus(s: &str, days: f64) -> Result<String> {
    if days.fract() != 0.0 {
        return Err(error!(TypeMismatch; "dateplus needs a whole number of days"));
    }
    let date = parse_date(s)?;
    let shifted = date
        .checked_add_signed(Duration::days(days as i64))
        .ok_or_else(|| error!(FormatError; "date out of range"))?;
    Ok(format_date(shifted))
}

/// Signed day count from the first date to the second.
pub fn days_between(from: &str, to: &str) -> Result<f64> {
    let from = parse_date(from)?;
    let to = parse_date(to)?;
    Ok((to - from).num_days() as f64)
}

pub fn day_of_week(s: &str) -> Result<String> {
    let date = parse_date(s)?;
    Ok(date.format("%A").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring() {
        assert_eq!(substring("abcdef", 1.0, 3.0).unwrap(), "bcd");
        assert_eq!(substring("calc", 2.0, 99.0).unwrap(), "lc");
        assert!(substring("calc", -1.0, 1.0).is_err());
        assert!(substring("calc", 1.5, 1.0).is_err());
    }

    #[test]
    fn test_int_to_string() {
        assert_eq!(int_to_string(3.99), "3");
        assert_eq!(int_to_string(-3.99), "-3");
    }

    #[test]
    fn test_date_arithmetic() {
        assert_eq!(date_plus("28.02.2023", 1.0).unwrap(), "01.03.2023");
        assert_eq!(date_plus("01.03.2024", -1.0).unwrap(), "29.02.2024");
        assert_eq!(days_between("01.01.2023", "01.01.2024").unwrap(), 365.0);
        assert_eq!(days_between("01.01.2024", "01.01.2023").unwrap(), -365.0);
    }

    #[test]
    fn test_day_of_week() {
        assert_eq!(day_of_week("25.08.2026").unwrap(), "Tuesday");
        assert!(day_of_week("31.02.2023").is_err());
    }
}
