mod names;

pub use names::{is_valid_name, validate_name, InvalidName, NamePlatform, NameRules};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Length of a `YYYY-MM-DD_` prefix
pub const PREFIX_LEN: usize = 11;

// Date prefix: YYYY-MM-DD_ at the very start of the name
// Examples: "2024-03-01_a.txt", "1999-12-31_Photos"
static PREFIX_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})_").unwrap());

/// Extract the calendar date from a valid prefix, if the name carries one
pub fn parse_prefix(name: &str) -> Option<NaiveDate> {
    let captures = PREFIX_REGEX.captures(name)?;

    let year: i32 = captures.get(1)?.as_str().parse().ok()?;
    let month: u32 = captures.get(2)?.as_str().parse().ok()?;
    let day: u32 = captures.get(3)?.as_str().parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// True iff `name` begins with a `YYYY-MM-DD_` prefix naming a real calendar date
pub fn has_prefix(name: &str) -> bool {
    parse_prefix(name).is_some()
}

/// Format a date as `YYYY-MM-DD_`
pub fn format_prefix(date: NaiveDate) -> String {
    date.format("%Y-%m-%d_").to_string()
}

/// Prepend the prefix; the original name is not otherwise touched
pub fn target_name(original_name: &str, prefix: &str) -> String {
    format!("{}{}", prefix, original_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_has_prefix_valid() {
        assert!(has_prefix("2024-03-01_a.txt"));
        assert!(has_prefix("1999-12-31_Photos"));
        assert!(has_prefix("2024-02-29_leap"));
    }

    #[test]
    fn test_has_prefix_rejects_invalid_dates() {
        assert!(!has_prefix("0000-13-40_x"));
        assert!(!has_prefix("2023-02-29_not-a-leap-year"));
        assert!(!has_prefix("2024-04-31_x"));
        assert!(!has_prefix("2024-00-10_x"));
    }

    #[test]
    fn test_has_prefix_rejects_partial_matches() {
        assert!(!has_prefix("2024-01-1_x"));
        assert!(!has_prefix("24-01-01_x"));
        assert!(!has_prefix("2024-01-01x"));
        assert!(!has_prefix("2024-01-01"));
        assert!(!has_prefix("x2024-01-01_x"));
        assert!(!has_prefix("20240101_x"));
    }

    #[test]
    fn test_has_prefix_with_empty_remainder() {
        // The underscore is the last character of the prefix, nothing more is required
        assert!(has_prefix("2024-01-01_"));
    }

    #[test]
    fn test_parse_prefix_returns_date() {
        assert_eq!(parse_prefix("2023-12-25_nested"), Some(date(2023, 12, 25)));
        assert_eq!(parse_prefix("nested"), None);
    }

    #[test]
    fn test_format_prefix_zero_padded() {
        assert_eq!(format_prefix(date(2024, 3, 1)), "2024-03-01_");
        assert_eq!(format_prefix(date(987, 1, 2)), "0987-01-02_");
        assert_eq!(format_prefix(date(2024, 3, 1)).len(), PREFIX_LEN);
    }

    #[test]
    fn test_format_prefix_is_detected() {
        let prefix = format_prefix(date(2023, 12, 25));
        assert!(has_prefix(&target_name("nested", &prefix)));
    }

    #[test]
    fn test_target_name_keeps_original() {
        assert_eq!(target_name("Report.PDF", "2024-03-01_"), "2024-03-01_Report.PDF");
        assert_eq!(target_name(".env", "2024-03-01_"), "2024-03-01_.env");
    }
}
