pub mod bookmarks;
pub mod dates;
pub mod expenses;
pub mod goals;
pub mod habits;
pub mod notes;
pub mod pomodoro;
pub mod projects;
pub mod quotes;
pub mod reading;
pub mod time_tracker;
pub mod todos;
pub mod water;
pub mod weather;

use chrono::NaiveDate;

use crate::error::ValidationError;

const SHORT_ID_LEN: usize = 8;

/// Leading characters of an id, enough to type back on the command line.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(raw.trim().to_string()))
}

/// Whole days from `today` to `date`; negative when `date` is past.
pub fn days_until(today: NaiveDate, date: NaiveDate) -> i64 {
    (date - today).num_days()
}

pub fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

fn check_box(done: bool) -> &'static str {
    if done { "[x]" } else { "[ ]" }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{days_until, parse_date, percent, short_id};

    #[test]
    fn short_ids_truncate_long_ids_only() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn dates_and_day_counts() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert_eq!(parse_date(" 2026-10-20 ").unwrap(), NaiveDate::from_ymd_opt(2026, 10, 20).unwrap());
        assert!(parse_date("20/10/2026").is_err());
        assert_eq!(days_until(today, NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()), 3);
        assert_eq!(days_until(today, NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()), -2);
    }

    #[test]
    fn percent_guards_empty_totals() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
    }
}
