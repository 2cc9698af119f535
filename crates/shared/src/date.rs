use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parses a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(value: &str) -> Option<Date> {
    Date::parse(value.trim(), DATE_FORMAT).ok()
}

pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).unwrap_or_default()
}

/// Moves a `YYYY-MM-DD` date by a number of days, rolling over months and years.
pub fn shift_date(value: &str, days: i64) -> Option<String> {
    parse_date(value)?
        .checked_add(Duration::days(days))
        .map(format_date)
}

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

pub fn now_timestamp() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
