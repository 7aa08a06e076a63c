use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// `active-fast.json` and `history.json` store epoch milliseconds.
pub fn from_unix_ms(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// Parses a journal entry date. Accepts RFC 3339, a naive
/// `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC) and a plain `YYYY-MM-DD`.
pub fn parse_entry_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
