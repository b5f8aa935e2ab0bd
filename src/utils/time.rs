use chrono::{NaiveDate, Utc};

/// Calendar date used for streak bookkeeping. Streaks are day-granular and
/// tracked in UTC.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}
