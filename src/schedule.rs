use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};

/// Reports are pushed on China Standard Time.
const UTC_OFFSET_HOURS: i64 = 8;
const WINDOW_START_HOUR: u32 = 8;
const WINDOW_END_HOUR: u32 = 22;

pub fn local_time(now: DateTime<Utc>) -> NaiveDateTime {
    now.naive_utc() + Duration::hours(UTC_OFFSET_HOURS)
}

pub fn is_within_window(now: DateTime<Utc>) -> bool {
    (WINDOW_START_HOUR..WINDOW_END_HOUR).contains(&local_time(now).hour())
}

pub fn should_run(now: DateTime<Utc>, force: bool) -> bool {
    force || is_within_window(now)
}
