use crate::{RRule, RuleSpec};
use chrono::{DateTime, TimeZone as _};
use chrono_tz::Tz;

pub const NEW_YORK: Tz = chrono_tz::America::New_York;
pub const TOKYO: Tz = chrono_tz::Asia::Tokyo;

pub fn at(
    zone: Tz,
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    min: u32,
    sec: u32,
) -> DateTime<Tz> {
    zone.with_ymd_and_hms(year, month, day, hour, min, sec)
        .single()
        .unwrap()
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Tz> {
    at(Tz::UTC, year, month, day, hour, min, sec)
}

/// 1997-09-02 09:00 UTC, the start most rule examples use.
pub fn sept_second() -> DateTime<Tz> {
    utc(1997, 9, 2, 9, 0, 0)
}

pub fn rule(text: &str) -> RuleSpec {
    text.parse().unwrap()
}

pub fn expand(start: DateTime<Tz>, text: &str) -> Vec<DateTime<Tz>> {
    RRule::new(start, rule(text)).all()
}
