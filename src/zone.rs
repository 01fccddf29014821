use chrono::{DateTime, NaiveDateTime, NaiveTime, Offset as _, TimeDelta, TimeZone as _};
use chrono_tz::Tz;

/// Canonical all-day form of an instant: midnight UTC of the calendar date
/// the instant falls on in its own zone.
pub fn floating(instant: &DateTime<Tz>) -> DateTime<Tz> {
    Tz::UTC.from_utc_datetime(&instant.date_naive().and_time(NaiveTime::MIN))
}

/// The host's zone, or UTC when it cannot be determined.
pub fn local_zone() -> Tz {
    match iana_time_zone::get_timezone() {
        Ok(name) => name.parse().unwrap_or_else(|_| {
            tracing::debug!(zone = %name, "local zone unknown to the tz database, using UTC");
            Tz::UTC
        }),
        Err(error) => {
            tracing::debug!(%error, "could not read the local zone, using UTC");
            Tz::UTC
        }
    }
}

/// Places a wall-clock time in `zone`.
///
/// Ambiguous times take the earlier instant. Times inside a DST gap keep the
/// offset in force before the gap, which moves them forward by its length.
pub(crate) fn localize(zone: &Tz, naive: &NaiveDateTime) -> Option<DateTime<Tz>> {
    if let Some(instant) = zone.from_local_datetime(naive).earliest() {
        return Some(instant);
    }

    let day_before = naive.checked_sub_signed(TimeDelta::days(1))?;
    let offset = zone.offset_from_local_datetime(&day_before).earliest()?.fix();
    let utc = naive.checked_sub_signed(TimeDelta::seconds(i64::from(offset.local_minus_utc())))?;
    Some(zone.from_utc_datetime(&utc))
}

pub(crate) fn is_utc(zone: &Tz) -> bool {
    matches!(
        zone.name(),
        "UTC" | "Etc/UTC" | "Etc/Universal" | "Universal" | "Zulu" | "Etc/Zulu"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use chrono::{NaiveDate, Timelike as _};

    #[test]
    fn floating_keeps_the_local_date() {
        let late_evening = at(NEW_YORK, 2023, 6, 15, 23, 30, 0);
        assert_eq!(floating(&late_evening), utc(2023, 6, 15, 0, 0, 0));

        let afternoon = at(TOKYO, 2023, 6, 15, 14, 30, 45);
        let canonical = floating(&afternoon);
        assert_eq!(canonical, utc(2023, 6, 15, 0, 0, 0));
        assert_eq!(canonical.hour(), 0);
        assert!(is_utc(&canonical.timezone()));
    }

    #[test]
    fn gap_moves_forward() {
        // 2019-03-10 02:30 does not exist in New York
        let naive = NaiveDate::from_ymd_opt(2019, 3, 10)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();

        let instant = localize(&NEW_YORK, &naive).unwrap();
        assert_eq!(instant, at(NEW_YORK, 2019, 3, 10, 3, 30, 0));
    }

    #[test]
    fn ambiguous_takes_earliest() {
        let naive = NaiveDate::from_ymd_opt(2019, 11, 3)
            .unwrap()
            .and_hms_opt(1, 30, 0)
            .unwrap();

        let instant = localize(&NEW_YORK, &naive).unwrap();
        assert_eq!(instant, utc(2019, 11, 3, 5, 30, 0));
    }

    #[test]
    fn utc_aliases() {
        assert!(is_utc(&Tz::UTC));
        assert!(is_utc(&Tz::Etc__UTC));
        assert!(!is_utc(&NEW_YORK));
    }
}
