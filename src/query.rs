//! Point and window queries over any ascending occurrence stream.

use chrono::DateTime;
use chrono_tz::Tz;

fn above(occurrence: &DateTime<Tz>, bound: &DateTime<Tz>, inclusive: bool) -> bool {
    if inclusive {
        occurrence >= bound
    } else {
        occurrence > bound
    }
}

fn below(occurrence: &DateTime<Tz>, bound: &DateTime<Tz>, inclusive: bool) -> bool {
    if inclusive {
        occurrence <= bound
    } else {
        occurrence < bound
    }
}

/// First occurrence after `instant`.
pub fn after<I>(occurrences: I, instant: DateTime<Tz>, inclusive: bool) -> Option<DateTime<Tz>>
where
    I: IntoIterator<Item = DateTime<Tz>>,
{
    occurrences
        .into_iter()
        .find(|occurrence| above(occurrence, &instant, inclusive))
}

/// Last occurrence before `instant`. Stops pulling as soon as the stream
/// reaches `instant`, so unbounded streams are fine.
pub fn before<I>(occurrences: I, instant: DateTime<Tz>, inclusive: bool) -> Option<DateTime<Tz>>
where
    I: IntoIterator<Item = DateTime<Tz>>,
{
    occurrences
        .into_iter()
        .take_while(|occurrence| below(occurrence, &instant, inclusive))
        .last()
}

/// Occurrences inside the window from `start` to `end`.
pub fn between<I>(
    occurrences: I,
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    inclusive: bool,
) -> Vec<DateTime<Tz>>
where
    I: IntoIterator<Item = DateTime<Tz>>,
{
    iter_between(occurrences, start, end, inclusive).collect()
}

/// Lazy form of [`between`].
pub fn iter_between<I>(
    occurrences: I,
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    inclusive: bool,
) -> impl Iterator<Item = DateTime<Tz>>
where
    I: IntoIterator<Item = DateTime<Tz>>,
{
    occurrences
        .into_iter()
        .skip_while(move |occurrence| !above(occurrence, &start, inclusive))
        .take_while(move |occurrence| below(occurrence, &end, inclusive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn daily() -> Vec<DateTime<Tz>> {
        (1..=5).map(|day| utc(2024, 1, day, 9, 0, 0)).collect()
    }

    #[test]
    fn after_respects_inclusive() {
        let third = utc(2024, 1, 3, 9, 0, 0);
        assert_eq!(after(daily(), third, true), Some(third));
        assert_eq!(after(daily(), third, false), Some(utc(2024, 1, 4, 9, 0, 0)));
        assert_eq!(after(daily(), utc(2024, 1, 5, 9, 0, 0), false), None);
    }

    #[test]
    fn before_respects_inclusive() {
        let third = utc(2024, 1, 3, 9, 0, 0);
        assert_eq!(before(daily(), third, true), Some(third));
        assert_eq!(before(daily(), third, false), Some(utc(2024, 1, 2, 9, 0, 0)));
        assert_eq!(before(daily(), utc(2024, 1, 1, 9, 0, 0), false), None);
    }

    #[test]
    fn before_stops_on_unbounded_streams() {
        let endless = (0..).map(|hours| utc(2024, 1, 1, 0, 0, 0) + chrono::TimeDelta::hours(hours));
        assert_eq!(
            before(endless, utc(2024, 1, 2, 0, 0, 0), false),
            Some(utc(2024, 1, 1, 23, 0, 0))
        );
    }

    #[test]
    fn between_open_and_closed() {
        let (second, fourth) = (utc(2024, 1, 2, 9, 0, 0), utc(2024, 1, 4, 9, 0, 0));
        assert_eq!(between(daily(), second, fourth, false), vec![utc(2024, 1, 3, 9, 0, 0)]);
        assert_eq!(
            between(daily(), second, fourth, true),
            vec![second, utc(2024, 1, 3, 9, 0, 0), fourth]
        );
    }

    #[test]
    fn bounds_in_other_zones_compare_as_instants() {
        // 2024-01-03 18:00 in Tokyo is 09:00 UTC
        let third = at(TOKYO, 2024, 1, 3, 18, 0, 0);
        assert_eq!(after(daily(), third, true), Some(utc(2024, 1, 3, 9, 0, 0)));
    }
}
