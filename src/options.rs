use crate::{
    error::{Field, ValidationError},
    plan::Plan,
    Frequency,
};
use chrono::{DateTime, Weekday};
use chrono_tz::Tz;
use std::{cmp::Ordering, fmt};

/// A BYDAY entry: a weekday, optionally restricted to its `n`th occurrence
/// within the period (negative counts from the end, `0` means every one).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WeekdaySelector {
    pub weekday: Weekday,
    pub n: i32,
}

impl WeekdaySelector {
    pub fn every(weekday: Weekday) -> Self {
        WeekdaySelector { weekday, n: 0 }
    }

    pub fn nth(n: i32, weekday: Weekday) -> Self {
        WeekdaySelector { weekday, n }
    }
}

impl From<Weekday> for WeekdaySelector {
    fn from(weekday: Weekday) -> Self {
        WeekdaySelector::every(weekday)
    }
}

impl PartialOrd for WeekdaySelector {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WeekdaySelector {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.n, self.weekday.num_days_from_monday())
            .cmp(&(other.n, other.weekday.num_days_from_monday()))
    }
}

impl fmt::Display for WeekdaySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.n != 0 {
            write!(f, "{}", self.n)?;
        }
        f.write_str(weekday_code(self.weekday))
    }
}

pub(crate) fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// Raw recurrence parameters, checked by [`RuleSpec::new`].
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    pub freq: Frequency,
    /// Defaults to 1.
    pub interval: Option<u32>,
    /// `Some(0)` is the same as `None`: unbounded.
    pub count: Option<u32>,
    /// Inclusive upper bound.
    pub until: Option<DateTime<Tz>>,
    pub week_start: Weekday,
    pub by_month: Vec<u32>,
    pub by_month_day: Vec<i32>,
    pub by_year_day: Vec<i32>,
    pub by_week_no: Vec<i32>,
    pub by_weekday: Vec<WeekdaySelector>,
    pub by_hour: Vec<u32>,
    pub by_minute: Vec<u32>,
    pub by_second: Vec<u32>,
    pub by_set_pos: Vec<i32>,
    /// Day offsets from Easter Sunday.
    pub by_easter: Vec<i32>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            freq: Frequency::default(),
            interval: None,
            count: None,
            until: None,
            week_start: Weekday::Mon,
            by_month: Vec::new(),
            by_month_day: Vec::new(),
            by_year_day: Vec::new(),
            by_week_no: Vec::new(),
            by_weekday: Vec::new(),
            by_hour: Vec::new(),
            by_minute: Vec::new(),
            by_second: Vec::new(),
            by_set_pos: Vec::new(),
            by_easter: Vec::new(),
        }
    }
}

/// A validated, immutable recurrence rule.
///
/// Selector lists are sorted and free of duplicates. Start-dependent
/// defaults are not part of the spec; [`RuleSpec::rebuild`] derives them.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleSpec {
    pub(crate) freq: Frequency,
    pub(crate) interval: u32,
    pub(crate) count: Option<u32>,
    pub(crate) until: Option<DateTime<Tz>>,
    pub(crate) week_start: Weekday,
    pub(crate) by_month: Vec<u32>,
    pub(crate) by_month_day: Vec<i32>,
    pub(crate) by_year_day: Vec<i32>,
    pub(crate) by_week_no: Vec<i32>,
    pub(crate) by_weekday: Vec<WeekdaySelector>,
    pub(crate) by_hour: Vec<u32>,
    pub(crate) by_minute: Vec<u32>,
    pub(crate) by_second: Vec<u32>,
    pub(crate) by_set_pos: Vec<i32>,
    pub(crate) by_easter: Vec<i32>,
}

impl RuleSpec {
    pub fn new(options: Options) -> Result<Self, ValidationError> {
        let Options {
            freq,
            interval,
            count,
            until,
            week_start,
            mut by_month,
            mut by_month_day,
            mut by_year_day,
            mut by_week_no,
            mut by_weekday,
            mut by_hour,
            mut by_minute,
            mut by_second,
            mut by_set_pos,
            mut by_easter,
        } = options;

        let interval = interval.unwrap_or(1);
        if interval == 0 {
            return Err(ValidationError::OutOfRange {
                field: Field::Interval,
                value: 0,
                min: 1,
                max: i32::MAX,
            });
        }

        check_range(Field::ByMonth, &mut by_month, 1, 12)?;
        check_signed(Field::ByMonthDay, &mut by_month_day, 31)?;
        check_signed(Field::ByYearDay, &mut by_year_day, 366)?;
        check_signed(Field::ByWeekNo, &mut by_week_no, 53)?;
        check_range(Field::ByHour, &mut by_hour, 0, 23)?;
        check_range(Field::ByMinute, &mut by_minute, 0, 59)?;
        check_range(Field::BySecond, &mut by_second, 0, 59)?;
        check_signed(Field::BySetPos, &mut by_set_pos, 366)?;

        for &offset in &by_easter {
            if !(-366..=366).contains(&offset) {
                return Err(ValidationError::OutOfRange {
                    field: Field::ByEaster,
                    value: offset,
                    min: -366,
                    max: 366,
                });
            }
        }
        by_easter.sort_unstable();
        by_easter.dedup();

        for selector in &by_weekday {
            if !(-53..=53).contains(&selector.n) {
                return Err(ValidationError::OutOfRange {
                    field: Field::ByDay,
                    value: selector.n,
                    min: -53,
                    max: 53,
                });
            }
            if selector.n != 0 && freq > Frequency::Monthly {
                return Err(ValidationError::Incompatible {
                    field: Field::ByDay,
                    freq,
                });
            }
        }
        by_weekday.sort_unstable();
        by_weekday.dedup();

        if !by_week_no.is_empty() && freq != Frequency::Yearly {
            return Err(ValidationError::Incompatible {
                field: Field::ByWeekNo,
                freq,
            });
        }
        if !by_year_day.is_empty()
            && matches!(
                freq,
                Frequency::Monthly | Frequency::Weekly | Frequency::Daily
            )
        {
            return Err(ValidationError::Incompatible {
                field: Field::ByYearDay,
                freq,
            });
        }
        if !by_month_day.is_empty() && freq == Frequency::Weekly {
            return Err(ValidationError::Incompatible {
                field: Field::ByMonthDay,
                freq,
            });
        }

        let spec = RuleSpec {
            freq,
            interval,
            count: count.filter(|&count| count > 0),
            until,
            week_start,
            by_month,
            by_month_day,
            by_year_day,
            by_week_no,
            by_weekday,
            by_hour,
            by_minute,
            by_second,
            by_set_pos,
            by_easter,
        };

        if !spec.by_set_pos.is_empty() && !spec.has_selectors() {
            return Err(ValidationError::SetPosWithoutSelector);
        }

        Ok(spec)
    }

    /// Derives the generator configuration for a rule anchored at `start`.
    pub fn rebuild(&self, start: &DateTime<Tz>) -> Plan {
        Plan::new(self, &start.naive_local())
    }

    pub fn freq(&self) -> Frequency {
        self.freq
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn count(&self) -> Option<u32> {
        self.count
    }

    pub fn until(&self) -> Option<&DateTime<Tz>> {
        self.until.as_ref()
    }

    pub fn week_start(&self) -> Weekday {
        self.week_start
    }

    pub fn by_month(&self) -> &[u32] {
        &self.by_month
    }

    pub fn by_month_day(&self) -> &[i32] {
        &self.by_month_day
    }

    pub fn by_year_day(&self) -> &[i32] {
        &self.by_year_day
    }

    pub fn by_week_no(&self) -> &[i32] {
        &self.by_week_no
    }

    pub fn by_weekday(&self) -> &[WeekdaySelector] {
        &self.by_weekday
    }

    pub fn by_hour(&self) -> &[u32] {
        &self.by_hour
    }

    pub fn by_minute(&self) -> &[u32] {
        &self.by_minute
    }

    pub fn by_second(&self) -> &[u32] {
        &self.by_second
    }

    pub fn by_set_pos(&self) -> &[i32] {
        &self.by_set_pos
    }

    pub fn by_easter(&self) -> &[i32] {
        &self.by_easter
    }

    /// Replaces the upper bound, keeping everything else.
    pub fn with_until(mut self, until: Option<DateTime<Tz>>) -> Self {
        self.until = until;
        self
    }

    fn has_selectors(&self) -> bool {
        !(self.by_month.is_empty()
            && self.by_month_day.is_empty()
            && self.by_year_day.is_empty()
            && self.by_week_no.is_empty()
            && self.by_weekday.is_empty()
            && self.by_hour.is_empty()
            && self.by_minute.is_empty()
            && self.by_second.is_empty()
            && self.by_easter.is_empty())
    }
}

impl TryFrom<Options> for RuleSpec {
    type Error = ValidationError;

    fn try_from(options: Options) -> Result<Self, Self::Error> {
        RuleSpec::new(options)
    }
}

fn check_range(
    field: Field,
    values: &mut Vec<u32>,
    min: u32,
    max: u32,
) -> Result<(), ValidationError> {
    if let Some(&value) = values.iter().find(|&&v| v < min || v > max) {
        return Err(ValidationError::OutOfRange {
            field,
            value: i32::try_from(value).unwrap_or(i32::MAX),
            min: min as i32,
            max: max as i32,
        });
    }
    values.sort_unstable();
    values.dedup();
    Ok(())
}

fn check_signed(field: Field, values: &mut Vec<i32>, max: i32) -> Result<(), ValidationError> {
    for &value in values.iter() {
        if value == 0 {
            return Err(ValidationError::Zero { field, max });
        }
        if value < -max || value > max {
            return Err(ValidationError::OutOfRange {
                field,
                value,
                min: -max,
                max,
            });
        }
    }
    values.sort_unstable();
    values.dedup();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yearly() -> Options {
        Options {
            freq: Frequency::Yearly,
            ..Options::default()
        }
    }

    #[test]
    fn interval_defaults_to_one() {
        let spec = RuleSpec::new(Options::default()).unwrap();
        assert_eq!(spec.interval(), 1);
        assert_eq!(spec.week_start(), Weekday::Mon);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let error = RuleSpec::new(Options {
            interval: Some(0),
            ..Options::default()
        })
        .unwrap_err();

        assert_eq!(
            error,
            ValidationError::OutOfRange {
                field: Field::Interval,
                value: 0,
                min: 1,
                max: i32::MAX,
            }
        );
    }

    #[test]
    fn zero_count_is_unbounded() {
        let spec = RuleSpec::new(Options {
            count: Some(0),
            ..Options::default()
        })
        .unwrap();
        assert_eq!(spec.count(), None);
    }

    #[test]
    fn out_of_range_names_field_and_range() {
        let error = RuleSpec::new(Options {
            by_month: vec![13],
            ..yearly()
        })
        .unwrap_err();
        assert_eq!(
            error.to_string(),
            "BYMONTH value 13 is outside the accepted range 1..=12"
        );

        let error = RuleSpec::new(Options {
            by_month_day: vec![0],
            ..yearly()
        })
        .unwrap_err();
        assert_eq!(
            error,
            ValidationError::Zero {
                field: Field::ByMonthDay,
                max: 31
            }
        );

        assert!(RuleSpec::new(Options {
            by_hour: vec![24],
            ..yearly()
        })
        .is_err());
        assert!(RuleSpec::new(Options {
            by_year_day: vec![-367],
            ..yearly()
        })
        .is_err());
        assert!(RuleSpec::new(Options {
            by_weekday: vec![WeekdaySelector::nth(54, Weekday::Mon)],
            ..yearly()
        })
        .is_err());
    }

    #[test]
    fn incompatible_combinations() {
        let weekly = |options: Options| {
            RuleSpec::new(Options {
                freq: Frequency::Weekly,
                ..options
            })
        };

        assert_eq!(
            weekly(Options {
                by_week_no: vec![1],
                ..Options::default()
            }),
            Err(ValidationError::Incompatible {
                field: Field::ByWeekNo,
                freq: Frequency::Weekly
            })
        );
        assert!(weekly(Options {
            by_month_day: vec![1],
            ..Options::default()
        })
        .is_err());
        assert!(weekly(Options {
            by_year_day: vec![1],
            ..Options::default()
        })
        .is_err());
        assert!(weekly(Options {
            by_weekday: vec![WeekdaySelector::nth(1, Weekday::Fri)],
            ..Options::default()
        })
        .is_err());
        assert!(weekly(Options {
            by_weekday: vec![Weekday::Fri.into()],
            ..Options::default()
        })
        .is_ok());
    }

    #[test]
    fn set_pos_needs_another_selector() {
        assert_eq!(
            RuleSpec::new(Options {
                by_set_pos: vec![1],
                ..Options::default()
            }),
            Err(ValidationError::SetPosWithoutSelector)
        );
        assert!(RuleSpec::new(Options {
            by_set_pos: vec![1],
            by_hour: vec![9, 17],
            ..Options::default()
        })
        .is_ok());
    }

    #[test]
    fn selectors_are_sorted_and_deduplicated() {
        let spec = RuleSpec::new(Options {
            by_month: vec![3, 1, 3],
            by_weekday: vec![Weekday::Fri.into(), Weekday::Mon.into(), Weekday::Fri.into()],
            ..yearly()
        })
        .unwrap();

        assert_eq!(spec.by_month(), &[1, 3]);
        assert_eq!(
            spec.by_weekday(),
            &[
                WeekdaySelector::every(Weekday::Mon),
                WeekdaySelector::every(Weekday::Fri)
            ]
        );
    }

    #[test]
    fn weekday_selector_display() {
        assert_eq!(WeekdaySelector::every(Weekday::Tue).to_string(), "TU");
        assert_eq!(WeekdaySelector::nth(-1, Weekday::Sun).to_string(), "-1SU");
        assert_eq!(WeekdaySelector::nth(2, Weekday::Mon).to_string(), "2MO");
    }
}
