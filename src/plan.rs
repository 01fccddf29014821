use crate::{options::RuleSpec, Frequency};
use chrono::{DateTime, Datelike as _, NaiveDateTime, Timelike as _};
use chrono_tz::Tz;

/// Generator configuration derived from a [`RuleSpec`] and a start instant.
///
/// Built fresh for every stream, so a rule can be expanded concurrently
/// without any shared mutable state. Weekdays are numbered from Monday = 0.
#[derive(Clone, Debug, PartialEq)]
pub struct Plan {
    pub(crate) freq: Frequency,
    pub(crate) interval: u32,
    pub(crate) count: Option<u32>,
    pub(crate) until: Option<DateTime<Tz>>,
    pub(crate) week_start: u32,
    pub(crate) by_month: Vec<u32>,
    pub(crate) by_month_day: Vec<i32>,
    pub(crate) by_neg_month_day: Vec<i32>,
    pub(crate) by_year_day: Vec<i32>,
    pub(crate) by_week_no: Vec<i32>,
    pub(crate) by_weekday: Vec<u32>,
    pub(crate) by_nth_weekday: Vec<(u32, i32)>,
    pub(crate) by_hour: Vec<u32>,
    pub(crate) by_minute: Vec<u32>,
    pub(crate) by_second: Vec<u32>,
    pub(crate) by_set_pos: Vec<i32>,
    pub(crate) by_easter: Vec<i32>,
}

impl Plan {
    pub(crate) fn new(spec: &RuleSpec, start: &NaiveDateTime) -> Self {
        let freq = spec.freq;
        let mut by_month = spec.by_month.clone();
        let mut month_days = spec.by_month_day.clone();
        let mut weekdays = spec.by_weekday.clone();

        // Without any day selector each period still yields the start's own day.
        let anchored = spec.by_week_no.is_empty()
            && spec.by_year_day.is_empty()
            && spec.by_month_day.is_empty()
            && spec.by_weekday.is_empty()
            && spec.by_easter.is_empty();
        if anchored {
            match freq {
                Frequency::Yearly => {
                    if by_month.is_empty() {
                        by_month.push(start.month());
                    }
                    month_days.push(start.day() as i32);
                }
                Frequency::Monthly => month_days.push(start.day() as i32),
                Frequency::Weekly => weekdays.push(start.weekday().into()),
                _ => {}
            }
        }

        let (by_month_day, by_neg_month_day): (Vec<i32>, Vec<i32>) =
            month_days.into_iter().partition(|&day| day > 0);

        let mut by_weekday = Vec::new();
        let mut by_nth_weekday = Vec::new();
        for selector in weekdays {
            let weekday = selector.weekday.num_days_from_monday();
            if selector.n == 0 || freq > Frequency::Monthly {
                if !by_weekday.contains(&weekday) {
                    by_weekday.push(weekday);
                }
            } else {
                by_nth_weekday.push((weekday, selector.n));
            }
        }
        by_weekday.sort_unstable();

        let fill = |given: &[u32], unit: Frequency, default: u32| {
            if given.is_empty() && freq < unit {
                vec![default]
            } else {
                given.to_vec()
            }
        };

        Plan {
            freq,
            interval: spec.interval,
            count: spec.count,
            until: spec.until,
            week_start: spec.week_start.num_days_from_monday(),
            by_month,
            by_month_day,
            by_neg_month_day,
            by_year_day: spec.by_year_day.clone(),
            by_week_no: spec.by_week_no.clone(),
            by_weekday,
            by_nth_weekday,
            by_hour: fill(&spec.by_hour, Frequency::Hourly, start.hour()),
            by_minute: fill(&spec.by_minute, Frequency::Minutely, start.minute()),
            by_second: fill(&spec.by_second, Frequency::Secondly, start.second()),
            by_set_pos: spec.by_set_pos.clone(),
            by_easter: spec.by_easter.clone(),
        }
    }

    pub fn freq(&self) -> Frequency {
        self.freq
    }

    pub fn by_month(&self) -> &[u32] {
        &self.by_month
    }

    pub fn by_month_day(&self) -> &[i32] {
        &self.by_month_day
    }

    pub fn by_neg_month_day(&self) -> &[i32] {
        &self.by_neg_month_day
    }

    /// Plain weekdays, Monday = 0.
    pub fn by_weekday(&self) -> &[u32] {
        &self.by_weekday
    }

    pub fn by_nth_weekday(&self) -> &[(u32, i32)] {
        &self.by_nth_weekday
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
}

#[cfg(test)]
mod tests {
    use crate::test_helpers::*;

    #[test]
    fn yearly_defaults_to_start_month_and_day() {
        let plan = rule("FREQ=YEARLY").rebuild(&sept_second());
        assert_eq!(plan.by_month(), &[9]);
        assert_eq!(plan.by_month_day(), &[2]);
        assert_eq!(plan.by_hour(), &[9]);
        assert_eq!(plan.by_minute(), &[0]);
        assert_eq!(plan.by_second(), &[0]);
    }

    #[test]
    fn yearly_keeps_given_months() {
        let plan = rule("FREQ=YEARLY;BYMONTH=1,3").rebuild(&sept_second());
        assert_eq!(plan.by_month(), &[1, 3]);
        assert_eq!(plan.by_month_day(), &[2]);
    }

    #[test]
    fn monthly_and_weekly_defaults() {
        let plan = rule("FREQ=MONTHLY").rebuild(&sept_second());
        assert!(plan.by_month().is_empty());
        assert_eq!(plan.by_month_day(), &[2]);

        // 1997-09-02 is a Tuesday
        let plan = rule("FREQ=WEEKLY").rebuild(&sept_second());
        assert_eq!(plan.by_weekday(), &[1]);
    }

    #[test]
    fn any_day_selector_suppresses_the_default() {
        let plan = rule("FREQ=YEARLY;BYEASTER=0").rebuild(&sept_second());
        assert!(plan.by_month().is_empty());
        assert!(plan.by_month_day().is_empty());

        let plan = rule("FREQ=YEARLY;BYYEARDAY=100").rebuild(&sept_second());
        assert!(plan.by_month_day().is_empty());
    }

    #[test]
    fn month_days_and_weekdays_are_split() {
        let plan = rule("FREQ=MONTHLY;BYMONTHDAY=1,-1,15;BYDAY=MO,-1FR").rebuild(&sept_second());
        assert_eq!(plan.by_month_day(), &[1, 15]);
        assert_eq!(plan.by_neg_month_day(), &[-1]);
        assert_eq!(plan.by_weekday(), &[0]);
        assert_eq!(plan.by_nth_weekday(), &[(4, -1)]);
    }

    #[test]
    fn sub_daily_leaves_own_unit_open() {
        let plan = rule("FREQ=HOURLY").rebuild(&sept_second());
        assert!(plan.by_hour().is_empty());
        assert_eq!(plan.by_minute(), &[0]);

        let plan = rule("FREQ=SECONDLY").rebuild(&sept_second());
        assert!(plan.by_hour().is_empty());
        assert!(plan.by_minute().is_empty());
        assert!(plan.by_second().is_empty());
    }
}
