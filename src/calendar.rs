//! Per-year lookup tables.
//!
//! Days are addressed by their zero-based index from January 1st. A WEEKLY
//! period can run up to six days past December 31st, so every per-day table
//! covers `year_len + 7` entries; the overflow belongs to next January.

use crate::{plan::Plan, Frequency};
use chrono::{Datelike as _, NaiveDate, TimeDelta};

pub(crate) fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

pub(crate) fn days_in_year(year: i32) -> usize {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Weekday of January 1st, Monday = 0.
pub(crate) fn first_weekday(year: i32) -> u32 {
    let y = i64::from(year) - 1;
    let sunday_based =
        (y + y.div_euclid(4) - y.div_euclid(100) + y.div_euclid(400) + 1).rem_euclid(7);
    ((sunday_based + 6) % 7) as u32
}

/// Easter Sunday of a Gregorian year (anonymous computus).
pub(crate) fn easter(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15).rem_euclid(30);
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k).rem_euclid(7);
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Where the rule's weeks fall in a year, for a given week start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct WeekLayout {
    /// Index of the first day of week 1, or 0 when week 1 started last year.
    first_week: usize,
    /// Days before the first week start of the year (0..7).
    first_week_start: usize,
    weeks: i32,
}

impl WeekLayout {
    fn new(year_len: usize, first_weekday: u32, week_start: u32) -> Self {
        let first_week_start = ((7 + week_start - first_weekday) % 7) as usize;
        // Week 1 is the first week with at least four days in this year.
        let (first_week, counted_days) = if first_week_start >= 4 {
            (0, year_len + ((first_weekday + 7 - week_start) % 7) as usize)
        } else {
            (first_week_start, year_len - first_week_start)
        };

        WeekLayout {
            first_week,
            first_week_start,
            weeks: (counted_days / 7 + (counted_days % 7) / 4) as i32,
        }
    }

    fn week_start_index(&self, week: i32) -> usize {
        let mut index = self.first_week + (week as usize - 1) * 7;
        if week > 1 && self.first_week != self.first_week_start {
            index -= 7 - self.first_week_start;
        }
        index
    }
}

#[derive(Clone, Debug)]
pub(crate) struct YearInfo {
    pub(crate) year: i32,
    pub(crate) year_len: usize,
    pub(crate) next_year_len: usize,
    first_weekday: u32,
    /// Day index of the first day of each month, plus the year length.
    pub(crate) month_ranges: [usize; 13],
    pub(crate) week_no_mask: Option<Vec<bool>>,
    pub(crate) nth_weekday_mask: Option<Vec<bool>>,
    pub(crate) easter_mask: Option<Vec<bool>>,
    month: u32,
}

impl YearInfo {
    pub(crate) fn new(year: i32, month: u32, plan: &Plan) -> Self {
        tracing::trace!(year, month, "building calendar tables");

        let mut month_ranges = [0; 13];
        for m in 1..=12 {
            month_ranges[m as usize] =
                month_ranges[m as usize - 1] + days_in_month(year, m) as usize;
        }

        let mut info = YearInfo {
            year,
            year_len: days_in_year(year),
            next_year_len: days_in_year(year + 1),
            first_weekday: first_weekday(year),
            month_ranges,
            week_no_mask: None,
            nth_weekday_mask: None,
            easter_mask: None,
            month,
        };

        if !plan.by_week_no.is_empty() {
            info.week_no_mask = Some(info.week_numbers(plan));
        }
        if !plan.by_easter.is_empty() {
            info.easter_mask = info.easter_days(plan);
        }
        info.nth_weekday_mask = info.nth_weekdays(plan);

        info
    }

    /// Moves the month-dependent tables to `month` of the same year.
    pub(crate) fn set_month(&mut self, month: u32, plan: &Plan) {
        if month != self.month {
            self.month = month;
            self.nth_weekday_mask = self.nth_weekdays(plan);
        }
    }

    pub(crate) fn date(&self, day: usize) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, 1, 1)?.checked_add_signed(TimeDelta::days(day as i64))
    }

    /// Index of a calendar day of this year.
    pub(crate) fn day_index(&self, month: u32, day: u32) -> usize {
        self.month_ranges[month as usize - 1] + day as usize - 1
    }

    /// Weekday of a day index, Monday = 0. Negative indexes count back into
    /// the previous year.
    pub(crate) fn weekday(&self, day: isize) -> u32 {
        (self.first_weekday as isize + day).rem_euclid(7) as u32
    }

    pub(crate) fn month(&self, day: usize) -> u32 {
        if day >= self.year_len {
            return 1;
        }
        self.month_ranges[1..]
            .iter()
            .position(|&end| day < end)
            .map_or(12, |m| m as u32 + 1)
    }

    pub(crate) fn month_day(&self, day: usize) -> i32 {
        if day >= self.year_len {
            return (day - self.year_len) as i32 + 1;
        }
        let month = self.month(day) as usize;
        (day - self.month_ranges[month - 1]) as i32 + 1
    }

    /// Day of month counted from the end, -1 being the last day.
    pub(crate) fn neg_month_day(&self, day: usize) -> i32 {
        if day >= self.year_len {
            return self.month_day(day) - 32;
        }
        let month = self.month(day) as usize;
        day as i32 - self.month_ranges[month] as i32
    }

    fn week_numbers(&self, plan: &Plan) -> Vec<bool> {
        let mut mask = vec![false; self.year_len + 7];
        let layout = WeekLayout::new(self.year_len, self.first_weekday, plan.week_start);

        let mark_week = |mask: &mut Vec<bool>, mut index: usize| {
            for _ in 0..7 {
                mask[index] = true;
                index += 1;
                if self.weekday(index as isize) == plan.week_start {
                    break;
                }
            }
        };

        for &week in &plan.by_week_no {
            let week = if week < 0 { week + layout.weeks + 1 } else { week };
            if week < 1 || week > layout.weeks {
                continue;
            }
            mark_week(&mut mask, layout.week_start_index(week));
        }

        // Week 1 of next year can start in the last days of this one.
        if plan.by_week_no.contains(&1) {
            let index = layout.week_start_index(layout.weeks + 1);
            if index < self.year_len {
                mark_week(&mut mask, index);
            }
        }

        // Days before this year's first week belong to last year's final week.
        if layout.first_week > 0 {
            let previous = self.year - 1;
            let last_weeks = WeekLayout::new(
                days_in_year(previous),
                first_weekday(previous),
                plan.week_start,
            )
            .weeks;
            let selected = plan.by_week_no.contains(&-1) || plan.by_week_no.contains(&last_weeks);
            if selected {
                mask[..layout.first_week].fill(true);
            }
        }

        mask
    }

    fn nth_weekdays(&self, plan: &Plan) -> Option<Vec<bool>> {
        if plan.by_nth_weekday.is_empty() {
            return None;
        }

        let ranges: Vec<(usize, usize)> = match plan.freq {
            Frequency::Yearly if plan.by_month.is_empty() => vec![(0, self.year_len)],
            Frequency::Yearly => plan
                .by_month
                .iter()
                .map(|&m| (self.month_ranges[m as usize - 1], self.month_ranges[m as usize]))
                .collect(),
            Frequency::Monthly => vec![(
                self.month_ranges[self.month as usize - 1],
                self.month_ranges[self.month as usize],
            )],
            _ => return None,
        };

        let mut mask = vec![false; self.year_len];
        for (first, end) in ranges {
            let (first, last) = (first as isize, end as isize - 1);
            for &(weekday, n) in &plan.by_nth_weekday {
                let n = n as isize;
                let index = if n < 0 {
                    let index = last + (n + 1) * 7;
                    index - (self.weekday(index) as isize - weekday as isize).rem_euclid(7)
                } else {
                    let index = first + (n - 1) * 7;
                    index + (7 - self.weekday(index) as isize + weekday as isize).rem_euclid(7)
                };
                if first <= index && index <= last {
                    mask[index as usize] = true;
                }
            }
        }

        Some(mask)
    }

    fn easter_days(&self, plan: &Plan) -> Option<Vec<bool>> {
        let sunday = easter(self.year)?.ordinal0() as i64;
        let mut mask = vec![false; self.year_len + 7];
        for &offset in &plan.by_easter {
            let index = sunday + i64::from(offset);
            if (0..mask.len() as i64).contains(&index) {
                mask[index as usize] = true;
            }
        }
        Some(mask)
    }
}
