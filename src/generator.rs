//! The frequency state machine behind a rule's occurrence stream.
//!
//! Each step builds the current period's candidate days, narrows them through
//! the filter pipeline, expands the survivors with the period's time set,
//! applies BYSETPOS and queues what remains. Then the cursor advances by
//! `interval` periods.

use crate::{
    calendar::{days_in_month, YearInfo},
    config::Config,
    filter,
    plan::Plan,
    timeset,
    zone::localize,
    Frequency,
};
use chrono::{DateTime, Datelike as _, NaiveDateTime, NaiveTime, Timelike as _};
use chrono_tz::Tz;
use std::collections::VecDeque;

/// Ascending occurrences of a single rule, bounded by its COUNT, its UNTIL
/// and the configured safety horizon.
#[derive(Debug)]
pub struct RuleIter {
    plan: Plan,
    zone: Tz,
    start: NaiveDateTime,
    max_year: i32,
    info: YearInfo,
    cursor: Cursor,
    time_set: Vec<NaiveTime>,
    remaining: Option<u32>,
    last: Option<DateTime<Tz>>,
    pending: VecDeque<DateTime<Tz>>,
    done: bool,
}

/// Calendar position of the current period. Fields may overflow their
/// natural range between an advance and the following normalization.
#[derive(Clone, Copy, Debug)]
struct Cursor {
    year: i64,
    month: i64,
    day: i64,
    hour: i64,
    minute: i64,
    second: i64,
    weekday: i64,
}

impl RuleIter {
    pub fn new(plan: Plan, start: &DateTime<Tz>, config: Config) -> Self {
        let zone = start.timezone();
        let local = start.naive_local();
        let cursor = Cursor {
            year: i64::from(local.year()),
            month: i64::from(local.month()),
            day: i64::from(local.day()),
            hour: i64::from(local.hour()),
            minute: i64::from(local.minute()),
            second: i64::from(local.second()),
            weekday: i64::from(local.weekday().num_days_from_monday()),
        };

        let info = YearInfo::new(local.year(), local.month(), &plan);
        let (hour, minute, second) = (local.hour(), local.minute(), local.second());
        let time_set = if timeset::cursor_selected(&plan, hour, minute, second) {
            timeset::build(&plan, hour, minute, second)
        } else {
            Vec::new()
        };
        let positions_unreachable = set_positions_unreachable(&plan);

        let mut iter = RuleIter {
            remaining: plan.count,
            plan,
            zone,
            start: local,
            max_year: config.max_year,
            info,
            cursor,
            time_set,
            last: None,
            pending: VecDeque::new(),
            done: local.year() > config.max_year,
        };
        if positions_unreachable {
            iter.exhausted();
        }
        iter
    }

    /// Candidate days of the current period, as indexes into the year tables.
    fn day_set(&self) -> Vec<usize> {
        let info = &self.info;
        let month = self.cursor.month as u32;
        match self.plan.freq {
            Frequency::Yearly => (0..info.year_len).collect(),
            Frequency::Monthly => {
                (info.month_ranges[month as usize - 1]..info.month_ranges[month as usize]).collect()
            }
            Frequency::Weekly => {
                let first = info.day_index(month, self.cursor.day as u32);
                let mut days = Vec::with_capacity(7);
                let mut day = first;
                for _ in 0..7 {
                    days.push(day);
                    day += 1;
                    if info.weekday(day as isize) == self.plan.week_start {
                        break;
                    }
                }
                days
            }
            _ => vec![info.day_index(month, self.cursor.day as u32)],
        }
    }

    /// Queues the current period's occurrences. Returns whether any of the
    /// period's days were filtered out.
    fn fill_period(&mut self) -> bool {
        let days = self.day_set();
        let candidates = days.len();
        let days = filter::apply(&self.plan, &self.info, days);
        let filtered = days.len() < candidates;

        let mut period: Vec<NaiveDateTime> = Vec::new();
        if !self.plan.by_set_pos.is_empty() && !self.time_set.is_empty() {
            let times = self.time_set.len() as i64;
            for &position in &self.plan.by_set_pos {
                let position = i64::from(position);
                let offset = if position > 0 { position - 1 } else { position };
                let (day_pos, time_pos) = (offset.div_euclid(times), offset.rem_euclid(times));
                let day_pos = if day_pos < 0 { days.len() as i64 + day_pos } else { day_pos };
                let Some(&day) = usize::try_from(day_pos).ok().and_then(|pos| days.get(pos)) else {
                    continue;
                };
                if let Some(date) = self.info.date(day) {
                    let candidate = date.and_time(self.time_set[time_pos as usize]);
                    if !period.contains(&candidate) {
                        period.push(candidate);
                    }
                }
            }
            period.sort_unstable();
        } else {
            for &day in &days {
                if let Some(date) = self.info.date(day) {
                    period.extend(self.time_set.iter().map(|&time| date.and_time(time)));
                }
            }
        }

        for candidate in period {
            if !self.emit(candidate) {
                self.done = true;
                break;
            }
        }

        filtered
    }

    /// Queues one candidate. Returns false once the stream must end.
    fn emit(&mut self, candidate: NaiveDateTime) -> bool {
        if candidate < self.start {
            return true;
        }
        let Some(instant) = localize(&self.zone, &candidate) else {
            return true;
        };
        if let Some(until) = &self.plan.until {
            if instant > *until {
                tracing::debug!(%until, "rule reached its UNTIL bound");
                return false;
            }
        }
        if self.last.map_or(false, |last| instant <= last) {
            return true;
        }
        self.last = Some(instant);
        self.pending.push_back(instant);
        match &mut self.remaining {
            Some(remaining) => {
                *remaining -= 1;
                *remaining > 0
            }
            None => true,
        }
    }

    /// Moves the cursor `interval` periods ahead and refreshes whatever
    /// tables the move invalidated.
    fn advance(&mut self, filtered: bool) {
        let Some(moved) = step(&self.plan, &mut self.cursor, filtered) else {
            return self.exhausted();
        };

        if self.plan.freq >= Frequency::Hourly {
            self.time_set = timeset::build(
                &self.plan,
                self.cursor.hour as u32,
                self.cursor.minute as u32,
                self.cursor.second as u32,
            );
        }

        match moved {
            Moved::Period => {
                self.rebuild();
            }
            Moved::Days => self.normalize_day(),
            Moved::Time => {}
        }
    }

    /// Carries an overflowing day-of-month into the following months.
    fn normalize_day(&mut self) {
        let mut cursor = self.cursor;
        let mut month_len = i64::from(days_in_month(cursor.year as i32, cursor.month as u32));
        if cursor.day <= month_len {
            return;
        }
        while cursor.day > month_len {
            cursor.day -= month_len;
            cursor.month += 1;
            if cursor.month == 13 {
                cursor.month = 1;
                cursor.year += 1;
                if cursor.year > i64::from(self.max_year) {
                    return self.passed_horizon();
                }
            }
            month_len = i64::from(days_in_month(cursor.year as i32, cursor.month as u32));
        }
        self.cursor = cursor;
        self.rebuild();
    }

    /// Points the year tables at the cursor's year and month.
    fn rebuild(&mut self) {
        let Cursor { year, month, day, .. } = self.cursor;
        if year > i64::from(self.max_year) {
            return self.passed_horizon();
        }
        let (year, month) = (year as i32, month as u32);
        if year == self.info.year {
            self.info.set_month(month, &self.plan);
        } else {
            self.info = YearInfo::new(year, month, &self.plan);
        }
        tracing::trace!(year, month, day, "advanced to next period");
    }

    fn passed_horizon(&mut self) {
        tracing::debug!(max_year = self.max_year, "rule passed the safety horizon");
        self.done = true;
    }

    fn exhausted(&mut self) {
        tracing::warn!(
            freq = %self.plan.freq,
            interval = self.plan.interval,
            "interval and time selectors can never produce another occurrence"
        );
        self.done = true;
    }
}

/// Whether every BYSETPOS of a sub-daily rule lies past the times a single
/// period can hold, so no period ever yields anything.
fn set_positions_unreachable(plan: &Plan) -> bool {
    match timeset::period_len(plan) {
        Some(len) if !plan.by_set_pos.is_empty() => plan
            .by_set_pos
            .iter()
            .all(|pos| pos.unsigned_abs() as usize > len),
        _ => false,
    }
}

/// What an advance changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Moved {
    /// Year or month moved; the tables need rebuilding.
    Period,
    /// The day moved and may have overflowed its month.
    Days,
    /// Only the time of day moved.
    Time,
}

/// Moves `cursor` by one interval of the rule's frequency. Returns `None`
/// when the time selectors can never be met again.
fn step(plan: &Plan, cursor: &mut Cursor, filtered: bool) -> Option<Moved> {
    let interval = i64::from(plan.interval);
    let mut moved = Moved::Time;

    match plan.freq {
        Frequency::Yearly => {
            cursor.year += interval;
            moved = Moved::Period;
        }
        Frequency::Monthly => {
            cursor.month += interval;
            if cursor.month > 12 {
                cursor.year += (cursor.month - 1) / 12;
                cursor.month = (cursor.month - 1) % 12 + 1;
            }
            moved = Moved::Period;
        }
        Frequency::Weekly => {
            let week_start = i64::from(plan.week_start);
            cursor.day += interval * 7 - (cursor.weekday - week_start).rem_euclid(7);
            cursor.weekday = week_start;
            moved = Moved::Days;
        }
        Frequency::Daily => {
            cursor.day += interval;
            moved = Moved::Days;
        }
        Frequency::Hourly => {
            if filtered {
                // Skip the rest of an excluded day, keeping the phase.
                cursor.hour += ((23 - cursor.hour) / interval) * interval;
            }
            let (days, hour) = if plan.by_hour.is_empty() {
                ((cursor.hour + interval) / 24, (cursor.hour + interval) % 24)
            } else {
                next_selected(cursor.hour, &plan.by_hour, 24, interval)?
            };
            cursor.hour = hour;
            if days > 0 {
                cursor.day += days;
                moved = Moved::Days;
            }
        }
        Frequency::Minutely => {
            if filtered {
                let elapsed = cursor.hour * 60 + cursor.minute;
                cursor.minute += ((1439 - elapsed) / interval) * interval;
            }
            let mut found = false;
            for _ in 0..1440 / gcd(interval, 1440) {
                let (hours, minute) = if plan.by_minute.is_empty() {
                    ((cursor.minute + interval) / 60, (cursor.minute + interval) % 60)
                } else {
                    next_selected(cursor.minute, &plan.by_minute, 60, interval)?
                };
                cursor.minute = minute;
                let days = (cursor.hour + hours) / 24;
                cursor.hour = (cursor.hour + hours) % 24;
                if days > 0 {
                    cursor.day += days;
                    moved = Moved::Days;
                }
                if selects(&plan.by_hour, cursor.hour) {
                    found = true;
                    break;
                }
            }
            if !found {
                return None;
            }
        }
        Frequency::Secondly => {
            if filtered {
                let elapsed = cursor.hour * 3600 + cursor.minute * 60 + cursor.second;
                cursor.second += ((86399 - elapsed) / interval) * interval;
            }
            let mut found = false;
            for _ in 0..86400 / gcd(interval, 86400) {
                let (minutes, second) = if plan.by_second.is_empty() {
                    ((cursor.second + interval) / 60, (cursor.second + interval) % 60)
                } else {
                    next_selected(cursor.second, &plan.by_second, 60, interval)?
                };
                cursor.second = second;
                let hours = (cursor.minute + minutes) / 60;
                cursor.minute = (cursor.minute + minutes) % 60;
                let days = (cursor.hour + hours) / 24;
                cursor.hour = (cursor.hour + hours) % 24;
                if days > 0 {
                    cursor.day += days;
                    moved = Moved::Days;
                }
                if selects(&plan.by_hour, cursor.hour) && selects(&plan.by_minute, cursor.minute) {
                    found = true;
                    break;
                }
            }
            if !found {
                return None;
            }
        }
    }

    Some(moved)
}

impl Iterator for RuleIter {
    type Item = DateTime<Tz>;

    fn next(&mut self) -> Option<DateTime<Tz>> {
        loop {
            if let Some(next) = self.pending.pop_front() {
                return Some(next);
            }
            if self.done {
                return None;
            }
            let filtered = self.fill_period();
            if !self.done {
                self.advance(filtered);
            }
        }
    }
}

/// Steps `value` by `interval` until it lands on a selected value, wrapping
/// at `base`. Returns the number of wraps and the value reached.
fn next_selected(value: i64, selected: &[u32], base: i64, interval: i64) -> Option<(i64, i64)> {
    let mut value = value;
    let mut wraps = 0;
    for _ in 0..base {
        value += interval;
        wraps += value / base;
        value %= base;
        if selects(selected, value) {
            return Some((wraps, value));
        }
    }
    None
}

fn selects(selected: &[u32], value: i64) -> bool {
    selected.is_empty() || u32::try_from(value).map_or(false, |value| selected.contains(&value))
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}
