use crate::{config::Config, generator::RuleIter, options::RuleSpec, query, zone};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
    iter::Peekable,
    vec,
};

/// A start instant, an optional rule and explicit RDATE/EXDATE lists.
///
/// Holds no iterator state: every query builds a fresh [`Occurrences`].
/// In all-day mode every stored instant is kept at [`zone::floating`] form.
#[derive(Clone, Debug, PartialEq)]
pub struct RecurrenceSet {
    start: DateTime<Tz>,
    rule: Option<RuleSpec>,
    inclusions: Vec<DateTime<Tz>>,
    exclusions: Vec<DateTime<Tz>>,
    all_day: bool,
    config: Config,
}

impl Default for RecurrenceSet {
    fn default() -> Self {
        RecurrenceSet::new()
    }
}

impl RecurrenceSet {
    /// An empty set starting now, in the host's zone.
    pub fn new() -> Self {
        RecurrenceSet::starting_at(Utc::now().with_timezone(&zone::local_zone()))
    }

    pub fn starting_at(start: DateTime<Tz>) -> Self {
        RecurrenceSet {
            start,
            rule: None,
            inclusions: Vec::new(),
            exclusions: Vec::new(),
            all_day: false,
            config: Config::default(),
        }
    }

    pub fn rule(mut self, spec: RuleSpec) -> Self {
        self.rule = Some(spec);
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn start(&self) -> &DateTime<Tz> {
        &self.start
    }

    pub fn spec(&self) -> Option<&RuleSpec> {
        self.rule.as_ref()
    }

    pub fn inclusions(&self) -> &[DateTime<Tz>] {
        &self.inclusions
    }

    pub fn exclusions(&self) -> &[DateTime<Tz>] {
        &self.exclusions
    }

    pub fn is_all_day(&self) -> bool {
        self.all_day
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_rule(&mut self, spec: Option<RuleSpec>) {
        self.rule = spec;
    }

    pub fn set_start(&mut self, start: DateTime<Tz>) {
        self.start = self.normalize(start);
    }

    /// Switches all-day mode. Turning it on drops the time of day and zone
    /// of every stored instant; turning it off again does not bring them
    /// back.
    pub fn set_all_day(&mut self, all_day: bool) {
        self.all_day = all_day;
        if all_day {
            self.start = zone::floating(&self.start);
            for instant in self.inclusions.iter_mut().chain(self.exclusions.iter_mut()) {
                *instant = zone::floating(instant);
            }
        }
    }

    pub fn add_inclusion(&mut self, instant: DateTime<Tz>) {
        let instant = self.normalize(instant);
        self.inclusions.push(instant);
    }

    pub fn add_exclusion(&mut self, instant: DateTime<Tz>) {
        let instant = self.normalize(instant);
        self.exclusions.push(instant);
    }

    pub fn set_inclusions(&mut self, instants: impl IntoIterator<Item = DateTime<Tz>>) {
        self.inclusions.clear();
        for instant in instants {
            self.add_inclusion(instant);
        }
    }

    pub fn set_exclusions(&mut self, instants: impl IntoIterator<Item = DateTime<Tz>>) {
        self.exclusions.clear();
        for instant in instants {
            self.add_exclusion(instant);
        }
    }

    fn normalize(&self, instant: DateTime<Tz>) -> DateTime<Tz> {
        if self.all_day {
            zone::floating(&instant)
        } else {
            instant
        }
    }

    /// A fresh, ascending and duplicate-free stream of the set's occurrences.
    pub fn iter(&self) -> Occurrences {
        let rule = self.rule.as_ref().map(|spec| Source::Rule {
            iter: RuleIter::new(spec.rebuild(&self.start), &self.start, self.config),
            all_day: self.all_day,
        });
        let inclusions = Source::Dates(sorted(&self.inclusions).into_iter());

        let heap = rule
            .into_iter()
            .chain(std::iter::once(inclusions))
            .filter_map(|mut iter| iter.next().map(|cursor| Reverse(IterHolder { cursor, iter })))
            .collect();

        Occurrences {
            heap,
            exclusions: sorted(&self.exclusions).into_iter().peekable(),
            last: None,
        }
    }

    pub fn all(&self) -> Vec<DateTime<Tz>> {
        self.iter().collect()
    }

    pub fn after(&self, instant: DateTime<Tz>, inclusive: bool) -> Option<DateTime<Tz>> {
        query::after(self.iter(), instant, inclusive)
    }

    pub fn before(&self, instant: DateTime<Tz>, inclusive: bool) -> Option<DateTime<Tz>> {
        query::before(self.iter(), instant, inclusive)
    }

    pub fn between(
        &self,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        inclusive: bool,
    ) -> Vec<DateTime<Tz>> {
        query::between(self.iter(), start, end, inclusive)
    }

    pub fn iter_between(
        &self,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        inclusive: bool,
    ) -> impl Iterator<Item = DateTime<Tz>> {
        query::iter_between(self.iter(), start, end, inclusive)
    }
}

impl<'a> IntoIterator for &'a RecurrenceSet {
    type Item = DateTime<Tz>;
    type IntoIter = Occurrences;

    fn into_iter(self) -> Occurrences {
        self.iter()
    }
}

fn sorted(instants: &[DateTime<Tz>]) -> Vec<DateTime<Tz>> {
    let mut instants = instants.to_vec();
    instants.sort_unstable();
    instants
}

/// Merged occurrences of a [`RecurrenceSet`].
#[derive(Debug)]
pub struct Occurrences {
    heap: BinaryHeap<Reverse<IterHolder>>,
    exclusions: Peekable<vec::IntoIter<DateTime<Tz>>>,
    last: Option<DateTime<Tz>>,
}

impl Iterator for Occurrences {
    type Item = DateTime<Tz>;

    fn next(&mut self) -> Option<DateTime<Tz>> {
        while let Some(Reverse(IterHolder { cursor, mut iter })) = self.heap.pop() {
            if let Some(next) = iter.next() {
                self.heap.push(Reverse(IterHolder { cursor: next, iter }));
            }

            if self.last.map_or(false, |last| cursor <= last) {
                continue;
            }
            self.last = Some(cursor);

            while self.exclusions.next_if(|excluded| *excluded < cursor).is_some() {}
            if self.exclusions.peek() == Some(&cursor) {
                continue;
            }

            return Some(cursor);
        }

        None
    }
}

#[derive(Debug)]
enum Source {
    Rule { iter: RuleIter, all_day: bool },
    Dates(vec::IntoIter<DateTime<Tz>>),
}

impl Iterator for Source {
    type Item = DateTime<Tz>;

    fn next(&mut self) -> Option<DateTime<Tz>> {
        match self {
            Source::Rule { iter, all_day: false } => iter.next(),
            Source::Rule {
                iter,
                all_day: true,
            } => iter.next().map(|instant| zone::floating(&instant)),
            Source::Dates(dates) => dates.next(),
        }
    }
}

/// Holds a source and the latest date that came out of it
#[derive(Debug)]
struct IterHolder {
    cursor: DateTime<Tz>,
    iter: Source,
}

impl Eq for IterHolder {}

impl PartialEq for IterHolder {
    fn eq(&self, other: &Self) -> bool {
        self.cursor.eq(&other.cursor)
    }
}

impl PartialOrd for IterHolder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IterHolder {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cursor.cmp(&other.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use approx::*;
    use chrono::Timelike as _;

    fn set(start: DateTime<Tz>, text: &str) -> RecurrenceSet {
        RecurrenceSet::starting_at(start).rule(rule(text))
    }

    #[test]
    fn defaults_to_now() {
        let now = Utc::now();
        let set = RecurrenceSet::new();
        assert_abs_diff_eq!(set.start().timestamp(), now.timestamp(), epsilon = 1);
        assert!(set.all().is_empty());
    }

    #[test]
    fn merges_rule_and_inclusions() {
        let mut set = set(sept_second(), "FREQ=WEEKLY;COUNT=3");
        set.add_inclusion(utc(1997, 9, 5, 12, 0, 0));
        set.add_inclusion(utc(1997, 8, 30, 0, 0, 0));

        assert_eq!(
            set.all(),
            vec![
                utc(1997, 8, 30, 0, 0, 0),
                utc(1997, 9, 2, 9, 0, 0),
                utc(1997, 9, 5, 12, 0, 0),
                utc(1997, 9, 9, 9, 0, 0),
                utc(1997, 9, 16, 9, 0, 0),
            ]
        );
    }

    #[test]
    fn skips_repeated() {
        let mut set = set(sept_second(), "FREQ=DAILY;COUNT=2");
        set.add_inclusion(sept_second());
        // the same instant, written in another zone
        set.add_inclusion(sept_second().with_timezone(&TOKYO));
        set.add_inclusion(utc(1997, 9, 10, 9, 0, 0));
        set.add_inclusion(utc(1997, 9, 10, 9, 0, 0));

        assert_eq!(
            set.all(),
            vec![sept_second(), utc(1997, 9, 3, 9, 0, 0), utc(1997, 9, 10, 9, 0, 0)]
        );
    }

    #[test]
    fn exclusion_wins_over_inclusion() {
        let mut set = set(sept_second(), "FREQ=DAILY;COUNT=3");
        set.add_inclusion(utc(1997, 9, 20, 9, 0, 0));
        set.add_exclusion(utc(1997, 9, 20, 9, 0, 0));
        set.add_exclusion(utc(1997, 9, 3, 9, 0, 0));
        // matches nothing
        set.add_exclusion(utc(1997, 9, 4, 10, 0, 0));

        assert_eq!(set.all(), vec![sept_second(), utc(1997, 9, 4, 9, 0, 0)]);
    }

    #[test]
    fn count_bounds_the_rule_not_the_result() {
        let mut set = set(sept_second(), "FREQ=DAILY;BYDAY=TU,TH;COUNT=6");
        set.add_inclusion(utc(1997, 9, 9, 9, 0, 0));
        set.add_inclusion(utc(1997, 9, 16, 9, 0, 0));
        set.add_exclusion(utc(1997, 9, 4, 9, 0, 0));
        set.add_exclusion(utc(1997, 9, 11, 9, 0, 0));
        set.add_exclusion(utc(1997, 9, 18, 9, 0, 0));

        assert_eq!(
            set.all(),
            vec![sept_second(), utc(1997, 9, 9, 9, 0, 0), utc(1997, 9, 16, 9, 0, 0)]
        );
    }

    #[test]
    fn exclusions_without_rule() {
        let mut set = RecurrenceSet::starting_at(sept_second());
        set.set_inclusions([utc(1997, 9, 4, 9, 0, 0), utc(1997, 9, 3, 9, 0, 0)]);
        set.set_exclusions([utc(1997, 9, 4, 9, 0, 0)]);
        assert_eq!(set.all(), vec![utc(1997, 9, 3, 9, 0, 0)]);
    }

    #[test]
    fn all_day_ignores_input_zone() {
        let mut set = set(at(TOKYO, 2023, 6, 15, 14, 30, 45), "FREQ=DAILY;COUNT=3");
        set.set_all_day(true);

        let dates = set.all();
        assert_eq!(
            dates,
            vec![
                utc(2023, 6, 15, 0, 0, 0),
                utc(2023, 6, 16, 0, 0, 0),
                utc(2023, 6, 17, 0, 0, 0),
            ]
        );
        assert!(dates.iter().all(|date| date.num_seconds_from_midnight() == 0));
    }

    #[test]
    fn all_day_compares_dates() {
        let mut set = set(at(NEW_YORK, 2023, 6, 15, 8, 0, 0), "FREQ=DAILY;COUNT=3");
        set.set_all_day(true);
        // late evening in New York is already the next day in UTC, but the
        // calendar date is what counts
        set.add_exclusion(at(NEW_YORK, 2023, 6, 16, 23, 0, 0));
        set.add_inclusion(at(TOKYO, 2023, 6, 17, 1, 0, 0));
        set.add_inclusion(at(TOKYO, 2023, 6, 20, 1, 0, 0));

        assert_eq!(
            set.all(),
            vec![
                utc(2023, 6, 15, 0, 0, 0),
                utc(2023, 6, 17, 0, 0, 0),
                utc(2023, 6, 20, 0, 0, 0),
            ]
        );
    }

    #[test]
    fn all_day_toggle_is_lossy() {
        let original = at(TOKYO, 2023, 6, 15, 14, 30, 45);
        let mut set = RecurrenceSet::starting_at(original);
        set.add_inclusion(original);

        set.set_all_day(true);
        set.set_all_day(false);

        assert!(!set.is_all_day());
        assert_eq!(*set.start(), utc(2023, 6, 15, 0, 0, 0));
        assert_eq!(set.inclusions(), &[utc(2023, 6, 15, 0, 0, 0)]);
        assert_ne!(*set.start(), original);

        // values added afterwards keep their time again
        set.add_inclusion(original);
        assert_eq!(set.inclusions()[1], original);
    }

    #[test]
    fn impossible_rule_is_empty() {
        assert!(set(sept_second(), "FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=31").all().is_empty());
    }

    #[test]
    fn iteration_matches_all() {
        let mut set = set(sept_second(), "FREQ=MONTHLY;BYDAY=MO,FR;BYSETPOS=1,-1;COUNT=10");
        set.add_inclusion(utc(1997, 10, 15, 9, 0, 0));
        set.add_exclusion(utc(1997, 11, 3, 9, 0, 0));

        let mut manual = Vec::new();
        for next in set.iter() {
            manual.push(next);
        }
        assert_eq!(manual, set.all());
        assert_eq!(manual, (&set).into_iter().collect::<Vec<_>>());
        assert!(manual.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn queries() {
        let set = set(sept_second(), "FREQ=DAILY");
        let third = utc(1997, 9, 3, 9, 0, 0);

        assert_eq!(set.after(third, false), Some(utc(1997, 9, 4, 9, 0, 0)));
        assert_eq!(set.before(third, false), Some(sept_second()));
        assert_eq!(set.before(sept_second(), false), None);
        assert_eq!(
            set.between(sept_second(), utc(1997, 9, 5, 9, 0, 0), false),
            vec![third, utc(1997, 9, 4, 9, 0, 0)]
        );
        assert_eq!(
            set.iter_between(third, utc(1997, 9, 10, 0, 0, 0), true).count(),
            7
        );
    }

    #[test]
    fn config_reaches_the_generator() {
        let set =
            set(sept_second(), "FREQ=YEARLY").with_config(Config::default().with_max_year(1999));
        assert_eq!(set.all().len(), 3);
    }
}
