use crate::{
    config::Config,
    options::RuleSpec,
    query,
    set::{Occurrences, RecurrenceSet},
};
use chrono::DateTime;
use chrono_tz::Tz;

/// A rule anchored at a start instant, without RDATE/EXDATE lists.
///
/// Queries go through a [`RecurrenceSet`] holding nothing but the rule, so
/// both share one merge and query implementation.
#[derive(Clone, Debug, PartialEq)]
pub struct RRule {
    start: DateTime<Tz>,
    spec: RuleSpec,
    config: Config,
}

impl RRule {
    pub fn new(start: DateTime<Tz>, spec: RuleSpec) -> Self {
        RRule {
            start,
            spec,
            config: Config::default(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn start(&self) -> &DateTime<Tz> {
        &self.start
    }

    pub fn spec(&self) -> &RuleSpec {
        &self.spec
    }

    fn set(&self) -> RecurrenceSet {
        RecurrenceSet::starting_at(self.start)
            .rule(self.spec.clone())
            .with_config(self.config)
    }

    pub fn iter(&self) -> Occurrences {
        self.set().iter()
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
}

impl From<RRule> for RecurrenceSet {
    fn from(rule: RRule) -> Self {
        rule.set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    #[test]
    fn exposes_start_and_rule() {
        let rrule = RRule::new(sept_second(), rule("FREQ=WEEKLY;COUNT=2"));
        assert_eq!(*rrule.start(), sept_second());
        assert_eq!(rrule.spec(), &rule("FREQ=WEEKLY;COUNT=2"));
        assert_eq!(rrule.all(), vec![sept_second(), utc(1997, 9, 9, 9, 0, 0)]);
    }

    #[test]
    fn queries_match_the_set() {
        let rrule = RRule::new(sept_second(), rule("FREQ=DAILY;INTERVAL=2"));
        let set = RecurrenceSet::from(rrule.clone());
        let pivot = utc(1997, 9, 5, 0, 0, 0);

        assert_eq!(rrule.after(pivot, false), Some(utc(1997, 9, 6, 9, 0, 0)));
        assert_eq!(rrule.after(pivot, false), set.after(pivot, false));
        assert_eq!(rrule.before(pivot, true), Some(utc(1997, 9, 4, 9, 0, 0)));
        assert_eq!(
            rrule.between(sept_second(), pivot, true),
            vec![sept_second(), utc(1997, 9, 4, 9, 0, 0)]
        );
    }

    #[test]
    fn config_is_passed_on() {
        let rrule = RRule::new(sept_second(), rule("FREQ=MONTHLY"))
            .with_config(Config::default().with_max_year(1997));
        assert_eq!(rrule.iter().count(), 4);
    }
}
