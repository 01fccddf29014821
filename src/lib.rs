//! Expands RFC 5545 recurrence rules, together with explicit RDATE and EXDATE
//! lists, into ascending streams of concrete occurrences.
//!
//! ```
//! use recurrence::RecurrenceSet;
//!
//! let set: RecurrenceSet = "DTSTART:19970902T090000Z\nRRULE:FREQ=DAILY;COUNT=3"
//!     .parse()
//!     .unwrap();
//! assert_eq!(set.all().len(), 3);
//! ```

mod calendar;
mod config;
mod error;
mod filter;
mod generator;
mod ical;
mod options;
mod plan;
mod query;
mod rrule;
mod set;
mod timeset;
mod zone;

#[cfg(test)]
mod test_helpers;

pub use config::{Config, DEFAULT_MAX_YEAR};
pub use error::{Field, ParseError, ValidationError};
pub use generator::RuleIter;
pub use options::{Options, RuleSpec, WeekdaySelector};
pub use plan::Plan;
pub use query::{after, before, between, iter_between};
pub use rrule::RRule;
pub use set::{Occurrences, RecurrenceSet};
pub use zone::{floating, local_zone};

pub use chrono::Weekday;
pub use chrono_tz::Tz;

use std::fmt;

/// How far apart the periods of a rule are.
///
/// Variants are ordered from coarsest to finest, so `freq < Frequency::Hourly`
/// reads as "coarser than hourly".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Frequency {
    Yearly,
    Monthly,
    Weekly,
    #[default]
    Daily,
    Hourly,
    Minutely,
    Secondly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Frequency::Yearly => "YEARLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Daily => "DAILY",
            Frequency::Hourly => "HOURLY",
            Frequency::Minutely => "MINUTELY",
            Frequency::Secondly => "SECONDLY",
        };
        f.write_str(name)
    }
}
