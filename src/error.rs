use crate::Frequency;
use std::fmt;
use thiserror::Error;

/// Rule part a [`ValidationError`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Interval,
    ByMonth,
    ByMonthDay,
    ByYearDay,
    ByWeekNo,
    ByDay,
    ByHour,
    ByMinute,
    BySecond,
    BySetPos,
    ByEaster,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Interval => "INTERVAL",
            Field::ByMonth => "BYMONTH",
            Field::ByMonthDay => "BYMONTHDAY",
            Field::ByYearDay => "BYYEARDAY",
            Field::ByWeekNo => "BYWEEKNO",
            Field::ByDay => "BYDAY",
            Field::ByHour => "BYHOUR",
            Field::ByMinute => "BYMINUTE",
            Field::BySecond => "BYSECOND",
            Field::BySetPos => "BYSETPOS",
            Field::ByEaster => "BYEASTER",
        };
        f.write_str(name)
    }
}

/// Rejection of a rule at construction time. No partially built rule is
/// ever returned alongside one of these.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} value {value} is outside the accepted range {min}..={max}")]
    OutOfRange {
        field: Field,
        value: i32,
        min: i32,
        max: i32,
    },

    #[error("{field} value must not be zero (accepted range -{max}..=-1 or 1..={max})")]
    Zero { field: Field, max: i32 },

    #[error("{field} cannot be used with FREQ={freq}")]
    Incompatible { field: Field, freq: Frequency },

    #[error("BYSETPOS requires at least one other BY* selector")]
    SetPosWithoutSelector,
}

/// Failure to read the textual DTSTART/RRULE/RDATE/EXDATE form.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("rule is missing FREQ")]
    MissingFreq,

    #[error("unknown rule part {0:?}")]
    UnknownKey(String),

    #[error("rule part {0} given more than once")]
    DuplicateKey(String),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    #[error("invalid date or date-time {0:?}")]
    InvalidDate(String),

    #[error("unknown time zone {0:?}")]
    UnknownZone(String),

    #[error("unsupported property {0:?}")]
    UnknownProperty(String),

    #[error("malformed content line {0:?}")]
    MalformedLine(String),

    #[error("DTSTART is missing")]
    MissingStart,

    #[error("more than one {0} line")]
    Repeated(&'static str),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
