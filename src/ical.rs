//! RFC 5545 text form of rules and sets: `RRULE` values and the
//! `DTSTART`/`RRULE`/`RDATE`/`EXDATE` content lines around them.

use crate::{
    error::ParseError,
    options::{weekday_code, Options, RuleSpec, WeekdaySelector},
    set::RecurrenceSet,
    zone::{is_utc, localize},
    Frequency,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone as _, Utc, Weekday};
use chrono_tz::Tz;
use std::{collections::BTreeMap, fmt, str::FromStr};

const DATE: &str = "%Y%m%d";
const DATE_TIME: &str = "%Y%m%dT%H%M%S";

impl FromStr for Frequency {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let freq = match text.trim().to_ascii_uppercase().as_str() {
            "YEARLY" => Frequency::Yearly,
            "MONTHLY" => Frequency::Monthly,
            "WEEKLY" => Frequency::Weekly,
            "DAILY" => Frequency::Daily,
            "HOURLY" => Frequency::Hourly,
            "MINUTELY" => Frequency::Minutely,
            "SECONDLY" => Frequency::Secondly,
            _ => {
                return Err(ParseError::InvalidValue {
                    key: "FREQ".to_string(),
                    value: text.to_string(),
                })
            }
        };
        Ok(freq)
    }
}

fn parse_weekday(code: &str) -> Option<Weekday> {
    let weekday = match code.to_ascii_uppercase().as_str() {
        "MO" => Weekday::Mon,
        "TU" => Weekday::Tue,
        "WE" => Weekday::Wed,
        "TH" => Weekday::Thu,
        "FR" => Weekday::Fri,
        "SA" => Weekday::Sat,
        "SU" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}

/// `TU`, `+2MO` or `-1FR`.
fn parse_selector(text: &str) -> Option<WeekdaySelector> {
    let text = text.trim();
    let split = text.len().checked_sub(2)?;
    let weekday = parse_weekday(text.get(split..)?)?;
    let n = match text.get(..split)? {
        "" => 0,
        n => match n.parse() {
            Ok(0) | Err(_) => return None,
            Ok(n) => n,
        },
    };
    Some(WeekdaySelector { weekday, n })
}

fn parse_list<T: FromStr>(value: &str) -> Option<Vec<T>> {
    value.split(',').map(|item| item.trim().parse().ok()).collect()
}

/// Reads `YYYYMMDD`, `YYYYMMDDTHHMMSS` or `YYYYMMDDTHHMMSSZ`. Values without
/// a trailing `Z` are wall-clock times in `zone`, or UTC when there is none.
fn parse_instant(value: &str, zone: Option<Tz>) -> Result<DateTime<Tz>, ParseError> {
    let value = value.trim();
    let invalid = || ParseError::InvalidDate(value.to_string());

    if let Some(utc) = value.strip_suffix(|c| c == 'Z' || c == 'z') {
        let naive = NaiveDateTime::parse_from_str(utc, DATE_TIME).map_err(|_| invalid())?;
        return Ok(Tz::UTC.from_utc_datetime(&naive));
    }

    let naive = if value.len() == 8 {
        NaiveDate::parse_from_str(value, DATE)
            .map_err(|_| invalid())?
            .and_time(NaiveTime::MIN)
    } else {
        NaiveDateTime::parse_from_str(value, DATE_TIME).map_err(|_| invalid())?
    };
    localize(&zone.unwrap_or(Tz::UTC), &naive).ok_or_else(invalid)
}

fn format_utc(instant: &DateTime<Tz>) -> String {
    instant.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ").to_string()
}

fn join<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl FromStr for RuleSpec {
    type Err = ParseError;

    #[tracing::instrument(level = "debug", err)]
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let body = match text.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("RRULE:") => &text[6..],
            _ => text,
        };

        let mut options = Options::default();
        let mut freq: Option<Frequency> = None;
        let mut seen: Vec<String> = Vec::new();

        for part in body.split(';').filter(|part| !part.trim().is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| ParseError::MalformedLine(part.to_string()))?;
            let key = key.trim().to_ascii_uppercase();
            let value = value.trim();
            if seen.contains(&key) {
                return Err(ParseError::DuplicateKey(key));
            }

            let parsed = match key.as_str() {
                "FREQ" => value.parse().ok().map(|f| freq = Some(f)),
                "INTERVAL" => value.parse().ok().map(|n| options.interval = Some(n)),
                "COUNT" => value
                    .parse::<i64>()
                    .ok()
                    .map(|n| options.count = u32::try_from(n).ok().filter(|&n| n > 0)),
                "UNTIL" => parse_instant(value, None)
                    .ok()
                    .map(|until| options.until = Some(until)),
                "WKST" => parse_weekday(value).map(|day| options.week_start = day),
                "BYMONTH" => parse_list(value).map(|list| options.by_month = list),
                "BYMONTHDAY" => parse_list(value).map(|list| options.by_month_day = list),
                "BYYEARDAY" => parse_list(value).map(|list| options.by_year_day = list),
                "BYWEEKNO" => parse_list(value).map(|list| options.by_week_no = list),
                "BYDAY" => value
                    .split(',')
                    .map(parse_selector)
                    .collect::<Option<Vec<_>>>()
                    .map(|list| options.by_weekday = list),
                "BYHOUR" => parse_list(value).map(|list| options.by_hour = list),
                "BYMINUTE" => parse_list(value).map(|list| options.by_minute = list),
                "BYSECOND" => parse_list(value).map(|list| options.by_second = list),
                "BYSETPOS" => parse_list(value).map(|list| options.by_set_pos = list),
                "BYEASTER" => parse_list(value).map(|list| options.by_easter = list),
                _ => return Err(ParseError::UnknownKey(key.clone())),
            };
            if parsed.is_none() {
                return Err(ParseError::InvalidValue {
                    key,
                    value: value.to_string(),
                });
            }
            seen.push(key);
        }

        options.freq = freq.ok_or(ParseError::MissingFreq)?;
        Ok(RuleSpec::new(options)?)
    }
}

impl fmt::Display for RuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = vec![format!("FREQ={}", self.freq)];

        if let Some(count) = self.count {
            parts.push(format!("COUNT={}", count));
        }
        if let Some(until) = &self.until {
            parts.push(format!("UNTIL={}", format_utc(until)));
        }
        if self.interval > 1 {
            parts.push(format!("INTERVAL={}", self.interval));
        }
        if self.week_start != Weekday::Mon {
            parts.push(format!("WKST={}", weekday_code(self.week_start)));
        }

        let lists = [
            ("BYSETPOS", join(&self.by_set_pos)),
            ("BYMONTH", join(&self.by_month)),
            ("BYMONTHDAY", join(&self.by_month_day)),
            ("BYYEARDAY", join(&self.by_year_day)),
            ("BYWEEKNO", join(&self.by_week_no)),
            ("BYDAY", join(&self.by_weekday)),
            ("BYHOUR", join(&self.by_hour)),
            ("BYMINUTE", join(&self.by_minute)),
            ("BYSECOND", join(&self.by_second)),
            ("BYEASTER", join(&self.by_easter)),
        ];
        for (key, values) in lists {
            if !values.is_empty() {
                parts.push(format!("{}={}", key, values));
            }
        }

        f.write_str(&parts.join(";"))
    }
}

/// Name and parameters of one content line.
struct Property<'a> {
    name: String,
    zone: Option<Tz>,
    date_only: bool,
    value: &'a str,
}

impl<'a> Property<'a> {
    fn parse(line: &'a str) -> Result<Self, ParseError> {
        let malformed = || ParseError::MalformedLine(line.to_string());
        let (head, value) = line.split_once(':').ok_or_else(malformed)?;
        let mut params = head.split(';');
        let name = params.next().ok_or_else(malformed)?.trim().to_ascii_uppercase();

        let mut zone = None;
        let mut date_only = false;
        for param in params {
            let (key, param_value) = param.split_once('=').ok_or_else(malformed)?;
            match key.trim().to_ascii_uppercase().as_str() {
                "TZID" => {
                    let id = param_value.trim().trim_matches('"');
                    zone = Some(
                        id.parse::<Tz>()
                            .map_err(|_| ParseError::UnknownZone(id.to_string()))?,
                    );
                }
                "VALUE" => date_only = param_value.trim().eq_ignore_ascii_case("DATE"),
                _ => {}
            }
        }

        Ok(Property {
            name,
            zone,
            date_only,
            value,
        })
    }

    fn instants(&self) -> Result<Vec<DateTime<Tz>>, ParseError> {
        self.value
            .split(',')
            .map(|value| parse_instant(value, self.zone))
            .collect()
    }
}

impl FromStr for RecurrenceSet {
    type Err = ParseError;

    #[tracing::instrument(level = "debug", skip(text), fields(lines = text.lines().count()), err)]
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut start = None;
        let mut all_day = false;
        let mut rule = None;
        let mut inclusions = Vec::new();
        let mut exclusions = Vec::new();

        for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let property = Property::parse(line)?;
            match property.name.as_str() {
                "DTSTART" => {
                    if start.is_some() {
                        return Err(ParseError::Repeated("DTSTART"));
                    }
                    all_day = property.date_only || property.value.trim().len() == 8;
                    start = Some(parse_instant(property.value, property.zone)?);
                }
                "RRULE" => {
                    if rule.is_some() {
                        return Err(ParseError::Repeated("RRULE"));
                    }
                    rule = Some(property.value.parse::<RuleSpec>()?);
                }
                "RDATE" => inclusions.extend(property.instants()?),
                "EXDATE" => exclusions.extend(property.instants()?),
                _ => return Err(ParseError::UnknownProperty(property.name.clone())),
            }
        }

        let mut set = RecurrenceSet::starting_at(start.ok_or(ParseError::MissingStart)?);
        set.set_rule(rule);
        set.set_inclusions(inclusions);
        set.set_exclusions(exclusions);
        set.set_all_day(all_day);
        Ok(set)
    }
}

impl fmt::Display for RecurrenceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all_day() {
            writeln!(f, "DTSTART;VALUE=DATE:{}", self.start().format(DATE))?;
        } else {
            let (params, value) = zoned(self.start());
            writeln!(f, "DTSTART{}:{}", params, value)?;
        }

        if let Some(spec) = self.spec() {
            writeln!(f, "RRULE:{}", spec)?;
        }

        for (name, instants) in [("RDATE", self.inclusions()), ("EXDATE", self.exclusions())] {
            if instants.is_empty() {
                continue;
            }
            if self.is_all_day() {
                let dates: Vec<_> = instants
                    .iter()
                    .map(|date| date.format(DATE).to_string())
                    .collect();
                writeln!(f, "{};VALUE=DATE:{}", name, dates.join(","))?;
                continue;
            }

            // UTC (the `None` key) sorts first, then zones by name.
            let mut groups: BTreeMap<Option<&str>, Vec<String>> = BTreeMap::new();
            for instant in instants {
                let key = wall_clock_zone(instant).map(|zone| zone.name());
                groups.entry(key).or_default().push(zoned(instant).1);
            }
            for (zone, values) in groups {
                match zone {
                    Some(zone) => writeln!(f, "{};TZID={}:{}", name, zone, values.join(","))?,
                    None => writeln!(f, "{}:{}", name, values.join(","))?,
                }
            }
        }

        Ok(())
    }
}

/// Zone a date-time can be written in as wall-clock time, or `None` when it
/// has to be written in UTC: UTC itself, and the later of two instants
/// sharing a wall-clock time, which reading back would turn into the earlier.
fn wall_clock_zone(instant: &DateTime<Tz>) -> Option<Tz> {
    let zone = instant.timezone();
    let exact = localize(&zone, &instant.naive_local()) == Some(*instant);
    (!is_utc(&zone) && exact).then_some(zone)
}

/// Parameters and value for a date-time: a `TZID` parameter with the
/// wall-clock time when that reads back to the same instant, bare `Z` form
/// otherwise.
fn zoned(instant: &DateTime<Tz>) -> (String, String) {
    match wall_clock_zone(instant) {
        Some(zone) => (
            format!(";TZID={}", zone.name()),
            instant.format(DATE_TIME).to_string(),
        ),
        None => (String::new(), format_utc(instant)),
    }
}
