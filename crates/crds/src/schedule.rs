//! Upgrade notification schedules
//!
//! Schedules are standard five-field cron expressions
//! (`minute hour day-of-month month day-of-week`), optionally prefixed with
//! `CRON_TZ=<zone>` or `TZ=<zone>`. They are evaluated with the `cron` crate,
//! which expects a leading seconds field and numbers weekdays 1-7 from Sunday.
//! When both day-of-month and day-of-week are restricted, a day matching
//! either one fires, as in standard cron.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use thiserror::Error;

/// Default schedule: every day at midnight.
pub const DEFAULT_SCHEDULE: &str = "0 0 * * *";

/// Error returned for a schedule string that is not a valid cron expression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Wrong number of fields
    #[error("expected 5 fields, found {0}")]
    FieldCount(usize),

    /// Unknown time zone in a `CRON_TZ=`/`TZ=` prefix
    #[error("unknown time zone {0:?}")]
    TimeZone(String),

    /// A field was rejected by the cron parser
    #[error("invalid cron expression: {0}")]
    Expression(String),
}

/// A validated schedule, ready to compute fire times.
#[derive(Debug, Clone)]
pub struct ParsedSchedule {
    source: String,
    schedule: cron::Schedule,
    /// Day-of-week half when both day fields are restricted
    weekdays: Option<cron::Schedule>,
    timezone: Tz,
}

impl ParsedSchedule {
    /// The schedule string as written by the user.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Time zone the expression is evaluated in.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let after = after.with_timezone(&self.timezone);
        let next = |schedule: &cron::Schedule| schedule.after(&after).next();
        let fire = match (next(&self.schedule), self.weekdays.as_ref().and_then(next)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        fire.map(|fire| fire.with_timezone(&Utc))
    }
}

impl FromStr for ParsedSchedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_schedule(s)
    }
}

/// Parse and validate a standard cron schedule.
pub fn parse_schedule(input: &str) -> Result<ParsedSchedule, ScheduleError> {
    let mut rest = input.trim();
    let mut timezone = Tz::UTC;

    if let Some(prefixed) = rest.strip_prefix("CRON_TZ=").or_else(|| rest.strip_prefix("TZ=")) {
        let (zone, expression) = prefixed
            .split_once(char::is_whitespace)
            .ok_or(ScheduleError::FieldCount(0))?;
        timezone = zone
            .parse()
            .map_err(|_| ScheduleError::TimeZone(zone.to_string()))?;
        rest = expression.trim();
    }

    let fields: Vec<&str> = rest.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(ScheduleError::FieldCount(fields.len()));
    }

    let weekday = translate_weekdays(fields[4])?;
    let compile = |day_of_month: &str, day_of_week: &str| {
        let expression = format!(
            "0 {} {} {} {} {}",
            fields[0], fields[1], day_of_month, fields[3], day_of_week
        );
        cron::Schedule::from_str(&expression).map_err(|e| ScheduleError::Expression(e.to_string()))
    };

    let (schedule, weekdays) = if is_restricted(fields[2]) && is_restricted(fields[4]) {
        (compile(fields[2], "*")?, Some(compile("*", &weekday)?))
    } else {
        (compile(fields[2], &weekday)?, None)
    };

    Ok(ParsedSchedule {
        source: input.to_string(),
        schedule,
        weekdays,
        timezone,
    })
}

/// A day field starting with `*` or `?` matches every day.
fn is_restricted(field: &str) -> bool {
    !(field.starts_with('*') || field.starts_with('?'))
}

/// Map standard weekday numbers (0-7, 0 and 7 are Sunday) onto 1-7 from Sunday.
/// Names and step values pass through untouched.
fn translate_weekdays(field: &str) -> Result<String, ScheduleError> {
    let items = field
        .split(',')
        .map(|item| {
            let (range, step) = match item.split_once('/') {
                Some((range, step)) => (range, Some(step)),
                None => (item, None),
            };
            let range = match range.split_once('-') {
                Some((start, "7")) if step.is_none() => {
                    format!("{}-7,1", translate_weekday(start)?)
                }
                Some((start, end)) => {
                    format!("{}-{}", translate_weekday(start)?, translate_weekday(end)?)
                }
                None => translate_weekday(range)?,
            };
            Ok(match step {
                Some(step) => format!("{range}/{step}"),
                None => range,
            })
        })
        .collect::<Result<Vec<_>, ScheduleError>>()?;
    Ok(items.join(","))
}

fn translate_weekday(day: &str) -> Result<String, ScheduleError> {
    if !day.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(day.to_string());
    }
    match day.parse::<u8>() {
        Ok(n @ 0..=7) => Ok(((n % 7) + 1).to_string()),
        _ => Err(ScheduleError::Expression(format!(
            "day of week {day:?} out of range"
        ))),
    }
}
