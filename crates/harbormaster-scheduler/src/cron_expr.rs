//! Cron expression parsing.
//!
//! The `cron` crate wants a leading seconds field and numbers weekdays 1-7
//! from Sunday. Standard 5-field expressions (`min hour dom mon dow`, with
//! 0 and 7 both Sunday) get `0` seconds prepended and their day-of-week
//! field rewritten to day names. 6 and 7 field expressions are passed
//! through in the crate's own dialect.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::error::SchedulerError;

/// Parse a 5, 6 or 7 field cron expression.
pub fn parse(expression: &str) -> Result<Schedule, SchedulerError> {
    let invalid = |reason: String| SchedulerError::InvalidCron {
        expression: expression.to_string(),
        reason,
    };

    let trimmed = expression.trim();
    let normalized = match trimmed.split_whitespace().count() {
        5 => {
            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            let day_of_week = standard_day_of_week(fields[4]).map_err(invalid)?;
            format!("0 {} {}", fields[..4].join(" "), day_of_week)
        }
        6 | 7 => trimmed.to_string(),
        n => return Err(invalid(format!("expected 5 to 7 fields, got {}", n))),
    };

    Schedule::from_str(&normalized).map_err(|e| invalid(e.to_string()))
}

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Rewrite a standard day-of-week field (0-7, Sunday = 0 or 7) as a list of
/// day names. Lists, ranges and steps are expanded; names pass through.
fn standard_day_of_week(field: &str) -> Result<String, String> {
    if field == "*" || field == "?" {
        return Ok(field.to_string());
    }

    let mut days = [false; 7];
    let mut named = Vec::new();
    for part in field.split(',') {
        if part.chars().any(|c| c.is_ascii_alphabetic()) {
            named.push(part.to_string());
            continue;
        }

        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| format!("invalid day-of-week step '{}'", step))?;
                if step == 0 {
                    return Err("day-of-week step cannot be 0".to_string());
                }
                (range, Some(step))
            }
            None => (part, None),
        };

        let (start, end) = if range == "*" {
            (0, 6)
        } else if let Some((start, end)) = range.split_once('-') {
            (day_number(start)?, day_number(end)?)
        } else {
            let day = day_number(range)?;
            // `n/step` runs from n to the end of the week.
            (day, if step.is_some() { 6.max(day) } else { day })
        };
        if start > end {
            return Err(format!("invalid day-of-week range '{}'", range));
        }

        for day in (start..=end).step_by(step.unwrap_or(1) as usize) {
            days[(day % 7) as usize] = true;
        }
    }

    let mut values: Vec<String> = DAY_NAMES
        .iter()
        .zip(days)
        .filter(|(_, set)| *set)
        .map(|(name, _)| name.to_string())
        .collect();
    values.extend(named);
    Ok(values.join(","))
}

fn day_number(value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(day) if day <= 7 => Ok(day),
        _ => Err(format!("invalid day of week '{}', expected 0-7", value)),
    }
}

/// Next firing strictly after `after`.
pub fn next_after(schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&after).next()
}
