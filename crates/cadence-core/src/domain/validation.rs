//! Request validation and schedule normalization.
//!
//! Users may submit a classic 5-field unix cron (`min hour dom month dow`).
//! The scheduler evaluates the stricter 6/7-field grammar
//! (`sec min hour dom month dow [year]`), which also forbids giving both
//! day-of-month and day-of-week: one of them must be `?`.

use std::str::FromStr;

use crate::error::ValidationError;

use super::request::{RequestDefinition, RequestSubmission};

pub type ValidationResult<T> = Result<T, ValidationError>;

fn check(expression: bool, message: &str) -> ValidationResult<()> {
    if expression {
        Ok(())
    } else {
        Err(ValidationError::new(message))
    }
}

/// Validate a submission and produce its canonical definition.
///
/// Checks run in a fixed order and the first failure is returned.
pub fn validate(submission: RequestSubmission) -> ValidationResult<RequestDefinition> {
    let RequestSubmission {
        id,
        name,
        command,
        executor,
        executor_data,
        resources,
        schedule,
        instances,
        daemon,
        rack_sensitive,
        env,
        uris,
        metadata,
        version,
        timestamp,
    } = submission;

    let id = id.ok_or_else(|| ValidationError::new("Id must not be null"))?;
    check(
        !id.is_empty() && !id.contains('/'),
        "Id must be a single path segment",
    )?;

    check(
        instances.is_none_or(|n| n > 0),
        "Instances must be greater than 0",
    )?;
    let instance_count = instances
        .map(u32::try_from)
        .transpose()
        .map_err(|_| ValidationError::new(format!("Instances must be at most {}", u32::MAX)))?;

    let single_instance = instances.is_none_or(|n| n == 1);
    check(
        schedule.is_none() || (single_instance && !daemon.unwrap_or(false)),
        "Scheduled requests can not be ran on more than one instance, and must not be daemons",
    )?;
    check(
        daemon.unwrap_or(true) || single_instance,
        "Non-daemons can not be ran on more than one instance",
    )?;

    let schedule = schedule.as_deref().map(normalize_schedule).transpose()?;
    check(
        schedule.as_deref().is_none_or(is_valid_cron),
        "Cron schedule was not parseable",
    )?;

    check(
        (command.is_some() && executor_data.is_none())
            || (executor_data.is_some() && executor.is_some() && command.is_none()),
        "If not using custom executor, specify a command. If using custom executor, specify executorData OR command.",
    )?;

    let wants_ports = resources.as_ref().is_some_and(|r| r.num_ports > 0);
    check(
        !wants_ports
            || executor.is_none()
            || executor_data.as_ref().is_some_and(serde_json::Value::is_object),
        "Requiring ports requires a custom executor with a json executor data payload OR not using a custom executor",
    )?;

    let instances = instance_count.unwrap_or(1);

    Ok(RequestDefinition {
        id,
        name,
        command,
        executor,
        executor_data,
        resources,
        schedule,
        instances,
        daemon,
        rack_sensitive,
        env,
        uris,
        metadata,
        version,
        timestamp,
    })
}

/// Rewrite a 5-, 6- or 7-field cron into the strict form.
///
/// - no seconds field → `0` is prepended
/// - day-of-week `*` → `?`
/// - otherwise day-of-month → `?`
/// - a trailing year passes through
pub fn normalize_schedule(schedule: &str) -> ValidationResult<String> {
    let invalid = || ValidationError::new(format!("Schedule {schedule} is invalid"));

    let tokens: Vec<&str> = schedule.split_whitespace().collect();
    // 4 tokens pass the minimum check but cannot supply a day-of-week
    if tokens.len() < 5 || tokens.len() > 7 {
        return Err(invalid());
    }

    let (seconds, base, year) = if tokens.len() >= 6 {
        (tokens[0], &tokens[1..6], tokens.get(6).copied())
    } else {
        ("0", &tokens[..5], None)
    };

    let (minute, hour, month) = (base[0], base[1], base[3]);
    let mut day_of_month = base[2];
    let mut day_of_week = base[4];

    if day_of_week == "*" {
        day_of_week = "?";
    } else if day_of_week != "?" {
        day_of_month = "?";
    }

    let mut normalized = vec![seconds, minute, hour, day_of_month, month, day_of_week];
    normalized.extend(year);
    Ok(normalized.join(" "))
}

const DAY_OF_MONTH: usize = 3;
const DAY_OF_WEEK: usize = 5;
const WEEKDAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Check a normalized expression against the strict grammar.
///
/// The `cron` crate covers everything except the Quartz day specifiers
/// (`L`, `L-n`, `nW`, `LW` for day-of-month; `L`, `nL`, `n#k` for
/// day-of-week). Those are checked here and replaced by a plain day before
/// the rest of the expression goes to the parser.
fn is_valid_cron(expression: &str) -> bool {
    let mut fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() < 6 {
        return false;
    }
    if is_quartz_day_of_month(fields[DAY_OF_MONTH]) {
        fields[DAY_OF_MONTH] = "1";
    }
    if is_quartz_day_of_week(fields[DAY_OF_WEEK]) {
        fields[DAY_OF_WEEK] = "1";
    }
    cron::Schedule::from_str(&fields.join(" ")).is_ok()
}

fn in_range(raw: &str, low: u32, high: u32) -> bool {
    raw.parse::<u32>().is_ok_and(|n| (low..=high).contains(&n))
}

fn is_weekday(raw: &str) -> bool {
    in_range(raw, 1, 7) || WEEKDAY_NAMES.contains(&raw.to_ascii_uppercase().as_str())
}

fn is_quartz_day_of_month(field: &str) -> bool {
    if field == "L" || field == "LW" {
        return true;
    }
    if let Some(offset) = field.strip_prefix("L-") {
        return in_range(offset, 1, 30);
    }
    field.strip_suffix('W').is_some_and(|day| in_range(day, 1, 31))
}

fn is_quartz_day_of_week(field: &str) -> bool {
    if field == "L" {
        return true;
    }
    if let Some((day, nth)) = field.split_once('#') {
        return is_weekday(day) && in_range(nth, 1, 5);
    }
    field.strip_suffix('L').is_some_and(is_weekday)
}
