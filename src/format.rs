use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const DISPLAY_FORMAT: &str = "%b %-d, %Y at %-I:%M %p";
const DATETIME_LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M";
const MAX_ERROR_MESSAGE_LENGTH: usize = 200;
const MASK_CHARACTER: char = '•';

const MINUTES_IN_DAY: i64 = 1440;
const MINUTES_IN_MONTH: i64 = 43200;
const MINUTES_IN_TWO_MONTHS: i64 = 86400;

/// Formats an instant as `Jan 5, 2030 at 3:04 PM` in `timezone`, or in UTC
/// when no zone is given or the zone is unknown.
pub fn format_date_time(instant: DateTime<Utc>, timezone: Option<&str>) -> String {
    match timezone.and_then(|name| name.parse::<Tz>().ok()) {
        Some(tz) => instant.with_timezone(&tz).format(DISPLAY_FORMAT).to_string(),
        None => {
            if let Some(name) = timezone {
                log::debug!("Unknown timezone {}, formatting in UTC", name);
            }
            instant.format(DISPLAY_FORMAT).to_string()
        }
    }
}

pub fn format_time_remaining(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if target < now {
        return "Past due".to_string();
    }

    let minutes_remaining = (target - now).num_minutes();

    if minutes_remaining < 1 {
        return "Less than a minute".to_string();
    }

    if minutes_remaining < 60 {
        return format!("{} {}", minutes_remaining, plural(minutes_remaining, "minute"));
    }

    format_distance(target - now)
}

/// `3 minutes ago`, `in about 2 hours`.
pub fn format_relative_time(instant: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if instant <= now {
        format!("{} ago", format_distance(now - instant))
    } else {
        format!("in {}", format_distance(instant - now))
    }
}

/// Human distance between two instants, bucketed like calendar apps do:
/// minutes, then "about N hours", days, months, and years.
pub fn format_distance(distance: Duration) -> String {
    let seconds = distance.num_seconds().abs();
    let minutes = (seconds as f64 / 60.0).round() as i64;

    if minutes < 1 {
        return "less than a minute".to_string();
    }

    if minutes < 45 {
        return format!("{} {}", minutes, plural(minutes, "minute"));
    }

    if minutes < 90 {
        return "about 1 hour".to_string();
    }

    if minutes < MINUTES_IN_DAY {
        let hours = (minutes as f64 / 60.0).round() as i64;
        return format!("about {} hours", hours);
    }

    if minutes < 2520 {
        return "1 day".to_string();
    }

    if minutes < MINUTES_IN_MONTH {
        let days = (minutes as f64 / MINUTES_IN_DAY as f64).round() as i64;
        return format!("{} days", days);
    }

    if minutes < MINUTES_IN_TWO_MONTHS {
        let months = (minutes as f64 / MINUTES_IN_MONTH as f64).round() as i64;
        return format!("about {} {}", months, plural(months, "month"));
    }

    let whole_months = minutes / MINUTES_IN_MONTH;

    if whole_months < 12 {
        let months = (minutes as f64 / MINUTES_IN_MONTH as f64).round() as i64;
        return format!("{} months", months);
    }

    let years = whole_months / 12;
    let months_into_year = whole_months % 12;

    if months_into_year < 3 {
        format!("about {} {}", years, plural(years, "year"))
    } else if months_into_year < 9 {
        format!("over {} {}", years, plural(years, "year"))
    } else {
        format!("almost {} years", years + 1)
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        unit.to_string()
    } else {
        format!("{}s", unit)
    }
}

/// Hides every digit except the last four, keeping the length intact.
pub fn mask_phone_number(phone: &str) -> String {
    let length = phone.chars().count();

    if length <= 4 {
        return phone.to_string();
    }

    phone
        .chars()
        .enumerate()
        .map(|(index, c)| {
            if index < length - 4 && c.is_ascii_digit() {
                MASK_CHARACTER
            } else {
                c
            }
        })
        .collect()
}

pub fn is_valid_e164(phone: &str) -> bool {
    static E164: OnceLock<Regex> = OnceLock::new();

    E164.get_or_init(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("E.164 pattern is valid"))
        .is_match(phone)
}

/// The `datetime-local` input value for `instant` as seen in `timezone`.
pub fn to_local_datetime_string(instant: DateTime<Utc>, timezone: &str) -> String {
    match timezone.parse::<Tz>() {
        Ok(tz) => instant
            .with_timezone(&tz)
            .format(DATETIME_LOCAL_FORMAT)
            .to_string(),
        Err(_) => instant.format(DATETIME_LOCAL_FORMAT).to_string(),
    }
}

/// `datetime-local` gives minutes precision; the API wants seconds. The zone
/// travels separately and is applied by the backend.
pub fn format_datetime_for_api(date_time: &str) -> String {
    format!("{}:00", date_time)
}

/// Turns a raw call-provider failure into something readable on a card.
///
/// Provider errors usually look like
/// `Vapi API error: 400 - {"statusCode":400,"message":"...","error":"..."}`.
pub fn format_error_message(raw: &str) -> String {
    static EMBEDDED_JSON: OnceLock<Regex> = OnceLock::new();
    static ERROR_PREFIX: OnceLock<Regex> = OnceLock::new();
    static PROVIDER_PREFIX: OnceLock<Regex> = OnceLock::new();

    if raw.is_empty() {
        return "An unknown error occurred".to_string();
    }

    let embedded_json =
        EMBEDDED_JSON.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("JSON pattern is valid"));

    if let Some(json) = embedded_json.find(raw) {
        if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(json.as_str()) {
            for key in ["message", "error"] {
                if let Some(text) = fields.get(key).and_then(readable_field) {
                    return text;
                }
            }
        }
    }

    let error_prefix = ERROR_PREFIX
        .get_or_init(|| Regex::new(r"(?i)^Error:\s*").expect("error prefix pattern is valid"));
    let provider_prefix = PROVIDER_PREFIX.get_or_init(|| {
        Regex::new(r"(?i)^Vapi API error:\s*\d+\s*-?\s*").expect("provider prefix pattern is valid")
    });

    let cleaned = error_prefix.replace(raw, "");
    let cleaned = provider_prefix.replace(&cleaned, "").to_string();

    if cleaned.contains('{') && cleaned.contains('}') {
        let before_json = cleaned.split('{').next().unwrap_or("").trim();
        if !before_json.is_empty() {
            return before_json.to_string();
        }
    }

    if cleaned.chars().count() > MAX_ERROR_MESSAGE_LENGTH {
        let truncated: String = cleaned.chars().take(MAX_ERROR_MESSAGE_LENGTH).collect();
        return format!("{}...", truncated);
    }

    if cleaned.is_empty() {
        return "An error occurred while making the call".to_string();
    }

    cleaned
}

// Mirrors JavaScript truthiness for the fields providers put messages in.
fn readable_field(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Array(parts) if !parts.is_empty() => Some(
            parts
                .iter()
                .map(|part| match part {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}
