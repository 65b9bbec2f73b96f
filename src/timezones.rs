use chrono_tz::Tz;
use serde::Serialize;

const TIMEZONE_LABELS: &[(&str, &str)] = &[
    ("America/New_York", "Eastern Time (ET)"),
    ("America/Chicago", "Central Time (CT)"),
    ("America/Denver", "Mountain Time (MT)"),
    ("America/Los_Angeles", "Pacific Time (PT)"),
    ("America/Anchorage", "Alaska Time (AKT)"),
    ("Pacific/Honolulu", "Hawaii Time (HT)"),
    ("Europe/London", "London (GMT/BST)"),
    ("Europe/Paris", "Paris (CET/CEST)"),
    ("Europe/Berlin", "Berlin (CET/CEST)"),
    ("Europe/Madrid", "Madrid (CET/CEST)"),
    ("Europe/Rome", "Rome (CET/CEST)"),
    ("Europe/Amsterdam", "Amsterdam (CET/CEST)"),
    ("Europe/Brussels", "Brussels (CET/CEST)"),
    ("Europe/Zurich", "Zurich (CET/CEST)"),
    ("Europe/Vienna", "Vienna (CET/CEST)"),
    ("Europe/Warsaw", "Warsaw (CET/CEST)"),
    ("Europe/Stockholm", "Stockholm (CET/CEST)"),
    ("Europe/Oslo", "Oslo (CET/CEST)"),
    ("Europe/Copenhagen", "Copenhagen (CET/CEST)"),
    ("Europe/Helsinki", "Helsinki (EET/EEST)"),
    ("Europe/Athens", "Athens (EET/EEST)"),
    ("Europe/Istanbul", "Istanbul (TRT)"),
    ("Europe/Moscow", "Moscow (MSK)"),
    ("Asia/Tokyo", "Tokyo (JST)"),
    ("Asia/Shanghai", "Shanghai (CST)"),
    ("Asia/Hong_Kong", "Hong Kong (HKT)"),
    ("Asia/Singapore", "Singapore (SGT)"),
    ("Asia/Dubai", "Dubai (GST)"),
    ("Asia/Kolkata", "India (IST)"),
    ("Asia/Bangkok", "Bangkok (ICT)"),
    ("Asia/Seoul", "Seoul (KST)"),
    ("Australia/Sydney", "Sydney (AEDT/AEST)"),
    ("Australia/Melbourne", "Melbourne (AEDT/AEST)"),
    ("Australia/Perth", "Perth (AWST)"),
    ("Pacific/Auckland", "Auckland (NZDT/NZST)"),
    ("Africa/Cairo", "Cairo (EET)"),
    ("Africa/Johannesburg", "Johannesburg (SAST)"),
    ("Africa/Lagos", "Lagos (WAT)"),
    ("Africa/Tunis", "Tunis (CET)"),
    ("America/Toronto", "Toronto (ET)"),
    ("America/Vancouver", "Vancouver (PT)"),
    ("America/Mexico_City", "Mexico City (CST)"),
    ("America/Sao_Paulo", "São Paulo (BRT)"),
    ("America/Buenos_Aires", "Buenos Aires (ART)"),
    ("UTC", "UTC"),
];

const COMMON_TIMEZONES: &[&str] = &[
    "America/New_York",
    "America/Chicago",
    "America/Denver",
    "America/Los_Angeles",
    "America/Anchorage",
    "Pacific/Honolulu",
    "Europe/London",
    "Europe/Paris",
    "Europe/Berlin",
    "Asia/Tokyo",
    "Asia/Shanghai",
    "Asia/Singapore",
    "Asia/Dubai",
    "Australia/Sydney",
    "UTC",
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TimezoneOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

pub fn is_known_timezone(name: &str) -> bool {
    name.parse::<Tz>().is_ok()
}

/// `Eastern Time (ET)` for well-known zones, `America / Port of Spain` otherwise.
pub fn timezone_label(name: &str) -> String {
    TIMEZONE_LABELS
        .iter()
        .find(|(zone, _)| *zone == name)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| name.replace('_', " ").replace('/', " / "))
}

/// Options for the timezone select. The detected zone is listed first when
/// it isn't one of the common ones, and so is a `selected` zone that would
/// otherwise be missing from the list.
pub fn timezone_options(detected: &str, selected: &str) -> Vec<TimezoneOption> {
    let mut zones: Vec<&str> = COMMON_TIMEZONES.to_vec();

    if !zones.contains(&detected) {
        zones.insert(0, detected);
    }

    if !selected.is_empty() && !zones.contains(&selected) {
        zones.insert(0, selected);
    }

    zones
        .into_iter()
        .map(|zone| {
            let label = if zone == detected {
                format!("{} (Detected)", timezone_label(zone))
            } else {
                timezone_label(zone)
            };

            TimezoneOption {
                value: zone.to_string(),
                label,
                selected: zone == selected,
            }
        })
        .collect()
}
