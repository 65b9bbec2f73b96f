use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Scheduled,
    InProgress,
    Completed,
    Failed,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Scheduled => "scheduled",
            ReminderStatus::InProgress => "in_progress",
            ReminderStatus::Completed => "completed",
            ReminderStatus::Failed => "failed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReminderStatus::Scheduled => "Scheduled",
            ReminderStatus::InProgress => "In Progress",
            ReminderStatus::Completed => "Completed",
            ReminderStatus::Failed => "Failed",
        }
    }

    /// Badge colour used by the card template.
    pub fn variant(&self) -> &'static str {
        match self {
            ReminderStatus::Scheduled => "primary",
            ReminderStatus::InProgress => "warning",
            ReminderStatus::Completed => "success",
            ReminderStatus::Failed => "danger",
        }
    }

    pub fn pulses(&self) -> bool {
        matches!(self, ReminderStatus::Scheduled | ReminderStatus::InProgress)
    }

    /// Only reminders that have not been picked up by the backend can be edited.
    pub fn is_editable(&self) -> bool {
        *self == ReminderStatus::Scheduled
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(ReminderStatus::Scheduled),
            "in_progress" => Ok(ReminderStatus::InProgress),
            "completed" => Ok(ReminderStatus::Completed),
            "failed" => Ok(ReminderStatus::Failed),
            other => Err(format!("unknown reminder status: {}", other)),
        }
    }
}

/// The dashboard's status tab: every reminder, or a single status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ReminderStatus),
}

impl StatusFilter {
    /// Unknown or empty values fall back to `All`.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(value) => value
                .parse::<ReminderStatus>()
                .map(StatusFilter::Only)
                .unwrap_or(StatusFilter::All),
            None => StatusFilter::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Only(status) => status.as_str(),
        }
    }

    pub fn status(&self) -> Option<ReminderStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Only(status) => Some(*status),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub title: String,
    pub message: String,
    pub phone_number: String,
    #[serde(deserialize_with = "deserialize_instant")]
    pub scheduled_at: DateTime<Utc>,
    pub timezone: String,
    pub status: ReminderStatus,
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(deserialize_with = "deserialize_instant")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_optional_instant")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReminderList {
    pub items: Vec<Reminder>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderStats {
    pub total: u64,
    pub scheduled: u64,
    pub completed: u64,
    pub failed: u64,
    pub in_progress: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReminderCreate {
    pub title: String,
    pub message: String,
    pub phone_number: String,
    pub scheduled_at: String,
    pub timezone: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReminderUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl From<ReminderCreate> for ReminderUpdate {
    fn from(create: ReminderCreate) -> Self {
        ReminderUpdate {
            title: Some(create.title),
            message: Some(create.message),
            phone_number: Some(create.phone_number),
            scheduled_at: Some(create.scheduled_at),
            timezone: Some(create.timezone),
        }
    }
}

/// Query parameters of `GET /api/reminders`. Unset values are not sent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReminderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl ListParams {
    pub const DASHBOARD_PAGE_SIZE: u32 = 50;

    pub fn for_dashboard(filter: StatusFilter, search: &str) -> Self {
        let search = search.trim();

        ListParams {
            status: filter.status(),
            search: (!search.is_empty()).then(|| search.to_string()),
            page: None,
            page_size: Some(Self::DASHBOARD_PAGE_SIZE),
        }
    }
}

// The backend emits `2030-01-05T15:04:00Z`; older rows can come back naive, which are UTC.
fn parse_instant(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(instant) => Ok(instant.with_timezone(&Utc)),
        Err(rfc3339_error) => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| rfc3339_error),
    }
}

fn deserialize_instant<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_instant(&value).map_err(serde::de::Error::custom)
}

fn deserialize_optional_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(value) => parse_instant(&value)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}
