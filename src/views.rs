use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    api::ApiError,
    format::{format_date_time, format_error_message, format_relative_time, format_time_remaining, mask_phone_number},
    models::{Reminder, ReminderList, ReminderStats, ReminderStatus, StatusFilter},
    theme::{theme_choices, Theme, ThemeChoice},
    timezones::TimezoneOption,
    validation::{FieldErrors, ReminderForm},
};

pub const PAST_DUE: &str = "Past due";

/// What every page needs for the header and theme switcher.
#[derive(Debug, Serialize)]
pub struct LayoutView {
    pub title: String,
    pub theme: &'static str,
    pub themes: Vec<ThemeChoice>,
    pub redirect_to: String,
}

impl LayoutView {
    pub fn new(title: impl Into<String>, theme: Theme, redirect_to: impl Into<String>) -> Self {
        LayoutView {
            title: title.into(),
            theme: theme.as_str(),
            themes: theme_choices(theme),
            redirect_to: redirect_to.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    Created,
    Updated,
    Deleted,
}

impl Notice {
    pub fn parse(value: &str) -> Option<Notice> {
        match value {
            "created" => Some(Notice::Created),
            "updated" => Some(Notice::Updated),
            "deleted" => Some(Notice::Deleted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Notice::Created => "created",
            Notice::Updated => "updated",
            Notice::Deleted => "deleted",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Notice::Created => "Reminder created successfully!",
            Notice::Updated => "Reminder updated successfully!",
            Notice::Deleted => "Reminder deleted",
        }
    }
}

/// `/`, `/?status=failed`, `/?search=dentist`, ...
pub fn dashboard_href(filter: StatusFilter, search: &str) -> String {
    let mut pairs: Vec<(&str, &str)> = Vec::new();

    if filter != StatusFilter::All {
        pairs.push(("status", filter.as_str()));
    }

    let search = search.trim();
    if !search.is_empty() {
        pairs.push(("search", search));
    }

    match serde_urlencoded::to_string(&pairs) {
        Ok(query) if !query.is_empty() => format!("/?{}", query),
        _ => "/".to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct FilterTab {
    pub value: &'static str,
    pub label: &'static str,
    pub href: String,
    pub active: bool,
}

pub fn filter_tabs(current: StatusFilter, search: &str) -> Vec<FilterTab> {
    [
        (StatusFilter::All, "All"),
        (StatusFilter::Only(ReminderStatus::Scheduled), "Scheduled"),
        (StatusFilter::Only(ReminderStatus::Completed), "Completed"),
        (StatusFilter::Only(ReminderStatus::Failed), "Failed"),
    ]
    .into_iter()
    .map(|(filter, label)| FilterTab {
        value: filter.as_str(),
        label,
        href: dashboard_href(filter, search),
        active: filter == current,
    })
    .collect()
}

#[derive(Debug, Serialize)]
pub struct ReminderCard {
    pub id: i64,
    pub title: String,
    pub masked_phone: String,
    pub message: String,
    pub status: &'static str,
    pub status_label: &'static str,
    pub status_variant: &'static str,
    pub pulse: bool,
    pub scheduled_at: String,
    pub scheduled_display: String,
    pub time_remaining: Option<String>,
    pub past_due: bool,
    pub error: Option<String>,
    pub created: String,
    pub editable: bool,
}

impl ReminderCard {
    pub fn new(reminder: &Reminder, now: DateTime<Utc>) -> Self {
        let scheduled = reminder.status == ReminderStatus::Scheduled;
        let time_remaining =
            scheduled.then(|| format_time_remaining(reminder.scheduled_at, now));
        let past_due = time_remaining.as_deref() == Some(PAST_DUE);

        let error = match (&reminder.status, &reminder.error_message) {
            (ReminderStatus::Failed, Some(message)) if !message.is_empty() => {
                Some(format_error_message(message))
            }
            _ => None,
        };

        ReminderCard {
            id: reminder.id,
            title: reminder.title.clone(),
            masked_phone: mask_phone_number(&reminder.phone_number),
            message: reminder.message.clone(),
            status: reminder.status.as_str(),
            status_label: reminder.status.label(),
            status_variant: reminder.status.variant(),
            pulse: reminder.status.pulses(),
            scheduled_at: reminder.scheduled_at.to_rfc3339(),
            scheduled_display: format_date_time(reminder.scheduled_at, Some(&reminder.timezone)),
            time_remaining,
            past_due,
            error,
            created: format_relative_time(reminder.created_at, now),
            editable: reminder.status.is_editable(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Action {
    pub label: &'static str,
    pub href: String,
}

#[derive(Debug, Serialize)]
pub struct EmptyState {
    pub icon: &'static str,
    pub title: String,
    pub description: String,
    pub action: Option<Action>,
}

impl EmptyState {
    /// Which empty state to show depends on why the list came back empty.
    pub fn for_filters(filter: StatusFilter, search: &str) -> Self {
        let search = search.trim();
        let create = |label| {
            Some(Action {
                label,
                href: "/reminders/new".to_string(),
            })
        };

        if !search.is_empty() {
            return EmptyState {
                icon: "search",
                title: "No results found".to_string(),
                description: format!(
                    "No reminders matching \"{}\". Try adjusting your search or create a new reminder.",
                    search
                ),
                action: create("Create Reminder"),
            };
        }

        if let Some(status) = filter.status() {
            let label = status_phrase(status);

            return EmptyState {
                icon: "bell",
                title: format!("No {} reminders", label),
                description: format!("You don't have any {} reminders yet.", label),
                action: if status == ReminderStatus::Scheduled {
                    create("Create Your First Reminder")
                } else {
                    None
                },
            };
        }

        EmptyState {
            icon: "bell",
            title: "No reminders yet".to_string(),
            description: "Create your first reminder and never miss an important moment again. We'll call you when it's time!".to_string(),
            action: create("Create Your First Reminder"),
        }
    }

    pub fn load_failed(retry_href: String) -> Self {
        EmptyState {
            icon: "alert",
            title: "Failed to load reminders".to_string(),
            description: "Something went wrong while loading your reminders. Please try again."
                .to_string(),
            action: Some(Action {
                label: "Try Again",
                href: retry_href,
            }),
        }
    }
}

fn status_phrase(status: ReminderStatus) -> &'static str {
    match status {
        ReminderStatus::Scheduled => "scheduled",
        ReminderStatus::InProgress => "in progress",
        ReminderStatus::Completed => "completed",
        ReminderStatus::Failed => "failed",
    }
}

#[derive(Debug, Serialize)]
pub struct ReminderListView {
    pub cards: Vec<ReminderCard>,
    pub empty: Option<EmptyState>,
    pub failed: bool,
}

impl ReminderListView {
    pub fn new(
        result: &Result<ReminderList, ApiError>,
        filter: StatusFilter,
        search: &str,
        now: DateTime<Utc>,
    ) -> Self {
        match result {
            Ok(list) if list.items.is_empty() => ReminderListView {
                cards: Vec::new(),
                empty: Some(EmptyState::for_filters(filter, search)),
                failed: false,
            },
            Ok(list) => ReminderListView {
                cards: list
                    .items
                    .iter()
                    .map(|reminder| ReminderCard::new(reminder, now))
                    .collect(),
                empty: None,
                failed: false,
            },
            Err(_) => ReminderListView {
                cards: Vec::new(),
                empty: Some(EmptyState::load_failed(dashboard_href(filter, search))),
                failed: true,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatCard {
    pub label: &'static str,
    pub value: u64,
    pub variant: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatsView {
    pub cards: Vec<StatCard>,
}

impl StatsView {
    pub fn new(stats: &ReminderStats) -> Self {
        StatsView {
            cards: vec![
                StatCard {
                    label: "Total",
                    value: stats.total,
                    variant: "neutral",
                },
                StatCard {
                    label: "Scheduled",
                    value: stats.scheduled,
                    variant: "primary",
                },
                StatCard {
                    label: "Completed",
                    value: stats.completed,
                    variant: "success",
                },
                StatCard {
                    label: "Failed",
                    value: stats.failed,
                    variant: "danger",
                },
            ],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub layout: LayoutView,
    pub notice: Option<&'static str>,
    pub stats: Option<StatsView>,
    pub list: ReminderListView,
    pub tabs: Vec<FilterTab>,
    pub status: &'static str,
    pub search: String,
    pub live_url: String,
}

#[derive(Debug, Serialize)]
pub struct ReminderFormView {
    pub layout: LayoutView,
    pub heading: &'static str,
    pub description: &'static str,
    pub action: String,
    pub submit_label: &'static str,
    pub editing: bool,
    pub values: ReminderForm,
    pub errors: FieldErrors,
    pub form_error: Option<String>,
    pub timezones: Vec<TimezoneOption>,
    pub min_datetime: String,
    pub phone_interacted: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteView {
    pub layout: LayoutView,
    pub id: i64,
    pub title: String,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorView {
    pub layout: LayoutView,
    pub heading: String,
    pub message: String,
}
