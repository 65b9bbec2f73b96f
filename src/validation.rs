use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    format::{format_datetime_for_api, to_local_datetime_string},
    models::{Reminder, ReminderCreate},
    timezones::is_known_timezone,
};

const MAX_TITLE_LENGTH: usize = 255;
const MAX_MESSAGE_LENGTH: usize = 1000;
const INPUT_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];
const INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Digits beyond a pre-filled country code that count as the user typing a number.
const PHONE_INTERACTION_DIGITS: usize = 3;

pub const PAST_DATE_MESSAGE: &str = "Please select a future date and time";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Message,
    PhoneNumber,
    ScheduledAt,
    Timezone,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Title,
        Field::Message,
        Field::PhoneNumber,
        Field::ScheduledAt,
        Field::Timezone,
    ];
}

pub type FieldErrors = BTreeMap<Field, String>;

/// Raw values of the create/edit form, exactly as the browser posts them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReminderForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub scheduled_at: String,
    #[serde(default)]
    pub timezone: String,
}

impl ReminderForm {
    /// An empty form with the phone field pre-filled with a country prefix.
    pub fn blank(default_timezone: &str, phone_prefix: &str) -> Self {
        ReminderForm {
            phone_number: phone_prefix.to_string(),
            timezone: default_timezone.to_string(),
            ..Default::default()
        }
    }

    /// The edit form shows the scheduled time on the wall clock of the
    /// reminder's own zone, which is the zone it is submitted with.
    pub fn from_reminder(reminder: &Reminder) -> Self {
        ReminderForm {
            title: reminder.title.clone(),
            message: reminder.message.clone(),
            phone_number: reminder.phone_number.clone(),
            scheduled_at: to_local_datetime_string(reminder.scheduled_at, &reminder.timezone),
            timezone: reminder.timezone.clone(),
        }
    }

    pub fn validate_field(&self, field: Field) -> Result<(), String> {
        match field {
            Field::Title => check_length(&self.title, MAX_TITLE_LENGTH, "Title"),
            Field::Message => check_length(&self.message, MAX_MESSAGE_LENGTH, "Message"),
            Field::PhoneNumber => {
                if self.phone_number.is_empty() {
                    Err("Phone number is required".to_string())
                } else if !validate_phone_number(&self.phone_number).is_valid {
                    Err("Please enter a valid phone number".to_string())
                } else {
                    Ok(())
                }
            }
            Field::ScheduledAt => {
                if self.scheduled_at.is_empty() {
                    Err("Date and time is required".to_string())
                } else if self.scheduled_at().is_none() {
                    Err("Please enter a valid date and time".to_string())
                } else {
                    Ok(())
                }
            }
            Field::Timezone => {
                if self.timezone.is_empty() {
                    Err("Timezone is required".to_string())
                } else if !is_known_timezone(&self.timezone) {
                    Err("Please choose a valid timezone".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }

    pub fn validate(&self) -> FieldErrors {
        Field::ALL
            .into_iter()
            .filter_map(|field| self.validate_field(field).err().map(|error| (field, error)))
            .collect()
    }

    pub fn scheduled_at(&self) -> Option<NaiveDateTime> {
        INPUT_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(&self.scheduled_at, format).ok())
    }

    /// Rejects wall-clock times that are already behind `now`.
    ///
    /// Both sides are naive: the entered time is read in the host's zone, not
    /// the reminder's, so this can disagree with the backend near zone
    /// boundaries. The backend's timezone-aware check is the one that counts.
    pub fn check_not_past(&self, now: NaiveDateTime) -> Result<(), String> {
        match self.scheduled_at() {
            Some(scheduled_at) if scheduled_at < now => Err(PAST_DATE_MESSAGE.to_string()),
            _ => Ok(()),
        }
    }

    /// Request body for the API. Call after `validate` came back empty.
    pub fn to_payload(&self) -> ReminderCreate {
        let scheduled_at = match self.scheduled_at() {
            Some(parsed) => format_datetime_for_api(&parsed.format(INPUT_FORMAT).to_string()),
            None => format_datetime_for_api(&self.scheduled_at),
        };

        ReminderCreate {
            title: self.title.clone(),
            message: self.message.clone(),
            phone_number: self.phone_number.clone(),
            scheduled_at,
            timezone: self.timezone.clone(),
        }
    }
}

fn check_length(value: &str, max: usize, name: &str) -> Result<(), String> {
    let length = value.chars().count();

    if length == 0 {
        Err(format!("{} is required", name))
    } else if length > max {
        Err(format!("{} is too long", name))
    } else {
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PhoneValidation {
    pub is_valid: bool,
    pub formatted: Option<String>,
}

/// Checks a number against the numbering plan of the country its prefix
/// names. Says nothing about whether the line can actually take calls.
pub fn validate_phone_number(phone: &str) -> PhoneValidation {
    if phone.len() < 4 {
        return PhoneValidation::default();
    }

    match phonenumber::parse(None, phone) {
        Ok(number) if phonenumber::is_valid(&number) => PhoneValidation {
            is_valid: true,
            formatted: Some(
                number
                    .format()
                    .mode(phonenumber::Mode::International)
                    .to_string(),
            ),
        },
        Ok(_) => PhoneValidation::default(),
        Err(err) => {
            log::trace!("Unparseable phone number {:?}: {}", phone, err);
            PhoneValidation::default()
        }
    }
}

pub fn has_typed_digits(phone: &str) -> bool {
    phone.chars().filter(char::is_ascii_digit).count() > PHONE_INTERACTION_DIGITS
}

/// Where a field stands in on-blur validation. While the browser waits for
/// `/reminders/validate` it shows the field as validating.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FieldState {
    #[default]
    Idle,
    Valid,
    Invalid(String),
}

/// On-blur validation state of one form.
///
/// A freshly opened form has the phone field pre-filled with just a country
/// prefix; its error is held back until the user types a number or leaves the
/// field, so the form doesn't open with a red phone input.
#[derive(Clone, Debug, Default)]
pub struct FormState {
    fields: BTreeMap<Field, FieldState>,
    phone_interacted: bool,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_phone_interacted(mut self, interacted: bool) -> Self {
        self.phone_interacted = interacted;
        self
    }

    pub fn phone_interacted(&self) -> bool {
        self.phone_interacted
    }

    /// A keystroke. Only the phone field validates while typing, and only
    /// once it has been interacted with.
    pub fn input(&mut self, field: Field, form: &ReminderForm) {
        if field != Field::PhoneNumber {
            return;
        }

        if has_typed_digits(&form.phone_number) {
            self.phone_interacted = true;
        }

        if self.phone_interacted {
            self.resolve(field, form);
        }
    }

    pub fn blur(&mut self, field: Field, form: &ReminderForm) {
        if field == Field::PhoneNumber {
            self.phone_interacted = true;
        }

        self.resolve(field, form);
    }

    /// Submitting counts as interacting with every field.
    pub fn submit(&mut self, form: &ReminderForm) -> bool {
        self.phone_interacted = true;

        for field in Field::ALL {
            self.resolve(field, form);
        }

        self.fields
            .values()
            .all(|state| *state == FieldState::Valid)
    }

    pub fn state(&self, field: Field) -> &FieldState {
        static IDLE: FieldState = FieldState::Idle;
        self.fields.get(&field).unwrap_or(&IDLE)
    }

    pub fn visible_error(&self, field: Field) -> Option<&str> {
        if field == Field::PhoneNumber && !self.phone_interacted {
            return None;
        }

        match self.state(field) {
            FieldState::Invalid(message) => Some(message),
            _ => None,
        }
    }

    pub fn visible_errors(&self) -> FieldErrors {
        Field::ALL
            .into_iter()
            .filter_map(|field| {
                self.visible_error(field)
                    .map(|message| (field, message.to_string()))
            })
            .collect()
    }

    fn resolve(&mut self, field: Field, form: &ReminderForm) {
        let state = match form.validate_field(field) {
            Ok(()) => FieldState::Valid,
            Err(message) => FieldState::Invalid(message),
        };

        self.fields.insert(field, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn valid_form() -> ReminderForm {
        ReminderForm {
            title: "Call mom".to_string(),
            message: "Don't forget her birthday".to_string(),
            phone_number: "+14155552671".to_string(),
            scheduled_at: "2030-01-05T15:04".to_string(),
            timezone: "America/New_York".to_string(),
        }
    }

    fn noon(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn valid_form_has_no_errors() {
        assert!(valid_form().validate().is_empty());
    }

    #[test]
    fn required_fields_report_their_messages() {
        let errors = ReminderForm::default().validate();

        assert_eq!(errors[&Field::Title], "Title is required");
        assert_eq!(errors[&Field::Message], "Message is required");
        assert_eq!(errors[&Field::PhoneNumber], "Phone number is required");
        assert_eq!(errors[&Field::ScheduledAt], "Date and time is required");
        assert_eq!(errors[&Field::Timezone], "Timezone is required");
    }

    #[test]
    fn length_limits() {
        let form = ReminderForm {
            title: "t".repeat(256),
            message: "m".repeat(1001),
            ..valid_form()
        };
        let errors = form.validate();

        assert_eq!(errors[&Field::Title], "Title is too long");
        assert_eq!(errors[&Field::Message], "Message is too long");

        let form = ReminderForm {
            title: "é".repeat(255),
            message: "m".repeat(1000),
            ..valid_form()
        };
        assert!(form.validate().is_empty());
    }

    #[test]
    fn phone_numbers_are_checked_against_the_numbering_plan() {
        assert!(validate_phone_number("+14155552671").is_valid);
        assert!(validate_phone_number("+442071838750").is_valid);
        assert!(!validate_phone_number("+1").is_valid);
        assert!(!validate_phone_number("+1415").is_valid);
        assert!(!validate_phone_number("call me maybe").is_valid);
        assert_eq!(validate_phone_number("+1415"), PhoneValidation::default());
        assert!(validate_phone_number("+14155552671")
            .formatted
            .unwrap()
            .starts_with("+1 415"));

        let form = ReminderForm {
            phone_number: "+1415".to_string(),
            ..valid_form()
        };
        assert_eq!(
            form.validate()[&Field::PhoneNumber],
            "Please enter a valid phone number"
        );
    }

    #[test]
    fn unknown_timezone_and_bad_datetime_are_rejected() {
        let form = ReminderForm {
            scheduled_at: "tomorrow at noon".to_string(),
            timezone: "Eastern".to_string(),
            ..valid_form()
        };
        let errors = form.validate();

        assert_eq!(errors[&Field::ScheduledAt], "Please enter a valid date and time");
        assert_eq!(errors[&Field::Timezone], "Please choose a valid timezone");
    }

    #[test]
    fn past_times_are_rejected_against_local_now() {
        let form = valid_form();

        assert_eq!(
            form.check_not_past(noon(2031, 1, 1)),
            Err(PAST_DATE_MESSAGE.to_string())
        );
        assert_eq!(form.check_not_past(noon(2029, 1, 1)), Ok(()));
    }

    #[test]
    fn payload_sends_seconds_and_zone_unchanged() {
        let payload = valid_form().to_payload();

        assert_eq!(payload.scheduled_at, "2030-01-05T15:04:00");
        assert_eq!(payload.timezone, "America/New_York");

        let with_seconds = ReminderForm {
            scheduled_at: "2030-01-05T15:04:30".to_string(),
            ..valid_form()
        };
        assert_eq!(with_seconds.to_payload().scheduled_at, "2030-01-05T15:04:00");
    }

    #[test]
    fn prefilled_phone_error_is_suppressed_until_interaction() {
        let form = ReminderForm {
            phone_number: "+1".to_string(),
            ..valid_form()
        };
        let mut state = FormState::new();

        state.input(Field::PhoneNumber, &form);
        assert_eq!(*state.state(Field::PhoneNumber), FieldState::Idle);
        assert_eq!(state.visible_error(Field::PhoneNumber), None);

        state.blur(Field::PhoneNumber, &form);
        assert!(state.phone_interacted());
        assert_eq!(
            state.visible_error(Field::PhoneNumber),
            Some("Please enter a valid phone number")
        );
    }

    #[test]
    fn typing_more_than_three_digits_counts_as_interaction() {
        let mut state = FormState::new();

        let form = ReminderForm {
            phone_number: "+141".to_string(),
            ..valid_form()
        };
        state.input(Field::PhoneNumber, &form);
        assert!(!state.phone_interacted());

        let form = ReminderForm {
            phone_number: "+1415".to_string(),
            ..valid_form()
        };
        state.input(Field::PhoneNumber, &form);
        assert!(state.phone_interacted());
        assert_eq!(
            state.visible_error(Field::PhoneNumber),
            Some("Please enter a valid phone number")
        );

        let form = valid_form();
        state.input(Field::PhoneNumber, &form);
        assert_eq!(*state.state(Field::PhoneNumber), FieldState::Valid);
    }

    #[test]
    fn blur_validates_other_fields_without_revealing_phone() {
        let form = ReminderForm {
            title: String::new(),
            phone_number: "+1".to_string(),
            ..valid_form()
        };
        let mut state = FormState::new();

        state.blur(Field::Title, &form);

        assert_eq!(
            state.visible_errors().into_iter().collect::<Vec<_>>(),
            vec![(Field::Title, "Title is required".to_string())]
        );
    }

    #[test]
    fn submit_validates_everything() {
        let mut state = FormState::new();
        assert!(state.submit(&valid_form()));

        let mut state = FormState::new();
        let form = ReminderForm {
            phone_number: "+1".to_string(),
            ..valid_form()
        };
        assert!(!state.submit(&form));
        assert!(state.visible_error(Field::PhoneNumber).is_some());
    }
}
