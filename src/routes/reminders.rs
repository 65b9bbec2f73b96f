use crate::{
    api::ApiError,
    models::ReminderUpdate,
    query_cache::QueryKind,
    theme::Theme,
    timezones::timezone_options,
    validation::{validate_phone_number, Field, FieldErrors, FormState, ReminderForm},
    views::{DeleteView, ErrorView, LayoutView, Notice, ReminderFormView},
    AppState,
};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_template::RenderHtml;
use chrono::Local;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FormMode {
    Create,
    Edit(i64),
}

/// Everything the create/edit template needs besides the layout.
struct FormPage {
    mode: FormMode,
    values: ReminderForm,
    errors: FieldErrors,
    form_error: Option<String>,
    phone_interacted: bool,
}

impl FormPage {
    fn new(mode: FormMode, values: ReminderForm) -> Self {
        FormPage {
            mode,
            values,
            errors: FieldErrors::new(),
            form_error: None,
            phone_interacted: false,
        }
    }

    fn submitted(mode: FormMode, values: ReminderForm, errors: FieldErrors) -> Self {
        FormPage {
            errors,
            phone_interacted: true,
            ..FormPage::new(mode, values)
        }
    }

    fn render(self, state: AppState, theme: Theme, status: StatusCode) -> Response {
        let (heading, description, action, submit_label, redirect_to) = match self.mode {
            FormMode::Create => (
                "Create Reminder",
                "Schedule a phone call reminder. We'll call you at the specified time with your message.",
                "/reminders".to_string(),
                "Create Reminder",
                "/reminders/new".to_string(),
            ),
            FormMode::Edit(id) => (
                "Edit Reminder",
                "Update your reminder details.",
                format!("/reminders/{}", id),
                "Update Reminder",
                format!("/reminders/{}/edit", id),
            ),
        };

        let timezones = timezone_options(&state.config.default_timezone, &self.values.timezone);

        let view = ReminderFormView {
            layout: LayoutView::new(heading, theme, redirect_to),
            heading,
            description,
            action,
            submit_label,
            editing: matches!(self.mode, FormMode::Edit(_)),
            values: self.values,
            errors: self.errors,
            form_error: self.form_error,
            timezones,
            min_datetime: Local::now().format("%Y-%m-%dT%H:%M").to_string(),
            phone_interacted: self.phone_interacted,
        };

        (status, RenderHtml("reminder_form", state.engine, view)).into_response()
    }
}

/// Field errors for a full submission, then the soft check against the
/// host's clock. Both run before anything is sent to the API.
fn submission_errors(form: &ReminderForm) -> FieldErrors {
    let mut form_state = FormState::new();
    form_state.submit(form);

    let mut errors = form_state.visible_errors();

    if errors.is_empty() {
        if let Err(message) = form.check_not_past(Local::now().naive_local()) {
            errors.insert(Field::ScheduledAt, message);
        }
    }

    errors
}

fn notice_redirect(notice: Notice) -> Response {
    Redirect::to(&format!("/?notice={}", notice.as_str())).into_response()
}

fn failure_message(err: &ApiError, fallback: &str) -> String {
    err.detail().unwrap_or_else(|| fallback.to_string())
}

pub async fn get_new_reminder(State(state): State<AppState>, theme: Theme) -> impl IntoResponse {
    let form = ReminderForm::blank(
        &state.config.default_timezone,
        &state.config.default_phone_prefix,
    );

    FormPage::new(FormMode::Create, form).render(state, theme, StatusCode::OK)
}

#[axum_macros::debug_handler]
pub async fn post_reminder(
    State(state): State<AppState>,
    theme: Theme,
    Form(form): Form<ReminderForm>,
) -> Response {
    let errors = submission_errors(&form);

    if !errors.is_empty() {
        log::debug!("Rejected new reminder: {:?}", errors);
        return FormPage::submitted(FormMode::Create, form, errors).render(
            state,
            theme,
            StatusCode::UNPROCESSABLE_ENTITY,
        );
    }

    match state.cache.api().create(&form.to_payload()).await {
        Ok(reminder) => {
            log::info!("Created reminder {} for {}", reminder.id, reminder.scheduled_at);

            state.cache.invalidate(QueryKind::Reminders).await;
            state.cache.invalidate(QueryKind::Stats).await;

            notice_redirect(Notice::Created)
        }
        Err(err) => {
            log::error!("Failed to create reminder: {}", err);

            let mut page = FormPage::submitted(FormMode::Create, form, FieldErrors::new());
            page.form_error = Some(failure_message(&err, "Failed to create reminder"));
            page.render(state, theme, StatusCode::BAD_GATEWAY)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub form: ReminderForm,
    #[serde(default)]
    pub blurred: Vec<Field>,
    #[serde(default)]
    pub typing: Option<Field>,
    #[serde(default)]
    pub phone_interacted: bool,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub errors: FieldErrors,
    pub phone_interacted: bool,
    pub phone_formatted: Option<String>,
}

/// On-blur and as-you-type validation for the browser. Returns only the
/// errors the user should currently see.
pub async fn post_validate(Json(request): Json<ValidateRequest>) -> Json<ValidateResponse> {
    let mut form_state = FormState::new().with_phone_interacted(request.phone_interacted);

    for field in &request.blurred {
        form_state.blur(*field, &request.form);
    }

    if let Some(field) = request.typing {
        form_state.input(field, &request.form);
    }

    Json(ValidateResponse {
        errors: form_state.visible_errors(),
        phone_interacted: form_state.phone_interacted(),
        phone_formatted: validate_phone_number(&request.form.phone_number).formatted,
    })
}

pub async fn get_edit_reminder(
    State(state): State<AppState>,
    theme: Theme,
    Path(id): Path<i64>,
) -> Response {
    match state.cache.api().get(id).await {
        Ok(reminder) if reminder.status.is_editable() => {
            FormPage::new(FormMode::Edit(id), ReminderForm::from_reminder(&reminder)).render(
                state,
                theme,
                StatusCode::OK,
            )
        }
        Ok(reminder) => error_page(
            state,
            theme,
            StatusCode::CONFLICT,
            "Reminder can't be edited",
            format!(
                "\"{}\" is {} and can no longer be changed. Only scheduled reminders can be edited.",
                reminder.title,
                reminder.status.label().to_lowercase()
            ),
        ),
        Err(err) => load_failure_page(state, theme, id, err),
    }
}

pub async fn post_update_reminder(
    State(state): State<AppState>,
    theme: Theme,
    Path(id): Path<i64>,
    Form(form): Form<ReminderForm>,
) -> Response {
    let mode = FormMode::Edit(id);
    let errors = submission_errors(&form);

    if !errors.is_empty() {
        log::debug!("Rejected update of reminder {}: {:?}", id, errors);
        return FormPage::submitted(mode, form, errors).render(
            state,
            theme,
            StatusCode::UNPROCESSABLE_ENTITY,
        );
    }

    let update = ReminderUpdate::from(form.to_payload());

    match state.cache.api().update(id, &update).await {
        Ok(_) => {
            log::info!("Updated reminder {}", id);

            // Counts per status don't move when details change.
            state.cache.invalidate(QueryKind::Reminders).await;

            notice_redirect(Notice::Updated)
        }
        Err(err) => {
            log::error!("Failed to update reminder {}: {}", id, err);

            let mut page = FormPage::submitted(mode, form, FieldErrors::new());
            page.form_error = Some(failure_message(&err, "Failed to update reminder"));
            page.render(state, theme, StatusCode::BAD_GATEWAY)
        }
    }
}

pub async fn get_delete_reminder(
    State(state): State<AppState>,
    theme: Theme,
    Path(id): Path<i64>,
) -> Response {
    match state.cache.api().get(id).await {
        Ok(reminder) => RenderHtml(
            "delete_reminder",
            state.engine,
            DeleteView {
                layout: LayoutView::new("Delete Reminder", theme, format!("/reminders/{}/delete", id)),
                id,
                title: reminder.title,
                error: None,
            },
        )
        .into_response(),
        Err(err) => load_failure_page(state, theme, id, err),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    pub title: String,
}

pub async fn post_delete_reminder(
    State(state): State<AppState>,
    theme: Theme,
    Path(id): Path<i64>,
    Form(form): Form<DeleteForm>,
) -> Response {
    match state.cache.api().delete(id).await {
        Ok(()) => {
            log::info!("Deleted reminder {}", id);

            state.cache.invalidate(QueryKind::Reminders).await;
            state.cache.invalidate(QueryKind::Stats).await;

            notice_redirect(Notice::Deleted)
        }
        Err(err) => {
            log::error!("Failed to delete reminder {}: {}", id, err);

            let view = DeleteView {
                layout: LayoutView::new("Delete Reminder", theme, format!("/reminders/{}/delete", id)),
                id,
                title: form.title,
                error: Some(failure_message(&err, "Failed to delete reminder")),
            };

            (
                StatusCode::BAD_GATEWAY,
                RenderHtml("delete_reminder", state.engine, view),
            )
                .into_response()
        }
    }
}

fn load_failure_page(state: AppState, theme: Theme, id: i64, err: ApiError) -> Response {
    if err.is_not_found() {
        log::warn!("Reminder {} not found", id);

        return error_page(
            state,
            theme,
            StatusCode::NOT_FOUND,
            "Reminder not found",
            "It may have already been deleted.".to_string(),
        );
    }

    log::error!("Failed to load reminder {}: {}", id, err);

    error_page(
        state,
        theme,
        StatusCode::BAD_GATEWAY,
        "Failed to load reminder",
        failure_message(&err, "Something went wrong while loading this reminder. Please try again."),
    )
}

fn error_page(
    state: AppState,
    theme: Theme,
    status: StatusCode,
    heading: &str,
    message: String,
) -> Response {
    let view = ErrorView {
        layout: LayoutView::new(heading, theme, "/"),
        heading: heading.to_string(),
        message,
    };

    (status, RenderHtml("error", state.engine, view)).into_response()
}
