use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::models::{
    ListParams, Reminder, ReminderCreate, ReminderList, ReminderStats, ReminderUpdate,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unable to build reminders API URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Reminders API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Reminders API responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unable to decode reminders API response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The server's own explanation, when the error body carries one.
    ///
    /// FastAPI-style bodies put either a string or a list of validation
    /// entries under `detail`; for the latter the `msg` fields are joined.
    pub fn detail(&self) -> Option<String> {
        let ApiError::Status { body, .. } = self else {
            return None;
        };

        let parsed: Value = serde_json::from_str(body).ok()?;

        match parsed.get("detail")? {
            Value::String(detail) if !detail.trim().is_empty() => Some(detail.clone()),
            Value::Array(entries) => {
                let messages: Vec<&str> = entries
                    .iter()
                    .filter_map(|entry| entry.get("msg").and_then(Value::as_str))
                    .collect();

                (!messages.is_empty()).then(|| messages.join("; "))
            }
            _ => None,
        }
    }
}

/// Typed client for the remote reminders service.
#[derive(Clone, Debug)]
pub struct RemindersApi {
    client: Client,
    base: Url,
}

impl RemindersApi {
    pub fn new(base: Url) -> Self {
        RemindersApi {
            client: Client::new(),
            base,
        }
    }

    pub async fn list(&self, params: &ListParams) -> Result<ReminderList, ApiError> {
        let request = self
            .request(Method::GET, "api/reminders")?
            .query(params);
        self.send_json(request).await
    }

    pub async fn get(&self, id: i64) -> Result<Reminder, ApiError> {
        let request = self.request(Method::GET, &format!("api/reminders/{}", id))?;
        self.send_json(request).await
    }

    pub async fn create(&self, payload: &ReminderCreate) -> Result<Reminder, ApiError> {
        let request = self.request(Method::POST, "api/reminders")?.json(payload);
        self.send_json(request).await
    }

    pub async fn update(&self, id: i64, payload: &ReminderUpdate) -> Result<Reminder, ApiError> {
        let request = self
            .request(Method::PUT, &format!("api/reminders/{}", id))?
            .json(payload);
        self.send_json(request).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, &format!("api/reminders/{}", id))?;
        self.send(request).await.map(|_| ())
    }

    pub async fn stats(&self) -> Result<ReminderStats, ApiError> {
        let request = self.request(Method::GET, "api/stats")?;
        self.send_json(request).await
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(path)?;
        log::trace!("{} {}", method, url);
        Ok(self.client.request(method, url))
    }

    // A base of `https://host/prefix` must resolve to `https://host/prefix/api/...`.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let mut base = self.base.clone();

        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }

        Ok(base.join(path)?)
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            log::warn!("Reminders API responded with {}: {}", status, body);
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send(request).await?;

        serde_json::from_str(&body).map_err(|err| {
            log::error!("Error parsing reminders API response: {}", err);
            log::error!("Response: {}", body);
            ApiError::Decode(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReminderStatus, StatusFilter};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reminder_json(id: i64, status: &str) -> Value {
        json!({
            "id": id,
            "title": "Take medication",
            "message": "Two pills with water",
            "phone_number": "+14155552671",
            "scheduled_at": "2030-01-05T15:04:00Z",
            "timezone": "America/New_York",
            "status": status,
            "call_id": null,
            "error_message": null,
            "created_at": "2029-12-31T08:00:00Z",
            "updated_at": null
        })
    }

    #[tokio::test]
    async fn list_omits_unset_filters() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/reminders"))
            .and(query_param("page_size", "50"))
            .and(query_param_is_missing("status"))
            .and(query_param_is_missing("search"))
            .and(query_param_is_missing("page"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [reminder_json(1, "scheduled")],
                "total": 1,
                "page": 1,
                "page_size": 50,
                "total_pages": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = RemindersApi::new(Url::parse(&server.uri()).unwrap());
        let list = api
            .list(&ListParams::for_dashboard(StatusFilter::All, ""))
            .await
            .unwrap();

        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].status, ReminderStatus::Scheduled);
    }

    #[tokio::test]
    async fn base_url_path_prefix_is_kept() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/backend/api/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 4, "scheduled": 1, "completed": 1, "failed": 1, "in_progress": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = RemindersApi::new(Url::parse(&format!("{}/backend", server.uri())).unwrap());
        let stats = api.stats().await.unwrap();

        assert_eq!(stats.total, 4);
        assert_eq!(stats.in_progress, 1);
    }

    #[tokio::test]
    async fn create_posts_payload() {
        let server = MockServer::start().await;
        let payload = ReminderCreate {
            title: "Take medication".to_string(),
            message: "Two pills with water".to_string(),
            phone_number: "+14155552671".to_string(),
            scheduled_at: "2030-01-05T10:04:00".to_string(),
            timezone: "America/New_York".to_string(),
        };

        Mock::given(method("POST"))
            .and(path("/api/reminders"))
            .and(body_json(serde_json::to_value(&payload).unwrap()))
            .respond_with(ResponseTemplate::new(201).set_body_json(reminder_json(9, "scheduled")))
            .expect(1)
            .mount(&server)
            .await;

        let api = RemindersApi::new(Url::parse(&server.uri()).unwrap());
        let created = api.create(&payload).await.unwrap();

        assert_eq!(created.id, 9);
    }

    #[tokio::test]
    async fn failures_carry_status_and_detail() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/reminders/3"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "detail": "Reminder not found" })),
            )
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/api/reminders/3"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "detail": [
                    { "loc": ["body", "phone_number"], "msg": "Phone number must be in E.164 format" },
                    { "loc": ["body", "title"], "msg": "String should have at least 1 character" }
                ]
            })))
            .mount(&server)
            .await;

        let api = RemindersApi::new(Url::parse(&server.uri()).unwrap());

        let error = api.delete(3).await.unwrap_err();
        assert!(error.is_not_found());
        assert_eq!(error.detail().as_deref(), Some("Reminder not found"));

        let error = api.update(3, &ReminderUpdate::default()).await.unwrap_err();
        assert_eq!(error.status(), Some(422));
        assert_eq!(
            error.detail().as_deref(),
            Some("Phone number must be in E.164 format; String should have at least 1 character")
        );
    }

    #[tokio::test]
    async fn undecodable_body_is_a_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/reminders/5"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let api = RemindersApi::new(Url::parse(&server.uri()).unwrap());
        let error = api.get(5).await.unwrap_err();

        assert!(matches!(error, ApiError::Decode(_)));
        assert_eq!(error.detail(), None);
    }
}
