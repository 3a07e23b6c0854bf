use super::RemoteAuthority;
use crate::errors::{AppError, AppResult};
use crate::models::AttendanceEvent;
use crate::models::incident::{EligibleDate, IncidenceReport, IncidentSummary};
use crate::models::notification::Notification;
use crate::models::user::UserProfile;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// JSON-over-HTTP client for the attendance server.
pub struct HttpRemote {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRemote {
    pub fn new(base_url: &str, request_timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("rfieldclock/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("http client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let response = self.client.get(&url).send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn send_json<B: serde::Serialize + ?Sized>(&self, path: &str, body: &B) -> AppResult<Response> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        let response = self.client.post(&url).json(body).send().await?;
        check(response).await
    }

    async fn patch(&self, path: &str) -> AppResult<()> {
        let url = self.url(path);
        debug!(url = %url, "PATCH");
        let response = self.client.patch(&url).send().await?;
        check(response).await?;
        Ok(())
    }
}

/// 401/403 → `Auth`, any other non-2xx → `Network`.
async fn check(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::Auth(detail)),
        _ => Err(AppError::Network(detail)),
    }
}

#[async_trait]
impl RemoteAuthority for HttpRemote {
    async fn probe(&self) -> AppResult<()> {
        let url = self.url(&format!("health?_={}", Utc::now().timestamp_millis()));
        let response = self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-cache, no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> AppResult<UserProfile> {
        let response = self
            .send_json(
                "auth/login",
                &json!({ "username": username, "password": password }),
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn submit_attendance(&self, event: &AttendanceEvent) -> AppResult<()> {
        self.send_json("attendance", event).await?;
        Ok(())
    }

    async fn list_attendance(&self, user_id: &str) -> AppResult<Vec<AttendanceEvent>> {
        self.get_json(&format!("attendance/{user_id}")).await
    }

    async fn submit_incident(&self, report: &IncidenceReport) -> AppResult<()> {
        let mut form = Form::new()
            .text("user_id", report.user_id.clone())
            .text("type", report.kind.clone())
            .text("description", report.description.clone())
            .text("incident_date", report.incident_date.format("%Y-%m-%d").to_string());

        for a in &report.attachments {
            let part = Part::bytes(a.bytes.clone())
                .file_name(a.name.clone())
                .mime_str(&a.mime)?;
            form = form.part("files", part);
        }

        let url = self.url("incidents");
        debug!(url = %url, attachments = report.attachments.len(), "POST multipart");
        let response = self.client.post(&url).multipart(form).send().await?;
        check(response).await?;
        Ok(())
    }

    async fn list_incidents(&self, user_id: &str) -> AppResult<Vec<IncidentSummary>> {
        self.get_json(&format!("incidents/{user_id}")).await
    }

    async fn list_eligible_incident_dates(&self, user_id: &str) -> AppResult<Vec<EligibleDate>> {
        self.get_json(&format!("incidents/{user_id}/eligible-dates"))
            .await
    }

    async fn submit_notification(&self, notification: &Notification) -> AppResult<()> {
        self.send_json("notifications", notification).await?;
        Ok(())
    }

    async fn list_notifications(&self, user_id: &str) -> AppResult<Vec<Notification>> {
        self.get_json(&format!("notifications/{user_id}")).await
    }

    async fn mark_notification_read(&self, id: &str) -> AppResult<()> {
        self.patch(&format!("notifications/{id}/read")).await
    }

    async fn mark_notification_viewed(&self, id: &str) -> AppResult<()> {
        self.patch(&format!("notifications/{id}/viewed")).await
    }
}
