//! Google Calendar REST client
//!
//! Thin wrapper over `calendars/{id}/events`. Every call asks the
//! credential provider for a fresh bearer token.

use std::sync::Arc;

use calpilot_core::CredentialProvider;
use calpilot_domain::{CalPilotError, CalendarEvent, GoogleConfig, Result};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::errors::InfraError;
use crate::http::HttpClient;

/// Upper bound on pages fetched by a single `list_events`.
const MAX_PAGES: usize = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<CalendarEvent>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Outcome of `events.delete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Failed(String),
}

/// Google Calendar events API
pub struct GoogleCalendarApi {
    http_client: HttpClient,
    credentials: Arc<dyn CredentialProvider>,
    api_base: String,
    calendar_id: String,
}

impl GoogleCalendarApi {
    pub fn new(
        http_client: HttpClient,
        credentials: Arc<dyn CredentialProvider>,
        config: &GoogleConfig,
    ) -> Self {
        Self {
            http_client,
            credentials,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            calendar_id: config.calendar_id.clone(),
        }
    }

    /// `{base}/calendars/{calendar_id}/events[/{event_id}]`, segments escaped.
    fn events_url(&self, event_id: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| CalPilotError::Config(format!("invalid calendar API base: {e}")))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                CalPilotError::Config("calendar API base cannot carry a path".to_string())
            })?;
            segments.pop_if_empty().extend(["calendars", self.calendar_id.as_str(), "events"]);
            if let Some(id) = event_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url, body: Option<&Value>) -> Result<Response> {
        let token = self.credentials.access_token().await?;
        let mut request = self.http_client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.http_client.send(request).await
    }

    /// `events.list` expanded to single instances, ordered by start time.
    pub async fn list_events(
        &self,
        time_min: Option<&str>,
        time_max: Option<&str>,
    ) -> Result<Vec<CalendarEvent>> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut url = self.events_url(None)?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("singleEvents", "true").append_pair("orderBy", "startTime");
                if let Some(min) = time_min {
                    query.append_pair("timeMin", min);
                }
                if let Some(max) = time_max {
                    query.append_pair("timeMax", max);
                }
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let response = check_status(self.send(Method::GET, url, None).await?).await?;
            let page: EventsPage = response.json().await.map_err(|e| CalPilotError::from(InfraError::from(e)))?;
            events.extend(page.items);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => {
                    debug!(count = events.len(), "Listed calendar events");
                    return Ok(events);
                }
            }
        }

        warn!(count = events.len(), "Stopped paging calendar events at the page limit");
        Ok(events)
    }

    /// `events.get`, decoded as `T` (a [`CalendarEvent`] or the raw JSON).
    pub async fn get_event<T: DeserializeOwned>(&self, event_id: &str) -> Result<T> {
        let url = self.events_url(Some(event_id))?;
        let response = check_status(self.send(Method::GET, url, None).await?).await?;
        response.json().await.map_err(|e| CalPilotError::from(InfraError::from(e)))
    }

    /// `events.insert`
    pub async fn insert_event(&self, body: &Value) -> Result<CalendarEvent> {
        let url = self.events_url(None)?;
        let response = check_status(self.send(Method::POST, url, Some(body)).await?).await?;
        response.json().await.map_err(|e| CalPilotError::from(InfraError::from(e)))
    }

    /// `events.update` (full replacement)
    pub async fn update_event(&self, event_id: &str, body: &Value) -> Result<CalendarEvent> {
        let url = self.events_url(Some(event_id))?;
        let response = check_status(self.send(Method::PUT, url, Some(body)).await?).await?;
        response.json().await.map_err(|e| CalPilotError::from(InfraError::from(e)))
    }

    /// `events.delete`; only `204 No Content` counts as deleted.
    pub async fn delete_event(&self, event_id: &str) -> Result<DeleteOutcome> {
        let url = self.events_url(Some(event_id))?;
        let response = self.send(Method::DELETE, url, None).await?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(DeleteOutcome::Deleted);
        }
        let body = response.text().await.unwrap_or_default();
        Ok(DeleteOutcome::Failed(format!("{}: {}", status, body.trim())))
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    let message = format!("Google Calendar API error ({}): {}", status, body.trim());
    Err(match status.as_u16() {
        401 | 403 => CalPilotError::Credential(message),
        400 | 404 | 409 => CalPilotError::InvalidInput(message),
        _ => CalPilotError::Network(message),
    })
}
