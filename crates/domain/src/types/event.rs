//! Calendar events in the Google Calendar v3 wire shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{CalPilotError, Result};
use crate::utils::time::{parse_all_day, parse_zoned_datetime};

/// Start or end of an event: `dateTime` for timed events, `date` for
/// all-day events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    pub fn timed(date_time: impl Into<String>, time_zone: impl Into<String>) -> Self {
        Self { date_time: Some(date_time.into()), date: None, time_zone: Some(time_zone.into()) }
    }

    pub fn all_day(date: impl Into<String>) -> Self {
        Self { date_time: None, date: Some(date.into()), time_zone: None }
    }

    /// Resolve to an absolute instant.
    ///
    /// `dateTime` wins when it parses (offsetless values are anchored in
    /// `timeZone`); otherwise `date` is read as midnight UTC.
    pub fn instant(&self) -> Result<DateTime<Utc>> {
        let zone = self.time_zone.as_deref();
        if let Some(instant) =
            self.date_time.as_deref().and_then(|raw| parse_zoned_datetime(raw, zone))
        {
            return Ok(instant);
        }
        if let Some(instant) = self.date.as_deref().and_then(parse_all_day) {
            return Ok(instant);
        }
        Err(CalPilotError::MalformedEvent(format!(
            "unparseable time (dateTime={:?}, date={:?})",
            self.date_time, self.date
        )))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAttendee {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
}

/// Calendar entry as listed by the remote provider.
///
/// Unknown fields are ignored and every field defaults, so partially
/// populated provider payloads still deserialize. A missing `start`/`end`
/// surfaces later as [`CalPilotError::MalformedEvent`] from [`Self::window`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarEvent {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<EventAttendee>,
    #[serde(rename = "htmlLink", skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
}

impl CalendarEvent {
    /// The event's `[start, end)` interval.
    pub fn window(&self) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.start.instant().map_err(|e| self.malformed(e))?;
        let end = self.end.instant().map_err(|e| self.malformed(e))?;
        Ok((start, end))
    }

    pub fn title(&self) -> &str {
        self.summary.as_deref().unwrap_or("(untitled)")
    }

    fn malformed(&self, err: CalPilotError) -> CalPilotError {
        match err {
            CalPilotError::MalformedEvent(msg) => {
                CalPilotError::MalformedEvent(format!("event '{}': {msg}", self.id))
            }
            other => other,
        }
    }
}
