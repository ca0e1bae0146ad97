//! Conversions from external infrastructure errors into domain errors.

use calpilot_domain::CalPilotError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CalPilotError);

impl From<InfraError> for CalPilotError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CalPilotError> for InfraError {
    fn from(value: CalPilotError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoCalPilotError {
    fn into_calpilot(self) -> CalPilotError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CalPilotError */
/* -------------------------------------------------------------------------- */

impl IntoCalPilotError for HttpError {
    fn into_calpilot(self) -> CalPilotError {
        if self.is_timeout() {
            return CalPilotError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return CalPilotError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => CalPilotError::Credential(message),
                400..=499 if code != 429 => CalPilotError::InvalidInput(message),
                _ => CalPilotError::Network(message),
            };
        }

        if self.is_decode() {
            return CalPilotError::Protocol(format!("unexpected HTTP response body: {self}"));
        }

        CalPilotError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_calpilot())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → CalPilotError */
/* -------------------------------------------------------------------------- */

impl IntoCalPilotError for std::io::Error {
    fn into_calpilot(self) -> CalPilotError {
        use std::io::ErrorKind;

        match self.kind() {
            ErrorKind::BrokenPipe | ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset => {
                CalPilotError::Transport(format!("channel closed: {self}"))
            }
            ErrorKind::NotFound => CalPilotError::Transport(format!("not found: {self}")),
            _ => CalPilotError::Transport(self.to_string()),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_calpilot())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → CalPilotError */
/* -------------------------------------------------------------------------- */

impl IntoCalPilotError for serde_json::Error {
    fn into_calpilot(self) -> CalPilotError {
        if self.is_io() {
            return CalPilotError::Transport(self.to_string());
        }
        CalPilotError::Protocol(format!("invalid JSON: {self}"))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(value.into_calpilot())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
