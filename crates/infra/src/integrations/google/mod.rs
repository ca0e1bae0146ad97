//! Google Calendar integration
//!
//! - [`OAuthCredentialRelay`]: refresh-token exchange, one fresh token per call
//! - [`StaticTokenProvider`]: token forwarded by a parent process
//! - [`GoogleCalendarApi`]: `events.list/get/insert/update/delete`

pub mod calendar;
pub mod credentials;

pub use calendar::{DeleteOutcome, GoogleCalendarApi};
pub use credentials::{OAuthCredentialRelay, StaticTokenProvider};
