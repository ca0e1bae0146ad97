//! Domain types and models
//!
//! Calendar events as the remote provider returns them, the closed set of
//! intents, the parameters a request carries, and the per-request state that
//! flows through the assistant pipeline.

pub mod event;
pub mod intent;
pub mod parameters;
pub mod response;
pub mod state;

pub use event::{CalendarEvent, EventAttendee, EventDateTime};
pub use intent::Intent;
pub use parameters::{EventParameters, EventPatch, NewEvent};
pub use response::QueryResponse;
pub use state::{
    ActionResult, ChatMessage, ConflictReport, RequestState, Role, ValidationOutcome,
};
