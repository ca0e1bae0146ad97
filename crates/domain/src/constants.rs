//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Tool executor protocol
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const JSONRPC_VERSION: &str = "2.0";
pub const CLIENT_NAME: &str = "calpilot";
pub const TOOL_SERVER_NAME: &str = "calpilot-calendar-tools";
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 180;

// Tool names exposed by the calendar tool server
pub const TOOL_LIST_EVENTS: &str = "list_events";
pub const TOOL_CREATE_EVENT: &str = "create_event";
pub const TOOL_UPDATE_EVENT: &str = "update_event";
pub const TOOL_DELETE_EVENT: &str = "delete_event";

// Resource exposing upcoming events
pub const EVENTS_RESOURCE_URI: &str = "cal://events";

// Google Calendar
pub const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_CALENDAR_ID: &str = "primary";
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

// Text generation
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

// Environment variable used to hand a fresh access token to a spawned tool server
pub const ACCESS_TOKEN_ENV: &str = "CALPILOT_GOOGLE_ACCESS_TOKEN";
