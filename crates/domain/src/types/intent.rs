//! The closed set of calendar intents.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{TOOL_CREATE_EVENT, TOOL_DELETE_EVENT, TOOL_LIST_EVENTS, TOOL_UPDATE_EVENT};

/// What the user wants done to their calendar.
///
/// Serialized with the tool-style wire names (`create_event`, ...). Parsing
/// also accepts the short verb (`create`) in any case, which is how
/// generation capabilities often answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ListEvents,
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
}

impl Intent {
    pub const ALL: [Intent; 4] =
        [Intent::ListEvents, Intent::CreateEvent, Intent::UpdateEvent, Intent::DeleteEvent];

    /// Wire name, identical to the tool that executes the intent.
    pub fn as_str(&self) -> &'static str {
        self.tool_name()
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::ListEvents => TOOL_LIST_EVENTS,
            Self::CreateEvent => TOOL_CREATE_EVENT,
            Self::UpdateEvent => TOOL_UPDATE_EVENT,
            Self::DeleteEvent => TOOL_DELETE_EVENT,
        }
    }

    /// Intents that write to the calendar.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::ListEvents)
    }

    /// Intents whose proposed window must be checked against existing events.
    pub fn requires_conflict_check(&self) -> bool {
        matches!(self, Self::CreateEvent | Self::UpdateEvent)
    }

    /// Lenient parse of capability output; `None` for anything unrecognized.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().trim_matches(|c| c == '"' || c == '\'').to_lowercase();
        match normalized.replace(['-', ' '], "_").as_str() {
            "list_events" | "list" => Some(Self::ListEvents),
            "create_event" | "create" => Some(Self::CreateEvent),
            "update_event" | "update" => Some(Self::UpdateEvent),
            "delete_event" | "delete" => Some(Self::DeleteEvent),
            _ => None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid Intent: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_and_short_forms() {
        assert_eq!(Intent::parse("create_event"), Some(Intent::CreateEvent));
        assert_eq!(Intent::parse("  Create "), Some(Intent::CreateEvent));
        assert_eq!(Intent::parse("\"delete\""), Some(Intent::DeleteEvent));
        assert_eq!(Intent::parse("list events"), Some(Intent::ListEvents));
        assert_eq!(Intent::parse("reschedule"), None);
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&Intent::UpdateEvent).expect("serialize");
        assert_eq!(json, "\"update_event\"");
        for intent in Intent::ALL {
            assert_eq!(intent.to_string().parse::<Intent>(), Ok(intent));
        }
    }

    #[test]
    fn only_create_and_update_check_for_conflicts() {
        let checked: Vec<_> =
            Intent::ALL.into_iter().filter(Intent::requires_conflict_check).collect();
        assert_eq!(checked, vec![Intent::CreateEvent, Intent::UpdateEvent]);
        assert!(!Intent::ListEvents.is_mutating());
    }
}
