//! Interval conflict detection
//!
//! Events occupy half-open `[start, end)` intervals, so back-to-back meetings
//! that merely touch do not conflict. Events are scanned in the order given
//! and the first overlap wins.

use calpilot_domain::{CalendarEvent, Result};
use chrono::{DateTime, Utc};

/// Find the first event overlapping `[start, end)`.
///
/// Fails with `MalformedEvent` when an event scanned before any overlap has
/// no parseable start or end.
pub fn detect_conflict<'a>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    events: &'a [CalendarEvent],
) -> Result<Option<&'a CalendarEvent>> {
    detect_conflict_excluding(start, end, events, None)
}

/// Same as [`detect_conflict`], skipping the event with `ignore_id`.
///
/// Used when rescheduling: the event being moved cannot conflict with itself.
pub fn detect_conflict_excluding<'a>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    events: &'a [CalendarEvent],
    ignore_id: Option<&str>,
) -> Result<Option<&'a CalendarEvent>> {
    for event in events {
        if ignore_id.is_some_and(|id| id == event.id) {
            continue;
        }
        let (event_start, event_end) = event.window()?;
        if overlaps(start, end, event_start, event_end) {
            return Ok(Some(event));
        }
    }
    Ok(None)
}

/// Half-open interval overlap.
pub fn overlaps(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    other_start: DateTime<Utc>,
    other_end: DateTime<Utc>,
) -> bool {
    start < other_end && other_start < end
}

#[cfg(test)]
mod tests {
    use calpilot_domain::{CalPilotError, EventDateTime};

    use super::*;

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).expect("fixture time").with_timezone(&Utc)
    }

    fn event(id: &str, start: &str, end: &str) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            summary: Some(id.to_string()),
            start: EventDateTime::timed(start, "UTC"),
            end: EventDateTime::timed(end, "UTC"),
            ..Default::default()
        }
    }

    fn existing() -> Vec<CalendarEvent> {
        vec![event("sync", "2025-09-25T15:00:00Z", "2025-09-25T16:00:00Z")]
    }

    #[test]
    fn touching_boundary_is_not_a_conflict() {
        let events = existing();
        let hit =
            detect_conflict(at("2025-09-25T16:00:00Z"), at("2025-09-25T17:00:00Z"), &events)
                .expect("scan");
        assert!(hit.is_none());

        let hit =
            detect_conflict(at("2025-09-25T14:00:00Z"), at("2025-09-25T15:00:00Z"), &events)
                .expect("scan");
        assert!(hit.is_none());
    }

    #[test]
    fn partial_overlap_is_a_conflict() {
        let events = existing();
        let hit =
            detect_conflict(at("2025-09-25T15:30:00Z"), at("2025-09-25T16:30:00Z"), &events)
                .expect("scan");
        assert_eq!(hit.map(|e| e.id.as_str()), Some("sync"));
    }

    #[test]
    fn containment_in_either_direction_conflicts() {
        let events = existing();
        assert!(detect_conflict(at("2025-09-25T15:10:00Z"), at("2025-09-25T15:20:00Z"), &events)
            .expect("scan")
            .is_some());
        assert!(detect_conflict(at("2025-09-25T14:00:00Z"), at("2025-09-25T18:00:00Z"), &events)
            .expect("scan")
            .is_some());
    }

    #[test]
    fn first_overlap_in_input_order_wins() {
        let events = vec![
            event("late", "2025-09-25T15:45:00Z", "2025-09-25T16:15:00Z"),
            event("early", "2025-09-25T15:00:00Z", "2025-09-25T16:00:00Z"),
        ];
        let hit =
            detect_conflict(at("2025-09-25T15:30:00Z"), at("2025-09-25T16:30:00Z"), &events)
                .expect("scan");
        assert_eq!(hit.map(|e| e.id.as_str()), Some("late"));
    }

    #[test]
    fn offsets_are_compared_as_instants() {
        let events = vec![event("ist", "2025-09-25T15:00:00+05:30", "2025-09-25T16:00:00+05:30")];
        let hit =
            detect_conflict(at("2025-09-25T10:00:00Z"), at("2025-09-25T11:00:00Z"), &events)
                .expect("scan");
        assert!(hit.is_some());
    }

    #[test]
    fn all_day_event_blocks_its_date() {
        let events = vec![CalendarEvent {
            id: "offsite".into(),
            start: EventDateTime::all_day("2025-09-25"),
            end: EventDateTime::all_day("2025-09-26"),
            ..Default::default()
        }];
        let hit =
            detect_conflict(at("2025-09-25T09:00:00Z"), at("2025-09-25T10:00:00Z"), &events)
                .expect("scan");
        assert_eq!(hit.map(|e| e.id.as_str()), Some("offsite"));
    }

    #[test]
    fn malformed_event_fails_the_scan() {
        let events = vec![CalendarEvent { id: "broken".into(), ..Default::default() }];
        let err = detect_conflict(at("2025-09-25T09:00:00Z"), at("2025-09-25T10:00:00Z"), &events)
            .unwrap_err();
        assert!(matches!(err, CalPilotError::MalformedEvent(_)));
    }

    #[test]
    fn excluded_event_is_skipped() {
        let events = existing();
        let hit = detect_conflict_excluding(
            at("2025-09-25T15:30:00Z"),
            at("2025-09-25T16:30:00Z"),
            &events,
            Some("sync"),
        )
        .expect("scan");
        assert!(hit.is_none());
    }
}
