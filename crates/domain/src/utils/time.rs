//! Instant and timezone parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::errors::{CalPilotError, Result};

/// Parse an RFC 3339 timestamp that carries an explicit offset.
///
/// Candidate windows must be resolvable to an absolute instant, so naive
/// timestamps ("2025-09-25T15:00:00") are rejected here.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            CalPilotError::InvalidInput(format!(
                "'{raw}' is not an ISO 8601 datetime with offset: {e}"
            ))
        })
}

/// Resolve an IANA timezone name such as `Asia/Kolkata`.
pub fn validate_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| CalPilotError::InvalidInput(format!("unknown timezone '{name}'")))
}

/// Parse a timed value that may omit its offset, using `zone` as the
/// fallback. Returns `None` when the value cannot be anchored.
pub fn parse_zoned_datetime(raw: &str, zone: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()?;
    let tz = zone.and_then(|z| z.parse::<Tz>().ok())?;
    tz.from_local_datetime(&naive).earliest().map(|dt| dt.with_timezone(&Utc))
}

/// Midnight UTC at the start of an all-day `date` (`YYYY-MM-DD`).
pub fn parse_all_day(raw: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()?;
    date.and_hms_opt(0, 0, 0).map(|midnight| Utc.from_utc_datetime(&midnight))
}
