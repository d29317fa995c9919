//! Clock, date parsing and response-envelope helpers.
//!
//! All stored instants are UTC and serialise with an explicit `Z` offset, so
//! elapsed-time arithmetic never depends on the host timezone.

use crate::core::error::OpsError;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use ulid::Ulid;

pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of "now" for every state transition.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Strict `YYYY-MM-DD`. chrono skips blanks before numeric fields, so any
/// whitespace is rejected up front.
pub fn parse_due_date(input: &str) -> Result<NaiveDate, OpsError> {
    if input.chars().any(char::is_whitespace) {
        return Err(OpsError::DateParseError {
            input: input.to_string(),
            reason: "whitespace is not allowed".to_string(),
        });
    }
    NaiveDate::parse_from_str(input, DUE_DATE_FORMAT).map_err(|e| OpsError::DateParseError {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// Renders whole seconds as `MM:SS`; minutes are not wrapped into hours.
pub fn format_countdown(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

pub fn to_rfc3339(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// Standard command response envelope shape used by `--format json`.
pub fn command_envelope(
    now: &DateTime<Utc>,
    cmd: &str,
    status: &str,
    extra: JsonValue,
) -> JsonValue {
    let mut base = serde_json::json!({
        "envelope_version": "1.0.0",
        "ts": to_rfc3339(now),
        "event_id": new_event_id(),
        "cmd": cmd,
        "status": status
    });
    if let (Some(base_obj), Some(extra_obj)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra_obj {
            base_obj.insert(k.clone(), v.clone());
        }
    }
    base
}
