//! The canonical log envelope.
//!
//! Every log call is normalized into a [`LogEntry`] before dispatch: fixed
//! identity and correlation fields, a capture-time RFC3339 timestamp, and a
//! free-form `extra` map for caller payloads. Construction never fails —
//! missing ambient context degrades to documented defaults instead of
//! erroring, because the logging path must not be able to break a request.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::stream::StreamId;

/// Sentinel actor id used when no authenticated actor is present in the
/// ambient context.
pub const UNKNOWN_AGENT: &str = "UNKNOWN_AGENT";

/// Fixed envelope field names. Colliding keys are stripped from `extra` at
/// build time so the fixed fields always take precedence on the wire.
const RESERVED_FIELDS: [&str; 9] = [
    "timestamp",
    "stream",
    "action",
    "actorId",
    "subjectId",
    "endpoint",
    "status",
    "sourceIP",
    "role",
];

/// Outcome recorded on an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryStatus {
    Success,
    Failure,
}

/// Ambient per-unit-of-work context, threaded explicitly through the call
/// chain. Never mutated after construction; absent fields fall back to
/// defaults when the envelope is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub actor_id: Option<String>,
    pub source_ip: Option<String>,
    pub endpoint: Option<String>,
    pub role: Option<String>,
}

/// A fully populated, immutable log entry ready for dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// RFC3339 capture time, millisecond precision.
    pub timestamp: String,
    pub stream: StreamId,
    pub action: String,
    pub actor_id: String,
    pub subject_id: String,
    pub endpoint: String,
    pub status: EntryStatus,
    #[serde(rename = "sourceIP")]
    pub source_ip: String,
    pub role: String,
    /// Caller payload, flattened alongside the fixed fields on the wire.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LogEntry {
    /// Builds an entry from caller metadata plus ambient context.
    ///
    /// Never fails. `status` defaults to [`EntryStatus::Success`]; a missing
    /// actor becomes [`UNKNOWN_AGENT`]; other absent context fields default
    /// to the empty string. Keys in `extra` that collide with fixed envelope
    /// fields are dropped.
    #[must_use]
    pub fn build(
        stream: StreamId,
        ctx: &RequestContext,
        action: &str,
        subject_id: &str,
        status: Option<EntryStatus>,
        extra: Option<Map<String, Value>>,
    ) -> LogEntry {
        let mut extra = extra.unwrap_or_default();
        for field in RESERVED_FIELDS {
            extra.remove(field);
        }

        LogEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            stream,
            action: action.to_string(),
            actor_id: ctx
                .actor_id
                .clone()
                .unwrap_or_else(|| UNKNOWN_AGENT.to_string()),
            subject_id: subject_id.to_string(),
            endpoint: ctx.endpoint.clone().unwrap_or_default(),
            status: status.unwrap_or(EntryStatus::Success),
            source_ip: ctx.source_ip.clone().unwrap_or_default(),
            role: ctx.role.clone().unwrap_or_default(),
            extra,
        }
    }
}
