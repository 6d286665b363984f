use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::identity::ProcessIdentity;

/// Stack trace text longer than this is cut to the first
/// `MAX_STACK_TRACE_LEN` characters so one exception cannot dominate a
/// queue message.
pub const MAX_STACK_TRACE_LEN: usize = 10_000;

/// Marker prepended to a stack trace that was cut at [`MAX_STACK_TRACE_LEN`].
pub const STACK_TRACE_TRUNCATED_MARKER: &str = "Truncated stack trace:";

/// Call-site information supplied by the capture layer, when available.
#[derive(Debug, Clone, Default)]
pub struct SourceLocation {
    pub class: Option<String>,
    pub method: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
}

/// One raw log event as handed over by the capture layer.
///
/// The message is any serializable value, not just text; whatever the
/// capture layer supplies is carried through to the wire unstringified.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: Value,
    pub logger_name: Option<String>,
    pub source: Option<SourceLocation>,
    pub properties: BTreeMap<String, String>,
    pub exception: Option<String>,
}

/// Canonical wire record for one log event.
///
/// Field declaration order is the wire order; downstream tooling relies
/// on it for fixed-width preview, so it is a compatibility contract.
/// Absent fields are omitted from the output entirely, never emitted as
/// `null` or an empty placeholder.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub tsi: String,
    pub lvl: String,
    pub msg: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cls: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineno: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
}

impl LogRecord {
    /// Substitute record used when the natural serialization of a record
    /// exceeds the configured size limit.
    ///
    /// Keeps the fields that identify where the event came from
    /// (timestamp, level, logger name, call site, host, cluster), drops
    /// everything unbounded (message, properties, exception) and replaces
    /// the message with a short description of the overflow. The result
    /// carries no unbounded fields, so it always fits the limit.
    pub fn reduced(&self, natural_size: usize, limit: usize) -> LogRecord {
        LogRecord {
            tsi: self.tsi.clone(),
            lvl: self.lvl.clone(),
            msg: Value::String(format!(
                "Log message size: {natural_size} exceeding limit: {limit}"
            )),
            name: self.name.clone(),
            cls: self.cls.clone(),
            method: self.method.clone(),
            file: self.file.clone(),
            lineno: self.lineno,
            properties: None,
            exception: None,
            host: self.host.clone(),
            cluster: self.cluster.clone(),
        }
    }
}

/// Maps raw events into canonical [`LogRecord`]s using a shared
/// [`ProcessIdentity`].
#[derive(Clone)]
pub struct RecordBuilder {
    identity: Arc<ProcessIdentity>,
}

impl RecordBuilder {
    pub fn new(identity: Arc<ProcessIdentity>) -> Self {
        Self { identity }
    }

    /// Build the canonical record for one event. Never fails: a missing
    /// optional input (no call site, no exception, empty properties)
    /// yields an absent field. May trigger the one-time host resolution.
    pub fn build(&self, event: &RawEvent) -> LogRecord {
        let source = event.source.clone().unwrap_or_default();

        LogRecord {
            tsi: format_timestamp(event.timestamp),
            lvl: event.level.clone(),
            msg: event.message.clone(),
            name: event.logger_name.clone(),
            cls: source.class,
            method: source.method,
            file: source.file,
            lineno: source.line,
            properties: if event.properties.is_empty() {
                None
            } else {
                Some(event.properties.clone())
            },
            exception: event.exception.as_deref().map(truncate_stack_trace),
            host: self.identity.host_name().to_string(),
            cluster: self.identity.cluster_name(),
        }
    }
}

/// `YYYY-MM-DDTHH:MM:SS.<decisecond>UTC`: one fractional digit with an
/// explicit zone abbreviation, always rendered in UTC.
fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    let decisecond = timestamp.timestamp_subsec_millis() / 100;
    format!(
        "{}.{}UTC",
        timestamp.format("%Y-%m-%dT%H:%M:%S"),
        decisecond
    )
}

fn truncate_stack_trace(text: &str) -> String {
    match text.char_indices().nth(MAX_STACK_TRACE_LEN) {
        // Cut at the 10 000th character and mark the cut.
        Some((cut, _)) => format!("{STACK_TRACE_TRUNCATED_MARKER}{}", &text[..cut]),
        None => text.to_string(),
    }
}
