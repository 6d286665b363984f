use std::sync::Arc;

use crate::identity::ProcessIdentity;
use crate::record::{LogRecord, RawEvent, RecordBuilder};

/// Hard floor for the configured message size limit. A limit below this
/// cannot hold even the reduced overflow record reliably.
pub const MIN_MESSAGE_SIZE: usize = 1000;

/// Default limit on the serialized size of one record.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 150_000;

/// Failure modes of [`Formatter::format`].
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    /// The configured size limit is below [`MIN_MESSAGE_SIZE`]. Detected
    /// at construction and returned identically on every call until the
    /// formatter is rebuilt with a valid limit.
    #[error("message size limit {limit} is below the minimum of {MIN_MESSAGE_SIZE}")]
    Configuration { limit: usize },

    /// The record could not be rendered as JSON. A data or code defect in
    /// the supplied message value; surfaced to the caller, never hidden,
    /// since without text there is nothing to ship for that event.
    #[error("unable to render log record as JSON text: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Render one record as JSON text no longer than `max_size`.
///
/// If the natural rendering exceeds the limit, the record's unbounded
/// payload is discarded and [`LogRecord::reduced`] is rendered in its
/// place, so the returned text is always within bound.
pub fn serialize(record: &LogRecord, max_size: usize) -> Result<String, FormatError> {
    let json = serde_json::to_string(record)?;
    if json.len() <= max_size {
        return Ok(json);
    }

    let reduced = record.reduced(json.len(), max_size);
    Ok(serde_json::to_string(&reduced)?)
}

/// The public "event in, bounded JSON text out" operation.
///
/// Composes a [`RecordBuilder`] with [`serialize`]. A size limit below
/// [`MIN_MESSAGE_SIZE`] is a standing fault: it is recorded once at
/// construction and every subsequent [`format`](Formatter::format) call
/// fails with the same [`FormatError::Configuration`] before any work is
/// done.
pub struct Formatter {
    builder: RecordBuilder,
    max_message_size: usize,
    invalid_configuration: bool,
}

impl Formatter {
    pub fn new(identity: Arc<ProcessIdentity>, max_message_size: usize) -> Self {
        Self {
            builder: RecordBuilder::new(identity),
            invalid_configuration: max_message_size < MIN_MESSAGE_SIZE,
            max_message_size,
        }
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Format one event as bounded JSON text.
    pub fn format(&self, event: &RawEvent) -> Result<String, FormatError> {
        if self.invalid_configuration {
            return Err(FormatError::Configuration {
                limit: self.max_message_size,
            });
        }

        let record = self.builder.build(event);
        serialize(&record, self.max_message_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;
    use std::collections::BTreeMap;

    fn located_event(message: Value) -> RawEvent {
        RawEvent {
            timestamp: Utc.timestamp_millis_opt(38905).unwrap(),
            level: "ERROR".to_string(),
            message,
            logger_name: Some("app::worker".to_string()),
            source: Some(crate::record::SourceLocation {
                class: Some("app::worker".to_string()),
                method: Some("run".to_string()),
                file: Some("worker.rs".to_string()),
                line: Some(42),
            }),
            properties: BTreeMap::new(),
            exception: None,
        }
    }

    fn formatter(max_size: usize) -> Formatter {
        Formatter::new(Arc::new(ProcessIdentity::new()), max_size)
    }

    #[test]
    fn output_leads_with_timestamp_level_and_message() {
        let out = formatter(DEFAULT_MAX_MESSAGE_SIZE)
            .format(&located_event(Value::String("message".into())))
            .unwrap();
        assert!(
            out.starts_with(r#"{"tsi":"1970-01-01T00:00:38.9UTC","lvl":"ERROR","msg":"message""#),
            "unexpected prefix: {out}"
        );
        assert!(!out.contains("\"properties\""));
        assert!(!out.contains("\"exception\""));
        assert!(!out.contains("\"cluster\""));
    }

    #[test]
    fn field_order_is_fixed_regardless_of_present_fields() {
        let mut raw = located_event(Value::String("m".into()));
        raw.properties.insert("request_id".into(), "abc".into());
        raw.exception = Some("trace".into());

        let identity = Arc::new(ProcessIdentity::new());
        identity.set_cluster_name("staging");
        let out = Formatter::new(identity, DEFAULT_MAX_MESSAGE_SIZE)
            .format(&raw)
            .unwrap();

        let keys = [
            "\"tsi\"",
            "\"lvl\"",
            "\"msg\"",
            "\"name\"",
            "\"cls\"",
            "\"method\"",
            "\"file\"",
            "\"lineno\"",
            "\"properties\"",
            "\"exception\"",
            "\"host\"",
            "\"cluster\"",
        ];
        let positions: Vec<usize> = keys
            .iter()
            .map(|k| out.find(k).unwrap_or_else(|| panic!("{k} missing in {out}")))
            .collect();
        assert!(
            positions.windows(2).all(|w| w[0] < w[1]),
            "field order violated: {out}"
        );
    }

    #[test]
    fn absent_fields_are_never_emitted_as_null() {
        let mut raw = located_event(Value::String("m".into()));
        raw.source = None;
        raw.logger_name = None;
        let out = formatter(DEFAULT_MAX_MESSAGE_SIZE).format(&raw).unwrap();
        assert!(!out.contains("null"));
        assert!(!out.contains("{}"));
        assert!(!out.contains("\"name\""));
        assert!(!out.contains("\"cls\""));
    }

    #[test]
    fn output_never_exceeds_the_configured_limit() {
        let raw = located_event(Value::String("m".repeat(655_350)));
        for max_size in [1000, 2000, 6000, DEFAULT_MAX_MESSAGE_SIZE] {
            let out = formatter(max_size).format(&raw).unwrap();
            assert!(
                out.len() <= max_size,
                "{} bytes exceeds limit {max_size}",
                out.len()
            );
        }
    }

    #[test]
    fn overflow_substitute_describes_the_overflow_and_keeps_the_call_site() {
        let raw = located_event(Value::String("m".repeat(655_350)));
        let out = formatter(6000).format(&raw).unwrap();

        assert!(out.starts_with(r#"{"tsi":"1970-01-01T00:00:38.9UTC","lvl":"ERROR","msg":"Log message size: "#));
        assert!(out.contains("exceeding limit: 6000\""));
        assert!(out.contains(r#""cls":"app::worker""#));
        assert!(out.contains(r#""method":"run""#));
        assert!(out.contains(r#""file":"worker.rs""#));
        assert!(out.contains(r#""lineno":42"#));
        assert!(!out.contains("\"properties\""));
        assert!(out.len() <= 6000);

        let parsed: Value = serde_json::from_str(&out).expect("well-formed JSON");
        let natural = serde_json::to_string(
            &RecordBuilder::new(Arc::new(ProcessIdentity::new())).build(&raw),
        )
        .unwrap()
        .len();
        assert_eq!(
            parsed["msg"],
            Value::String(format!("Log message size: {natural} exceeding limit: 6000"))
        );
    }

    #[test]
    fn limit_below_floor_is_a_sticky_configuration_fault() {
        let formatter = formatter(MIN_MESSAGE_SIZE - 1);
        for _ in 0..3 {
            match formatter.format(&located_event(Value::String("m".into()))) {
                Err(FormatError::Configuration { limit }) => {
                    assert_eq!(limit, MIN_MESSAGE_SIZE - 1)
                }
                other => panic!("expected configuration error, got {other:?}"),
            }
        }
    }

    #[test]
    fn limit_at_floor_is_accepted() {
        let out = formatter(MIN_MESSAGE_SIZE)
            .format(&located_event(Value::String("m".into())))
            .unwrap();
        assert!(out.len() <= MIN_MESSAGE_SIZE);
    }

    #[test]
    fn cluster_and_host_appear_when_cluster_is_set() {
        let identity = Arc::new(ProcessIdentity::new());
        identity.set_cluster_name("regression");
        let out = Formatter::new(identity, DEFAULT_MAX_MESSAGE_SIZE)
            .format(&located_event(Value::String("message".into())))
            .unwrap();

        assert!(out.contains(r#""cluster":"regression""#));
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert!(!parsed["host"].as_str().unwrap().is_empty());
    }
}
