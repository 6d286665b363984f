use crate::format::Formatter;
use crate::record::{RawEvent, SourceLocation};
use crate::sink::TextSink;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that adapts each event to the formatter's
/// input contract and hands the bounded JSON text to a [`TextSink`].
///
/// The layer performs no level filtering of its own; compose it with
/// `tracing_subscriber` filters to select which events are shipped.
pub struct QueueLogLayer {
    formatter: Formatter,
    sink: Arc<dyn TextSink>,
}

impl QueueLogLayer {
    pub fn new(formatter: Formatter, sink: Arc<dyn TextSink>) -> Self {
        Self { formatter, sink }
    }
}

impl<S> Layer<S> for QueueLogLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let meta = event.metadata();
        let raw = RawEvent {
            timestamp: Utc::now(),
            level: meta.level().to_string(),
            message: visitor
                .message
                .unwrap_or_else(|| Value::String(String::new())),
            logger_name: Some(meta.target().to_string()),
            source: Some(SourceLocation {
                class: meta.module_path().map(str::to_string),
                // tracing carries no function name at the call site.
                method: None,
                file: meta.file().map(str::to_string),
                line: meta.line(),
            }),
            properties: visitor.properties,
            exception: visitor.exception,
        };

        match self.formatter.format(&raw) {
            Ok(text) => self.sink.deliver(text),
            // stderr, not tracing: an error event emitted here would
            // re-enter this layer.
            Err(e) => eprintln!("unable to format log event for shipping: {e}"),
        }
    }
}

/// Collects event fields: `message` becomes the record's message value,
/// an error-typed field becomes the exception text (with its source
/// chain), and everything else becomes a string property.
#[derive(Default)]
struct EventVisitor {
    message: Option<Value>,
    properties: BTreeMap<String, String>,
    exception: Option<String>,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(Value::String(value.to_string()));
        } else {
            self.properties
                .insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if field.name() == "message" {
            self.message = Some(Value::from(value));
        } else {
            self.properties
                .insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "message" {
            self.message = Some(Value::from(value));
        } else {
            self.properties
                .insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "message" {
            self.message = Some(Value::from(value));
        } else {
            self.properties
                .insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_error(&mut self, _field: &Field, value: &(dyn std::error::Error + 'static)) {
        let mut text = value.to_string();
        let mut source = value.source();
        while let Some(cause) = source {
            text.push_str("\nCaused by: ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        self.exception = Some(text);
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(Value::String(format!("{:?}", value)));
        } else {
            self.properties
                .insert(field.name().to_string(), format!("{:?}", value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::DEFAULT_MAX_MESSAGE_SIZE;
    use crate::identity::ProcessIdentity;
    use std::sync::Mutex;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    #[derive(Default)]
    struct CollectingSink {
        texts: Mutex<Vec<String>>,
    }

    impl TextSink for CollectingSink {
        fn deliver(&self, text: String) {
            self.texts.lock().unwrap().push(text);
        }
    }

    fn layer_with(max_size: usize) -> (QueueLogLayer, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::default());
        let formatter = Formatter::new(Arc::new(ProcessIdentity::new()), max_size);
        (
            QueueLogLayer::new(formatter, Arc::clone(&sink) as Arc<dyn TextSink>),
            sink,
        )
    }

    #[test]
    fn events_become_bounded_json_with_fields_as_properties() {
        let (layer, sink) = layer_with(DEFAULT_MAX_MESSAGE_SIZE);
        let subscriber = Registry::default().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(request_id = "abc-123", attempt = 3, "boom {}", 7);
        });

        let texts = sink.texts.lock().unwrap();
        assert_eq!(texts.len(), 1);
        let parsed: Value = serde_json::from_str(&texts[0]).unwrap();
        assert_eq!(parsed["lvl"], "ERROR");
        assert_eq!(parsed["msg"], "boom 7");
        assert_eq!(parsed["properties"]["request_id"], "abc-123");
        assert_eq!(parsed["properties"]["attempt"], "3");
        assert_eq!(parsed["name"], "queue_log_sink::layer::tests");
        assert!(!parsed["host"].as_str().unwrap().is_empty());
        assert!(parsed["file"].is_string());
        assert!(parsed["lineno"].is_u64());
    }

    #[test]
    fn error_typed_fields_are_captured_as_exception_text() {
        let (layer, sink) = layer_with(DEFAULT_MAX_MESSAGE_SIZE);
        let subscriber = Registry::default().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            let err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
            tracing::error!(error = &err as &(dyn std::error::Error + 'static), "write failed");
        });

        let texts = sink.texts.lock().unwrap();
        let parsed: Value = serde_json::from_str(&texts[0]).unwrap();
        assert_eq!(parsed["msg"], "write failed");
        assert_eq!(parsed["exception"], "disk on fire");
    }

    #[test]
    fn an_invalid_size_limit_ships_nothing() {
        let (layer, sink) = layer_with(10);
        let subscriber = Registry::default().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("never shipped");
        });

        assert!(sink.texts.lock().unwrap().is_empty());
    }
}
