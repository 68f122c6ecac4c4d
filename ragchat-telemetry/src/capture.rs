use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

/// A single recorded log event.
#[derive(Debug, Clone, Serialize)]
pub struct CapturedEvent {
    pub level: String,
    pub target: String,
    /// The event's message, if it had one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub fields: HashMap<String, serde_json::Value>,
    /// Nanoseconds since the Unix epoch.
    pub timestamp: u128,
}

impl CapturedEvent {
    /// A field rendered as a string, if present.
    pub fn field(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Shared storage for captured events.
///
/// Clones share the same storage, so a test can keep one handle while the
/// layer holds another.
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    events: Arc<RwLock<Vec<CapturedEvent>>>,
    /// Map of session id -> indices into `events`
    sessions: Arc<RwLock<HashMap<String, Vec<usize>>>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far, oldest first.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.read().map(|events| events.clone()).unwrap_or_default()
    }

    /// Events that carried a `session` field equal to `session_id`.
    pub fn for_session(&self, session_id: &str) -> Vec<CapturedEvent> {
        let Ok(sessions) = self.sessions.read() else {
            return Vec::new();
        };
        let Some(indices) = sessions.get(session_id) else {
            return Vec::new();
        };
        let Ok(events) = self.events.read() else {
            return Vec::new();
        };
        indices.iter().filter_map(|&i| events.get(i).cloned()).collect()
    }

    /// Whether an event at `level` (e.g. `"WARN"`) with exactly this message was recorded.
    pub fn contains(&self, level: &str, message: &str) -> bool {
        self.events().iter().any(|e| e.level == level && e.message.as_deref() == Some(message))
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.clear();
        }
    }

    /// A subscriber that records every event into this store and prints nothing.
    ///
    /// Pair with `tracing::subscriber::set_default` to capture the events of
    /// one test.
    pub fn subscriber(&self) -> impl Subscriber + Send + Sync + 'static {
        tracing_subscriber::registry().with(CaptureLayer::new(self.clone()))
    }

    fn push(&self, event: CapturedEvent) {
        let session = event.field("session");
        let Ok(mut events) = self.events.write() else {
            return;
        };
        let index = events.len();
        events.push(event);
        drop(events);

        if let Some(session) = session {
            if let Ok(mut sessions) = self.sessions.write() {
                sessions.entry(session).or_default().push(index);
            }
        }
    }
}

/// A tracing layer that records events in memory
pub struct CaptureLayer {
    store: EventStore,
}

impl CaptureLayer {
    pub fn new(store: EventStore) -> Self {
        Self { store }
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        let mut fields = visitor.0;

        let message = fields.remove("message").map(|value| match value {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });

        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();

        let metadata = event.metadata();
        self.store.push(CapturedEvent {
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message,
            fields,
            timestamp,
        });
    }
}

#[derive(Default)]
struct JsonVisitor(HashMap<String, serde_json::Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}
