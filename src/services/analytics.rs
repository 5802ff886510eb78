use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::{KeyValue, local::ANALYTICS_KEY};

/// The closed set of dispatchable events. Anything else is a silent
/// no-op at the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsEvent {
    TaskAdded,
    TaskCompleted,
    NoteUsed,
    ThemeChanged,
    UndoUsed,
}

impl AnalyticsEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsEvent::TaskAdded => "task_added",
            AnalyticsEvent::TaskCompleted => "task_completed",
            AnalyticsEvent::NoteUsed => "note_used",
            AnalyticsEvent::ThemeChanged => "theme_changed",
            AnalyticsEvent::UndoUsed => "undo_used",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "task_added" => Some(AnalyticsEvent::TaskAdded),
            "task_completed" => Some(AnalyticsEvent::TaskCompleted),
            "note_used" => Some(AnalyticsEvent::NoteUsed),
            "theme_changed" => Some(AnalyticsEvent::ThemeChanged),
            "undo_used" => Some(AnalyticsEvent::UndoUsed),
            _ => None,
        }
    }
}

/// Whitelisted metadata per event kind. Serialized field names and
/// order are the wire format, so the variant keys in the aggregate stay
/// stable across runs.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SanitizedMetadata {
    TaskAdded {
        #[serde(rename = "hasMood")]
        has_mood: bool,
        #[serde(rename = "hasCategory")]
        has_category: bool,
        #[serde(rename = "hasPriority")]
        has_priority: bool,
    },
    TaskCompleted {
        completed: bool,
    },
    NoteUsed {
        action: &'static str,
    },
    ThemeChanged {
        theme: String,
    },
    UndoUsed {
        #[serde(rename = "restoredCount")]
        restored_count: u64,
    },
    Empty {},
}

/// Counts arrive as numbers or numeric strings; anything else is 0.
fn numeric_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as u64)
            })
            .unwrap_or(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f as u64)
            .unwrap_or(0),
        _ => 0,
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        _ => false,
    }
}

/// Strips everything outside the per-event whitelist. Non-object
/// metadata sanitizes to the empty record.
pub fn sanitize_metadata(event: AnalyticsEvent, metadata: &Value) -> SanitizedMetadata {
    let Some(fields) = metadata.as_object() else {
        return SanitizedMetadata::Empty {};
    };

    match event {
        AnalyticsEvent::TaskAdded => SanitizedMetadata::TaskAdded {
            has_mood: is_truthy(fields.get("hasMood")),
            has_category: is_truthy(fields.get("hasCategory")),
            has_priority: is_truthy(fields.get("hasPriority")),
        },
        AnalyticsEvent::TaskCompleted => SanitizedMetadata::TaskCompleted {
            completed: is_truthy(fields.get("completed")),
        },
        AnalyticsEvent::NoteUsed => SanitizedMetadata::NoteUsed {
            action: if fields.get("action").and_then(Value::as_str) == Some("cleared") {
                "cleared"
            } else {
                "added"
            },
        },
        AnalyticsEvent::ThemeChanged => SanitizedMetadata::ThemeChanged {
            theme: fields
                .get("theme")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        },
        AnalyticsEvent::UndoUsed => SanitizedMetadata::UndoUsed {
            restored_count: numeric_count(fields.get("restoredCount")),
        },
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct EventBucket {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub variants: BTreeMap<String, u64>,
}

/// Aggregate counters persisted as one JSON blob.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub events: BTreeMap<String, EventBucket>,
}

/// Append-only counter store over the injected key-value storage. Each
/// increment is a full read-modify-write cycle; the synchronous storage
/// model makes that race-free.
pub struct LocalAggregateStore<'a, S: KeyValue> {
    storage: &'a S,
    key: String,
}

impl<'a, S: KeyValue> LocalAggregateStore<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self::with_key(storage, ANALYTICS_KEY)
    }

    pub fn with_key(storage: &'a S, key: &str) -> Self {
        Self {
            storage,
            key: key.to_string(),
        }
    }

    /// Reads the persisted aggregate, treating any corruption (invalid
    /// JSON, wrong shape) as an empty snapshot rather than an error.
    pub fn read_snapshot(&self) -> Snapshot {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            _ => return Snapshot::default(),
        };
        let parsed: Value = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(_) => return Snapshot::default(),
        };
        if !parsed.is_object() {
            return Snapshot::default();
        }
        serde_json::from_value(parsed).unwrap_or_default()
    }

    pub fn increment(&self, event: AnalyticsEvent, metadata: &SanitizedMetadata) -> Snapshot {
        let mut snapshot = self.read_snapshot();
        let bucket = snapshot
            .events
            .entry(event.as_str().to_string())
            .or_default();
        bucket.count += 1;
        let variant_key =
            serde_json::to_string(metadata).unwrap_or_else(|_| "{}".to_string());
        *bucket.variants.entry(variant_key).or_insert(0) += 1;
        snapshot.total += 1;
        self.write_snapshot(&snapshot);
        snapshot
    }

    pub fn clear(&self) {
        self.write_snapshot(&Snapshot::default());
    }

    fn write_snapshot(&self, snapshot: &Snapshot) {
        let json = match serde_json::to_string(snapshot) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Warning: analytics aggregate could not be serialized: {e}");
                return;
            }
        };
        if let Err(e) = self.storage.set(&self.key, &json) {
            eprintln!("Warning: analytics aggregate could not be saved: {e}");
        }
    }
}

/// A record forwarded to an optional external sink on each dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkRecord {
    pub event: String,
    pub timestamp: String,
    pub metadata: SanitizedMetadata,
}

/// Gates, sanitizes, and records events. Disabled analytics and
/// unknown event names are not errors; `dispatch` just reports `false`.
pub struct EventDispatcher<'a, S: KeyValue> {
    enabled: Box<dyn Fn() -> bool + 'a>,
    store: LocalAggregateStore<'a, S>,
    sink: Option<Box<dyn FnMut(SinkRecord) + 'a>>,
}

impl<'a, S: KeyValue> EventDispatcher<'a, S> {
    pub fn new(enabled: impl Fn() -> bool + 'a, store: LocalAggregateStore<'a, S>) -> Self {
        Self {
            enabled: Box::new(enabled),
            store,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: impl FnMut(SinkRecord) + 'a) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn dispatch(&mut self, event_name: &str, metadata: &Value) -> bool {
        let Some(event) = AnalyticsEvent::parse(event_name) else {
            return false;
        };
        if !(self.enabled)() {
            return false;
        }

        let sanitized = sanitize_metadata(event, metadata);
        self.store.increment(event, &sanitized);

        if let Some(sink) = self.sink.as_mut() {
            sink(SinkRecord {
                event: event.as_str().to_string(),
                timestamp: jiff::Timestamp::now().to_string(),
                metadata: sanitized,
            });
        }

        true
    }
}
