use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{
    settings::{DEFAULT_THEME, Settings},
    task::Task,
};

pub const PORTABLE_SCHEMA: &str = "journey-log";
pub const PORTABLE_SCHEMA_VERSION: u64 = 1;

/// Versioned backup document. Write-once: created from live state and
/// never mutated afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JourneyExport {
    pub schema: String,
    pub version: u64,
    #[serde(rename = "exportedAt")]
    pub exported_at: String,
    pub settings: Settings,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JourneyImport {
    pub settings: Settings,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid JSON file. Please choose a valid Journey export.")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Import file must contain an object at the top level.")]
    NotAnObject,

    #[error("Import file schema is not supported by Journey Log.")]
    UnsupportedSchema(String),

    #[error("Import file version is newer than this app can read (version {0}).")]
    FutureVersion(u64),

    #[error("Import file is missing a valid tasks list.")]
    MissingTasks,

    #[error("Import file has tasks, but none are valid Journey steps.")]
    NoValidTasks,

    #[error("Failed to serialize export: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Real booleans pass through; the literal strings "true"/"false" are
/// accepted for flag values that were persisted as strings. Anything
/// else falls back.
pub fn normalize_boolean(value: Option<&Value>, fallback: bool) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) if s == "true" => true,
        Some(Value::String(s)) if s == "false" => false,
        _ => fallback,
    }
}

fn normalize_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn numeric_id(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Number(n)) => {
            if let Some(id) = n.as_i64() {
                Some(id)
            } else {
                n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)
            }
        }
        // Ids written by other tools sometimes arrive as decimal strings
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f as i64),
        _ => None,
    }
}

/// Version fields are accepted as numbers or numeric strings.
fn numeric_version(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64().filter(|f| f.is_finite()),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Validates and normalizes one externally supplied task record.
/// Returns `None` for non-objects and for records whose trimmed
/// description is empty; every surviving record has all string fields
/// populated (empty string, never absent) and a numeric id, minted when
/// the input had none.
pub fn normalize_task_record(raw: &Value, create_id: &mut dyn FnMut() -> i64) -> Option<Task> {
    let record = raw.as_object()?;

    let description = normalize_text(record.get("description"))
        .trim()
        .to_string();
    if description.is_empty() {
        return None;
    }

    let id = numeric_id(record.get("id")).unwrap_or_else(|| create_id());

    Some(Task {
        id,
        description,
        completed: normalize_boolean(record.get("completed"), false),
        selected: normalize_boolean(record.get("selected"), false),
        mood: normalize_text(record.get("mood")),
        category: normalize_text(record.get("category")),
        priority: normalize_text(record.get("priority")),
        note: normalize_text(record.get("note")),
    })
}

fn normalize_portable_settings(value: Option<&Value>) -> Settings {
    let defaults = Settings::default();
    let empty = Value::Null;
    let value = value.unwrap_or(&empty);

    let theme = normalize_text(value.get("theme"));
    Settings {
        theme: if theme.is_empty() {
            DEFAULT_THEME.to_string()
        } else {
            theme
        },
        wisdom_enabled: normalize_boolean(value.get("wisdomEnabled"), defaults.wisdom_enabled),
        artful_mode: normalize_boolean(value.get("artfulMode"), defaults.artful_mode),
        analytics_opt_in: normalize_boolean(value.get("analyticsOptIn"), defaults.analytics_opt_in),
    }
}

fn normalize_live_task(task: &Task) -> Option<Task> {
    let description = task.description.trim().to_string();
    if description.is_empty() {
        return None;
    }
    Some(Task {
        description,
        ..task.clone()
    })
}

/// Builds the export envelope from live state. Invalid tasks are
/// dropped silently.
pub fn create_journey_export(tasks: &[Task], settings: &Settings) -> JourneyExport {
    let theme = settings.theme.trim();
    JourneyExport {
        schema: PORTABLE_SCHEMA.to_string(),
        version: PORTABLE_SCHEMA_VERSION,
        exported_at: jiff::Timestamp::now().to_string(),
        settings: Settings {
            theme: if theme.is_empty() {
                DEFAULT_THEME.to_string()
            } else {
                theme.to_string()
            },
            ..settings.clone()
        },
        tasks: tasks.iter().filter_map(normalize_live_task).collect(),
    }
}

pub fn serialize_journey_export(envelope: &JourneyExport) -> Result<String, ImportError> {
    serde_json::to_string_pretty(envelope).map_err(ImportError::Serialize)
}

/// Parses and validates an import document.
///
/// The import is rejected wholesale on structural problems; a declared
/// task list whose entries all fail normalization is also an error, so
/// garbage input never silently produces an empty journal. Id
/// collisions within the batch are resolved by minting replacements.
pub fn parse_journey_import(
    json_text: &str,
    create_id: &mut dyn FnMut() -> i64,
) -> Result<JourneyImport, ImportError> {
    let parsed: Value = serde_json::from_str(json_text).map_err(ImportError::InvalidJson)?;

    let document = parsed.as_object().ok_or(ImportError::NotAnObject)?;

    if let Some(schema) = document.get("schema")
        && schema.as_str() != Some(PORTABLE_SCHEMA)
    {
        return Err(ImportError::UnsupportedSchema(
            schema.as_str().unwrap_or("<non-string>").to_string(),
        ));
    }

    if let Some(version) = numeric_version(document.get("version"))
        && version > PORTABLE_SCHEMA_VERSION as f64
    {
        return Err(ImportError::FutureVersion(version.round() as u64));
    }

    let declared_tasks = document
        .get("tasks")
        .and_then(Value::as_array)
        .ok_or(ImportError::MissingTasks)?;

    let mut seen_ids = HashSet::new();
    let mut tasks = Vec::new();
    for raw in declared_tasks {
        let Some(mut task) = normalize_task_record(raw, create_id) else {
            continue;
        };
        while !seen_ids.insert(task.id) {
            task.id = create_id();
        }
        tasks.push(task);
    }

    if tasks.is_empty() && !declared_tasks.is_empty() {
        return Err(ImportError::NoValidTasks);
    }

    Ok(JourneyImport {
        settings: normalize_portable_settings(document.get("settings")),
        tasks,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sequential_ids() -> impl FnMut() -> i64 {
        let mut next = 9_000;
        move || {
            next += 1;
            next
        }
    }

    fn task(id: i64, description: &str) -> Task {
        Task {
            id,
            description: description.to_string(),
            ..Task::default()
        }
    }

    #[test]
    fn test_normalize_boolean_coercions() {
        assert!(normalize_boolean(Some(&json!(true)), false));
        assert!(!normalize_boolean(Some(&json!(false)), true));
        assert!(normalize_boolean(Some(&json!("true")), false));
        assert!(!normalize_boolean(Some(&json!("false")), true));
        assert!(normalize_boolean(Some(&json!("yes")), true));
        assert!(!normalize_boolean(Some(&json!(1)), false));
        assert!(normalize_boolean(None, true));
    }

    #[test]
    fn test_normalize_task_record_rejects_non_objects() {
        let mut ids = sequential_ids();
        assert!(normalize_task_record(&json!("a string"), &mut ids).is_none());
        assert!(normalize_task_record(&json!([1, 2]), &mut ids).is_none());
        assert!(normalize_task_record(&json!(null), &mut ids).is_none());
    }

    #[test]
    fn test_normalize_task_record_rejects_blank_descriptions() {
        let mut ids = sequential_ids();
        assert!(normalize_task_record(&json!({"id": 1}), &mut ids).is_none());
        assert!(normalize_task_record(&json!({"id": 1, "description": "   "}), &mut ids).is_none());
    }

    #[test]
    fn test_normalize_task_record_fills_defaults() {
        let mut ids = sequential_ids();
        let normalized =
            normalize_task_record(&json!({"id": 42, "description": " Walk "}), &mut ids).unwrap();
        assert_eq!(normalized.id, 42);
        assert_eq!(normalized.description, "Walk");
        assert!(!normalized.completed);
        assert!(!normalized.selected);
        assert_eq!(normalized.mood, "");
        assert_eq!(normalized.note, "");
    }

    #[test]
    fn test_normalize_task_record_keeps_numeric_string_ids() {
        let mut ids = sequential_ids();
        let normalized =
            normalize_task_record(&json!({"id": "123", "description": "kept"}), &mut ids).unwrap();
        assert_eq!(normalized.id, 123);

        let text = json!({"tasks": [{"id": "123", "description": "kept"}]}).to_string();
        let imported = parse_journey_import(&text, &mut ids).unwrap();
        assert_eq!(imported.tasks[0].id, 123);
    }

    #[test]
    fn test_normalize_task_record_mints_id_when_missing_or_bad() {
        let mut ids = sequential_ids();
        let normalized =
            normalize_task_record(&json!({"description": "no id"}), &mut ids).unwrap();
        assert_eq!(normalized.id, 9_001);

        let normalized =
            normalize_task_record(&json!({"id": "nope", "description": "bad id"}), &mut ids)
                .unwrap();
        assert_eq!(normalized.id, 9_002);
    }

    #[test]
    fn test_export_drops_invalid_tasks() {
        let tasks = vec![task(1, "keep"), task(2, "   ")];
        let envelope = create_journey_export(&tasks, &Settings::default());
        assert_eq!(envelope.schema, "journey-log");
        assert_eq!(envelope.version, 1);
        assert_eq!(envelope.tasks.len(), 1);
        assert_eq!(envelope.tasks[0].description, "keep");
    }

    #[test]
    fn test_round_trip_reproduces_tasks_and_settings() {
        let tasks = vec![
            Task {
                completed: true,
                mood: "calm".to_string(),
                note: "with a note".to_string(),
                ..task(1, "first")
            },
            task(2, "second"),
        ];
        let settings = Settings {
            theme: "forest".to_string(),
            wisdom_enabled: false,
            artful_mode: true,
            analytics_opt_in: true,
        };

        let envelope = create_journey_export(&tasks, &settings);
        let serialized = serialize_journey_export(&envelope).unwrap();
        let mut ids = sequential_ids();
        let imported = parse_journey_import(&serialized, &mut ids).unwrap();

        assert_eq!(imported.tasks, tasks);
        assert_eq!(imported.settings, settings);
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let mut ids = sequential_ids();
        let err = parse_journey_import("{not-valid-json", &mut ids).unwrap_err();
        assert!(err.to_string().contains("Invalid JSON"));
    }

    #[test]
    fn test_parse_rejects_non_object_top_level() {
        let mut ids = sequential_ids();
        assert!(matches!(
            parse_journey_import("[1, 2, 3]", &mut ids),
            Err(ImportError::NotAnObject)
        ));
    }

    #[test]
    fn test_parse_rejects_foreign_schema() {
        let mut ids = sequential_ids();
        let text = json!({"schema": "other-app", "tasks": []}).to_string();
        assert!(matches!(
            parse_journey_import(&text, &mut ids),
            Err(ImportError::UnsupportedSchema(_))
        ));
    }

    #[test]
    fn test_parse_rejects_future_version() {
        let mut ids = sequential_ids();
        let text = json!({"schema": "journey-log", "version": 2, "tasks": []}).to_string();
        assert!(matches!(
            parse_journey_import(&text, &mut ids),
            Err(ImportError::FutureVersion(2))
        ));
    }

    #[test]
    fn test_parse_rejects_future_version_as_string_or_float() {
        let mut ids = sequential_ids();
        let text = json!({"schema": "journey-log", "version": "2", "tasks": []}).to_string();
        assert!(matches!(
            parse_journey_import(&text, &mut ids),
            Err(ImportError::FutureVersion(2))
        ));

        let text = json!({"schema": "journey-log", "version": 1.5, "tasks": []}).to_string();
        assert!(matches!(
            parse_journey_import(&text, &mut ids),
            Err(ImportError::FutureVersion(_))
        ));

        // A string version at or below the current one is fine
        let text = json!({"schema": "journey-log", "version": "1", "tasks": []}).to_string();
        assert!(parse_journey_import(&text, &mut ids).is_ok());
    }

    #[test]
    fn test_parse_rejects_missing_task_list() {
        let mut ids = sequential_ids();
        let text = json!({"schema": "journey-log"}).to_string();
        assert!(matches!(
            parse_journey_import(&text, &mut ids),
            Err(ImportError::MissingTasks)
        ));
    }

    #[test]
    fn test_parse_rejects_all_invalid_tasks() {
        let mut ids = sequential_ids();
        let text = json!({"tasks": [{"description": ""}, "garbage", 7]}).to_string();
        assert!(matches!(
            parse_journey_import(&text, &mut ids),
            Err(ImportError::NoValidTasks)
        ));
    }

    #[test]
    fn test_parse_accepts_empty_task_list() {
        let mut ids = sequential_ids();
        let imported = parse_journey_import(&json!({"tasks": []}).to_string(), &mut ids).unwrap();
        assert!(imported.tasks.is_empty());
        assert_eq!(imported.settings, Settings::default());
    }

    #[test]
    fn test_parse_regenerates_colliding_ids() {
        let mut ids = sequential_ids();
        let text = json!({
            "tasks": [
                {"id": 1, "description": "a"},
                {"id": 1, "description": "b"},
                {"id": 1, "description": "c"}
            ]
        })
        .to_string();
        let imported = parse_journey_import(&text, &mut ids).unwrap();
        let mut seen: Vec<i64> = imported.tasks.iter().map(|t| t.id).collect();
        seen.dedup();
        assert_eq!(seen.len(), 3);
        assert_eq!(imported.tasks[0].id, 1);
    }

    #[test]
    fn test_parse_normalizes_settings_with_defaults() {
        let mut ids = sequential_ids();
        let text = json!({
            "tasks": [],
            "settings": {"theme": "", "wisdomEnabled": "false"}
        })
        .to_string();
        let imported = parse_journey_import(&text, &mut ids).unwrap();
        assert_eq!(imported.settings.theme, "comfort");
        assert!(!imported.settings.wisdom_enabled);
        assert!(!imported.settings.artful_mode);
    }
}
