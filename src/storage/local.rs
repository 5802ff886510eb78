use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{
    models::{
        settings::{DEFAULT_THEME, Settings, normalize_theme},
        task::Task,
    },
    storage::{KeyValue, StorageError},
};

pub const TASKS_KEY: &str = "journeyTasks";
pub const THEME_KEY: &str = "journeyTheme";
pub const WISDOM_KEY: &str = "journeyWisdomEnabled";
pub const ARTFUL_KEY: &str = "journeyArtfulMode";
pub const HELPER_SEEN_KEY: &str = "journeySeenAddHelper";
pub const MILESTONE_KEY: &str = "journeyMilestone";
pub const ANALYTICS_OPT_IN_KEY: &str = "journeyAnalyticsOptIn";
pub const ANALYTICS_KEY: &str = "journeyAnalyticsAggregate";
pub const UNDO_KEY: &str = "journeyUndoBuffer";
pub const OPEN_NOTE_KEY: &str = "journeyOpenNote";
pub const LAST_WISDOM_KEY: &str = "journeyLastWisdom";

/// Deleted batch persisted between invocations so the undo window
/// spans processes.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct UndoRecord {
    #[serde(rename = "expiresAt")]
    expires_at: Timestamp,
    tasks: Vec<Task>,
}

/// Typed accessors over the flat persisted keys.
///
/// Reads never hard-fail: unavailable storage falls back to defaults
/// and corrupt task JSON is discarded wholesale. Writes surface their
/// error so the shell can report a transient "unable to save" without
/// aborting the operation that triggered them.
pub struct JourneyStore<'a, S: KeyValue> {
    storage: &'a S,
}

impl<'a, S: KeyValue> JourneyStore<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    pub fn load_tasks(&self) -> Vec<Task> {
        let raw = match self.storage.get(TASKS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                eprintln!("Warning: storage unavailable, starting empty: {e}");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Task>>(&raw) {
            Ok(tasks) => tasks,
            Err(e) => {
                eprintln!("Warning: stored tasks were corrupt, clearing them: {e}");
                let _ = self.storage.remove(TASKS_KEY);
                Vec::new()
            }
        }
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), StorageError> {
        let json =
            serde_json::to_string(tasks).map_err(|e| StorageError::SerializeFailed { source: e })?;
        self.storage.set(TASKS_KEY, &json)
    }

    pub fn load_settings(&self) -> Settings {
        let defaults = Settings::default();
        Settings {
            theme: normalize_theme(
                &self
                    .get_or(THEME_KEY, DEFAULT_THEME)
                    .unwrap_or_else(|| DEFAULT_THEME.to_string()),
            )
            .to_string(),
            wisdom_enabled: self.load_flag(WISDOM_KEY, defaults.wisdom_enabled),
            artful_mode: self.load_flag(ARTFUL_KEY, defaults.artful_mode),
            analytics_opt_in: self.load_flag(ANALYTICS_OPT_IN_KEY, defaults.analytics_opt_in),
        }
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        self.storage.set(THEME_KEY, &settings.theme)?;
        self.save_flag(WISDOM_KEY, settings.wisdom_enabled)?;
        self.save_flag(ARTFUL_KEY, settings.artful_mode)?;
        self.save_flag(ANALYTICS_OPT_IN_KEY, settings.analytics_opt_in)?;
        Ok(())
    }

    pub fn helper_seen(&self) -> bool {
        self.load_flag(HELPER_SEEN_KEY, false)
    }

    pub fn mark_helper_seen(&self) -> Result<(), StorageError> {
        self.save_flag(HELPER_SEEN_KEY, true)
    }

    /// Highest milestone threshold already celebrated.
    pub fn milestone_high_water(&self) -> u32 {
        self.get_or(MILESTONE_KEY, "0")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0)
    }

    pub fn set_milestone_high_water(&self, value: u32) -> Result<(), StorageError> {
        self.storage.set(MILESTONE_KEY, &value.to_string())
    }

    pub fn load_undo(&self) -> Option<(Vec<Task>, Timestamp)> {
        let raw = self.storage.get(UNDO_KEY).ok().flatten()?;
        match serde_json::from_str::<UndoRecord>(&raw) {
            Ok(record) => Some((record.tasks, record.expires_at)),
            Err(_) => {
                let _ = self.storage.remove(UNDO_KEY);
                None
            }
        }
    }

    pub fn save_undo(&self, tasks: &[Task], expires_at: Timestamp) -> Result<(), StorageError> {
        let record = UndoRecord {
            expires_at,
            tasks: tasks.to_vec(),
        };
        let json = serde_json::to_string(&record)
            .map_err(|e| StorageError::SerializeFailed { source: e })?;
        self.storage.set(UNDO_KEY, &json)
    }

    pub fn clear_undo(&self) -> Result<(), StorageError> {
        self.storage.remove(UNDO_KEY)
    }

    /// Which task's note panel is open, if any.
    pub fn open_note_id(&self) -> Option<i64> {
        self.storage
            .get(OPEN_NOTE_KEY)
            .ok()
            .flatten()
            .and_then(|raw| raw.parse().ok())
    }

    pub fn set_open_note_id(&self, open: Option<i64>) -> Result<(), StorageError> {
        match open {
            Some(id) => self.storage.set(OPEN_NOTE_KEY, &id.to_string()),
            None => self.storage.remove(OPEN_NOTE_KEY),
        }
    }

    /// Text of the most recently shown wisdom quote, used to avoid an
    /// immediate repeat on refresh.
    pub fn last_wisdom_text(&self) -> String {
        self.storage
            .get(LAST_WISDOM_KEY)
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    pub fn set_last_wisdom_text(&self, text: &str) -> Result<(), StorageError> {
        self.storage.set(LAST_WISDOM_KEY, text)
    }

    fn get_or(&self, key: &str, fallback: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(Some(value)) => Some(value),
            Ok(None) => Some(fallback.to_string()),
            Err(_) => None,
        }
    }

    fn load_flag(&self, key: &str, fallback: bool) -> bool {
        match self.storage.get(key) {
            Ok(Some(value)) => match value.as_str() {
                "true" => true,
                "false" => false,
                _ => fallback,
            },
            _ => fallback,
        }
    }

    fn save_flag(&self, key: &str, value: bool) -> Result<(), StorageError> {
        self.storage.set(key, if value { "true" } else { "false" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::kv::MemoryKv;

    fn task(id: i64, description: &str) -> Task {
        Task {
            id,
            description: description.to_string(),
            ..Task::default()
        }
    }

    #[test]
    fn test_tasks_round_trip() {
        let kv = MemoryKv::new();
        let store = JourneyStore::new(&kv);
        let tasks = vec![task(1, "a"), task(2, "b")];
        store.save_tasks(&tasks).unwrap();
        assert_eq!(store.load_tasks(), tasks);
    }

    #[test]
    fn test_corrupt_tasks_are_discarded() {
        let kv = MemoryKv::new();
        kv.set(TASKS_KEY, "{ definitely not a task list").unwrap();
        let store = JourneyStore::new(&kv);
        assert!(store.load_tasks().is_empty());
        // The corrupt value is cleared, not left to fail again
        assert_eq!(kv.get(TASKS_KEY).unwrap(), None);
    }

    #[test]
    fn test_missing_keys_yield_defaults() {
        let kv = MemoryKv::new();
        let store = JourneyStore::new(&kv);
        let settings = store.load_settings();
        assert_eq!(settings, Settings::default());
        assert_eq!(store.milestone_high_water(), 0);
        assert!(!store.helper_seen());
    }

    #[test]
    fn test_settings_round_trip() {
        let kv = MemoryKv::new();
        let store = JourneyStore::new(&kv);
        let settings = Settings {
            theme: "dark".to_string(),
            wisdom_enabled: false,
            artful_mode: true,
            analytics_opt_in: true,
        };
        store.save_settings(&settings).unwrap();
        assert_eq!(store.load_settings(), settings);
    }

    #[test]
    fn test_legacy_theme_value_is_normalized() {
        let kv = MemoryKv::new();
        kv.set(THEME_KEY, "default").unwrap();
        let store = JourneyStore::new(&kv);
        assert_eq!(store.load_settings().theme, "comfort");
    }

    #[test]
    fn test_undo_record_round_trip() {
        let kv = MemoryKv::new();
        let store = JourneyStore::new(&kv);
        let deadline = Timestamp::from_second(1_700_000_000).unwrap();
        store.save_undo(&[task(3, "gone")], deadline).unwrap();

        let (tasks, expires_at) = store.load_undo().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 3);
        assert_eq!(expires_at, deadline);

        store.clear_undo().unwrap();
        assert!(store.load_undo().is_none());
    }

    #[test]
    fn test_corrupt_undo_record_is_discarded() {
        let kv = MemoryKv::new();
        kv.set(UNDO_KEY, "oops").unwrap();
        let store = JourneyStore::new(&kv);
        assert!(store.load_undo().is_none());
        assert_eq!(kv.get(UNDO_KEY).unwrap(), None);
    }

    #[test]
    fn test_open_note_id_round_trip() {
        let kv = MemoryKv::new();
        let store = JourneyStore::new(&kv);
        assert_eq!(store.open_note_id(), None);
        store.set_open_note_id(Some(7)).unwrap();
        assert_eq!(store.open_note_id(), Some(7));
        store.set_open_note_id(None).unwrap();
        assert_eq!(store.open_note_id(), None);
    }

    #[test]
    fn test_milestone_high_water_round_trip() {
        let kv = MemoryKv::new();
        let store = JourneyStore::new(&kv);
        store.set_milestone_high_water(10).unwrap();
        assert_eq!(store.milestone_high_water(), 10);
    }
}
