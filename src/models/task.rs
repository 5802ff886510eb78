use serde::{Deserialize, Serialize};

/// Moods a step can carry. Empty string on a task means "unset".
pub const MOODS: [&str; 4] = ["bright", "calm", "focused", "reflective"];

/// Categories a step can carry.
pub const CATEGORIES: [&str; 4] = ["wellness", "creative", "planning", "connection"];

/// Priorities a step can carry.
pub const PRIORITIES: [&str; 3] = ["low", "medium", "high"];

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct Task {
    /// Unique id, derived from creation time (millis * 1000 + sequence)
    pub id: i64,
    /// Trimmed, non-empty description of the step
    pub description: String,
    /// Whether the step is done
    #[serde(default)]
    pub completed: bool,
    /// Transient selection flag, independent of `completed`
    #[serde(default)]
    pub selected: bool,
    /// Mood tag, one of MOODS or empty
    #[serde(default)]
    pub mood: String,
    /// Category tag, one of CATEGORIES or empty
    #[serde(default)]
    pub category: String,
    /// Priority tag, one of PRIORITIES or empty
    #[serde(default)]
    pub priority: String,
    /// Free-text note, empty means "no note"
    #[serde(default)]
    pub note: String,
}

impl Task {
    pub fn has_note(&self) -> bool {
        !self.note.trim().is_empty()
    }
}

/// Optional metadata captured when a task is created.
#[derive(Debug, Default, Clone)]
pub struct TaskMeta {
    pub mood: String,
    pub category: String,
    pub priority: String,
}

/// Mints ids from creation time in milliseconds, bumping a sequence
/// counter when two tasks land in the same millisecond.
#[derive(Debug, Default)]
pub struct TaskIdGenerator {
    last_millis: i64,
    sequence: i64,
}

impl TaskIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> i64 {
        self.next_at(jiff::Timestamp::now().as_millisecond())
    }

    pub fn next_at(&mut self, now_millis: i64) -> i64 {
        if now_millis == self.last_millis {
            self.sequence += 1;
        } else {
            self.last_millis = now_millis;
            self.sequence = 0;
        }
        now_millis * 1000 + self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_within_same_millisecond_are_unique() {
        let mut generator = TaskIdGenerator::new();
        let first = generator.next_at(1_700_000_000_000);
        let second = generator.next_at(1_700_000_000_000);
        let third = generator.next_at(1_700_000_000_000);
        assert_eq!(first, 1_700_000_000_000_000_000);
        assert_eq!(second, first + 1);
        assert_eq!(third, first + 2);
    }

    #[test]
    fn test_sequence_resets_on_new_millisecond() {
        let mut generator = TaskIdGenerator::new();
        generator.next_at(1_700_000_000_000);
        generator.next_at(1_700_000_000_000);
        let next = generator.next_at(1_700_000_000_001);
        assert_eq!(next, 1_700_000_000_001_000_000);
    }

    #[test]
    fn test_ids_are_monotonic_across_milliseconds() {
        let mut generator = TaskIdGenerator::new();
        let earlier = generator.next_at(1_700_000_000_000);
        let later = generator.next_at(1_700_000_000_500);
        assert!(later > earlier);
    }
}
