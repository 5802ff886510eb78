use std::collections::HashMap;

use jiff::{SignedDuration, Timestamp};

use crate::models::task::Task;

/// How long a deleted batch stays restorable.
pub const UNDO_WINDOW: SignedDuration = SignedDuration::from_secs(8);

/// Debounce delay for note persistence.
pub const NOTE_SAVE_DELAY: SignedDuration = SignedDuration::from_millis(250);

/// Time-bounded holding area for the most recently deleted batch of
/// tasks. Expiry is checked against a caller-supplied "now" so the
/// buffer never touches the wall clock.
#[derive(Debug)]
pub struct UndoBuffer {
    batch: Vec<Task>,
    deadline: Option<Timestamp>,
    window: SignedDuration,
}

impl UndoBuffer {
    pub fn new(window: SignedDuration) -> Self {
        Self {
            batch: Vec::new(),
            deadline: None,
            window,
        }
    }

    /// Replaces any previously remembered batch, cancelling its
    /// deadline. Selection flags are dropped so restored tasks come
    /// back unselected.
    pub fn remember(&mut self, removed: Vec<Task>, now: Timestamp) {
        if removed.is_empty() {
            return;
        }
        self.batch = removed
            .into_iter()
            .map(|task| Task {
                selected: false,
                ..task
            })
            .collect();
        self.deadline = now.checked_add(self.window).ok();
    }

    /// Reinstates a previously remembered batch with its original
    /// deadline (the shell persists batches across invocations).
    pub fn restore(&mut self, batch: Vec<Task>, deadline: Timestamp) {
        self.batch = batch;
        self.deadline = Some(deadline);
    }

    pub fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }

    /// Consumes the batch if it has not expired.
    pub fn take(&mut self, now: Timestamp) -> Option<Vec<Task>> {
        self.expire(now);
        if self.batch.is_empty() {
            return None;
        }
        self.deadline = None;
        Some(std::mem::take(&mut self.batch))
    }

    pub fn peek(&mut self, now: Timestamp) -> Option<&[Task]> {
        self.expire(now);
        if self.batch.is_empty() {
            None
        } else {
            Some(&self.batch)
        }
    }

    pub fn is_empty(&mut self, now: Timestamp) -> bool {
        self.peek(now).is_none()
    }

    pub fn clear(&mut self) {
        self.batch.clear();
        self.deadline = None;
    }

    fn expire(&mut self, now: Timestamp) {
        match self.deadline {
            Some(deadline) if now < deadline => {}
            _ => self.clear(),
        }
    }
}

/// Per-task deadline tracker for debounced note saves. Scheduling a
/// task that already has a pending save cancels the old deadline first,
/// so each task carries at most one.
#[derive(Debug)]
pub struct NoteDebouncer {
    delay: SignedDuration,
    deadlines: HashMap<i64, Timestamp>,
}

impl NoteDebouncer {
    pub fn new(delay: SignedDuration) -> Self {
        Self {
            delay,
            deadlines: HashMap::new(),
        }
    }

    pub fn schedule(&mut self, task_id: i64, now: Timestamp) {
        self.cancel(task_id);
        if let Ok(deadline) = now.checked_add(self.delay) {
            self.deadlines.insert(task_id, deadline);
        }
    }

    pub fn cancel(&mut self, task_id: i64) {
        self.deadlines.remove(&task_id);
    }

    /// Consumes a pending save immediately (the blur path). Returns
    /// whether one was pending.
    pub fn flush(&mut self, task_id: i64) -> bool {
        self.deadlines.remove(&task_id).is_some()
    }

    pub fn has(&self, task_id: i64) -> bool {
        self.deadlines.contains_key(&task_id)
    }

    /// Drains every task whose deadline has elapsed.
    pub fn due(&mut self, now: Timestamp) -> Vec<i64> {
        let mut elapsed: Vec<i64> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| now >= **deadline)
            .map(|(id, _)| *id)
            .collect();
        elapsed.sort_unstable();
        for id in &elapsed {
            self.deadlines.remove(id);
        }
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(seconds: i64) -> Timestamp {
        Timestamp::from_second(seconds).unwrap()
    }

    fn task(id: i64, selected: bool) -> Task {
        Task {
            id,
            description: format!("step {id}"),
            selected,
            ..Task::default()
        }
    }

    #[test]
    fn test_remember_drops_selection_flags() {
        let mut buffer = UndoBuffer::new(UNDO_WINDOW);
        buffer.remember(vec![task(1, true)], at(100));
        let batch = buffer.peek(at(100)).unwrap();
        assert!(!batch[0].selected);
    }

    #[test]
    fn test_take_within_window_returns_batch_once() {
        let mut buffer = UndoBuffer::new(UNDO_WINDOW);
        buffer.remember(vec![task(1, false), task(2, false)], at(100));
        let batch = buffer.take(at(104)).unwrap();
        assert_eq!(batch.len(), 2);
        assert!(buffer.take(at(104)).is_none());
    }

    #[test]
    fn test_batch_expires_after_window() {
        let mut buffer = UndoBuffer::new(UNDO_WINDOW);
        buffer.remember(vec![task(1, false)], at(100));
        assert!(!buffer.is_empty(at(107)));
        assert!(buffer.take(at(108)).is_none());
    }

    #[test]
    fn test_remember_replaces_previous_batch_and_deadline() {
        let mut buffer = UndoBuffer::new(UNDO_WINDOW);
        buffer.remember(vec![task(1, false)], at(100));
        buffer.remember(vec![task(2, false)], at(106));
        // The first batch's deadline no longer applies
        let batch = buffer.take(at(110)).unwrap();
        assert_eq!(batch[0].id, 2);
    }

    #[test]
    fn test_remember_empty_batch_is_noop() {
        let mut buffer = UndoBuffer::new(UNDO_WINDOW);
        buffer.remember(Vec::new(), at(100));
        assert!(buffer.is_empty(at(100)));
    }

    #[test]
    fn test_debouncer_reschedule_cancels_previous_deadline() {
        let mut debouncer = NoteDebouncer::new(NOTE_SAVE_DELAY);
        debouncer.schedule(1, at(100));
        // Rescheduling pushes the deadline out; the original would have
        // fired at 100.25s
        debouncer.schedule(1, at(101));
        assert!(debouncer.due(at(100)).is_empty());
        assert_eq!(debouncer.due(at(102)), vec![1]);
    }

    #[test]
    fn test_debouncer_flush_consumes_pending_save() {
        let mut debouncer = NoteDebouncer::new(NOTE_SAVE_DELAY);
        debouncer.schedule(1, at(100));
        assert!(debouncer.flush(1));
        assert!(!debouncer.has(1));
        assert!(!debouncer.flush(1));
    }

    #[test]
    fn test_debouncer_due_drains_elapsed_tasks_only() {
        let mut debouncer = NoteDebouncer::new(NOTE_SAVE_DELAY);
        debouncer.schedule(2, at(100));
        debouncer.schedule(1, at(100));
        debouncer.schedule(3, at(200));
        assert_eq!(debouncer.due(at(101)), vec![1, 2]);
        assert!(debouncer.has(3));
    }

    #[test]
    fn test_debouncer_cancel_removes_deadline() {
        let mut debouncer = NoteDebouncer::new(NOTE_SAVE_DELAY);
        debouncer.schedule(1, at(100));
        debouncer.cancel(1);
        assert!(debouncer.due(at(200)).is_empty());
    }
}
