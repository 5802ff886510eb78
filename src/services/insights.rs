use crate::models::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insights {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub active_tasks: usize,
    /// Percentage complete, rounded half-up. 0 for an empty list.
    pub progress: u32,
}

pub fn compute_insights(tasks: &[Task]) -> Insights {
    let total_tasks = tasks.len();
    let completed_tasks = tasks.iter().filter(|task| task.completed).count();
    let active_tasks = total_tasks - completed_tasks;
    let progress = if total_tasks == 0 {
        0
    } else {
        (completed_tasks as f64 / total_tasks as f64 * 100.0).round() as u32
    };

    Insights {
        total_tasks,
        completed_tasks,
        active_tasks,
        progress,
    }
}

/// Wisdom is visible while at least one step is completed and the
/// preference is on.
pub fn wisdom_visible(tasks: &[Task], wisdom_enabled: bool) -> bool {
    wisdom_enabled && tasks.iter().any(|task| task.completed)
}
