use colored::*;

use crate::{
    models::task::Task,
    services::{
        insights::Insights,
        tasks::{MilestoneState, milestone_message},
        wisdom::Quote,
    },
};

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Get the appropriate status glyph for a task
pub fn get_status_glyph(task: &Task) -> ColoredString {
    if task.completed {
        "✓".dimmed()
    } else if task.selected {
        "●".cyan()
    } else {
        "○".normal()
    }
}

fn badge_label(kind: &str, value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    let label = match (kind, value) {
        ("mood", "bright") => "Bright",
        ("mood", "calm") => "Calm",
        ("mood", "focused") => "Focused",
        ("mood", "reflective") => "Reflective",
        ("category", "wellness") => "Wellness",
        ("category", "creative") => "Creative",
        ("category", "planning") => "Planning",
        ("category", "connection") => "Connection",
        ("priority", "low") => "Low priority",
        ("priority", "medium") => "Medium priority",
        ("priority", "high") => "High priority",
        _ => value,
    };
    Some(label.to_string())
}

/// Build the metadata string for a task (mood / category / priority / note)
/// Returns None if the task carries no metadata
pub fn get_task_context(task: &Task) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    if let Some(label) = badge_label("mood", &task.mood) {
        parts.push(label);
    }
    if let Some(label) = badge_label("category", &task.category) {
        parts.push(label);
    }
    if let Some(label) = badge_label("priority", &task.priority) {
        parts.push(label);
    }
    if task.has_note() {
        parts.push("Note".to_string());
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" · "))
    }
}

/// Render a single task line with id, glyph, description, and
/// right-aligned metadata
pub fn render_task_line(task: &Task) {
    let terminal_width = get_terminal_width();

    let id_str = format!("{}", task.id);
    let glyph = get_status_glyph(task);
    let description = &task.description;

    let left_section = format!("  {}  {}  {}", id_str, glyph, description);

    let styled_left = if task.completed {
        left_section.dimmed()
    } else {
        left_section.bold()
    };

    match get_task_context(task) {
        Some(context) => {
            let right_dimmed = context.dimmed();
            let left_visible_len = format!("  {}  {}  {}", id_str, " ", description).len();
            let total_content = left_visible_len + context.len();

            if total_content + 4 < terminal_width {
                let padding = terminal_width - total_content - 2;
                println!("{}{}{}", styled_left, " ".repeat(padding), right_dimmed);
            } else {
                println!("{}", styled_left);
                println!("      {}", right_dimmed);
            }
        }
        None => println!("{}", styled_left),
    }
}

/// Render the note body under a task line, if any
pub fn render_task_note(task: &Task) {
    if task.has_note() {
        println!("      {}", format!("📝 {}", task.note.trim()).dimmed());
    }
}

/// Render a view header with title and count
pub fn render_view_header(title: &str, count: usize) {
    let step_word = if count == 1 { "step" } else { "steps" };
    println!("\n  {} ({} {})\n", title.cyan().bold(), count, step_word);
}

/// Render a section header
pub fn render_section_header(title: &str) {
    println!("\n  ─── {} ───\n", title.bold());
}

/// Render the insights panel with a progress bar
pub fn render_insights(insights: &Insights) {
    render_view_header("Insights", insights.total_tasks);
    println!(
        "  {}  {}    {}  {}    {}  {}",
        "Total".dimmed(),
        insights.total_tasks,
        "Completed".dimmed(),
        insights.completed_tasks,
        "Active".dimmed(),
        insights.active_tasks,
    );

    let bar_width = 24usize;
    let filled = bar_width * insights.progress as usize / 100;
    let bar = format!(
        "{}{}",
        "█".repeat(filled).green(),
        "░".repeat(bar_width - filled).dimmed()
    );
    println!("\n  {} {}%", bar, insights.progress);
}

/// Render the milestone strip. The high-water mark marks thresholds
/// already celebrated; a freshly unlocked one gets a flare line.
pub fn render_milestones(state: &MilestoneState, thresholds: &[u32], high_water: u32) {
    render_section_header("Milestones");
    for value in thresholds {
        let unlocked = state.unlocked.contains(value);
        let marker = if unlocked {
            format!("  ✓ {:>3}  {}", value, milestone_message(*value))
                .green()
                .to_string()
        } else if state.next == Some(*value) {
            format!("  ▸ {:>3}  Unlocks at {} completed steps", value, value)
        } else {
            format!("  · {:>3}  Milestone at {} completed steps", value, value)
                .dimmed()
                .to_string()
        };
        println!("{}", marker);
    }
    if let Some(last) = state.last_unlocked
        && last > high_water
    {
        println!("\n  {}", "🎉 New milestone reached!".yellow().bold());
    }
}

/// Render a wisdom quote with attribution
pub fn render_quote(quote: &Quote) {
    println!("\n  {}", format!("“{}”", quote.text).italic());
    if !quote.author.is_empty() {
        println!("  {}", format!("— {}", quote.author).dimmed());
    }
    println!();
}

/// Transient confirmation after a successful save
pub fn render_saved() {
    println!("{}", "  Saved".dimmed());
}

/// Transient warning when a write failed; the operation still applied
/// in memory
pub fn render_save_warning(message: &str) {
    eprintln!("{}", format!("  Storage unavailable: {}", message).yellow());
}
