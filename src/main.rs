use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::*;
use jiff::Timestamp;
use serde_json::json;

use crate::{
    models::{
        settings::{SUPPORTED_THEMES, Settings},
        task::{CATEGORIES, MOODS, PRIORITIES, Task, TaskIdGenerator, TaskMeta},
    },
    services::{
        analytics::{EventDispatcher, LocalAggregateStore},
        insights::{compute_insights, wisdom_visible},
        tasks::{
            MILESTONE_THRESHOLDS, add_task, clear_completed, clear_selected,
            completed_task_for_milestone, derive_milestone_state, milestone_message,
            next_open_note_id, remove_task, restore_deleted_tasks, select_all_state,
            set_all_selected, set_selected, toggle_complete, update_task_note,
        },
        undo::{NOTE_SAVE_DELAY, NoteDebouncer, UNDO_WINDOW, UndoBuffer},
        wisdom::{default_wisdom_set, pick_quote_for_task, resolve_exclude_text},
    },
    storage::{KeyValue, kv::JsonFileKv, local::JourneyStore},
};

mod models;
mod services;
mod storage;
mod ui;

#[derive(Parser)]
#[command(
    name = "journey",
    about = "A journey log for your terminal: small steps, tracked kindly"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show all steps
    List,

    /// Add a new step
    Add {
        /// Step description
        description: String,

        /// Mood tag (bright, calm, focused, reflective)
        #[arg(long)]
        mood: Option<String>,

        /// Category tag (wellness, creative, planning, connection)
        #[arg(long)]
        category: Option<String>,

        /// Priority tag (low, medium, high)
        #[arg(long)]
        priority: Option<String>,

        /// Attach a note right away
        #[arg(long)]
        note: Option<String>,
    },

    /// Toggle a step between completed and active
    Done { id: i64 },

    /// Mark a step as selected
    Select { id: i64 },

    /// Clear a step's selection
    Deselect { id: i64 },

    /// Select every step
    SelectAll,

    /// Clear every selection
    DeselectAll,

    /// Delete a step (restorable with undo for a short while)
    Delete { id: i64 },

    /// Delete all completed steps
    ClearCompleted,

    /// Delete all selected steps
    ClearSelected,

    /// Restore the most recently deleted steps
    Undo,

    /// Open, set, or clear a step's note
    Note {
        id: i64,

        /// Note text; omit to toggle the note panel open or closed
        text: Option<String>,

        /// Remove the note
        #[arg(long)]
        clear: bool,
    },

    /// Show progress insights
    Insights,

    /// Show the milestone strip
    Milestones {
        /// Revisit the step that unlocked a milestone
        #[arg(long)]
        view: Option<u32>,
    },

    /// Show a wisdom quote for your latest completed step
    Wisdom {
        /// Pick a different quote than last time
        #[arg(long)]
        refresh: bool,
    },

    /// Show or change the theme
    Theme { name: Option<String> },

    /// Manage preferences
    #[command(subcommand)]
    Settings(SettingsCommands),

    /// Write a portable backup (stdout when no path is given)
    Export { path: Option<PathBuf> },

    /// Replace all steps and settings from a backup file
    Import { path: PathBuf },

    /// Inspect or reset the local analytics aggregate
    #[command(subcommand)]
    Analytics(AnalyticsCommands),
}

#[derive(Debug, Subcommand)]
enum SettingsCommands {
    /// Show current preferences
    Show,
    /// Turn wisdom quotes on or off
    Wisdom { state: String },
    /// Turn artful mode on or off
    Artful { state: String },
    /// Opt in or out of local analytics
    Analytics { state: String },
}

#[derive(Debug, Subcommand)]
enum AnalyticsCommands {
    /// Show the aggregate counters
    Show,
    /// Reset the aggregate to empty
    Reset,
}

fn main() {
    let cli = Cli::parse();

    // Initialize storage
    let storage_path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("journey-log")
        .join("journal.json");

    if let Some(parent) = storage_path.parent() {
        std::fs::create_dir_all(parent).unwrap_or_else(|e| {
            eprintln!("Error: Failed to create data directory: {}", e);
            std::process::exit(1);
        });
    }

    let kv = JsonFileKv::new(storage_path);
    let store = JourneyStore::new(&kv);

    let mut tasks = store.load_tasks();
    let mut settings = store.load_settings();
    let now = Timestamp::now();

    let mut undo_buffer = UndoBuffer::new(UNDO_WINDOW);
    if let Some((batch, deadline)) = store.load_undo() {
        undo_buffer.restore(batch, deadline);
    }

    let analytics_enabled = settings.analytics_opt_in;
    let mut dispatcher =
        EventDispatcher::new(move || analytics_enabled, LocalAggregateStore::new(&kv));

    match cli.command.unwrap_or(Commands::List) {
        Commands::List => {
            if tasks.is_empty() {
                println!("No steps yet");
                if !store.helper_seen() {
                    println!("Add one with: journey add \"your next step\"");
                }
                return;
            }

            ui::render_view_header("Journey Log", tasks.len());
            let open_note = store.open_note_id();
            for task in &tasks {
                ui::render_task_line(task);
                if open_note == Some(task.id) {
                    ui::render_task_note(task);
                }
            }

            let insights = compute_insights(&tasks);
            println!(
                "\n  {}",
                format!(
                    "{} of {} complete ({}%)",
                    insights.completed_tasks, insights.total_tasks, insights.progress
                )
                .dimmed()
            );

            let selection = select_all_state(&tasks);
            if selection.checked {
                println!("  {}", "All steps selected".dimmed());
            } else if selection.indeterminate {
                println!("  {}", "Some steps selected".dimmed());
            }
        }
        Commands::Add {
            description,
            mood,
            category,
            priority,
            note,
        } => {
            let meta = TaskMeta {
                mood: validate_tag("mood", mood, &MOODS),
                category: validate_tag("category", category, &CATEGORIES),
                priority: validate_tag("priority", priority, &PRIORITIES),
            };

            let mut ids = TaskIdGenerator::new();
            tasks = match add_task(&tasks, &description, meta.clone(), &mut ids) {
                Ok(tasks) => tasks,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            if let Some(note) = note
                && !note.trim().is_empty()
                && let Some(added) = tasks.last()
            {
                tasks = update_task_note(&tasks, added.id, &note);
            }
            persist_tasks(&store, &tasks);

            dispatcher.dispatch(
                "task_added",
                &json!({
                    "hasMood": !meta.mood.is_empty(),
                    "hasCategory": !meta.category.is_empty(),
                    "hasPriority": !meta.priority.is_empty(),
                }),
            );

            if !store.helper_seen()
                && let Err(e) = store.mark_helper_seen()
            {
                ui::render_save_warning(&e.to_string());
            }

            let added = tasks.last().expect("just appended");
            println!("Added step {} {}", added.id, added.description.bold());
        }
        Commands::Done { id } => {
            require_task(&tasks, id);
            tasks = toggle_complete(&tasks, id);
            persist_tasks(&store, &tasks);

            let task = tasks.iter().find(|t| t.id == id).expect("still present");
            if task.completed {
                dispatcher.dispatch("task_completed", &json!({ "completed": true }));
                println!("Completed {}", task.description.bold());

                celebrate_new_milestones(&store, &tasks);

                if wisdom_visible(&tasks, settings.wisdom_enabled) {
                    show_wisdom_for(task, &store, false);
                }
            } else {
                println!("Marked {} as active again", task.description.bold());
            }
        }
        Commands::Select { id } => {
            require_task(&tasks, id);
            tasks = set_selected(&tasks, id, true);
            persist_tasks(&store, &tasks);
        }
        Commands::Deselect { id } => {
            require_task(&tasks, id);
            tasks = set_selected(&tasks, id, false);
            persist_tasks(&store, &tasks);
        }
        Commands::SelectAll => {
            tasks = set_all_selected(&tasks, true);
            persist_tasks(&store, &tasks);
        }
        Commands::DeselectAll => {
            tasks = set_all_selected(&tasks, false);
            persist_tasks(&store, &tasks);
        }
        Commands::Delete { id } => {
            require_task(&tasks, id);
            let (remaining, removed) = remove_task(&tasks, id);
            tasks = remaining;
            undo_buffer.remember(removed, now);
            persist_tasks(&store, &tasks);
            persist_undo(&store, &mut undo_buffer, now);
            println!("Deleted step {}. Restore it with: journey undo", id);
        }
        Commands::ClearCompleted => {
            let (remaining, removed) = clear_completed(&tasks);
            if removed.is_empty() {
                println!("No completed steps to clear");
                return;
            }
            tasks = remaining;
            undo_buffer.remember(removed, now);
            persist_tasks(&store, &tasks);
            persist_undo(&store, &mut undo_buffer, now);
            println!("Cleared completed steps. Restore them with: journey undo");
        }
        Commands::ClearSelected => {
            let (remaining, removed) = clear_selected(&tasks);
            if removed.is_empty() {
                println!("Select one or more steps to clear.");
                return;
            }
            tasks = remaining;
            undo_buffer.remember(removed, now);
            persist_tasks(&store, &tasks);
            persist_undo(&store, &mut undo_buffer, now);
            println!("Cleared selected steps. Restore them with: journey undo");
        }
        Commands::Undo => match undo_buffer.take(now) {
            Some(batch) => {
                let restored_count = batch.len();
                tasks = restore_deleted_tasks(&tasks, &batch);
                persist_tasks(&store, &tasks);
                if let Err(e) = store.clear_undo() {
                    ui::render_save_warning(&e.to_string());
                }
                dispatcher.dispatch("undo_used", &json!({ "restoredCount": restored_count }));
                let step_word = if restored_count == 1 { "step" } else { "steps" };
                println!("Restored {} {}", restored_count, step_word);
            }
            None => {
                println!("Nothing to undo. Deleted steps are only kept for a short while.");
            }
        },
        Commands::Note { id, text, clear } => {
            require_task(&tasks, id);

            if text.is_none() && !clear {
                // Toggle the note panel open or closed
                let open = next_open_note_id(store.open_note_id(), id);
                if let Err(e) = store.set_open_note_id(open) {
                    ui::render_save_warning(&e.to_string());
                }
                match open {
                    Some(open_id) => {
                        let task = tasks.iter().find(|t| t.id == open_id).expect("checked");
                        ui::render_task_line(task);
                        if task.has_note() {
                            ui::render_task_note(task);
                        } else {
                            println!("      {}", "No note yet".dimmed());
                        }
                    }
                    None => println!("Note closed"),
                }
                return;
            }

            let note = if clear {
                String::new()
            } else {
                text.unwrap_or_default()
            };
            // The command is the whole editing session: the scheduled save
            // flushes the way closing the note editor would.
            let mut saves = NoteDebouncer::new(NOTE_SAVE_DELAY);
            saves.schedule(id, now);
            if saves.flush(id) {
                tasks = update_task_note(&tasks, id, &note);
                persist_tasks(&store, &tasks);
            }

            let action = if note.trim().is_empty() {
                "cleared"
            } else {
                "added"
            };
            dispatcher.dispatch("note_used", &json!({ "action": action }));
            println!("Note {} for step {}", action, id);
        }
        Commands::Insights => {
            ui::render_insights(&compute_insights(&tasks));
        }
        Commands::Milestones { view } => {
            if let Some(value) = view {
                match completed_task_for_milestone(&tasks, Some(value)) {
                    Some(task) => {
                        println!(
                            "Milestone {}: {}",
                            value,
                            milestone_message(value).yellow()
                        );
                        ui::render_task_line(task);
                        if wisdom_visible(&tasks, settings.wisdom_enabled) {
                            show_wisdom_for(task, &store, false);
                        }
                    }
                    None => println!("No completed steps yet"),
                }
                return;
            }

            let insights = compute_insights(&tasks);
            let state =
                derive_milestone_state(insights.completed_tasks as u32, &MILESTONE_THRESHOLDS);
            let high_water = store.milestone_high_water();
            ui::render_milestones(&state, &MILESTONE_THRESHOLDS, high_water);
            if let Some(last) = state.last_unlocked
                && last > high_water
                && let Err(e) = store.set_milestone_high_water(last)
            {
                ui::render_save_warning(&e.to_string());
            }
        }
        Commands::Wisdom { refresh } => {
            if !settings.wisdom_enabled {
                println!("Wisdom quotes are turned off. Enable them with: journey settings wisdom on");
                return;
            }
            if !wisdom_visible(&tasks, settings.wisdom_enabled) {
                println!("Complete a step to unlock a bit of wisdom");
                return;
            }
            let task = completed_task_for_milestone(&tasks, None).expect("has completed tasks");
            show_wisdom_for(task, &store, refresh);
        }
        Commands::Theme { name } => match name {
            Some(name) => {
                settings.apply_theme(&name);
                if let Err(e) = store.save_settings(&settings) {
                    ui::render_save_warning(&e.to_string());
                }
                dispatcher.dispatch("theme_changed", &json!({ "theme": settings.theme }));
                println!("Theme set to {}", settings.theme.bold());
            }
            None => {
                println!("Current theme: {}", settings.theme.bold());
                println!("Available themes: {}", SUPPORTED_THEMES.join(", "));
            }
        },
        Commands::Settings(command) => {
            handle_settings(command, &store, &mut settings);
        }
        Commands::Export { path } => {
            let envelope = portable_export(&tasks, &settings);
            match path {
                Some(path) => {
                    if let Err(e) = std::fs::write(&path, &envelope) {
                        eprintln!("Error: Failed to write export to '{}': {}", path.display(), e);
                        std::process::exit(1);
                    }
                    println!("Exported {} steps to {}", tasks.len(), path.display());
                }
                None => println!("{}", envelope),
            }
        }
        Commands::Import { path } => {
            let text = std::fs::read_to_string(&path).unwrap_or_else(|e| {
                eprintln!("Error: Failed to read '{}': {}", path.display(), e);
                std::process::exit(1);
            });

            let mut ids = TaskIdGenerator::new();
            let imported = storage::portable::parse_journey_import(&text, &mut || ids.next())
                .unwrap_or_else(|e| {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                });

            tasks = imported.tasks;
            settings = imported.settings;
            persist_tasks(&store, &tasks);
            if let Err(e) = store.save_settings(&settings) {
                ui::render_save_warning(&e.to_string());
            }
            println!("Imported {} steps from {}", tasks.len(), path.display());
        }
        Commands::Analytics(command) => match command {
            AnalyticsCommands::Show => {
                let snapshot = LocalAggregateStore::new(&kv).read_snapshot();
                if snapshot.total == 0 {
                    println!("No analytics recorded yet");
                    return;
                }
                ui::render_section_header("Analytics");
                println!("  {}  {}\n", "Total events".dimmed(), snapshot.total);
                for (event, bucket) in &snapshot.events {
                    println!("  {}  {}", format!("{:>4}", bucket.count).bold(), event);
                    for (variant, count) in &bucket.variants {
                        println!("        {} {}", format!("{:>3}×", count).dimmed(), variant.dimmed());
                    }
                }
            }
            AnalyticsCommands::Reset => {
                LocalAggregateStore::new(&kv).clear();
                println!("Analytics aggregate cleared");
            }
        },
    }
}

fn require_task(tasks: &[Task], id: i64) {
    if !tasks.iter().any(|task| task.id == id) {
        eprintln!("Error: No step with id {} found", id);
        std::process::exit(1);
    }
}

fn validate_tag(kind: &str, value: Option<String>, allowed: &[&str]) -> String {
    match value {
        None => String::new(),
        Some(value) if allowed.contains(&value.as_str()) => value,
        Some(value) => {
            eprintln!("Error: Unknown {} '{}'", kind, value);
            eprintln!("\nAvailable values: {}", allowed.join(", "));
            std::process::exit(1);
        }
    }
}

fn persist_tasks<S: KeyValue>(store: &JourneyStore<S>, tasks: &[Task]) {
    match store.save_tasks(tasks) {
        Ok(()) => ui::render_saved(),
        Err(e) => ui::render_save_warning(&e.to_string()),
    }
}

fn persist_undo<S: KeyValue>(store: &JourneyStore<S>, buffer: &mut UndoBuffer, now: Timestamp) {
    let deadline = buffer.deadline();
    let snapshot = buffer.peek(now).map(|batch| batch.to_vec());
    let result = match (snapshot, deadline) {
        (Some(batch), Some(deadline)) => store.save_undo(&batch, deadline),
        _ => store.clear_undo(),
    };
    if let Err(e) = result {
        ui::render_save_warning(&e.to_string());
    }
}

fn celebrate_new_milestones<S: KeyValue>(store: &JourneyStore<S>, tasks: &[Task]) {
    let insights = compute_insights(tasks);
    let state = derive_milestone_state(insights.completed_tasks as u32, &MILESTONE_THRESHOLDS);
    let high_water = store.milestone_high_water();
    if let Some(last) = state.last_unlocked
        && last > high_water
    {
        println!(
            "\n  {}",
            format!("🎉 Milestone {}: {}", last, milestone_message(last))
                .yellow()
                .bold()
        );
        if let Err(e) = store.set_milestone_high_water(last) {
            ui::render_save_warning(&e.to_string());
        }
    }
}

fn show_wisdom_for<S: KeyValue>(task: &Task, store: &JourneyStore<S>, refresh: bool) {
    let wisdom_set = default_wisdom_set();
    let last_text = store.last_wisdom_text();
    let exclude = resolve_exclude_text(&last_text, refresh);
    let mut rng = rand::rng();
    if let Some(quote) = pick_quote_for_task(task, &wisdom_set, exclude, &mut rng) {
        ui::render_quote(quote);
        if let Err(e) = store.set_last_wisdom_text(&quote.text) {
            ui::render_save_warning(&e.to_string());
        }
    }
}

fn portable_export(tasks: &[Task], settings: &Settings) -> String {
    let envelope = storage::portable::create_journey_export(tasks, settings);
    storage::portable::serialize_journey_export(&envelope).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    })
}

fn handle_settings<S: KeyValue>(
    command: SettingsCommands,
    store: &JourneyStore<S>,
    settings: &mut Settings,
) {
    let parse_state = |state: &str| match state {
        "on" => true,
        "off" => false,
        other => {
            eprintln!("Error: Expected 'on' or 'off', got '{}'", other);
            std::process::exit(1);
        }
    };

    match command {
        SettingsCommands::Show => {
            ui::render_section_header("Settings");
            println!("  theme      {}", settings.theme.bold());
            println!("  wisdom     {}", on_off(settings.wisdom_enabled));
            println!("  artful     {}", on_off(settings.artful_mode));
            println!("  analytics  {}", on_off(settings.analytics_opt_in));
            return;
        }
        SettingsCommands::Wisdom { state } => {
            settings.wisdom_enabled = parse_state(&state);
            println!("Wisdom quotes {}", on_off(settings.wisdom_enabled));
        }
        SettingsCommands::Artful { state } => {
            let enabled = parse_state(&state);
            if enabled && settings.theme == "high-contrast" {
                eprintln!("Error: Artful mode is unavailable with the high-contrast theme");
                std::process::exit(1);
            }
            settings.artful_mode = enabled;
            println!("Artful mode {}", on_off(settings.artful_mode));
        }
        SettingsCommands::Analytics { state } => {
            settings.analytics_opt_in = parse_state(&state);
            println!("Local analytics {}", on_off(settings.analytics_opt_in));
        }
    }

    if let Err(e) = store.save_settings(settings) {
        ui::render_save_warning(&e.to_string());
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}
