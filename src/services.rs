pub mod analytics;
pub mod insights;
pub mod tasks;
pub mod undo;
pub mod wisdom;
