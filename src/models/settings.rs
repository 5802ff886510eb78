use serde::{Deserialize, Serialize};

/// Themes the terminal renderer understands.
pub const SUPPORTED_THEMES: [&str; 5] = ["comfort", "forest", "ocean", "dark", "high-contrast"];

pub const DEFAULT_THEME: &str = "comfort";

/// User preferences, persisted on every change and carried verbatim in
/// the portable export format (hence the camelCase field names).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Settings {
    pub theme: String,
    #[serde(rename = "wisdomEnabled")]
    pub wisdom_enabled: bool,
    #[serde(rename = "artfulMode")]
    pub artful_mode: bool,
    #[serde(rename = "analyticsOptIn")]
    pub analytics_opt_in: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            wisdom_enabled: true,
            artful_mode: false,
            analytics_opt_in: false,
        }
    }
}

/// Maps the legacy "default" value and anything unrecognized to the
/// default theme.
pub fn normalize_theme(theme: &str) -> &str {
    if theme == "default" {
        return DEFAULT_THEME;
    }
    if SUPPORTED_THEMES.contains(&theme) {
        theme
    } else {
        DEFAULT_THEME
    }
}

impl Settings {
    /// The high-contrast theme disables artful mode; everything else
    /// leaves the flag alone.
    pub fn apply_theme(&mut self, theme: &str) {
        let normalized = normalize_theme(theme);
        self.theme = normalized.to_string();
        if normalized == "high-contrast" {
            self.artful_mode = false;
        }
    }
}
