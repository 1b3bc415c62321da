//! Status → LED color mapping
//!
//! Fixed default table, overridable per status from configuration without a
//! code change.

use std::collections::HashMap;

use deskglow_domain::{Color, Status};

/// Total, deterministic mapping from status to LED color.
#[derive(Debug, Clone)]
pub struct ColorScheme {
    overrides: HashMap<Status, Color>,
}

impl ColorScheme {
    /// Scheme with the built-in defaults only.
    pub fn new() -> Self {
        Self { overrides: HashMap::new() }
    }

    /// Scheme with per-status RGB overrides from configuration.
    pub fn with_overrides(overrides: &HashMap<Status, [u8; 3]>) -> Self {
        let overrides =
            overrides.iter().map(|(status, rgb)| (*status, Color::from(*rgb))).collect();
        Self { overrides }
    }

    /// Color for a status; falls back to the built-in table.
    pub fn color_for(&self, status: Status) -> Color {
        self.overrides.get(&status).copied().unwrap_or_else(|| default_color(status))
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::new()
    }
}

const fn default_color(status: Status) -> Color {
    match status {
        Status::Available => Color::new(0, 255, 0),
        Status::Ringing => Color::new(255, 255, 0),
        Status::OnCall => Color::new(255, 0, 0),
        Status::Dnd => Color::new(128, 0, 128),
        Status::Away => Color::new(255, 165, 0),
        Status::Offline => Color::new(0, 0, 255),
    }
}
