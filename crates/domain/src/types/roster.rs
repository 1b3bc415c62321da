//! Team roster types

use serde::{Deserialize, Serialize};

use super::status::Status;

/// Closed set of class tokens the roster view uses for per-agent status
///
/// Roster status comes from indicator class tokens only, never from the
/// free-text keyword table used for "my status".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatusToken {
    Available,
    Ringing,
    Busy,
    Away,
    Offline,
}

impl AgentStatusToken {
    /// Parse a single CSS class token.
    pub fn from_class(class: &str) -> Option<Self> {
        match class.trim().to_ascii_lowercase().as_str() {
            "available" | "online" => Some(Self::Available),
            "ringing" => Some(Self::Ringing),
            "busy" | "oncall" | "on-call" | "dnd" => Some(Self::Busy),
            "away" | "idle" => Some(Self::Away),
            "offline" | "unregistered" => Some(Self::Offline),
            _ => None,
        }
    }

    pub fn as_status(self) -> Status {
        match self {
            Self::Available => Status::Available,
            Self::Ringing => Status::Ringing,
            Self::Busy => Status::OnCall,
            Self::Away => Status::Away,
            Self::Offline => Status::Offline,
        }
    }
}

/// One team member in the roster snapshot
///
/// The roster is a full-replace list re-derived each scrape cycle; agents
/// are matched across snapshots by `extension` only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentEntry {
    /// Extension number, unique within one snapshot
    pub extension: String,

    /// Display name; rows with an empty name are discarded upstream
    pub name: String,

    pub status: Status,

    /// Comma-joined queue names, possibly empty
    pub queues: String,

    pub queue_count: u32,

    /// Hex color for the roster UI. Deliberately independent from the LED
    /// color scheme; the dashboard palette is a UI concern.
    pub display_color: String,
}

impl AgentEntry {
    /// Roster display color for a status (dashboard palette, not the LED
    /// scheme).
    pub fn display_color_for(status: Status) -> &'static str {
        match status {
            Status::Available => "#4caf50",
            Status::Ringing => "#ffeb3b",
            Status::OnCall => "#f44336",
            Status::Dnd => "#9c27b0",
            Status::Away => "#ff9800",
            Status::Offline => "#607d8b",
        }
    }
}
