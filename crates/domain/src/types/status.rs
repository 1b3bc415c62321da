//! Presence status and color types

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Presence status as reported by the phone system
///
/// Exactly one value is active for "my status" at any time. Unknown raw
/// signals fall back to `Available` at the extraction boundary (documented
/// quirk: a false "available" is preferred over a false "offline" that would
/// hide the calls display).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    Available,
    Ringing,
    OnCall,
    Dnd,
    Away,
    Offline,
}

impl Status {
    /// All status values, in display order.
    pub const ALL: [Status; 6] = [
        Status::Available,
        Status::Ringing,
        Status::OnCall,
        Status::Dnd,
        Status::Away,
        Status::Offline,
    ];
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Available => "available",
            Status::Ringing => "ringing",
            Status::OnCall => "onCall",
            Status::Dnd => "dnd",
            Status::Away => "away",
            Status::Offline => "offline",
        };
        write!(f, "{label}")
    }
}

/// RGB triple sent to the LED device
///
/// Never stored independently of a [`Status`]; always derived through the
/// color scheme table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Array form used by the WLED segment payload (`col: [[r,g,b]]`).
    pub fn as_array(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Color {
    fn from(rgb: [u8; 3]) -> Self {
        Self { r: rgb[0], g: rgb[1], b: rgb[2] }
    }
}

/// Raw signals lifted off one status-bearing page element
///
/// The normalizer consumes these without knowing which selector produced
/// them; class names are checked before text, text before attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStatusSignal {
    /// CSS class tokens on the matched element
    pub class_names: Vec<String>,

    /// Visible text content of the matched element
    pub text: String,

    /// Selected data attributes (name → value)
    pub attributes: HashMap<String, String>,
}

impl RawStatusSignal {
    /// Candidate strings in match-priority order: classes, then text, then
    /// attribute values.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        self.class_names
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.text.as_str()))
            .chain(self.attributes.values().map(String::as_str))
    }
}

/// A normalized status plus where it came from
///
/// `source` is a short human-readable tag (`"indicator-class"`,
/// `"status-text"`, `"default"`, `"manual"`) surfaced to the dashboard so
/// stale or defaulted readings are never mistaken for confident ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusReading {
    pub status: Status,
    pub source: String,
}

impl StatusReading {
    pub fn new(status: Status, source: impl Into<String>) -> Self {
        Self { status, source: source.into() }
    }

    /// The documented fallback when no selector matched anything.
    pub fn fallback() -> Self {
        Self::new(Status::Available, "default")
    }
}
