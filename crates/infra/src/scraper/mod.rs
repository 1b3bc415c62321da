//! Presence scraper
//!
//! Drives a browser session against the 3CX web client and extracts presence
//! state from a UI it does not control. Split into:
//! - `session`: the per-session state machine (auth, navigation, recovery)
//! - `inspector`: the read-only extraction queries and their heuristics
//! - `cookies`: persisted session-cookie store
//! - `screenshot`: diagnostic screenshot rate limiting
//! - `scripts`: the JavaScript snippets executed in the page

pub mod cookies;
pub mod inspector;
pub mod screenshot;
pub mod scripts;
pub mod session;

pub use inspector::SwitchboardInspector;
pub use session::{ScraperSession, SessionPhase};
