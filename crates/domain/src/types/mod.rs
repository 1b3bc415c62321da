//! Domain types and models

pub mod roster;
pub mod snapshot;
pub mod stats;
pub mod status;

pub use roster::{AgentEntry, AgentStatusToken};
pub use snapshot::{
    AuthState, CycleTrigger, ManualOverrideInfo, PresenceSnapshot, StateSnapshot,
};
pub use stats::{CallStats, CallStatsOverlay, StatsSource};
pub use status::{Color, RawStatusSignal, Status, StatusReading};
