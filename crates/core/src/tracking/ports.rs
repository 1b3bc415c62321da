//! Port interfaces for presence tracking
//!
//! These traits define the boundaries between core business logic and
//! infrastructure implementations. Markup drift in the scraped application
//! stays isolated behind [`PresenceInspector`]; LED protocol details behind
//! [`LedController`].

use async_trait::async_trait;
use deskglow_domain::{AgentEntry, CallStats, Color, StatusReading};

/// Trait for reading presence state off the phone system's web client
///
/// Every method is tolerant of a missing container: it returns a neutral
/// default rather than an error, so a wrong view or mid-render page never
/// aborts a collection cycle.
#[async_trait]
pub trait PresenceInspector: Send + Sync {
    /// Read the current user's own status. Defaults to
    /// [`StatusReading::fallback`] when nothing matches.
    async fn read_status(&self) -> StatusReading;

    /// Read the call-queue statistics table.
    ///
    /// Returns zeroed stats when the table is simply absent; `None` only on
    /// an unexpected extraction failure.
    async fn fetch_call_stats(&self) -> Option<CallStats>;

    /// Read the all-agents roster.
    ///
    /// Returns `None` when the roster container itself is absent ("feature
    /// unavailable this cycle"); an empty vec when it exists but lists no
    /// agents.
    async fn fetch_agent_statuses(&self) -> Option<Vec<AgentEntry>>;

    /// Consume the in-page mutation flag, returning whether relevant DOM
    /// subtrees changed since the last call.
    async fn take_mutation_flag(&self) -> bool;
}

/// Last known LED device state, read back from the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedDeviceState {
    pub on: bool,
    pub brightness: u8,
    pub color: Option<Color>,
}

/// Trait for commanding the LED device
///
/// All commands are fire-and-report: an unreachable device yields `false`,
/// never an error, because the LED being down must not stop presence
/// tracking. Sending the same color twice is safe and idempotent.
#[async_trait]
pub trait LedController: Send + Sync {
    /// Power on and show a solid color.
    async fn set_color(&self, color: Color, brightness: u8, transition_ms: u64) -> bool;

    /// Read back device state; `None` on failure.
    async fn get_state(&self) -> Option<LedDeviceState>;

    /// Power the device off (used at shutdown).
    async fn turn_off(&self) -> bool;

    /// Partial update: brightness only.
    async fn set_brightness(&self, brightness: u8) -> bool;

    /// Partial update: transition duration only.
    async fn set_transition(&self, transition_ms: u64) -> bool;
}
