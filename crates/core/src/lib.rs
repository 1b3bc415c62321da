//! # Deskglow Core
//!
//! Business logic for presence tracking: signal normalization, status
//! coloring, and the reconciliation service that owns application state.
//!
//! ## Architecture
//! - Defines port traits implemented by `deskglow-infra`
//! - Depends on `deskglow-domain` only
//! - No I/O beyond the injected ports

pub mod status;
pub mod tracking;

// Re-export commonly used items
pub use status::colors::ColorScheme;
pub use status::normalizer::normalize;
pub use tracking::debounce::MutationDebouncer;
pub use tracking::ports::{LedController, LedDeviceState, PresenceInspector};
pub use tracking::reconciler::{ReconcilerConfig, ReconcilerService};
