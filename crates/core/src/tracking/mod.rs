//! Presence tracking: ports, debounce, and the reconciliation service

pub mod debounce;
pub mod ports;
pub mod reconciler;
