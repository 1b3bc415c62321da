//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Scrape cycle timing
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 7_000;
pub const MUTATION_DEBOUNCE_MS: u64 = 500;

// Browser session bounds
pub const LOGIN_WAIT_CEILING_SECS: u64 = 600;
pub const LOGIN_POLL_INTERVAL_SECS: u64 = 5;
pub const NAVIGATION_WAIT_MS: u64 = 5_000;
pub const NAVIGATION_POLL_MS: u64 = 100;

// Cookies expiring sooner than this are not worth persisting
pub const COOKIE_MIN_TTL_SECS: i64 = 86_400;

// Screenshot caps
pub const SCREENSHOT_MIN_INTERVAL_SECS: u64 = 60;
pub const SCREENSHOT_MAX_PER_SESSION: u32 = 20;

// Manual override window
pub const OVERRIDE_TIMEOUT_SECS: u64 = 900;

// LED device defaults
pub const DEFAULT_BRIGHTNESS: u8 = 128;
pub const DEFAULT_TRANSITION_MS: u64 = 1_000;

// Dashboard connection liveness
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

// Graceful shutdown hard deadline
pub const SHUTDOWN_DEADLINE_SECS: u64 = 5;
