//! Configuration structures
//!
//! Typed configuration for the LED device, the presence scraper, screenshot
//! diagnostics, and the dashboard server. Loading (environment variables,
//! file probing) lives in the infra crate; this module only defines the
//! shapes and defaults.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BRIGHTNESS, DEFAULT_REFRESH_INTERVAL_MS, DEFAULT_TRANSITION_MS,
    LOGIN_WAIT_CEILING_SECS, SCREENSHOT_MAX_PER_SESSION, SCREENSHOT_MIN_INTERVAL_SECS,
};
use crate::types::Status;

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub led: LedConfig,
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub screenshots: ScreenshotConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// WLED device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedConfig {
    /// Device address (IP or hostname), required
    pub address: String,

    /// Master brightness 0-255
    #[serde(default = "default_brightness")]
    pub brightness: u8,

    /// Color fade duration in milliseconds; the device wants seconds and
    /// the adapter converts
    #[serde(default = "default_transition_ms")]
    pub transition_ms: u64,

    /// Per-status RGB overrides for the default color table
    #[serde(default)]
    pub colors: HashMap<Status, [u8; 3]>,
}

/// Presence scraper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// 3CX web client URL, required
    pub target_url: String,

    /// WebDriver endpoint driving the browser session
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Fixed poll interval between collection cycles
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// Run the browser headless; switched off for the interactive login
    /// fallback
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Where persisted session cookies are stored
    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,

    /// Ceiling for the human-in-the-loop login wait
    #[serde(default = "default_login_timeout_secs")]
    pub login_timeout_secs: u64,
}

/// Screenshot diagnostics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Minimum spacing between shots
    #[serde(default = "default_screenshot_interval_secs")]
    pub min_interval_secs: u64,

    /// Hard cap per scraper session
    #[serde(default = "default_screenshot_max")]
    pub max_per_session: u32,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_interval_secs: SCREENSHOT_MIN_INTERVAL_SECS,
            max_per_session: SCREENSHOT_MAX_PER_SESSION,
        }
    }
}

/// Dashboard server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

fn default_brightness() -> u8 {
    DEFAULT_BRIGHTNESS
}

fn default_transition_ms() -> u64 {
    DEFAULT_TRANSITION_MS
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_refresh_interval_ms() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MS
}

fn default_true() -> bool {
    true
}

fn default_cookie_path() -> String {
    "deskglow-cookies.json".to_string()
}

fn default_login_timeout_secs() -> u64 {
    LOGIN_WAIT_CEILING_SECS
}

fn default_screenshot_interval_secs() -> u64 {
    SCREENSHOT_MIN_INTERVAL_SECS
}

fn default_screenshot_max() -> u32 {
    SCREENSHOT_MAX_PER_SESSION
}

fn default_port() -> u16 {
    3000
}
