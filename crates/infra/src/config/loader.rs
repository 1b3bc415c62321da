//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `DESKGLOW_LED_ADDRESS`: WLED device address (required)
//! - `DESKGLOW_LED_BRIGHTNESS`: Master brightness 0-255
//! - `DESKGLOW_LED_TRANSITION_MS`: Color fade duration in milliseconds
//! - `DESKGLOW_TARGET_URL`: 3CX web client URL (required)
//! - `DESKGLOW_WEBDRIVER_URL`: WebDriver endpoint
//! - `DESKGLOW_REFRESH_INTERVAL_MS`: Poll interval between collection cycles
//! - `DESKGLOW_HEADLESS`: Run the browser headless (true/false)
//! - `DESKGLOW_COOKIE_PATH`: Session cookie store location
//! - `DESKGLOW_LOGIN_TIMEOUT_SECS`: Interactive login wait ceiling
//! - `DESKGLOW_SCREENSHOTS_ENABLED`: Diagnostic screenshots (true/false)
//! - `DESKGLOW_SERVER_PORT`: Dashboard server port
//!
//! Per-status color overrides have no environment form; use a config file.
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./deskglow.json` or `./deskglow.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use deskglow_domain::constants::{
    DEFAULT_BRIGHTNESS, DEFAULT_REFRESH_INTERVAL_MS, DEFAULT_TRANSITION_MS,
    LOGIN_WAIT_CEILING_SECS,
};
use deskglow_domain::{
    Config, DeskglowError, LedConfig, Result, ScraperConfig, ScreenshotConfig, ServerConfig,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `DeskglowError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// The LED address and target URL must be present; everything else falls
/// back to its default.
///
/// # Errors
/// Returns `DeskglowError::Config` if required variables are missing or
/// have invalid values.
pub fn load_from_env() -> Result<Config> {
    let led_address = env_var("DESKGLOW_LED_ADDRESS")?;
    let led_brightness = env_parse("DESKGLOW_LED_BRIGHTNESS", DEFAULT_BRIGHTNESS)?;
    let led_transition_ms = env_parse("DESKGLOW_LED_TRANSITION_MS", DEFAULT_TRANSITION_MS)?;

    let target_url = env_var("DESKGLOW_TARGET_URL")?;
    let webdriver_url = std::env::var("DESKGLOW_WEBDRIVER_URL")
        .unwrap_or_else(|_| "http://localhost:9515".to_string());
    let refresh_interval_ms =
        env_parse("DESKGLOW_REFRESH_INTERVAL_MS", DEFAULT_REFRESH_INTERVAL_MS)?;
    let headless = env_bool("DESKGLOW_HEADLESS", true);
    let cookie_path = std::env::var("DESKGLOW_COOKIE_PATH")
        .unwrap_or_else(|_| "deskglow-cookies.json".to_string());
    let login_timeout_secs =
        env_parse("DESKGLOW_LOGIN_TIMEOUT_SECS", LOGIN_WAIT_CEILING_SECS)?;

    let screenshots = ScreenshotConfig {
        enabled: env_bool("DESKGLOW_SCREENSHOTS_ENABLED", false),
        ..ScreenshotConfig::default()
    };
    let server = ServerConfig { port: env_parse("DESKGLOW_SERVER_PORT", 3000)? };

    Ok(Config {
        led: LedConfig {
            address: led_address,
            brightness: led_brightness,
            transition_ms: led_transition_ms,
            colors: HashMap::new(),
        },
        scraper: ScraperConfig {
            target_url,
            webdriver_url,
            refresh_interval_ms,
            headless,
            cookie_path,
            login_timeout_secs,
        },
        screenshots,
        server,
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `DeskglowError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(DeskglowError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            DeskglowError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| DeskglowError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| DeskglowError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| DeskglowError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(DeskglowError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, up to two parent levels, and the
/// executable's directory.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("deskglow.json"),
            cwd.join("deskglow.toml"),
            cwd.join("../config.json"),
            cwd.join("../config.toml"),
            cwd.join("../../config.json"),
            cwd.join("../../config.toml"),
        ]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(vec![
                exe_dir.join("config.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("deskglow.json"),
                exe_dir.join("deskglow.toml"),
            ]);
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        DeskglowError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse an optional environment variable, falling back to a default when
/// unset. A set-but-unparseable value is an error, not a silent default.
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| DeskglowError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    fn clear_deskglow_env() {
        for key in [
            "DESKGLOW_LED_ADDRESS",
            "DESKGLOW_LED_BRIGHTNESS",
            "DESKGLOW_LED_TRANSITION_MS",
            "DESKGLOW_TARGET_URL",
            "DESKGLOW_WEBDRIVER_URL",
            "DESKGLOW_REFRESH_INTERVAL_MS",
            "DESKGLOW_HEADLESS",
            "DESKGLOW_COOKIE_PATH",
            "DESKGLOW_LOGIN_TIMEOUT_SECS",
            "DESKGLOW_SCREENSHOTS_ENABLED",
            "DESKGLOW_SERVER_PORT",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("TEST_BOOL_TRUE_1", "1");
        std::env::set_var("TEST_BOOL_TRUE_YES", "yes");
        std::env::set_var("TEST_BOOL_TRUE_UPPER", "TRUE");
        std::env::set_var("TEST_BOOL_FALSE_0", "0");
        std::env::set_var("TEST_BOOL_FALSE_OFF", "off");

        assert!(env_bool("TEST_BOOL_TRUE_1", false));
        assert!(env_bool("TEST_BOOL_TRUE_YES", false));
        assert!(env_bool("TEST_BOOL_TRUE_UPPER", false));
        assert!(!env_bool("TEST_BOOL_FALSE_0", true));
        assert!(!env_bool("TEST_BOOL_FALSE_OFF", true));

        std::env::remove_var("TEST_BOOL_MISSING");
        assert!(env_bool("TEST_BOOL_MISSING", true));
        assert!(!env_bool("TEST_BOOL_MISSING", false));

        std::env::remove_var("TEST_BOOL_TRUE_1");
        std::env::remove_var("TEST_BOOL_TRUE_YES");
        std::env::remove_var("TEST_BOOL_TRUE_UPPER");
        std::env::remove_var("TEST_BOOL_FALSE_0");
        std::env::remove_var("TEST_BOOL_FALSE_OFF");
    }

    #[test]
    fn test_load_from_env_required_and_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_deskglow_env();

        std::env::set_var("DESKGLOW_LED_ADDRESS", "192.168.1.50");
        std::env::set_var("DESKGLOW_TARGET_URL", "https://pbx.example.com/webclient");
        std::env::set_var("DESKGLOW_LED_BRIGHTNESS", "200");
        std::env::set_var("DESKGLOW_HEADLESS", "false");

        let config = load_from_env().expect("should load from env");
        assert_eq!(config.led.address, "192.168.1.50");
        assert_eq!(config.led.brightness, 200);
        assert_eq!(config.led.transition_ms, DEFAULT_TRANSITION_MS);
        assert_eq!(config.scraper.target_url, "https://pbx.example.com/webclient");
        assert_eq!(config.scraper.webdriver_url, "http://localhost:9515");
        assert_eq!(config.scraper.refresh_interval_ms, DEFAULT_REFRESH_INTERVAL_MS);
        assert!(!config.scraper.headless);
        assert_eq!(config.server.port, 3000);
        assert!(!config.screenshots.enabled);

        clear_deskglow_env();
    }

    #[test]
    fn test_load_from_env_missing_required_var() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_deskglow_env();

        let result = load_from_env();
        assert!(result.is_err(), "Should fail with missing env var");
        assert!(matches!(result.unwrap_err(), DeskglowError::Config(_)));
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_deskglow_env();

        std::env::set_var("DESKGLOW_LED_ADDRESS", "192.168.1.50");
        std::env::set_var("DESKGLOW_TARGET_URL", "https://pbx.example.com");
        std::env::set_var("DESKGLOW_LED_BRIGHTNESS", "not-a-number");

        let result = load_from_env();
        assert!(result.is_err(), "Should fail with invalid brightness");
        assert!(matches!(result.unwrap_err(), DeskglowError::Config(_)));

        clear_deskglow_env();
    }

    #[test]
    fn test_load_from_file_json() {
        let json_content = r#"{
            "led": {
                "address": "192.168.1.50",
                "brightness": 180,
                "colors": { "onCall": [255, 0, 0] }
            },
            "scraper": {
                "target_url": "https://pbx.example.com/webclient"
            }
        }"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(json_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("json");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let config = load_from_file(Some(path.clone())).expect("should load JSON config");
        assert_eq!(config.led.address, "192.168.1.50");
        assert_eq!(config.led.brightness, 180);
        assert_eq!(
            config.led.colors.get(&deskglow_domain::Status::OnCall),
            Some(&[255u8, 0, 0])
        );
        assert_eq!(config.scraper.refresh_interval_ms, DEFAULT_REFRESH_INTERVAL_MS);
        assert_eq!(config.server.port, 3000);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_toml() {
        let toml_content = r#"
[led]
address = "wled-desk.local"

[scraper]
target_url = "https://pbx.example.com/webclient"
refresh_interval_ms = 5000
headless = false

[server]
port = 8080
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("toml");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let config = load_from_file(Some(path.clone())).expect("should load TOML config");
        assert_eq!(config.led.address, "wled-desk.local");
        assert_eq!(config.led.brightness, DEFAULT_BRIGHTNESS);
        assert_eq!(config.scraper.refresh_interval_ms, 5000);
        assert!(!config.scraper.headless);
        assert_eq!(config.server.port, 8080);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/config.json")));
        assert!(result.is_err(), "Should fail when file not found");
        assert!(matches!(result.unwrap_err(), DeskglowError::Config(_)));
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let invalid_json = r#"{ "this is": "not valid json" "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_json.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("json");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let result = load_from_file(Some(path.clone()));
        assert!(result.is_err(), "Should fail with invalid JSON");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let content = "some content";
        let path = PathBuf::from("test.yaml");
        let result = parse_config(content, &path);
        assert!(result.is_err(), "Should fail with unsupported format");
    }
}
