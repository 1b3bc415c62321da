//! WLED JSON API adapter
//!
//! Implements the [`LedController`] port against a WLED device's
//! `http://{address}/json` endpoint. Every command is fire-and-report: a
//! device that is off the network yields `false` and a log line, never an
//! error, because an unreachable LED strip must not stop presence tracking.

use std::time::Duration;

use async_trait::async_trait;
use deskglow_core::{LedController, LedDeviceState};
use deskglow_domain::{Color, DeskglowError, LedConfig, Result};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::http::{HttpClient, RetryPolicy};

const DEVICE_TIMEOUT_SECS: u64 = 5;

/// Effect 0 is WLED's built-in "solid" effect.
const EFFECT_SOLID: u8 = 0;
const EFFECT_SPEED_DEFAULT: u8 = 128;
const EFFECT_INTENSITY_DEFAULT: u8 = 128;

/// Locally cached device settings, updated on successful partial commands.
#[derive(Debug, Clone)]
pub struct WledClientConfig {
    pub brightness: u8,
    pub transition_ms: u64,
}

/// WLED HTTP JSON client.
pub struct WledClient {
    base_url: String,
    http_client: HttpClient,
    cached: Mutex<WledClientConfig>,
}

/// Segment command payload (`seg: [{col: [[r,g,b]], fx, sx, ix}]`).
#[derive(Debug, Serialize)]
struct SegmentCommand {
    col: Vec<[u8; 3]>,
    fx: u8,
    sx: u8,
    ix: u8,
}

/// State-changing command body; absent fields leave device state untouched.
#[derive(Debug, Serialize)]
struct StateCommand {
    #[serde(skip_serializing_if = "Option::is_none")]
    on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bri: Option<u8>,
    /// Device-native unit is seconds; milliseconds are converted by /1000
    #[serde(skip_serializing_if = "Option::is_none")]
    transition: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seg: Option<Vec<SegmentCommand>>,
}

#[derive(Debug, Deserialize)]
struct SegmentState {
    #[serde(default)]
    col: Vec<Vec<u8>>,
}

#[derive(Debug, Deserialize)]
struct DeviceStateBody {
    on: bool,
    bri: u8,
    #[serde(default)]
    seg: Vec<SegmentState>,
}

impl WledClient {
    /// Create a client for the configured device address.
    pub fn new(config: &LedConfig) -> Result<Self> {
        if config.address.trim().is_empty() {
            return Err(DeskglowError::Config("LED device address cannot be empty".into()));
        }

        let base_url = if config.address.starts_with("http") {
            format!("{}/json", config.address.trim_end_matches('/'))
        } else {
            format!("http://{}/json", config.address)
        };

        let http_client = HttpClient::with_policy(RetryPolicy {
            timeout: Duration::from_secs(DEVICE_TIMEOUT_SECS),
            attempts: 2,
            ..RetryPolicy::default()
        })?;

        Ok(Self {
            base_url,
            http_client,
            cached: Mutex::new(WledClientConfig {
                brightness: config.brightness,
                transition_ms: config.transition_ms,
            }),
        })
    }

    /// Base URL override for tests.
    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Currently cached brightness/transition settings.
    pub async fn cached_config(&self) -> WledClientConfig {
        self.cached.lock().await.clone()
    }

    fn transition_seconds(transition_ms: u64) -> f64 {
        transition_ms as f64 / 1_000.0
    }

    /// POST a state command; logs and reports failure instead of erroring.
    async fn post_command(&self, command: &StateCommand) -> bool {
        let request = self.http_client.request(Method::POST, &self.base_url).json(command);

        match self.http_client.send(request).await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(status = %response.status(), "WLED device rejected command");
                false
            }
            Err(err) => {
                warn!(error = %err, "WLED device unreachable");
                false
            }
        }
    }
}

#[async_trait]
impl LedController for WledClient {
    async fn set_color(&self, color: Color, brightness: u8, transition_ms: u64) -> bool {
        debug!(r = color.r, g = color.g, b = color.b, brightness, transition_ms, "Setting LED color");
        let command = StateCommand {
            on: Some(true),
            bri: Some(brightness),
            transition: Some(Self::transition_seconds(transition_ms)),
            seg: Some(vec![SegmentCommand {
                col: vec![color.as_array()],
                fx: EFFECT_SOLID,
                sx: EFFECT_SPEED_DEFAULT,
                ix: EFFECT_INTENSITY_DEFAULT,
            }]),
        };
        self.post_command(&command).await
    }

    async fn get_state(&self) -> Option<LedDeviceState> {
        let request = self.http_client.request(Method::GET, &self.base_url);
        let response = match self.http_client.send(request).await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(status = %response.status(), "WLED state read failed");
                return None;
            }
            Err(err) => {
                warn!(error = %err, "WLED state read failed");
                return None;
            }
        };

        let body: DeviceStateBody = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "WLED state body was not valid JSON");
                return None;
            }
        };

        let color = body
            .seg
            .first()
            .and_then(|segment| segment.col.first())
            .filter(|rgb| rgb.len() >= 3)
            .map(|rgb| Color::new(rgb[0], rgb[1], rgb[2]));

        Some(LedDeviceState { on: body.on, brightness: body.bri, color })
    }

    async fn turn_off(&self) -> bool {
        debug!("Turning LED device off");
        let command = StateCommand { on: Some(false), bri: None, transition: None, seg: None };
        self.post_command(&command).await
    }

    async fn set_brightness(&self, brightness: u8) -> bool {
        let command =
            StateCommand { on: None, bri: Some(brightness), transition: None, seg: None };
        let ok = self.post_command(&command).await;
        if ok {
            self.cached.lock().await.brightness = brightness;
        }
        ok
    }

    async fn set_transition(&self, transition_ms: u64) -> bool {
        let command = StateCommand {
            on: None,
            bri: None,
            transition: Some(Self::transition_seconds(transition_ms)),
            seg: None,
        };
        let ok = self.post_command(&command).await;
        if ok {
            self.cached.lock().await.transition_ms = transition_ms;
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> WledClient {
        let config = LedConfig {
            address: "device.invalid".into(),
            brightness: 200,
            transition_ms: 1_000,
            colors: HashMap::new(),
        };
        WledClient::new(&config)
            .expect("client")
            .with_base_url(format!("{}/json", server.uri()))
    }

    #[tokio::test]
    async fn set_color_posts_full_segment_command() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json"))
            .and(body_partial_json(json!({
                "on": true,
                "bri": 200,
                "transition": 1.0,
                "seg": [{"col": [[255, 0, 0]], "fx": 0, "sx": 128, "ix": 128}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.set_color(Color::new(255, 0, 0), 200, 1_000).await);
    }

    #[tokio::test]
    async fn set_color_is_idempotent_across_identical_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.set_color(Color::new(0, 255, 0), 128, 500).await);
        assert!(client.set_color(Color::new(0, 255, 0), 128, 500).await);
    }

    #[tokio::test]
    async fn server_error_yields_false_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(!client.set_color(Color::new(255, 0, 0), 200, 1_000).await);
    }

    #[tokio::test]
    async fn unreachable_device_yields_false() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        drop(server); // nothing listening any more

        assert!(!client.turn_off().await);
    }

    #[tokio::test]
    async fn get_state_reads_back_color_and_power() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "on": true,
                "bri": 180,
                "seg": [{"col": [[128, 0, 128]]}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let state = client.get_state().await.expect("state");
        assert_eq!(
            state,
            LedDeviceState { on: true, brightness: 180, color: Some(Color::new(128, 0, 128)) }
        );
    }

    #[tokio::test]
    async fn partial_updates_refresh_cached_config() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.set_brightness(90).await);
        assert!(client.set_transition(2_500).await);

        let cached = client.cached_config().await;
        assert_eq!(cached.brightness, 90);
        assert_eq!(cached.transition_ms, 2_500);
    }

    #[tokio::test]
    async fn turn_off_sends_power_off_only() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json"))
            .and(body_partial_json(json!({"on": false})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.turn_off().await);
    }
}
