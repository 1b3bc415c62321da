//! Scraper session lifecycle
//!
//! Owns the browser session from startup through authentication and
//! navigation into monitoring, and recovers it when the browser dies
//! underneath us. Authentication is cookie-first: persisted cookies are
//! replayed before falling back to a human-in-the-loop login wait.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine as _;
use chrono::Utc;
use deskglow_core::PresenceInspector;
use deskglow_domain::constants::{
    LOGIN_POLL_INTERVAL_SECS, NAVIGATION_POLL_MS, NAVIGATION_WAIT_MS,
};
use deskglow_domain::{
    AuthState, CallStats, CycleTrigger, PresenceSnapshot, Result, ScraperConfig, ScreenshotConfig,
    StatsSource, Status, StatusReading,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::cookies::CookieStore;
use super::screenshot::ScreenshotLimiter;
use super::scripts;
use super::SwitchboardInspector;
use crate::webdriver::WebDriverClient;

/// Selector for the switchboard view container; its presence is the
/// "navigation done" signal.
const SWITCHBOARD_CONTAINER: &str =
    ".agents-list, [data-qa='agents-panel'], #switchboardAgents, .queue-statistics";

/// Selector for links that lead to the switchboard view.
const SWITCHBOARD_LINK: &str =
    "a[href*='switchboard'], [data-qa='switchboard-tab'], a[href*='wallboard']";

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    /// Browser is up but the page is not authenticated yet
    Authenticating,
    Authenticated,
    Navigating,
    /// Observer installed, extraction queries are meaningful
    Monitoring,
    Closed,
}

/// Result of the in-page login probe script.
#[derive(Debug, Deserialize)]
struct LoginProbe {
    #[serde(default)]
    url: String,
    #[serde(rename = "loginForm", default)]
    login_form: bool,
    #[serde(rename = "loggedIn", default)]
    logged_in: bool,
    #[serde(rename = "hasAuthToken", default)]
    has_auth_token: bool,
}

impl LoginProbe {
    fn authenticated(&self) -> bool {
        !self.login_form && (self.logged_in || self.has_auth_token)
    }
}

/// Browser session against the phone system's web client.
pub struct ScraperSession {
    driver: Arc<WebDriverClient>,
    inspector: SwitchboardInspector,
    config: ScraperConfig,
    cookies: CookieStore,
    screenshots: Mutex<ScreenshotLimiter>,
    phase: Mutex<SessionPhase>,
    /// Set when the last initialization attempt hit a hard driver or
    /// browser error, cleared by the next attempt that gets further.
    auth_failed: AtomicBool,
}

impl ScraperSession {
    pub fn new(config: ScraperConfig, screenshots: &ScreenshotConfig) -> Result<Self> {
        let driver = Arc::new(WebDriverClient::new(&config.webdriver_url)?);
        let inspector = SwitchboardInspector::new(Arc::clone(&driver));
        let cookies = CookieStore::new(&config.cookie_path);
        Ok(Self {
            driver,
            inspector,
            config,
            cookies,
            screenshots: Mutex::new(ScreenshotLimiter::new(screenshots)),
            phase: Mutex::new(SessionPhase::Uninitialized),
            auth_failed: AtomicBool::new(false),
        })
    }

    pub async fn phase(&self) -> SessionPhase {
        *self.phase.lock().await
    }

    /// Authentication state as surfaced to dashboard clients.
    pub async fn auth_state(&self) -> AuthState {
        match self.phase().await {
            SessionPhase::Uninitialized | SessionPhase::Closed => AuthState::Unauthenticated,
            SessionPhase::Authenticating => {
                if self.auth_failed.load(Ordering::SeqCst) {
                    AuthState::Failed
                } else {
                    AuthState::AwaitingLogin
                }
            }
            SessionPhase::Authenticated
            | SessionPhase::Navigating
            | SessionPhase::Monitoring => AuthState::Authenticated,
        }
    }

    /// Bring the session up to the monitoring phase.
    ///
    /// Returns `Ok(false)` when the login wait timed out (the session stays
    /// in the authenticating phase and a later call may retry); hard browser
    /// or driver failures are errors and mark the auth state as failed
    /// until a later attempt succeeds.
    pub async fn initialize(&self) -> Result<bool> {
        let result = self.bring_up().await;
        self.auth_failed.store(result.is_err(), Ordering::SeqCst);
        result
    }

    async fn bring_up(&self) -> Result<bool> {
        self.set_phase(SessionPhase::Authenticating).await;

        if !self.driver.has_session().await {
            self.driver.start_session(self.config.headless).await?;
        }
        self.driver.navigate(&self.config.target_url).await?;

        self.replay_cookies().await?;

        if !self.wait_for_login().await? {
            warn!(
                timeout_secs = self.config.login_timeout_secs,
                "Login wait timed out; session left awaiting authentication"
            );
            self.capture_screenshot(true).await;
            return Ok(false);
        }
        self.set_phase(SessionPhase::Authenticated).await;
        self.persist_cookies().await;

        self.set_phase(SessionPhase::Navigating).await;
        if !self.navigate_to_switchboard().await {
            // Extraction degrades gracefully on the wrong view, so this is
            // not fatal.
            warn!("Could not reach the switchboard view; extraction may return defaults");
            self.capture_screenshot(false).await;
        }

        self.inspector.install_observer().await;
        self.set_phase(SessionPhase::Monitoring).await;
        info!("Scraper session monitoring");
        Ok(true)
    }

    /// Run one collection cycle.
    ///
    /// Never fails: a lost browser session demotes the phase back to
    /// authenticating and yields an error-tagged snapshot so downstream
    /// consumers see the outage instead of silence.
    pub async fn collect(&self, trigger: CycleTrigger) -> PresenceSnapshot {
        if let Err(err) = self.driver.current_url().await {
            warn!(error = %err, "Browser session lost during collection");
            self.set_phase(SessionPhase::Authenticating).await;
            self.capture_screenshot(true).await;
            return Self::error_snapshot(trigger);
        }

        let reading = self.inspector.read_status().await;
        let stats = self.inspector.fetch_call_stats().await;
        let roster = self.inspector.fetch_agent_statuses().await;

        PresenceSnapshot { reading, stats, roster, trigger, collected_at: Utc::now() }
    }

    /// Consume the in-page mutation flag.
    pub async fn take_mutation_flag(&self) -> bool {
        self.inspector.take_mutation_flag().await
    }

    /// Attempt to recover a session that fell out of monitoring.
    pub async fn recover(&self) -> Result<bool> {
        // The old session id is useless after a browser crash; drop it so
        // initialize opens a fresh one.
        self.driver.quit().await?;
        self.initialize().await
    }

    /// Close the browser session.
    pub async fn close(&self) -> Result<()> {
        self.set_phase(SessionPhase::Closed).await;
        self.driver.quit().await
    }

    /// Take a rate-limited diagnostic screenshot, returning PNG bytes.
    pub async fn take_screenshot(&self, force: bool) -> Option<Vec<u8>> {
        if !self.screenshots.lock().await.try_acquire(force, Instant::now()) {
            return None;
        }
        let encoded = match self.driver.screenshot().await {
            Ok(encoded) => encoded,
            Err(err) => {
                debug!(error = %err, "Screenshot capture failed");
                return None;
            }
        };
        match base64::engine::general_purpose::STANDARD.decode(encoded) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                debug!(error = %err, "Screenshot payload was not valid base64");
                None
            }
        }
    }

    async fn set_phase(&self, phase: SessionPhase) {
        *self.phase.lock().await = phase;
    }

    /// Replay persisted cookies into the live session, then reload so the
    /// page picks them up. Individual stale cookies are skipped.
    async fn replay_cookies(&self) -> Result<()> {
        let stored = self.cookies.load()?;
        if stored.is_empty() {
            return Ok(());
        }

        let mut installed = 0usize;
        for cookie in &stored {
            match self.driver.add_cookie(cookie).await {
                Ok(()) => installed += 1,
                Err(err) => debug!(cookie = %cookie.name, error = %err, "Cookie rejected"),
            }
        }
        if installed > 0 {
            info!(installed, total = stored.len(), "Replayed persisted session cookies");
            self.driver.navigate(&self.config.target_url).await?;
        }
        Ok(())
    }

    async fn persist_cookies(&self) {
        match self.driver.cookies().await {
            Ok(cookies) => {
                if let Err(err) = self.cookies.save(&cookies, Utc::now().timestamp()) {
                    warn!(error = %err, "Failed to persist session cookies");
                }
            }
            Err(err) => warn!(error = %err, "Failed to read session cookies"),
        }
    }

    /// Poll the login probe until the page is authenticated or the
    /// configured ceiling passes. With cookies replayed this usually
    /// resolves on the first probe; otherwise a human completes the login
    /// form in the (non-headless) browser window.
    async fn wait_for_login(&self) -> Result<bool> {
        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(self.config.login_timeout_secs);
        let mut announced = false;

        loop {
            let probe: LoginProbe =
                self.driver.execute(scripts::LOGIN_PROBE, json!([])).await?;
            if probe.authenticated() {
                return Ok(true);
            }

            if !announced {
                info!(url = %probe.url, "Waiting for interactive login");
                announced = true;
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_secs(LOGIN_POLL_INTERVAL_SECS)).await;
        }
    }

    /// Get the authenticated page onto the switchboard view.
    ///
    /// Tries, in order: waiting for the view to render on its own, clicking
    /// a direct link, and a text-scan click over interactive elements. Each
    /// attempt is followed by a bounded wait for the view container.
    async fn navigate_to_switchboard(&self) -> bool {
        if self.wait_for_container().await {
            return true;
        }

        match self.driver.find_element(SWITCHBOARD_LINK).await {
            Ok(Some(link)) => {
                if self.driver.click(&link).await.is_ok() && self.wait_for_container().await {
                    debug!("Reached switchboard via direct link");
                    return true;
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "Switchboard link lookup failed");
                return false;
            }
        }

        let clicked: bool = match self
            .driver
            .execute(scripts::CLICK_BY_TEXT, json!([["switchboard", "wallboard", "queues"]]))
            .await
        {
            Ok(clicked) => clicked,
            Err(err) => {
                warn!(error = %err, "Text-scan navigation failed");
                return false;
            }
        };
        if clicked && self.wait_for_container().await {
            debug!("Reached switchboard via text-scan click");
            return true;
        }
        false
    }

    /// Bounded poll for the switchboard container.
    async fn wait_for_container(&self) -> bool {
        let deadline =
            tokio::time::Instant::now() + Duration::from_millis(NAVIGATION_WAIT_MS);
        loop {
            match self.driver.find_element(SWITCHBOARD_CONTAINER).await {
                Ok(Some(_)) => return true,
                Ok(None) => {}
                Err(err) => {
                    debug!(error = %err, "Container poll failed");
                    return false;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(NAVIGATION_POLL_MS)).await;
        }
    }

    async fn capture_screenshot(&self, force: bool) {
        if let Some(bytes) = self.take_screenshot(force).await {
            let path = format!(
                "deskglow-diagnostic-{}.png",
                Utc::now().format("%Y%m%dT%H%M%S")
            );
            match std::fs::write(&path, bytes) {
                Ok(()) => info!(path, "Wrote diagnostic screenshot"),
                Err(err) => warn!(error = %err, "Failed to write diagnostic screenshot"),
            }
        }
    }

    fn error_snapshot(trigger: CycleTrigger) -> PresenceSnapshot {
        PresenceSnapshot {
            reading: StatusReading::new(Status::Available, "error"),
            stats: Some(CallStats::zeroed(StatsSource::Error)),
            roster: None,
            trigger,
            collected_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn session_config(server: &MockServer, dir: &std::path::Path) -> ScraperConfig {
        ScraperConfig {
            target_url: "https://pbx.example.com/webclient".to_string(),
            webdriver_url: server.uri(),
            refresh_interval_ms: 7_000,
            headless: true,
            cookie_path: dir.join("cookies.json").to_string_lossy().into_owned(),
            login_timeout_secs: 0,
        }
    }

    async fn mount_session_start(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": {"sessionId": "s1", "capabilities": {}}
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/s1/url"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": null})))
            .mount(server)
            .await;
    }

    fn execute_response(value: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "value": value }))
    }

    #[tokio::test]
    async fn login_timeout_returns_false_and_stays_authenticating() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");
        mount_session_start(&server).await;
        Mock::given(method("POST"))
            .and(path("/session/s1/execute/sync"))
            .respond_with(execute_response(json!({
                "url": "https://pbx.example.com/login",
                "loginForm": true,
                "loggedIn": false,
                "hasAuthToken": false
            })))
            .mount(&server)
            .await;

        let session = ScraperSession::new(
            session_config(&server, dir.path()),
            &ScreenshotConfig::default(),
        )
        .expect("session");

        let ready = session.initialize().await.expect("initialize");
        assert!(!ready);
        assert_eq!(session.phase().await, SessionPhase::Authenticating);
        assert_eq!(session.auth_state().await, AuthState::AwaitingLogin);
    }

    #[tokio::test]
    async fn hard_driver_failure_surfaces_failed_auth_state() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "value": {"error": "session not created", "message": "chrome failed to start"}
            })))
            .mount(&server)
            .await;

        let session = ScraperSession::new(
            session_config(&server, dir.path()),
            &ScreenshotConfig::default(),
        )
        .expect("session");

        assert!(session.initialize().await.is_err());
        assert_eq!(session.phase().await, SessionPhase::Authenticating);
        assert_eq!(session.auth_state().await, AuthState::Failed);
    }

    #[tokio::test]
    async fn cookie_login_reaches_monitoring_and_persists_cookies() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");
        mount_session_start(&server).await;

        // Login probe answers "logged in"; every other script returns a
        // benign value.
        Mock::given(method("POST"))
            .and(path("/session/s1/execute/sync"))
            .and(body_partial_json(json!({"args": []})))
            .respond_with(execute_response(json!({
                "url": "https://pbx.example.com/webclient",
                "loginForm": false,
                "loggedIn": true,
                "hasAuthToken": true
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/s1/element"))
            .respond_with(execute_response(
                json!({"element-6066-11e4-a52e-4f735466cecf": "el-1"}),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/session/s1/cookie"))
            .respond_with(execute_response(json!([{
                "name": "session",
                "value": "token",
                "secure": true,
                "httpOnly": true,
                "expiry": 4_000_000_000u32
            }])))
            .mount(&server)
            .await;

        let config = session_config(&server, dir.path());
        let cookie_path = config.cookie_path.clone();
        let session =
            ScraperSession::new(config, &ScreenshotConfig::default()).expect("session");

        let ready = session.initialize().await.expect("initialize");
        assert!(ready);
        assert_eq!(session.phase().await, SessionPhase::Monitoring);
        assert_eq!(session.auth_state().await, AuthState::Authenticated);
        assert!(std::path::Path::new(&cookie_path).exists());
    }

    #[tokio::test]
    async fn lost_session_yields_error_snapshot_and_demotes_phase() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": {"sessionId": "s1", "capabilities": {}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/session/s1/url"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "value": {"error": "invalid session id", "message": "gone"}
            })))
            .mount(&server)
            .await;

        let session = ScraperSession::new(
            session_config(&server, dir.path()),
            &ScreenshotConfig::default(),
        )
        .expect("session");
        session.driver.start_session(true).await.expect("start");

        let snapshot = session.collect(CycleTrigger::Interval).await;
        assert_eq!(snapshot.reading.source, "error");
        assert_eq!(snapshot.reading.status, Status::Available);
        let stats = snapshot.stats.expect("stats");
        assert_eq!(stats.source, StatsSource::Error);
        assert!(snapshot.roster.is_none());
        assert_eq!(session.phase().await, SessionPhase::Authenticating);
    }

    #[tokio::test]
    async fn close_is_safe_without_a_browser() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let session = ScraperSession::new(
            session_config(&server, dir.path()),
            &ScreenshotConfig::default(),
        )
        .expect("session");

        session.close().await.expect("close");
        assert_eq!(session.phase().await, SessionPhase::Closed);
        assert_eq!(session.auth_state().await, AuthState::Unauthenticated);
    }
}
