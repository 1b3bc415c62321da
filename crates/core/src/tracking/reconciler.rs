//! Reconciliation service - the single writer of application state
//!
//! Scrape results, manual dashboard submissions, and the LED device all meet
//! here. Every mutation happens inside one lock scope, so a scrape result
//! can never interleave with a manual submission, and LED writes are
//! serialized through the same path as the state change that caused them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use deskglow_domain::constants::OVERRIDE_TIMEOUT_SECS;
use deskglow_domain::{
    AgentEntry, AuthState, CallStats, CallStatsOverlay, CycleTrigger, DeskglowError,
    ManualOverrideInfo, PresenceSnapshot, Result, StateSnapshot, Status, StatusReading,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use super::ports::LedController;
use crate::status::colors::ColorScheme;

/// Reconciler tuning knobs, taken from the LED configuration.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Brightness passed on every color push
    pub brightness: u8,
    /// Transition passed on every color push, in milliseconds
    pub transition_ms: u64,
    /// Manual-override window length
    pub override_timeout: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            brightness: deskglow_domain::constants::DEFAULT_BRIGHTNESS,
            transition_ms: deskglow_domain::constants::DEFAULT_TRANSITION_MS,
            override_timeout: Duration::from_secs(OVERRIDE_TIMEOUT_SECS),
        }
    }
}

/// An active manual-override window.
#[derive(Debug, Clone)]
struct OverrideWindow {
    started: DateTime<Utc>,
    timeout: Duration,
}

impl OverrideWindow {
    fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let elapsed = (now - self.started).to_std().ok()?;
        self.timeout.checked_sub(elapsed).filter(|left| !left.is_zero())
    }
}

/// Process-lifetime application state. Only the reconciler touches it.
struct ApplicationState {
    current: StatusReading,
    monitoring: bool,
    stats: CallStats,
    roster: Vec<AgentEntry>,
    override_window: Option<OverrideWindow>,
    /// Status the device last accepted. Compared against `current` on every
    /// cycle so the LED is re-pushed when it falls behind, e.g. after an
    /// override window ends or the device comes back online.
    led_status: Option<Status>,
    last_hash: Option<u64>,
    device_connected: bool,
    auth_state: AuthState,
}

impl ApplicationState {
    fn new() -> Self {
        Self {
            current: StatusReading::new(Status::Offline, "default"),
            monitoring: true,
            stats: CallStats::default(),
            roster: Vec::new(),
            override_window: None,
            led_status: None,
            last_hash: None,
            device_connected: false,
            auth_state: AuthState::Unauthenticated,
        }
    }

    fn expire_override(&mut self, now: DateTime<Utc>) {
        if let Some(window) = &self.override_window {
            if window.remaining(now).is_none() {
                debug!("Manual override window expired");
                self.override_window = None;
            }
        }
    }

    fn override_info(&self, now: DateTime<Utc>) -> ManualOverrideInfo {
        match &self.override_window {
            Some(window) => match window.remaining(now) {
                Some(left) => ManualOverrideInfo {
                    active: true,
                    since: Some(window.started),
                    remaining_seconds: left.as_secs(),
                },
                None => ManualOverrideInfo::inactive(),
            },
            None => ManualOverrideInfo::inactive(),
        }
    }
}

/// Single authoritative holder of [`ApplicationState`].
pub struct ReconcilerService {
    state: Mutex<ApplicationState>,
    led: Arc<dyn LedController>,
    colors: ColorScheme,
    config: ReconcilerConfig,
    broadcast_tx: broadcast::Sender<StateSnapshot>,
}

impl ReconcilerService {
    pub fn new(led: Arc<dyn LedController>, colors: ColorScheme, config: ReconcilerConfig) -> Self {
        let (broadcast_tx, _) = broadcast::channel(64);
        Self { state: Mutex::new(ApplicationState::new()), led, colors, config, broadcast_tx }
    }

    /// Subscribe for state broadcasts. Slow consumers may observe lag; they
    /// recover by requesting a fresh snapshot.
    pub fn subscribe(&self) -> broadcast::Receiver<StateSnapshot> {
        self.broadcast_tx.subscribe()
    }

    /// Current state as one consistent snapshot.
    pub async fn snapshot(&self) -> StateSnapshot {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        state.expire_override(now);
        build_snapshot(&state, now)
    }

    /// Apply one collection cycle's result from the scraper.
    ///
    /// Mutation-triggered cycles whose content matches the last applied
    /// snapshot are suppressed entirely; interval cycles always pass through
    /// as a liveness heartbeat. Stats and roster are informational and are
    /// replaced regardless of the monitoring flag (a `None` roster means
    /// "unavailable this cycle" and keeps the previous one).
    pub async fn apply_scrape(&self, snapshot: PresenceSnapshot) {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        state.expire_override(now);

        let hash = snapshot.content_hash();
        let changed = state.last_hash != Some(hash);
        if !changed && snapshot.trigger == CycleTrigger::Mutation {
            debug!("Suppressing unchanged mutation-triggered snapshot");
            return;
        }
        state.last_hash = Some(hash);

        if let Some(stats) = snapshot.stats {
            state.stats = stats;
        }
        match snapshot.roster {
            Some(roster) => {
                state.roster = roster.into_iter().filter(|agent| !agent.name.is_empty()).collect();
            }
            None => debug!("Roster unavailable this cycle; keeping previous roster"),
        }

        let status_changed = snapshot.reading.status != state.current.status;
        let override_active = state.override_window.is_some();

        if status_changed {
            info!(
                from = %state.current.status,
                to = %snapshot.reading.status,
                source = %snapshot.reading.source,
                monitoring = state.monitoring,
                override_active,
                "Detected status change"
            );
        }

        // Scraper readings are always recorded so the dashboard shows the
        // truth, even when monitoring is off or an override holds the LED.
        state.current = snapshot.reading;

        // The LED follows `current` whenever nothing holds it. Comparing
        // against the device's last accepted status (not against the
        // previous reading) hands the LED back after an expired or cleared
        // override.
        let led_stale = state.led_status != Some(state.current.status);
        if state.monitoring && !override_active && led_stale {
            let status = state.current.status;
            let connected = self.push_led(status).await;
            state.device_connected = connected;
            if connected {
                state.led_status = Some(status);
            }
        }

        self.broadcast(&state, now);
    }

    /// Apply a manual status submission (direct user intent).
    ///
    /// Always takes effect and always drives the LED, regardless of the
    /// monitoring flag, and opens the override window: until it expires or
    /// is cleared, scraper results keep the dashboard honest but do not
    /// touch the LED.
    pub async fn set_manual_status(&self, status: Status) {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        info!(%status, "Applying manual status override");
        state.current = StatusReading::new(status, "manual");
        state.override_window =
            Some(OverrideWindow { started: now, timeout: self.config.override_timeout });

        let connected = self.push_led(status).await;
        state.device_connected = connected;
        if connected {
            state.led_status = Some(status);
        }

        self.broadcast(&state, now);
    }

    /// Overlay manually submitted statistics fields onto the current stats.
    pub async fn set_manual_stats(&self, overlay: CallStatsOverlay) {
        let mut state = self.state.lock().await;
        state.stats = overlay.apply(&state.stats);
        self.broadcast(&state, Utc::now());
    }

    /// Manually override one roster agent's status.
    pub async fn set_agent_status(&self, extension: &str, status: Status) -> Result<()> {
        let mut state = self.state.lock().await;
        let agent = state
            .roster
            .iter_mut()
            .find(|agent| agent.extension == extension)
            .ok_or_else(|| DeskglowError::NotFound(format!("no agent with extension {extension}")))?;
        agent.status = status;
        agent.display_color = AgentEntry::display_color_for(status).to_string();
        self.broadcast(&state, Utc::now());
        Ok(())
    }

    /// Enable or disable monitoring. While disabled, scraper results are
    /// recorded for display but never drive the LED.
    pub async fn set_monitoring(&self, enabled: bool) {
        let mut state = self.state.lock().await;
        info!(enabled, "Monitoring toggled");
        state.monitoring = enabled;
        self.broadcast(&state, Utc::now());
    }

    /// Explicitly clear an active manual override and hand the LED back to
    /// the most recent scraped status.
    pub async fn clear_override(&self) {
        let mut state = self.state.lock().await;
        if state.override_window.take().is_some() {
            info!(status = %state.current.status, "Manual override cleared");
            if state.monitoring && state.led_status != Some(state.current.status) {
                let status = state.current.status;
                let connected = self.push_led(status).await;
                state.device_connected = connected;
                if connected {
                    state.led_status = Some(status);
                }
            }
        }
        self.broadcast(&state, Utc::now());
    }

    /// Record the scraper's authentication state for the dashboard.
    pub async fn set_auth_state(&self, auth_state: AuthState) {
        let mut state = self.state.lock().await;
        if state.auth_state != auth_state {
            state.auth_state = auth_state;
            self.broadcast(&state, Utc::now());
        }
    }

    /// Best-effort LED off, used during graceful shutdown.
    pub async fn shutdown_led(&self) -> bool {
        self.led.turn_off().await
    }

    async fn push_led(&self, status: Status) -> bool {
        let color = self.colors.color_for(status);
        let ok =
            self.led.set_color(color, self.config.brightness, self.config.transition_ms).await;
        if !ok {
            warn!(%status, "LED device did not accept color command");
        }
        ok
    }

    fn broadcast(&self, state: &ApplicationState, now: DateTime<Utc>) {
        // No receivers is fine; the snapshot endpoint still serves reads.
        let _ = self.broadcast_tx.send(build_snapshot(state, now));
    }
}

fn build_snapshot(state: &ApplicationState, now: DateTime<Utc>) -> StateSnapshot {
    StateSnapshot {
        status: state.current.status,
        status_source: state.current.source.clone(),
        monitoring: state.monitoring,
        call_stats: state.stats.clone(),
        roster: state.roster.clone(),
        manual_override: state.override_info(now),
        device_connected: state.device_connected,
        auth_state: state.auth_state,
        timestamp: now,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use deskglow_domain::{Color, StatsSource};

    use super::*;
    use crate::tracking::ports::LedDeviceState;

    #[derive(Default)]
    struct MockLed {
        calls: StdMutex<Vec<(Color, u8, u64)>>,
        off_calls: StdMutex<u32>,
        fail: AtomicBool,
    }

    impl MockLed {
        fn set_failing(&self, failing: bool) {
            self.fail.store(failing, Ordering::SeqCst);
        }

        fn calls(&self) -> Vec<(Color, u8, u64)> {
            self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl LedController for MockLed {
        async fn set_color(&self, color: Color, brightness: u8, transition_ms: u64) -> bool {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((color, brightness, transition_ms));
            }
            !self.fail.load(Ordering::SeqCst)
        }

        async fn get_state(&self) -> Option<LedDeviceState> {
            None
        }

        async fn turn_off(&self) -> bool {
            if let Ok(mut off) = self.off_calls.lock() {
                *off += 1;
            }
            !self.fail.load(Ordering::SeqCst)
        }

        async fn set_brightness(&self, _brightness: u8) -> bool {
            true
        }

        async fn set_transition(&self, _transition_ms: u64) -> bool {
            true
        }
    }

    fn service() -> (Arc<MockLed>, ReconcilerService) {
        let led = Arc::new(MockLed::default());
        let config = ReconcilerConfig {
            brightness: 200,
            transition_ms: 1_000,
            override_timeout: Duration::from_secs(900),
        };
        let reconciler =
            ReconcilerService::new(Arc::clone(&led) as Arc<dyn LedController>, ColorScheme::new(), config);
        (led, reconciler)
    }

    fn scrape(status: Status, trigger: CycleTrigger) -> PresenceSnapshot {
        PresenceSnapshot {
            reading: StatusReading::new(status, "indicator-class"),
            stats: Some(CallStats::zeroed(StatsSource::Scraped)),
            roster: Some(vec![agent("101", "Ada", Status::Available)]),
            trigger,
            collected_at: Utc::now(),
        }
    }

    fn agent(extension: &str, name: &str, status: Status) -> AgentEntry {
        AgentEntry {
            extension: extension.to_string(),
            name: name.to_string(),
            status,
            queues: String::new(),
            queue_count: 0,
            display_color: AgentEntry::display_color_for(status).to_string(),
        }
    }

    #[tokio::test]
    async fn status_change_drives_led_and_broadcast() {
        let (led, reconciler) = service();
        let mut rx = reconciler.subscribe();

        // Move into available first so the on-call change is a transition
        reconciler.apply_scrape(scrape(Status::Available, CycleTrigger::Interval)).await;
        let _ = rx.recv().await;

        reconciler.apply_scrape(scrape(Status::OnCall, CycleTrigger::Interval)).await;
        let snapshot = rx.recv().await.expect("expected broadcast");
        assert_eq!(snapshot.status, Status::OnCall);
        assert!(snapshot.device_connected);

        let calls = led.calls();
        assert_eq!(calls.last(), Some(&(Color::new(255, 0, 0), 200, 1_000)));
    }

    #[tokio::test]
    async fn led_failure_does_not_block_status_tracking() {
        let (led, reconciler) = service();
        led.set_failing(true);

        reconciler.apply_scrape(scrape(Status::OnCall, CycleTrigger::Interval)).await;

        let snapshot = reconciler.snapshot().await;
        assert_eq!(snapshot.status, Status::OnCall);
        assert!(!snapshot.device_connected);
        assert_eq!(led.calls().len(), 1);
    }

    #[tokio::test]
    async fn monitoring_disabled_records_status_without_led() {
        let (led, reconciler) = service();
        reconciler.set_monitoring(false).await;

        reconciler.apply_scrape(scrape(Status::Dnd, CycleTrigger::Interval)).await;

        let snapshot = reconciler.snapshot().await;
        assert_eq!(snapshot.status, Status::Dnd);
        assert!(led.calls().is_empty());
    }

    #[tokio::test]
    async fn manual_status_always_takes_effect_and_drives_led() {
        let (led, reconciler) = service();
        reconciler.set_monitoring(false).await;
        let mut rx = reconciler.subscribe();

        reconciler.set_manual_status(Status::Dnd).await;

        let snapshot = rx.recv().await.expect("expected broadcast");
        assert_eq!(snapshot.status, Status::Dnd);
        assert_eq!(snapshot.status_source, "manual");
        assert!(snapshot.manual_override.active);
        assert!(snapshot.manual_override.remaining_seconds > 890);
        assert_eq!(led.calls().last(), Some(&(Color::new(128, 0, 128), 200, 1_000)));
    }

    #[tokio::test]
    async fn override_holds_led_but_scraper_still_broadcasts() {
        let (led, reconciler) = service();
        reconciler.set_manual_status(Status::Dnd).await;
        let manual_calls = led.calls().len();

        reconciler.apply_scrape(scrape(Status::Available, CycleTrigger::Interval)).await;

        let snapshot = reconciler.snapshot().await;
        // Dashboard sees the scraped truth, LED keeps the human's choice
        assert_eq!(snapshot.status, Status::Available);
        assert!(snapshot.manual_override.active);
        assert_eq!(led.calls().len(), manual_calls);
    }

    #[tokio::test]
    async fn expired_override_hands_led_back_to_scraped_status() {
        let led = Arc::new(MockLed::default());
        let config = ReconcilerConfig {
            brightness: 200,
            transition_ms: 1_000,
            override_timeout: Duration::from_millis(50),
        };
        let reconciler = ReconcilerService::new(
            Arc::clone(&led) as Arc<dyn LedController>,
            ColorScheme::new(),
            config,
        );

        reconciler.set_manual_status(Status::Dnd).await;
        reconciler.apply_scrape(scrape(Status::Available, CycleTrigger::Interval)).await;
        // Window still open: the LED keeps the manual purple
        assert_eq!(led.calls().last(), Some(&(Color::new(128, 0, 128), 200, 1_000)));

        tokio::time::sleep(Duration::from_millis(60)).await;
        reconciler.apply_scrape(scrape(Status::Available, CycleTrigger::Interval)).await;

        let snapshot = reconciler.snapshot().await;
        assert!(!snapshot.manual_override.active);
        assert_eq!(led.calls().last(), Some(&(Color::new(0, 255, 0), 200, 1_000)));
    }

    #[tokio::test]
    async fn clear_override_restores_led_to_scraped_status() {
        let (led, reconciler) = service();
        reconciler.set_manual_status(Status::Dnd).await;
        reconciler.apply_scrape(scrape(Status::Available, CycleTrigger::Interval)).await;
        assert_eq!(led.calls().last(), Some(&(Color::new(128, 0, 128), 200, 1_000)));

        reconciler.clear_override().await;

        let snapshot = reconciler.snapshot().await;
        assert!(!snapshot.manual_override.active);
        assert_eq!(snapshot.status, Status::Available);
        assert_eq!(led.calls().last(), Some(&(Color::new(0, 255, 0), 200, 1_000)));
    }

    #[tokio::test]
    async fn roster_none_keeps_previous_roster_but_empty_clears_it() {
        let (_led, reconciler) = service();
        reconciler.apply_scrape(scrape(Status::Available, CycleTrigger::Interval)).await;
        assert_eq!(reconciler.snapshot().await.roster.len(), 1);

        let mut unavailable = scrape(Status::Available, CycleTrigger::Interval);
        unavailable.roster = None;
        reconciler.apply_scrape(unavailable).await;
        assert_eq!(reconciler.snapshot().await.roster.len(), 1);

        let mut empty = scrape(Status::Available, CycleTrigger::Interval);
        empty.roster = Some(vec![]);
        reconciler.apply_scrape(empty).await;
        assert!(reconciler.snapshot().await.roster.is_empty());
    }

    #[tokio::test]
    async fn agents_with_empty_names_are_filtered_from_published_roster() {
        let (_led, reconciler) = service();
        let mut snapshot = scrape(Status::Available, CycleTrigger::Interval);
        snapshot.roster =
            Some(vec![agent("101", "Ada", Status::Available), agent("102", "", Status::Away)]);

        reconciler.apply_scrape(snapshot).await;

        let roster = reconciler.snapshot().await.roster;
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].extension, "101");
    }

    #[tokio::test]
    async fn unchanged_mutation_snapshot_is_suppressed_but_interval_heartbeats() {
        let (_led, reconciler) = service();
        let mut rx = reconciler.subscribe();

        reconciler.apply_scrape(scrape(Status::Available, CycleTrigger::Mutation)).await;
        assert!(rx.try_recv().is_ok());

        // Identical content via mutation: suppressed
        reconciler.apply_scrape(scrape(Status::Available, CycleTrigger::Mutation)).await;
        assert!(rx.try_recv().is_err());

        // Identical content via interval: heartbeat passes through
        reconciler.apply_scrape(scrape(Status::Available, CycleTrigger::Interval)).await;
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn agent_override_updates_roster_entry() {
        let (_led, reconciler) = service();
        reconciler.apply_scrape(scrape(Status::Available, CycleTrigger::Interval)).await;

        reconciler.set_agent_status("101", Status::Away).await.expect("override failed");

        let roster = reconciler.snapshot().await.roster;
        assert_eq!(roster[0].status, Status::Away);
        assert_eq!(roster[0].display_color, "#ff9800");

        let missing = reconciler.set_agent_status("999", Status::Away).await;
        assert!(missing.is_err());
    }
}
