//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use deskglow_core::{ColorScheme, LedController, ReconcilerConfig, ReconcilerService};
use deskglow_domain::constants::OVERRIDE_TIMEOUT_SECS;
use deskglow_domain::{Config, Result};
use deskglow_infra::{PollScheduler, PollSchedulerConfig, ScraperSession, WledClient};
use tokio::sync::Mutex;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub reconciler: Arc<ReconcilerService>,
    pub session: Arc<ScraperSession>,
    /// Behind a mutex because start/stop need exclusive access
    pub scheduler: Mutex<PollScheduler>,
}

impl AppContext {
    /// Wire the full service graph from configuration.
    ///
    /// Construction performs no I/O; the browser session and scheduler are
    /// brought up explicitly by the caller.
    pub fn new(config: Config) -> Result<Self> {
        let led: Arc<dyn LedController> = Arc::new(WledClient::new(&config.led)?);
        let colors = ColorScheme::with_overrides(&config.led.colors);
        let reconciler_config = ReconcilerConfig {
            brightness: config.led.brightness,
            transition_ms: config.led.transition_ms,
            override_timeout: Duration::from_secs(OVERRIDE_TIMEOUT_SECS),
        };
        let reconciler = Arc::new(ReconcilerService::new(led, colors, reconciler_config));

        let session =
            Arc::new(ScraperSession::new(config.scraper.clone(), &config.screenshots)?);

        let scheduler = PollScheduler::new(
            Arc::clone(&session),
            Arc::clone(&reconciler),
            PollSchedulerConfig::with_interval_ms(config.scraper.refresh_interval_ms),
        );

        Ok(Self { config, reconciler, session, scheduler: Mutex::new(scheduler) })
    }
}
