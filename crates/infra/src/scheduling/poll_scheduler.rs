//! Poll scheduler driving the collection loop
//!
//! Owns the scraper cadence end to end: fixed-interval collection cycles,
//! mutation polling with debounced mutation-triggered cycles, and recovery
//! attempts when the browser session falls out of monitoring.
//!
//! Cycles are serialized by construction. The loop runs one select arm at a
//! time, so an interval cycle can never interleave with a mutation cycle
//! against the same browser session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use deskglow_core::{MutationDebouncer, ReconcilerService};
use deskglow_domain::constants::MUTATION_DEBOUNCE_MS;
use deskglow_domain::CycleTrigger;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};
use crate::scraper::{ScraperSession, SessionPhase};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for the poll scheduler
#[derive(Debug, Clone)]
pub struct PollSchedulerConfig {
    /// Interval between fixed collection cycles
    pub interval: Duration,
    /// How often the in-page mutation flag is polled
    pub mutation_poll: Duration,
    /// Debounce window for mutation-triggered cycles
    pub debounce_window: Duration,
}

impl Default for PollSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(
                deskglow_domain::constants::DEFAULT_REFRESH_INTERVAL_MS,
            ),
            mutation_poll: Duration::from_millis(250),
            debounce_window: Duration::from_millis(MUTATION_DEBOUNCE_MS),
        }
    }
}

impl PollSchedulerConfig {
    /// Configuration with the collection interval taken from the scraper
    /// config.
    pub fn with_interval_ms(interval_ms: u64) -> Self {
        Self { interval: Duration::from_millis(interval_ms), ..Self::default() }
    }
}

/// Poll scheduler for the presence collection loop
pub struct PollScheduler {
    session: Arc<ScraperSession>,
    reconciler: Arc<ReconcilerService>,
    config: PollSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl PollScheduler {
    pub fn new(
        session: Arc<ScraperSession>,
        reconciler: Arc<ReconcilerService>,
        config: PollSchedulerConfig,
    ) -> Self {
        Self {
            session,
            reconciler,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the scheduler
    ///
    /// Spawns the background collection loop.
    ///
    /// # Errors
    /// Returns error if the scheduler is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            "Starting poll scheduler"
        );

        // Create a new cancellation token (supports restart after stop)
        self.cancellation_token = CancellationToken::new();

        let session = Arc::clone(&self.session);
        let reconciler = Arc::clone(&self.reconciler);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::poll_loop(session, reconciler, config, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        info!("Poll scheduler started");
        Ok(())
    }

    /// Stop the scheduler gracefully
    ///
    /// Cancels the background task and awaits completion.
    ///
    /// # Errors
    /// Returns error if the scheduler is not running or the task does not
    /// finish within the stop timeout
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping poll scheduler");

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = Duration::from_secs(5);
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|e| SchedulerError::TaskJoinFailed(e.to_string()))?;
        }

        info!("Poll scheduler stopped");
        Ok(())
    }

    /// Check if scheduler is running
    ///
    /// A scheduler is considered running if it has an active task handle
    /// that hasn't finished.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Background collection loop
    async fn poll_loop(
        session: Arc<ScraperSession>,
        reconciler: Arc<ReconcilerService>,
        config: PollSchedulerConfig,
        cancel: CancellationToken,
    ) {
        let mut debouncer = MutationDebouncer::new(config.debounce_window);
        let mut interval = tokio::time::interval(config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut mutation_poll = tokio::time::interval(config.mutation_poll);
        mutation_poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Poll loop cancelled");
                    break;
                }
                _ = interval.tick() => {
                    // An interval cycle collects everything a pending
                    // mutation trigger would have.
                    debouncer.reset();
                    Self::run_cycle(&session, &reconciler, CycleTrigger::Interval).await;
                }
                _ = mutation_poll.tick() => {
                    if session.phase().await == SessionPhase::Monitoring
                        && session.take_mutation_flag().await
                    {
                        debouncer.signal(Instant::now());
                    }
                    if debouncer.take_due(Instant::now()) {
                        Self::run_cycle(&session, &reconciler, CycleTrigger::Mutation).await;
                    }
                }
            }
        }
    }

    /// Run one collection cycle against the session's current phase.
    async fn run_cycle(
        session: &Arc<ScraperSession>,
        reconciler: &Arc<ReconcilerService>,
        trigger: CycleTrigger,
    ) {
        match session.phase().await {
            SessionPhase::Monitoring => {
                let snapshot = session.collect(trigger).await;
                reconciler.apply_scrape(snapshot).await;
            }
            SessionPhase::Authenticating => {
                // Recovery is expensive (full re-auth); only interval cycles
                // attempt it.
                if trigger == CycleTrigger::Interval {
                    match session.recover().await {
                        Ok(true) => info!("Scraper session recovered"),
                        Ok(false) => warn!("Scraper session recovery still awaiting login"),
                        Err(e) => error!(error = %e, "Scraper session recovery failed"),
                    }
                }
            }
            phase => {
                debug!(?phase, "Skipping collection cycle outside monitoring");
            }
        }
        reconciler.set_auth_state(session.auth_state().await).await;
    }
}

/// Ensure scheduler is stopped when dropped
impl Drop for PollScheduler {
    fn drop(&mut self) {
        // Best-effort cleanup; stop() is the proper path
        if !self.cancellation_token.is_cancelled() {
            warn!("PollScheduler dropped while running; cancelling");
            self.cancellation_token.cancel();
        }
    }
}
