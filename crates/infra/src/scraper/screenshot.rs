//! Diagnostic screenshot rate limiting
//!
//! Screenshots are expensive over WebDriver and pile up on disk, so three
//! independent caps apply: a global enable flag, minimum spacing between
//! shots, and a per-session count ceiling. `force` (critical failure
//! diagnostics) bypasses spacing and count but never the enable flag.

use std::time::{Duration, Instant};

use deskglow_domain::ScreenshotConfig;

/// Pure limiter state; the session feeds it `Instant`s.
#[derive(Debug)]
pub struct ScreenshotLimiter {
    enabled: bool,
    min_interval: Duration,
    max_per_session: u32,
    taken: u32,
    last_shot: Option<Instant>,
}

impl ScreenshotLimiter {
    pub fn new(config: &ScreenshotConfig) -> Self {
        Self {
            enabled: config.enabled,
            min_interval: Duration::from_secs(config.min_interval_secs),
            max_per_session: config.max_per_session,
            taken: 0,
            last_shot: None,
        }
    }

    /// Whether a shot may be taken now; records it when allowed.
    pub fn try_acquire(&mut self, force: bool, now: Instant) -> bool {
        if !self.enabled {
            return false;
        }

        if !force {
            if self.taken >= self.max_per_session {
                return false;
            }
            if let Some(last) = self.last_shot {
                if now.duration_since(last) < self.min_interval {
                    return false;
                }
            }
        }

        self.taken = self.taken.saturating_add(1);
        self.last_shot = Some(now);
        true
    }

    /// Shots taken this session (forced ones included).
    pub fn taken(&self) -> u32 {
        self.taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool) -> ScreenshotConfig {
        ScreenshotConfig { enabled, min_interval_secs: 60, max_per_session: 2 }
    }

    #[test]
    fn disabled_flag_blocks_even_forced_shots() {
        let mut limiter = ScreenshotLimiter::new(&config(false));
        let now = Instant::now();
        assert!(!limiter.try_acquire(false, now));
        assert!(!limiter.try_acquire(true, now));
    }

    #[test]
    fn spacing_is_enforced_between_shots() {
        let mut limiter = ScreenshotLimiter::new(&config(true));
        let start = Instant::now();

        assert!(limiter.try_acquire(false, start));
        assert!(!limiter.try_acquire(false, start + Duration::from_secs(30)));
        assert!(limiter.try_acquire(false, start + Duration::from_secs(61)));
    }

    #[test]
    fn session_count_cap_applies() {
        let mut limiter = ScreenshotLimiter::new(&config(true));
        let start = Instant::now();

        assert!(limiter.try_acquire(false, start));
        assert!(limiter.try_acquire(false, start + Duration::from_secs(100)));
        assert!(!limiter.try_acquire(false, start + Duration::from_secs(200)));
    }

    #[test]
    fn force_bypasses_spacing_and_count_but_still_counts() {
        let mut limiter = ScreenshotLimiter::new(&config(true));
        let start = Instant::now();

        assert!(limiter.try_acquire(false, start));
        assert!(limiter.try_acquire(true, start + Duration::from_secs(1)));
        assert!(limiter.try_acquire(true, start + Duration::from_secs(2)));
        assert_eq!(limiter.taken(), 3);
    }
}
