//! Call-queue statistics types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a statistics snapshot came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatsSource {
    Scraped,
    Manual,
    Default,
    Error,
}

/// One snapshot of call-queue statistics
///
/// Replaced wholesale on each successful scrape or manual submission; the
/// only partial mutation allowed is an explicit field overlay via
/// [`CallStatsOverlay`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CallStats {
    pub waiting_calls: u32,
    pub active_calls: u32,
    /// Always derived as waiting + serviced + abandoned; an on-page "total"
    /// field is never trusted.
    pub total_calls: u32,
    pub serviced_calls: u32,
    pub abandoned_calls: u32,

    /// Formatted `HH:MM:SS` durations when the page exposes them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longest_waiting: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_waiting: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_talking: Option<String>,

    pub last_updated: DateTime<Utc>,
    pub source: StatsSource,
}

impl CallStats {
    /// Zeroed statistics tagged with the given source.
    pub fn zeroed(source: StatsSource) -> Self {
        Self {
            waiting_calls: 0,
            active_calls: 0,
            total_calls: 0,
            serviced_calls: 0,
            abandoned_calls: 0,
            longest_waiting: None,
            average_waiting: None,
            average_talking: None,
            last_updated: Utc::now(),
            source,
        }
    }

    /// Recompute the derived total from its parts.
    pub fn derive_total(&mut self) {
        self.total_calls = self
            .waiting_calls
            .saturating_add(self.serviced_calls)
            .saturating_add(self.abandoned_calls);
    }
}

impl Default for CallStats {
    fn default() -> Self {
        Self::zeroed(StatsSource::Default)
    }
}

/// Explicit field overlay for manual statistics submissions
///
/// Only the fields present in the submission are applied; the result is
/// re-totalled and tagged [`StatsSource::Manual`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStatsOverlay {
    pub waiting_calls: Option<u32>,
    pub active_calls: Option<u32>,
    pub serviced_calls: Option<u32>,
    pub abandoned_calls: Option<u32>,
    pub longest_waiting: Option<String>,
    pub average_waiting: Option<String>,
    pub average_talking: Option<String>,
}

impl CallStatsOverlay {
    /// Apply this overlay onto existing stats, producing a manual snapshot.
    pub fn apply(&self, base: &CallStats) -> CallStats {
        let mut next = base.clone();
        if let Some(waiting) = self.waiting_calls {
            next.waiting_calls = waiting;
        }
        if let Some(active) = self.active_calls {
            next.active_calls = active;
        }
        if let Some(serviced) = self.serviced_calls {
            next.serviced_calls = serviced;
        }
        if let Some(abandoned) = self.abandoned_calls {
            next.abandoned_calls = abandoned;
        }
        if let Some(ref longest) = self.longest_waiting {
            next.longest_waiting = Some(longest.clone());
        }
        if let Some(ref average) = self.average_waiting {
            next.average_waiting = Some(average.clone());
        }
        if let Some(ref talking) = self.average_talking {
            next.average_talking = Some(talking.clone());
        }
        next.derive_total();
        next.last_updated = Utc::now();
        next.source = StatsSource::Manual;
        next
    }
}
