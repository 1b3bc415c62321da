//! Snapshot types crossing the scraper → reconciler → dashboard pipeline

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::roster::AgentEntry;
use super::stats::CallStats;
use super::status::{Status, StatusReading};

/// What caused a collection cycle to run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CycleTrigger {
    /// Fixed-interval tick; doubles as a liveness heartbeat, so the result
    /// is forwarded downstream even when unchanged.
    Interval,
    /// DOM mutation signal; coalesced by the debouncer and suppressed when
    /// the collected snapshot is unchanged.
    Mutation,
}

/// One complete read of the scraped page state
///
/// Status, statistics, and roster are collected together so consumers never
/// see a stats value from cycle N next to a roster from cycle N+1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    pub reading: StatusReading,

    /// None only when extraction itself failed unexpectedly
    pub stats: Option<CallStats>,

    /// None means "roster unavailable this cycle" (container absent) and
    /// must not clear an existing roster; an empty vec is an explicit
    /// "zero agents" and replaces it.
    pub roster: Option<Vec<AgentEntry>>,

    pub trigger: CycleTrigger,
    pub collected_at: DateTime<Utc>,
}

impl PresenceSnapshot {
    /// Hash of the comparable content, used for change suppression.
    ///
    /// The trigger and all timestamps are excluded: a re-scrape that found
    /// identical page state must hash identically even though it was
    /// collected later.
    pub fn content_hash(&self) -> u64 {
        #[derive(Serialize)]
        struct ComparableStats<'a> {
            waiting: u32,
            active: u32,
            serviced: u32,
            abandoned: u32,
            longest_waiting: Option<&'a str>,
            average_waiting: Option<&'a str>,
            average_talking: Option<&'a str>,
        }

        #[derive(Serialize)]
        struct Comparable<'a> {
            reading: &'a StatusReading,
            stats: Option<ComparableStats<'a>>,
            roster: Option<&'a Vec<AgentEntry>>,
        }

        let comparable = Comparable {
            reading: &self.reading,
            stats: self.stats.as_ref().map(|stats| ComparableStats {
                waiting: stats.waiting_calls,
                active: stats.active_calls,
                serviced: stats.serviced_calls,
                abandoned: stats.abandoned_calls,
                longest_waiting: stats.longest_waiting.as_deref(),
                average_waiting: stats.average_waiting.as_deref(),
                average_talking: stats.average_talking.as_deref(),
            }),
            roster: self.roster.as_ref(),
        };
        let serialized = serde_json::to_string(&comparable).unwrap_or_default();
        let mut hasher = DefaultHasher::new();
        serialized.hash(&mut hasher);
        hasher.finish()
    }
}

/// Scraper authentication state surfaced to the dashboard
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AuthState {
    Unauthenticated,
    AwaitingLogin,
    Authenticated,
    Failed,
}

/// Manual-override metadata exposed to dashboard clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManualOverrideInfo {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    pub remaining_seconds: u64,
}

impl ManualOverrideInfo {
    pub fn inactive() -> Self {
        Self { active: false, since: None, remaining_seconds: 0 }
    }
}

/// The canonical application state as broadcast to dashboard clients
///
/// Every snapshot carries its source/timestamp indicators so clients can
/// distinguish fresh data from last-known-good.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub status: Status,
    pub status_source: String,
    pub monitoring: bool,
    pub call_stats: CallStats,
    pub roster: Vec<AgentEntry>,
    pub manual_override: ManualOverrideInfo,
    pub device_connected: bool,
    pub auth_state: AuthState,
    pub timestamp: DateTime<Utc>,
}
