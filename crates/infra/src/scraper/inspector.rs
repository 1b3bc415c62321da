//! Switchboard extraction queries
//!
//! Concrete [`PresenceInspector`] for the 3CX web client's switchboard view.
//! Each query executes one script from [`scripts`](super::scripts) and
//! interprets the returned JSON here, so every heuristic is testable without
//! a browser. All queries are tolerant of a missing container: a wrong view
//! or a mid-render page produces a neutral default, never an error.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use deskglow_core::{normalize, PresenceInspector};
use deskglow_core::status::normalizer::match_keyword;
use deskglow_domain::{
    AgentEntry, AgentStatusToken, CallStats, RawStatusSignal, StatsSource, Status, StatusReading,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::scripts;
use crate::webdriver::WebDriverClient;

/// Wire shape of one entry from the status probe script.
#[derive(Debug, Deserialize)]
struct StatusSignalRow {
    #[serde(rename = "classNames", default)]
    class_names: Vec<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    attributes: HashMap<String, String>,
}

impl From<StatusSignalRow> for RawStatusSignal {
    fn from(row: StatusSignalRow) -> Self {
        RawStatusSignal {
            class_names: row.class_names,
            text: row.text,
            attributes: row.attributes,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatsProbe {
    present: bool,
    #[serde(default)]
    headers: Vec<String>,
    #[serde(default)]
    values: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RosterProbe {
    present: bool,
    #[serde(default)]
    rows: Vec<RosterRow>,
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(default)]
    number: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    classes: Vec<String>,
    #[serde(default)]
    queues: Vec<String>,
}

/// Extraction queries against the switchboard view.
pub struct SwitchboardInspector {
    driver: Arc<WebDriverClient>,
    duration_format: Regex,
}

impl SwitchboardInspector {
    pub fn new(driver: Arc<WebDriverClient>) -> Self {
        // HH:MM:SS, hours unbounded
        #[allow(clippy::unwrap_used)] // literal pattern, cannot fail
        let duration_format = Regex::new(r"^\d{1,3}:\d{2}:\d{2}$").unwrap();
        Self { driver, duration_format }
    }

    /// Install the in-page mutation observer. Safe to re-run.
    pub async fn install_observer(&self) -> bool {
        match self.driver.execute::<bool>(scripts::OBSERVER_INSTALL, json!([])).await {
            Ok(installed) => installed,
            Err(err) => {
                warn!(error = %err, "Failed to install mutation observer");
                false
            }
        }
    }

    fn stats_from_table(&self, headers: &[String], values: &[String]) -> CallStats {
        let cells: HashMap<String, &str> = headers
            .iter()
            .zip(values.iter())
            .map(|(header, value)| (header.trim().to_lowercase(), value.trim()))
            .collect();

        let count = |names: &[&str]| -> u32 {
            names
                .iter()
                .find_map(|name| cells.get(*name))
                .and_then(|value| value.parse::<u32>().ok())
                .unwrap_or(0)
        };
        let duration = |names: &[&str]| -> Option<String> {
            names
                .iter()
                .find_map(|name| cells.get(*name))
                .filter(|value| self.duration_format.is_match(value))
                .map(|value| (*value).to_string())
        };

        let mut stats = CallStats {
            waiting_calls: count(&["waiting calls", "waiting", "calls waiting"]),
            active_calls: count(&["active calls", "active", "calls active"]),
            total_calls: 0,
            serviced_calls: count(&["serviced calls", "serviced", "answered calls", "answered"]),
            abandoned_calls: count(&["abandoned calls", "abandoned"]),
            longest_waiting: duration(&["longest waiting", "longest wait time"]),
            average_waiting: duration(&["average waiting", "average wait time"]),
            average_talking: duration(&["average talking", "average talk time"]),
            last_updated: Utc::now(),
            source: StatsSource::Scraped,
        };
        // Derived, never read off the page: an on-page "total" cell lags
        // behind its parts during live updates.
        stats.derive_total();
        stats
    }

    fn agents_from_rows(rows: Vec<RosterRow>) -> Vec<AgentEntry> {
        rows.into_iter()
            .filter(|row| !row.name.is_empty())
            .map(|row| {
                let status = row
                    .classes
                    .iter()
                    .find_map(|class| AgentStatusToken::from_class(class))
                    .map(AgentStatusToken::as_status)
                    .unwrap_or(Status::Offline);
                let queue_count = row.queues.len() as u32;
                AgentEntry {
                    extension: row.number,
                    name: row.name,
                    status,
                    queues: row.queues.join(","),
                    queue_count,
                    display_color: AgentEntry::display_color_for(status).to_string(),
                }
            })
            .collect()
    }

    fn reading_from_signals(signals: Vec<RawStatusSignal>) -> StatusReading {
        for signal in &signals {
            // Field-by-field so the reading can say where it matched
            if let Some(status) = signal.class_names.iter().find_map(|c| match_keyword(c)) {
                return StatusReading::new(status, "indicator-class");
            }
            if let Some(status) = match_keyword(&signal.text) {
                return StatusReading::new(status, "status-text");
            }
            if let Some(status) = normalize(signal) {
                return StatusReading::new(status, "data-attribute");
            }
        }
        StatusReading::fallback()
    }
}

#[async_trait]
impl PresenceInspector for SwitchboardInspector {
    async fn read_status(&self) -> StatusReading {
        let signals = match self
            .driver
            .execute::<Vec<StatusSignalRow>>(scripts::STATUS_PROBE, json!([]))
            .await
        {
            Ok(rows) => rows.into_iter().map(RawStatusSignal::from).collect::<Vec<_>>(),
            Err(err) => {
                debug!(error = %err, "Status probe failed; using fallback reading");
                return StatusReading::fallback();
            }
        };
        Self::reading_from_signals(signals)
    }

    async fn fetch_call_stats(&self) -> Option<CallStats> {
        let probe = match self
            .driver
            .execute::<StatsProbe>(scripts::STATS_TABLE, json!([]))
            .await
        {
            Ok(probe) => probe,
            Err(err) => {
                warn!(error = %err, "Stats extraction failed");
                return None;
            }
        };

        if !probe.present {
            debug!("Statistics table absent from current view; defaulting to zeroed stats");
            return Some(CallStats::zeroed(StatsSource::Default));
        }
        Some(self.stats_from_table(&probe.headers, &probe.values))
    }

    async fn fetch_agent_statuses(&self) -> Option<Vec<AgentEntry>> {
        let probe = match self.driver.execute::<RosterProbe>(scripts::ROSTER, json!([])).await {
            Ok(probe) => probe,
            Err(err) => {
                warn!(error = %err, "Roster extraction failed");
                return None;
            }
        };

        if !probe.present {
            // Feature unavailable this cycle; distinct from zero agents
            return None;
        }
        Some(Self::agents_from_rows(probe.rows))
    }

    async fn take_mutation_flag(&self) -> bool {
        match self.driver.execute::<bool>(scripts::TAKE_MUTATION_FLAG, json!([])).await {
            Ok(mutated) => mutated,
            Err(err) => {
                debug!(error = %err, "Mutation flag read failed");
                false
            }
        }
    }
}
