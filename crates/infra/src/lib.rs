//! # Deskglow Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - Retrying HTTP client used by every outbound integration
//! - WLED device adapter (LED controller port)
//! - WebDriver protocol client and the 3CX switchboard inspector
//! - Scraper session state machine (auth, navigation, collection)
//! - Configuration loader and the poll scheduler
//!
//! ## Architecture
//! - Implements traits defined in `deskglow-core`
//! - Contains all "impure" code (network I/O, browser session, filesystem)

pub mod config;
pub mod errors;
pub mod http;
pub mod scheduling;
pub mod scraper;
pub mod webdriver;
pub mod wled;

// Re-export commonly used items
pub use config::loader as config_loader;
pub use errors::InfraError;
pub use http::{HttpClient, RetryPolicy};
pub use scheduling::{PollScheduler, PollSchedulerConfig, SchedulerError};
pub use scraper::{ScraperSession, SessionPhase, SwitchboardInspector};
pub use webdriver::WebDriverClient;
pub use wled::WledClient;
