//! Persisted session-cookie store
//!
//! Cookies are the scraper's only durable state: they let a restart skip the
//! human-in-the-loop login. Cookies expiring within 24 hours are not worth
//! caching (a near-dead session would just bounce back to the login form),
//! so saving filters them out.

use std::fs;
use std::path::{Path, PathBuf};

use deskglow_domain::constants::COOKIE_MIN_TTL_SECS;
use deskglow_domain::{DeskglowError, Result};
use tracing::{debug, info};

use crate::webdriver::Cookie;

/// JSON-file-backed cookie store.
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// Load previously persisted cookies. A missing file is an empty store,
    /// not an error.
    pub fn load(&self) -> Result<Vec<Cookie>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No cookie store on disk");
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&self.path)
            .map_err(|err| DeskglowError::Internal(format!("reading cookie store: {err}")))?;
        serde_json::from_str(&raw)
            .map_err(|err| DeskglowError::Internal(format!("parsing cookie store: {err}")))
    }

    /// Persist cookies, dropping entries that expire within 24 hours of
    /// `now` (unix seconds). Session cookies without an expiry are kept.
    /// Returns how many cookies were written.
    pub fn save(&self, cookies: &[Cookie], now: i64) -> Result<usize> {
        let keep: Vec<&Cookie> = cookies
            .iter()
            .filter(|cookie| match cookie.expiry {
                Some(expiry) => expiry - now >= COOKIE_MIN_TTL_SECS,
                None => true,
            })
            .collect();

        let serialized = serde_json::to_string_pretty(&keep)
            .map_err(|err| DeskglowError::Internal(format!("serializing cookies: {err}")))?;
        fs::write(&self.path, serialized)
            .map_err(|err| DeskglowError::Internal(format!("writing cookie store: {err}")))?;

        info!(count = keep.len(), path = %self.path.display(), "Persisted session cookies");
        Ok(keep.len())
    }
}
