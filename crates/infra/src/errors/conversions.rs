//! Conversions from external infrastructure errors into domain errors.

use deskglow_domain::DeskglowError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub DeskglowError);

impl From<InfraError> for DeskglowError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<DeskglowError> for InfraError {
    fn from(value: DeskglowError) -> Self {
        InfraError(value)
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → DeskglowError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for InfraError {
    fn from(err: HttpError) -> Self {
        let message = if let Some(url) = err.url() {
            format!("{err} (url: {url})")
        } else {
            err.to_string()
        };

        let domain_err = if err.is_timeout() {
            DeskglowError::Network(format!("request timed out: {message}"))
        } else if err.is_connect() {
            DeskglowError::Network(format!("connection failed: {message}"))
        } else if err.is_status() {
            let status = err.status().map(|code| code.as_u16()).unwrap_or_default();
            DeskglowError::Network(format!("http status {status}: {message}"))
        } else if err.is_decode() {
            DeskglowError::Internal(format!("failed to decode response body: {message}"))
        } else {
            DeskglowError::Network(message)
        };

        InfraError(domain_err)
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → DeskglowError */
/* -------------------------------------------------------------------------- */

impl From<std::io::Error> for InfraError {
    fn from(err: std::io::Error) -> Self {
        InfraError(DeskglowError::Internal(format!("io error: {err}")))
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → DeskglowError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(err: serde_json::Error) -> Self {
        InfraError(DeskglowError::Internal(format!("json error: {err}")))
    }
}
