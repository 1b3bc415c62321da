//! Minimal W3C WebDriver HTTP client
//!
//! Talks to a local chromedriver/geckodriver endpoint. Only the handful of
//! commands the presence scraper needs are implemented: session lifecycle,
//! navigation, element lookup, script execution, cookies, and screenshots.
//!
//! Element lookups distinguish "no such element" (a normal answer during
//! extraction) from transport failures; the former surfaces as `Ok(None)`.

use std::time::Duration;

use deskglow_domain::{DeskglowError, Result};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::http::{HttpClient, RetryPolicy};

const COMMAND_TIMEOUT_SECS: u64 = 60;

/// W3C element identifier key inside element reference objects.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Opaque element handle returned by element lookup commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(pub String);

/// Browser cookie as exposed by the WebDriver cookie commands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, rename = "httpOnly")]
    pub http_only: bool,
    /// Unix timestamp; session cookies carry no expiry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WireResponse<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct NewSessionValue {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorValue {
    error: String,
    #[serde(default)]
    message: String,
}

/// WebDriver HTTP client bound to one browser session at a time.
pub struct WebDriverClient {
    base_url: String,
    http_client: HttpClient,
    session_id: RwLock<Option<String>>,
}

impl WebDriverClient {
    pub fn new(webdriver_url: &str) -> Result<Self> {
        if webdriver_url.trim().is_empty() {
            return Err(DeskglowError::Config("WebDriver URL cannot be empty".into()));
        }

        // WebDriver commands are not idempotent (clicks, script execution),
        // so the transport must not retry them.
        let http_client = HttpClient::with_policy(RetryPolicy {
            timeout: Duration::from_secs(COMMAND_TIMEOUT_SECS),
            attempts: 1,
            ..RetryPolicy::default()
        })?;

        Ok(Self {
            base_url: webdriver_url.trim_end_matches('/').to_string(),
            http_client,
            session_id: RwLock::new(None),
        })
    }

    /// Whether a browser session is currently open.
    pub async fn has_session(&self) -> bool {
        self.session_id.read().await.is_some()
    }

    /// Open a new browser session.
    pub async fn start_session(&self, headless: bool) -> Result<()> {
        let mut args = vec!["--disable-gpu".to_string(), "--window-size=1400,900".to_string()];
        if headless {
            args.push("--headless=new".to_string());
        }

        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let url = format!("{}/session", self.base_url);
        let request = self.http_client.request(Method::POST, &url).json(&body);
        let response = self.http_client.send(request).await?;
        let parsed: WireResponse<NewSessionValue> = decode_body(response).await?;

        debug!(session_id = %parsed.value.session_id, headless, "WebDriver session started");
        *self.session_id.write().await = Some(parsed.value.session_id);
        Ok(())
    }

    /// Close the browser session. Safe to call when none is open.
    pub async fn quit(&self) -> Result<()> {
        let session_id = match self.session_id.write().await.take() {
            Some(id) => id,
            None => return Ok(()),
        };

        let url = format!("{}/session/{session_id}", self.base_url);
        let request = self.http_client.request(Method::DELETE, &url);
        match self.http_client.send(request).await {
            Ok(_) => Ok(()),
            Err(err) => {
                // The driver may already be gone at shutdown; that is fine.
                warn!(error = %err, "WebDriver session delete failed");
                Ok(())
            }
        }
    }

    /// Navigate the session to a URL.
    pub async fn navigate(&self, target: &str) -> Result<()> {
        let session_id = self.require_session().await?;
        let url = format!("{}/session/{session_id}/url", self.base_url);
        let request = self.http_client.request(Method::POST, &url).json(&json!({"url": target}));
        let response = self.http_client.send(request).await?;
        let _: WireResponse<Value> = decode_body(response).await?;
        Ok(())
    }

    /// Current page URL.
    pub async fn current_url(&self) -> Result<String> {
        let session_id = self.require_session().await?;
        let url = format!("{}/session/{session_id}/url", self.base_url);
        let request = self.http_client.request(Method::GET, &url);
        let response = self.http_client.send(request).await?;
        let parsed: WireResponse<String> = decode_body(response).await?;
        Ok(parsed.value)
    }

    /// Find the first element matching a CSS selector; `Ok(None)` when the
    /// page has no such element.
    pub async fn find_element(&self, selector: &str) -> Result<Option<ElementRef>> {
        let session_id = self.require_session().await?;
        let url = format!("{}/session/{session_id}/element", self.base_url);
        let body = json!({"using": "css selector", "value": selector});
        let request = self.http_client.request(Method::POST, &url).json(&body);
        let response = self.http_client.send(request).await?;

        // 404 also covers "invalid session id"; only a genuine missing
        // element is a normal answer.
        if response.status() == StatusCode::NOT_FOUND {
            let bytes = response.bytes().await.unwrap_or_default();
            let is_missing = serde_json::from_slice::<WireResponse<ErrorValue>>(&bytes)
                .map(|wire| wire.value.error == "no such element")
                .unwrap_or(true);
            if is_missing {
                return Ok(None);
            }
            return Err(DeskglowError::Scraper("webdriver session lost".into()));
        }
        let parsed: WireResponse<Value> = decode_body(response).await?;
        Ok(extract_element_ref(&parsed.value))
    }

    /// Find all elements matching a CSS selector.
    pub async fn find_elements(&self, selector: &str) -> Result<Vec<ElementRef>> {
        let session_id = self.require_session().await?;
        let url = format!("{}/session/{session_id}/elements", self.base_url);
        let body = json!({"using": "css selector", "value": selector});
        let request = self.http_client.request(Method::POST, &url).json(&body);
        let response = self.http_client.send(request).await?;
        let parsed: WireResponse<Vec<Value>> = decode_body(response).await?;
        Ok(parsed.value.iter().filter_map(extract_element_ref).collect())
    }

    /// Click an element.
    pub async fn click(&self, element: &ElementRef) -> Result<()> {
        let session_id = self.require_session().await?;
        let url =
            format!("{}/session/{session_id}/element/{}/click", self.base_url, element.0);
        let request = self.http_client.request(Method::POST, &url).json(&json!({}));
        let response = self.http_client.send(request).await?;
        let _: WireResponse<Value> = decode_body(response).await?;
        Ok(())
    }

    /// Execute synchronous JavaScript in the page, deserializing the result.
    pub async fn execute<T: DeserializeOwned>(&self, script: &str, args: Value) -> Result<T> {
        let session_id = self.require_session().await?;
        let url = format!("{}/session/{session_id}/execute/sync", self.base_url);
        let body = json!({"script": script, "args": args});
        let request = self.http_client.request(Method::POST, &url).json(&body);
        let response = self.http_client.send(request).await?;
        let parsed: WireResponse<T> = decode_body(response).await?;
        Ok(parsed.value)
    }

    /// All cookies visible to the current page.
    pub async fn cookies(&self) -> Result<Vec<Cookie>> {
        let session_id = self.require_session().await?;
        let url = format!("{}/session/{session_id}/cookie", self.base_url);
        let request = self.http_client.request(Method::GET, &url);
        let response = self.http_client.send(request).await?;
        let parsed: WireResponse<Vec<Cookie>> = decode_body(response).await?;
        Ok(parsed.value)
    }

    /// Add one cookie to the session.
    pub async fn add_cookie(&self, cookie: &Cookie) -> Result<()> {
        let session_id = self.require_session().await?;
        let url = format!("{}/session/{session_id}/cookie", self.base_url);
        let request =
            self.http_client.request(Method::POST, &url).json(&json!({"cookie": cookie}));
        let response = self.http_client.send(request).await?;
        let _: WireResponse<Value> = decode_body(response).await?;
        Ok(())
    }

    /// Base64-encoded PNG of the current viewport.
    pub async fn screenshot(&self) -> Result<String> {
        let session_id = self.require_session().await?;
        let url = format!("{}/session/{session_id}/screenshot", self.base_url);
        let request = self.http_client.request(Method::GET, &url);
        let response = self.http_client.send(request).await?;
        let parsed: WireResponse<String> = decode_body(response).await?;
        Ok(parsed.value)
    }

    async fn require_session(&self) -> Result<String> {
        self.session_id
            .read()
            .await
            .clone()
            .ok_or_else(|| DeskglowError::Scraper("no browser session open".into()))
    }
}

/// Decode a WebDriver response body, mapping protocol errors onto
/// [`DeskglowError::Scraper`].
async fn decode_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<WireResponse<T>> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|err| DeskglowError::Network(format!("reading webdriver response: {err}")))?;

    if !status.is_success() {
        let detail = serde_json::from_slice::<WireResponse<ErrorValue>>(&bytes)
            .map(|wire| format!("{}: {}", wire.value.error, wire.value.message))
            .unwrap_or_else(|_| format!("http status {status}"));
        return Err(DeskglowError::Scraper(format!("webdriver command failed: {detail}")));
    }

    serde_json::from_slice(&bytes)
        .map_err(|err| DeskglowError::Scraper(format!("malformed webdriver response: {err}")))
}

fn extract_element_ref(value: &Value) -> Option<ElementRef> {
    value.get(ELEMENT_KEY).and_then(Value::as_str).map(|id| ElementRef(id.to_string()))
}
