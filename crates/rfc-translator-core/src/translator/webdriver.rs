//! Minimal W3C WebDriver client (geckodriver, chromedriver) over `reqwest`.
//!
//! Only the commands the browser translator needs: new session, timeouts,
//! navigate, find elements, element text, delete session.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::browser::BrowserSession;
use crate::config::BrowserConfig;
use crate::error::{Error, Result};

/// Web element identifier defined by the W3C WebDriver spec
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Every WebDriver reply wraps its payload in `value`
#[derive(Debug, Deserialize)]
struct Reply<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewSession {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct ElementRef {
    #[serde(rename = "element-6066-11e4-a52e-4f735466cecf", alias = "ELEMENT")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct CommandError {
    error: String,
    #[serde(default)]
    message: String,
}

/// A live WebDriver session
pub struct WebDriverSession {
    client: Client,
    base: String,
    session_id: String,
    closed: AtomicBool,
}

impl WebDriverSession {
    /// Open a new browser session and set its implicit wait.
    pub async fn start(config: &BrowserConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::BackendRequest(format!("Failed to create HTTP client: {e}")))?;
        let base = config.webdriver_url.trim_end_matches('/').to_string();

        let args: Vec<&str> = if config.headless { vec!["-headless"] } else { Vec::new() };
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "firefox",
                    "moz:firefoxOptions": { "args": args }
                }
            }
        });

        let response = client
            .post(format!("{base}/session"))
            .json(&capabilities)
            .send()
            .await
            .map_err(|e| Error::BackendRequest(format!("WebDriver at {base} unreachable: {e}")))?;
        let success = response.status().is_success();
        let body = response
            .text()
            .await
            .map_err(|e| Error::BackendRequest(format!("Invalid WebDriver response: {e}")))?;
        let NewSession { session_id } = parse_reply(success, &body)
            .map_err(|e| Error::BackendRequest(format!("WebDriver refused session: {e}")))?;

        debug!("Started WebDriver session {}", session_id);

        let session = Self {
            client,
            base,
            session_id,
            closed: AtomicBool::new(false),
        };
        session
            .command::<IgnoredAny>(
                Method::POST,
                "timeouts",
                Some(json!({ "implicit": config.implicit_wait_ms })),
            )
            .await?;

        Ok(session)
    }

    /// Run a session command and decode its `value`.
    async fn command<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let url = format!("{}/session/{}/{}", self.base, self.session_id, path);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::BackendBlocked(format!("WebDriver request failed: {e}")))?;
        let success = response.status().is_success();
        let body = response
            .text()
            .await
            .map_err(|e| Error::BackendBlocked(format!("Invalid WebDriver response: {e}")))?;

        parse_reply(success, &body)
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.command::<IgnoredAny>(Method::POST, "url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn element_texts(&self, selector: &str) -> Result<Vec<String>> {
        let found: Vec<ElementRef> = self
            .command(
                Method::POST,
                "elements",
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await?;

        let mut texts = Vec::with_capacity(found.len());
        for element in found {
            let text: Option<String> = self
                .command(Method::GET, &format!("element/{}/text", element.id), None)
                .await?;
            texts.push(text.unwrap_or_default());
        }
        Ok(texts)
    }

    async fn quit(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let url = format!("{}/session/{}", self.base, self.session_id);
        match self.client.delete(&url).send().await {
            Ok(_) => {
                debug!("Closed WebDriver session {}", self.session_id);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to close WebDriver session: {}", e);
                Err(Error::BackendRequest(e.to_string()))
            }
        }
    }
}

/// Decode `{"value": ...}`, or turn an error reply into the matching [`Error`].
fn parse_reply<T: DeserializeOwned>(success: bool, body: &str) -> Result<T> {
    if !success {
        return Err(command_error(body));
    }
    serde_json::from_str::<Reply<T>>(body)
        .map(|reply| reply.value)
        .map_err(|e| Error::BackendBlocked(format!("Unexpected WebDriver reply: {e}")))
}

/// `{"value": {"error": "no such element", "message": "..."}}`
fn command_error(body: &str) -> Error {
    let Ok(Reply { value }) = serde_json::from_str::<Reply<CommandError>>(body) else {
        return Error::BackendBlocked(format!("WebDriver error: {body}"));
    };

    match value.error.as_str() {
        "no such element" | "stale element reference" => {
            Error::BackendElementMissing(format!("{}: {}", value.error, value.message))
        }
        _ => Error::BackendBlocked(format!("WebDriver {}: {}", value.error, value.message)),
    }
}
