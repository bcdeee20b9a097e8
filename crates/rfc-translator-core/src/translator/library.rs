use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use std::borrow::Cow;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, warn};

use super::traits::{Translator, TranslatorInfo};
use crate::config::{BackendKind, Lang, LibraryConfig};
use crate::error::{Error, Result};
use crate::governor::{Governor, LinearGovernor};
use crate::progress::{NoProgress, ProgressSink};
use crate::rules::RuleTable;
use crate::util::char_len;

#[allow(clippy::unwrap_used)]
static ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&(#?[a-zA-Z0-9]+);").unwrap());

#[allow(clippy::unwrap_used)]
static FULLWIDTH_PARENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"（([^（）]*)）").unwrap());

/// Google Translate through its public `translate_a/single` JSON endpoint.
///
/// Batches are sent one string at a time; the bulk form of this endpoint
/// drops or merges entries. The whole batch then waits once, on the batch
/// governor.
pub struct LibraryTranslator {
    client: Client,
    endpoint: String,
    rules: Arc<RuleTable>,
    single: Arc<dyn Governor>,
    batch: Arc<dyn Governor>,
    progress: Arc<dyn ProgressSink>,
}

impl LibraryTranslator {
    pub fn new(config: &LibraryConfig, rules: Arc<RuleTable>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| Error::BackendRequest(format!("Failed to create HTTP client: {e}")))?;

        let single = LinearGovernor::from_pacing(config.single);
        let batch = single.with_pacing(config.batch);

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            rules,
            single: Arc::new(single),
            batch: Arc::new(batch),
            progress: Arc::new(NoProgress),
        })
    }

    #[must_use]
    pub fn with_governors(mut self, single: Arc<dyn Governor>, batch: Arc<dyn Governor>) -> Self {
        self.single = single;
        self.batch = batch;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// One HTTP round trip, no rules and no throttling
    async fn request(&self, text: &str, source: &Lang, target: &Lang) -> Result<String> {
        debug!("Requesting translation of {} chars", char_len(text));

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source.as_str()),
                ("tl", target.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!("Request failed: {}", e);
                Error::BackendBlocked(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Translation endpoint answered {}", status);
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS | StatusCode::FORBIDDEN => {
                    Error::BackendBlocked(format!("HTTP {status}: unusual traffic detected"))
                }
                _ => Error::BackendBlocked(format!("HTTP {status}")),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::BackendBlocked(format!("Failed to read response: {e}")))?;

        parse_response(&body)
    }
}

#[async_trait]
impl Translator for LibraryTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "Google Translate (HTTP)",
            backend: BackendKind::Library,
        }
    }

    async fn translate(&self, text: &str, source: &Lang, target: &Lang) -> Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }
        if let Some(fixed) = self.rules.lookup(text) {
            return Ok(fixed.to_string());
        }

        let escaped = escape_entities(text);
        let translated = self.request(&escaped, source, target).await;

        // Failed calls count against the rate limit too.
        let payload = char_len(&escaped);
        let wait = self.single.wait(payload).await;
        self.progress.throttled(payload, wait);

        Ok(normalize_parens(&translated?))
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        source: &Lang,
        target: &Lang,
    ) -> Result<Vec<String>> {
        let mut translated = Vec::with_capacity(texts.len());
        let mut payload = 0;
        let mut requests = 0;
        let mut failure = None;

        for text in texts {
            if text.is_empty() {
                translated.push(String::new());
                continue;
            }
            if let Some(fixed) = self.rules.lookup(text) {
                translated.push(fixed.to_string());
                continue;
            }

            let escaped = escape_entities(text);
            payload += char_len(&escaped);
            requests += 1;
            match self.request(&escaped, source, target).await {
                Ok(result) => translated.push(normalize_parens(&result)),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if requests > 0 {
            let wait = self.batch.wait(payload).await;
            self.progress.throttled(payload, wait);
        }
        if let Some(e) = failure {
            return Err(e);
        }

        // A backend answer never replaces a canonical term.
        for (text, out) in texts.iter().zip(translated.iter_mut()) {
            if let Some(fixed) = self.rules.lookup(text) {
                fixed.clone_into(out);
            }
        }

        Ok(translated)
    }
}

/// `&amp;` -> `& amp;`: the endpoint otherwise treats entities as markup.
pub fn escape_entities(text: &str) -> Cow<'_, str> {
    ENTITY.replace_all(text, "& ${1};")
}

/// `（…）` -> `(…)`
pub fn normalize_parens(text: &str) -> String {
    FULLWIDTH_PARENS.replace_all(text, "(${1})").into_owned()
}

/// Concatenate the sentence chunks of a `translate_a/single` answer.
///
/// The body looks like `[[["译文一","source one",null,null,10],["译文二",...]],null,"en",...]`.
/// Anything else (a captcha page, an empty result) means the backend is
/// refusing service.
pub fn parse_response(body: &str) -> Result<String> {
    let json: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        warn!("Unparseable translation response: {}", e);
        Error::BackendBlocked(format!("unparseable response: {e}"))
    })?;

    let sentences = json
        .get(0)
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| Error::BackendBlocked("response has no sentence array".to_string()))?;

    let translated: String = sentences
        .iter()
        .filter_map(|sentence| sentence.get(0).and_then(serde_json::Value::as_str))
        .collect();

    if translated.is_empty() {
        return Err(Error::BackendBlocked("empty translation".to_string()));
    }
    Ok(translated)
}
