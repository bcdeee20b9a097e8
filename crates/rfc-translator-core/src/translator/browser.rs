use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::traits::{Translator, TranslatorInfo};
use super::webdriver::WebDriverSession;
use crate::config::{BackendKind, BrowserConfig, Lang};
use crate::error::{Error, Result};
use crate::governor::{Governor, LinearGovernor};
use crate::progress::{NoProgress, ProgressSink};
use crate::rules::RuleTable;
use crate::util::char_len;

/// The part of a browser the translator drives
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Visible text of every element matching a CSS selector, in page order
    async fn element_texts(&self, selector: &str) -> Result<Vec<String>>;

    /// End the session; further calls are no-ops
    async fn quit(&self) -> Result<()>;
}

/// Translates by loading `translate.google.com/#<sl>/<tl>/<text>` in a real
/// browser and reading the rendered result.
pub struct BrowserTranslator {
    session: Box<dyn BrowserSession>,
    translate_url: String,
    result_selector: String,
    rules: Arc<RuleTable>,
    governor: Arc<dyn Governor>,
    progress: Arc<dyn ProgressSink>,
}

impl BrowserTranslator {
    /// Start a WebDriver session for `config`.
    pub async fn connect(config: &BrowserConfig, rules: Arc<RuleTable>) -> Result<Self> {
        let session = WebDriverSession::start(config).await?;
        Ok(Self::with_session(Box::new(session), config, rules))
    }

    pub fn with_session(
        session: Box<dyn BrowserSession>,
        config: &BrowserConfig,
        rules: Arc<RuleTable>,
    ) -> Self {
        Self {
            session,
            translate_url: config.translate_url.trim_end_matches('/').to_string(),
            result_selector: config.result_selector.clone(),
            rules,
            governor: Arc::new(LinearGovernor::from_pacing(config.pacing)),
            progress: Arc::new(NoProgress),
        }
    }

    #[must_use]
    pub fn with_governor(mut self, governor: Arc<dyn Governor>) -> Self {
        self.governor = governor;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn page_url(&self, query: &str, source: &Lang, target: &Lang) -> String {
        format!("{}/#{}/{}/{}", self.translate_url, source, target, query)
    }
}

#[async_trait]
impl Translator for BrowserTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "Google Translate (browser)",
            backend: BackendKind::Browser,
        }
    }

    async fn translate(&self, text: &str, source: &Lang, target: &Lang) -> Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }
        if let Some(fixed) = self.rules.lookup(text) {
            return Ok(fixed.to_string());
        }

        let query = encode_query(text);
        let url = self.page_url(&query, source, target);
        debug!("Navigating to translation page ({} chars)", url.len());
        let navigated = self.session.navigate(&url).await;

        // The page renders asynchronously; give it time before scraping.
        // A failed navigation is paced like any other call.
        let payload = char_len(text);
        let wait = self.governor.wait(payload).await;
        self.progress.throttled(payload, wait);
        navigated?;

        let translated = self
            .session
            .element_texts(&self.result_selector)
            .await?
            .concat();

        if translated.is_empty() {
            return Err(Error::BackendElementMissing(format!(
                "no text under {}",
                self.result_selector
            )));
        }
        Ok(translated)
    }

    async fn close(&self) -> Result<()> {
        self.session.quit().await
    }
}

/// Percent-encode text for the fragment of a translate URL.
///
/// `%`, `|` and `/` are pre-escaped (the page decodes the fragment once more
/// and splits on `/`), then everything is form-encoded with spaces as `+`.
pub fn encode_query(text: &str) -> String {
    let pre_escaped = text
        .replace('%', "%25")
        .replace('|', "%7C")
        .replace('/', "%2F");
    urlencoding::encode(&pre_escaped).replace("%20", "+")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governor::CountingGovernor;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Answers every page with a fixed list of result spans
    #[derive(Default)]
    struct FakeSession {
        spans: Vec<String>,
        refuse_navigation: bool,
        visited: Mutex<Vec<String>>,
        quits: AtomicUsize,
        quit_flag: AtomicBool,
    }

    impl FakeSession {
        fn answering(spans: &[&str]) -> Self {
            Self {
                spans: spans.iter().map(|s| (*s).to_string()).collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl BrowserSession for Arc<FakeSession> {
        async fn navigate(&self, url: &str) -> Result<()> {
            self.visited.lock().unwrap().push(url.to_string());
            if self.refuse_navigation {
                return Err(Error::BackendBlocked("navigation refused".to_string()));
            }
            Ok(())
        }

        async fn element_texts(&self, _selector: &str) -> Result<Vec<String>> {
            Ok(self.spans.clone())
        }

        async fn quit(&self) -> Result<()> {
            if !self.quit_flag.swap(true, Ordering::SeqCst) {
                self.quits.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    fn translator(session: &Arc<FakeSession>) -> BrowserTranslator {
        BrowserTranslator::with_session(
            Box::new(Arc::clone(session)),
            &BrowserConfig::default(),
            Arc::new(RuleTable::builtin()),
        )
        .with_governor(Arc::new(LinearGovernor::immediate()))
    }

    fn langs() -> (Lang, Lang) {
        (Lang::new("en"), Lang::new("zh-cn"))
    }

    #[test]
    fn test_encode_query() {
        assert_eq!(encode_query("hello world"), "hello+world");
        assert_eq!(encode_query("50%"), "50%2525");
        assert_eq!(encode_query("a|b"), "a%257Cb");
        assert_eq!(encode_query("TCP/IP"), "TCP%252FIP");
        assert_eq!(encode_query("a+b=c&d"), "a%2Bb%3Dc%26d");
    }

    #[tokio::test]
    async fn test_translate_scrapes_result_spans() {
        let session = Arc::new(FakeSession::answering(&["你好，", "世界"]));
        let translator = translator(&session);
        let (en, zh) = langs();

        let out = translator.translate("hello world", &en, &zh).await.unwrap();
        assert_eq!(out, "你好，世界");

        let visited = session.visited.lock().unwrap();
        assert_eq!(
            visited.as_slice(),
            ["https://translate.google.com/#en/zh-cn/hello+world"]
        );
    }

    #[tokio::test]
    async fn test_rules_short_circuit_browser() {
        let session = Arc::new(FakeSession::answering(&["wrong"]));
        let translator = translator(&session);
        let (en, zh) = langs();

        assert_eq!(translator.translate("Abstract", &en, &zh).await.unwrap(), "摘要");
        assert_eq!(translator.translate("", &en, &zh).await.unwrap(), "");
        assert!(session.visited.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_result_element() {
        let session = Arc::new(FakeSession::answering(&[]));
        let translator = translator(&session);
        let (en, zh) = langs();

        let result = translator.translate("hello", &en, &zh).await;
        assert!(matches!(result, Err(Error::BackendElementMissing(_))));
    }

    #[tokio::test]
    async fn test_batch_is_sequential_singles() {
        let session = Arc::new(FakeSession::answering(&["译文"]));
        let translator = translator(&session);
        let (en, zh) = langs();

        let texts = vec!["one".to_string(), String::new(), "Introduction".to_string()];
        let out = translator.translate_batch(&texts, &en, &zh).await.unwrap();
        assert_eq!(out, vec!["译文", "", "介绍"]);
        assert_eq!(session.visited.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_navigation_is_still_throttled() {
        let session = Arc::new(FakeSession {
            refuse_navigation: true,
            ..FakeSession::default()
        });
        let governor = Arc::new(CountingGovernor::default());
        let translator = translator(&session).with_governor(governor.clone());
        let (en, zh) = langs();

        let result = translator.translate("hello", &en, &zh).await;
        assert!(matches!(result, Err(Error::BackendBlocked(_))));
        assert_eq!(governor.payloads(), vec![5]);
    }

    #[tokio::test]
    async fn test_close_quits_once() {
        let session = Arc::new(FakeSession::answering(&[]));
        let translator = translator(&session);
        translator.close().await.unwrap();
        translator.close().await.unwrap();
        assert_eq!(session.quits.load(Ordering::SeqCst), 1);
    }
}
