use async_trait::async_trait;

use crate::config::{BackendKind, Lang};
use crate::error::Result;

/// Information about a translator backend
#[derive(Debug, Clone)]
pub struct TranslatorInfo {
    /// Human-readable name
    pub name: &'static str,
    /// Which backend family this is
    pub backend: BackendKind,
}

/// Trait for translation backends
///
/// Implementations throttle themselves: every call that reaches the remote
/// service waits on a governor before returning.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Get information about this translator
    fn info(&self) -> TranslatorInfo;

    /// Get the translator name (convenience method)
    fn name(&self) -> &'static str {
        self.info().name
    }

    /// Translate one string
    async fn translate(&self, text: &str, source: &Lang, target: &Lang) -> Result<String>;

    /// Translate a batch; the result has one entry per input, in order.
    ///
    /// Empty inputs are placeholders and come back empty.
    async fn translate_batch(
        &self,
        texts: &[String],
        source: &Lang,
        target: &Lang,
    ) -> Result<Vec<String>> {
        let mut translated = Vec::with_capacity(texts.len());
        for text in texts {
            translated.push(self.translate(text, source, target).await?);
        }
        Ok(translated)
    }

    /// Release the backend session; safe to call more than once
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
