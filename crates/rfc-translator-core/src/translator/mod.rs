mod browser;
mod library;
mod traits;
mod webdriver;

pub use browser::{BrowserSession, BrowserTranslator, encode_query};
pub use library::{LibraryTranslator, escape_entities, normalize_parens, parse_response};
pub use traits::{Translator, TranslatorInfo};
pub use webdriver::WebDriverSession;

use crate::config::{AppConfig, BackendKind};
use crate::error::Result;
use crate::progress::ProgressSink;
use crate::rules::RuleTable;
use std::sync::Arc;
use tracing::info;

/// Create the configured translator.
///
/// The browser backend opens its WebDriver session here; call
/// [`Translator::close`] when done with it.
pub async fn create_translator(
    config: &AppConfig,
    rules: Arc<RuleTable>,
    progress: Arc<dyn ProgressSink>,
) -> Result<Arc<dyn Translator>> {
    let translator: Arc<dyn Translator> = match config.backend {
        BackendKind::Library => Arc::new(
            LibraryTranslator::new(&config.library, rules)?.with_progress(progress),
        ),
        BackendKind::Browser => Arc::new(
            BrowserTranslator::connect(&config.browser, rules)
                .await?
                .with_progress(progress),
        ),
    };

    info!("Using {} backend: {}", config.backend, translator.name());
    Ok(translator)
}
