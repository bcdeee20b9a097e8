//! RFC Translator Core Library
//!
//! This library provides the core functionality for translating RFC documents:
//! - Document model and bucketed on-disk storage with checkpoints
//! - Terminology rules and list-marker handling
//! - Translation via Google Translate (HTTP endpoint or a WebDriver browser)
//! - Mandatory rate limiting between backend calls
//! - A resumable batch pipeline tying it all together

pub mod config;
pub mod document;
pub mod error;
pub mod governor;
pub mod marker;
pub mod pipeline;
pub mod progress;
pub mod rules;
pub mod store;
pub mod translator;
pub mod util;

pub use config::{AppConfig, BackendKind, BrowserConfig, Lang, LibraryConfig, PacingConfig};
pub use document::{DocId, Document, Segment};
pub use error::{Error, Result};
pub use governor::{Governor, LinearGovernor};
pub use marker::split_marker;
pub use pipeline::{Pipeline, RunOutcome, Stage};
pub use progress::{NoProgress, ProgressSink, ProgressSnapshot, ProgressTracker};
pub use rules::RuleTable;
pub use store::{DocumentPaths, DocumentStatus, DocumentStore};
pub use translator::{
    BrowserSession, BrowserTranslator, LibraryTranslator, Translator, TranslatorInfo,
    create_translator,
};

use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// Translate one document with the backend chosen in `config`.
///
/// Opens the backend, runs the pipeline until it completes, gets
/// interrupted, or `shutdown` resolves, and closes the backend again.
pub async fn translate_document<F>(
    config: &AppConfig,
    id: DocId,
    progress: Arc<dyn ProgressSink>,
    shutdown: F,
) -> Result<RunOutcome>
where
    F: Future<Output = ()>,
{
    let rules = Arc::new(config.rule_table());
    let translator = create_translator(config, Arc::clone(&rules), Arc::clone(&progress)).await?;

    Pipeline::from_config(translator, config)
        .with_rules(rules)
        .with_progress(progress)
        .run_until(id, shutdown)
        .await
}

/// Translate `"test"` once to see whether the backend answers at all.
pub async fn check_backend(config: &AppConfig) -> Result<String> {
    let translator =
        create_translator(config, Arc::new(RuleTable::empty()), Arc::new(NoProgress)).await?;
    round_trip(translator.as_ref(), &config.source_lang, &config.target_lang).await
}

/// One `"test"` round trip; a failing `close` is logged, not returned.
async fn round_trip(translator: &dyn Translator, source: &Lang, target: &Lang) -> Result<String> {
    let result = translator.translate("test", source, target).await;
    if let Err(e) = translator.close().await {
        warn!("Failed to close {} session: {}", translator.name(), e);
    }

    let translated = result?;
    info!("{} answered {:?}", translator.name(), translated);
    Ok(translated)
}
