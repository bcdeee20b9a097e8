//! Resumable, throttled translation of one document.
//!
//! ```text
//! Idle -> Loading -> TranslatingTitle -> TranslatingContent -> Finalizing -> Completed
//!                         |                     |                   \
//!                         +---------------------+--------------------> Interrupted
//! ```
//!
//! Loading picks the checkpoint over the source. Interruptions (blocked
//! backend, missing result element, cancellation) save the document as it
//! is into the checkpoint; the next run resumes from there.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, Lang};
use crate::document::{DocId, Document, Segment};
use crate::error::{Error, Result};
use crate::marker::split_marker;
use crate::progress::{NoProgress, ProgressSink};
use crate::rules::RuleTable;
use crate::store::{DocumentStore, LoadedDocument};
use crate::translator::Translator;

/// Default number of content segments per backend batch
pub const DEFAULT_BATCH_SIZE: usize = 15;

/// Stage of a document run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Loading,
    TranslatingTitle,
    TranslatingContent,
    Finalizing,
    Completed,
    Interrupted,
}

impl Stage {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Interrupted)
    }
}

/// How a run ended, when it did not fail outright
#[derive(Debug)]
pub enum RunOutcome {
    /// Output written; source and checkpoint removed
    Completed { output: PathBuf, resumed: bool },
    /// Partial progress saved to the checkpoint
    Interrupted { checkpoint: PathBuf, reason: Error },
}

impl RunOutcome {
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub const fn stage(&self) -> Stage {
        match self {
            Self::Completed { .. } => Stage::Completed,
            Self::Interrupted { .. } => Stage::Interrupted,
        }
    }
}

/// Stage bookkeeping for one run
#[derive(Debug)]
struct Run {
    id: DocId,
    stage: Stage,
}

impl Run {
    const fn new(id: DocId) -> Self {
        Self { id, stage: Stage::Idle }
    }

    fn enter(&mut self, next: Stage) {
        debug_assert!(!self.stage.is_terminal(), "{:?} is terminal", self.stage);
        info!("{}: {:?} -> {:?}", self.id, self.stage, next);
        self.stage = next;
    }
}

/// Drives documents through a translator, one batch at a time.
pub struct Pipeline {
    translator: Arc<dyn Translator>,
    store: DocumentStore,
    rules: Arc<RuleTable>,
    progress: Arc<dyn ProgressSink>,
    source_lang: Lang,
    target_lang: Lang,
    batch_size: usize,
}

impl Pipeline {
    /// English to Simplified Chinese with the builtin rules.
    pub fn new(translator: Arc<dyn Translator>, store: DocumentStore) -> Self {
        Self {
            translator,
            store,
            rules: Arc::new(RuleTable::builtin()),
            progress: Arc::new(NoProgress),
            source_lang: Lang::new("en"),
            target_lang: Lang::new("zh-cn"),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Languages, batch size and data directory from `config`.
    pub fn from_config(translator: Arc<dyn Translator>, config: &AppConfig) -> Self {
        Self::new(translator, DocumentStore::new(&config.data_dir))
            .with_languages(config.source_lang.clone(), config.target_lang.clone())
            .with_batch_size(config.batch_size)
    }

    #[must_use]
    pub fn with_rules(mut self, rules: Arc<RuleTable>) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn with_languages(mut self, source: Lang, target: Lang) -> Self {
        self.source_lang = source;
        self.target_lang = target;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub const fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub const fn target_lang(&self) -> &Lang {
        &self.target_lang
    }

    /// Translate a document with no external cancellation.
    pub async fn run(&self, id: DocId) -> Result<RunOutcome> {
        self.run_until(id, std::future::pending()).await
    }

    /// Translate a document, cancelling when `shutdown` resolves.
    ///
    /// Interruptions come back as `Ok(RunOutcome::Interrupted)`. Errors are
    /// reserved for loading failures and storage problems. The translator is
    /// closed on every path.
    pub async fn run_until<F>(&self, id: DocId, shutdown: F) -> Result<RunOutcome>
    where
        F: Future<Output = ()>,
    {
        let result = self.drive(id, shutdown).await;

        if let Err(e) = self.translator.close().await {
            warn!("Failed to close {} session: {}", self.translator.name(), e);
        }
        self.progress.finish();

        result
    }

    async fn drive<F>(&self, id: DocId, shutdown: F) -> Result<RunOutcome>
    where
        F: Future<Output = ()>,
    {
        let mut run = Run::new(id);

        run.enter(Stage::Loading);
        let LoadedDocument { mut document, resumed } = self.store.load(id)?;
        info!(
            "{}: {} segments, {} pending{}",
            id,
            document.contents.len(),
            document.pending_count(&self.target_lang),
            if resumed { " (resumed from checkpoint)" } else { "" }
        );
        self.progress.start(&id.to_string(), document.contents.len());

        let translated = tokio::select! {
            biased;
            () = shutdown => Err(Error::UserCancelled),
            result = self.translate_document(&mut run, &mut document) => result,
        };

        run.enter(Stage::Finalizing);
        match translated {
            Ok(()) => match self.store.finalize(id, &document) {
                Ok(output) => {
                    run.enter(Stage::Completed);
                    Ok(RunOutcome::Completed { output, resumed })
                }
                Err(e) => {
                    self.checkpoint_best_effort(id, &document);
                    run.enter(Stage::Interrupted);
                    Err(e)
                }
            },
            Err(reason) if reason.is_interruption() => {
                warn!("{} interrupted: {}", id, reason);
                let checkpoint = self.store.save_checkpoint(id, &document)?;
                run.enter(Stage::Interrupted);
                Ok(RunOutcome::Interrupted { checkpoint, reason })
            }
            Err(e) => {
                self.checkpoint_best_effort(id, &document);
                run.enter(Stage::Interrupted);
                Err(e)
            }
        }
    }

    /// Keep whatever was translated when the run is failing anyway
    fn checkpoint_best_effort(&self, id: DocId, document: &Document) {
        if let Err(save) = self.store.save_checkpoint(id, document) {
            warn!("Failed to save checkpoint for {}: {}", id, save);
        }
    }

    async fn translate_document(&self, run: &mut Run, document: &mut Document) -> Result<()> {
        run.enter(Stage::TranslatingTitle);
        self.translate_title(run.id, &mut document.title).await?;

        run.enter(Stage::TranslatingContent);
        let total = document.contents.len();
        for (batch_no, batch) in document.contents.chunks_mut(self.batch_size).enumerate() {
            let first = batch_no * self.batch_size;
            info!("{}: segments {}..{} of {}", run.id, first, first + batch.len(), total);
            self.translate_batch(batch).await?;
            self.progress.advance(batch.len());
        }

        Ok(())
    }

    /// `"RFC 8446 - The TLS Protocol"`: only the part after the first `" - "`
    /// is translated.
    async fn translate_title(&self, id: DocId, title: &mut Segment) -> Result<()> {
        if title.is_translated(&self.target_lang) {
            return Ok(());
        }

        let translated = match title.text.split_once(" - ") {
            None => id.fallback_title(),
            Some((prefix, rest)) => format!("{prefix} - {}", self.translate_one(rest).await?),
        };
        title.set_translation(&self.target_lang, translated);
        Ok(())
    }

    async fn translate_one(&self, text: &str) -> Result<String> {
        if let Some(fixed) = self.rules.lookup(text) {
            return Ok(fixed.to_string());
        }
        self.translator
            .translate(text, &self.source_lang, &self.target_lang)
            .await
    }

    /// Translate one batch in place.
    ///
    /// Finished, raw and rule-resolved segments go out as empty placeholders
    /// so positions line up with the backend's answer. Nothing is written
    /// until the whole batch has come back.
    async fn translate_batch(&self, segments: &mut [Segment]) -> Result<()> {
        let lang = &self.target_lang;

        // (marker, body) for every segment that still needs work
        let plan: Vec<Option<(String, String)>> = segments
            .iter()
            .map(|segment| {
                (!segment.is_complete(lang)).then(|| {
                    let (marker, body) = split_marker(&segment.text);
                    (marker.to_string(), body.to_string())
                })
            })
            .collect();

        let texts: Vec<String> = plan
            .iter()
            .map(|step| match step {
                Some((_, body)) if self.rules.lookup(body).is_none() => body.clone(),
                _ => String::new(),
            })
            .collect();

        let to_send = texts.iter().filter(|t| !t.is_empty()).count();
        let translated = if to_send == 0 {
            vec![String::new(); texts.len()]
        } else {
            debug!("Sending {} of {} segments to {}", to_send, texts.len(), self.translator.name());
            let translated = self
                .translator
                .translate_batch(&texts, &self.source_lang, lang)
                .await?;
            if translated.len() != texts.len() {
                return Err(Error::BackendBlocked(format!(
                    "backend returned {} translations for {} texts",
                    translated.len(),
                    texts.len()
                )));
            }
            translated
        };

        for ((segment, step), answer) in segments.iter_mut().zip(plan).zip(translated) {
            let Some((marker, body)) = step else {
                continue;
            };
            let body = self.rules.lookup(&body).map_or(answer, str::to_string);
            segment.set_translation(lang, format!("{marker}{body}"));
        }

        Ok(())
    }
}
