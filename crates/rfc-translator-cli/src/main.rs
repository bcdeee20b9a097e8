//! RFC Translator CLI - Command line tool for translating RFC documents.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rfc_translator_core::{
    AppConfig, BackendKind, DocId, DocumentStore, Error, Lang, ProgressSink, RunOutcome,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{Level, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendOption {
    Library,
    Browser,
}

impl From<BackendOption> for BackendKind {
    fn from(opt: BackendOption) -> Self {
        match opt {
            BackendOption::Library => Self::Library,
            BackendOption::Browser => Self::Browser,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "rfc-translate")]
#[command(author, version, about = "Translate RFC documents", long_about = None)]
struct Args {
    /// RFC numbers to translate (e.g. 791 or rfc8446)
    #[arg(required_unless_present = "check")]
    numbers: Vec<DocId>,

    /// Translation backend
    #[arg(short, long, value_enum)]
    backend: Option<BackendOption>,

    /// Source language code
    #[arg(short = 's', long)]
    source: Option<String>,

    /// Target language code
    #[arg(short = 't', long)]
    target: Option<String>,

    /// Root of the bucketed data directories
    #[arg(short, long, env = "RFC_TRANSLATOR_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Paragraphs per backend request
    #[arg(long)]
    batch_size: Option<usize>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Show where each document stands instead of translating
    #[arg(long)]
    status: bool,

    /// Translate "test" once to check the backend
    #[arg(long)]
    check: bool,
}

/// Draws pipeline progress as one bar per document
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        // Template is hardcoded and valid, unwrap is safe
        #[allow(clippy::unwrap_used)]
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl ProgressSink for BarProgress {
    #[allow(clippy::cast_possible_truncation)]
    fn start(&self, label: &str, total: usize) {
        self.bar.set_prefix(label.to_string());
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn advance(&self, units: usize) {
        self.bar.inc(units as u64);
    }

    fn throttled(&self, payload: usize, wait: Duration) {
        self.bar
            .set_message(format!("{payload} chars, waited {:.1}s", wait.as_secs_f64()));
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // RUST_LOG wins over -v when set
    if std::env::var_os("RUST_LOG").is_some() {
        FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load().context("Failed to load configuration")?
    };

    // Override config with CLI arguments
    if let Some(backend) = args.backend {
        config.backend = backend.into();
    }
    if let Some(source) = &args.source {
        config.source_lang = Lang::new(source);
    }
    if let Some(target) = &args.target {
        config.target_lang = Lang::new(target);
    }
    if let Some(data_dir) = &args.data_dir {
        config.data_dir.clone_from(data_dir);
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// User-facing explanation of why a document stopped early
fn interruption_message(reason: &Error) -> &'static str {
    match reason {
        Error::BackendBlocked(_) => {
            "Google is refusing requests (rate limited or captcha). Wait a while, then rerun to resume."
        }
        Error::BackendElementMissing(_) => {
            "The translation did not appear on the page. Check the browser session, then rerun to resume."
        }
        Error::UserCancelled => "Cancelled. Rerun to resume.",
        _ => "Stopped early. Rerun to resume.",
    }
}

/// Print how a document run ended; false unless it completed
#[allow(clippy::print_stdout)]
fn report(id: DocId, outcome: rfc_translator_core::Result<RunOutcome>) -> bool {
    match outcome {
        Ok(RunOutcome::Completed { output, resumed }) => {
            let resumed = if resumed { " (resumed)" } else { "" };
            println!("{id}: translated{resumed} -> {}", output.display());
            true
        }
        Ok(RunOutcome::Interrupted { checkpoint, reason }) => {
            println!("{id}: {}", interruption_message(&reason));
            println!("  reason: {reason}");
            println!("  progress saved to {}", checkpoint.display());
            false
        }
        Err(e) => {
            error!("{}: {:#}", id, anyhow::Error::from(e));
            false
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_status(config: &AppConfig, numbers: &[DocId]) {
    let store = DocumentStore::new(&config.data_dir);
    for &id in numbers {
        let paths = store.paths(id);
        println!("{id}: {} ({})", store.status(id), paths.output.display());
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(&args)?;
    info!(
        "Using {} backend, {} -> {}, data in {}",
        config.backend,
        config.source_lang,
        config.target_lang,
        config.data_dir.display()
    );

    if args.status {
        print_status(&config, &args.numbers);
        return Ok(ExitCode::SUCCESS);
    }

    if args.check {
        let translated = rfc_translator_core::check_backend(&config)
            .await
            .context("Backend check failed")?;
        // CLI output is intentional
        #[allow(clippy::print_stdout)]
        {
            println!("{} backend answered: {translated}", config.backend);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, saving progress");
            let _ = cancel_tx.send(true);
        }
    });

    let mut failures = 0usize;
    for &id in &args.numbers {
        if *cancel_rx.borrow() {
            warn!("Skipping {}: cancelled", id);
            failures += 1;
            continue;
        }

        let mut cancelled = cancel_rx.clone();
        let shutdown = async move {
            let _ = cancelled.wait_for(|cancelled| *cancelled).await;
        };

        let progress: Arc<dyn ProgressSink> = Arc::new(BarProgress::new());
        let outcome = rfc_translator_core::translate_document(&config, id, progress, shutdown).await;

        if !report(id, outcome) {
            failures += 1;
        }
    }

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbers() {
        let args = Args::try_parse_from(["rfc-translate", "791", "rfc8446"]).unwrap();
        assert_eq!(args.numbers, vec![DocId(791), DocId(8446)]);
        assert!(!args.status);
    }

    #[test]
    fn test_numbers_required_unless_check() {
        assert!(Args::try_parse_from(["rfc-translate"]).is_err());
        assert!(Args::try_parse_from(["rfc-translate", "--check"]).is_ok());
        assert!(Args::try_parse_from(["rfc-translate", "abc"]).is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::try_parse_from([
            "rfc-translate",
            "--config",
            "/nonexistent/config.toml",
            "1",
        ])
        .unwrap();
        assert!(load_config(&args).is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "batch_size = 5\n").unwrap();
        let args = Args::try_parse_from([
            "rfc-translate",
            "-c",
            path.to_str().unwrap(),
            "--backend",
            "browser",
            "--target",
            "ja",
            "--batch-size",
            "3",
            "1",
        ])
        .unwrap();

        let config = load_config(&args).unwrap();
        assert_eq!(config.backend, BackendKind::Browser);
        assert_eq!(config.target_lang.as_str(), "ja");
        assert_eq!(config.batch_size, 3);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();
        let args = Args::try_parse_from([
            "rfc-translate",
            "-c",
            path.to_str().unwrap(),
            "--batch-size",
            "0",
            "1",
        ])
        .unwrap();
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_interruption_messages_differ() {
        let blocked = interruption_message(&Error::BackendBlocked(String::new()));
        let missing = interruption_message(&Error::BackendElementMissing(String::new()));
        let cancelled = interruption_message(&Error::UserCancelled);
        assert_ne!(blocked, missing);
        assert_ne!(missing, cancelled);
        assert_ne!(blocked, cancelled);
    }
}
