use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::rules::RuleTable;

/// Language codes as used by the translation backends (e.g. "en", "zh-cn").
///
/// The target code doubles as the JSON key under which translations are stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn default_source_lang() -> Lang {
    Lang::new("en")
}

fn default_target_lang() -> Lang {
    Lang::new("zh-cn")
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Which translation backend drives a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Google Translate's public JSON endpoint over HTTP
    #[default]
    Library,
    /// A real browser driven through WebDriver
    Browser,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Library => f.write_str("library"),
            Self::Browser => f.write_str("browser"),
        }
    }
}

/// Delay policy for one kind of backend call: `floor + payload * per_char`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PacingConfig {
    pub floor_ms: u64,
    pub per_char_ms: f64,
}

impl PacingConfig {
    pub const fn new(floor_ms: u64, per_char_ms: f64) -> Self {
        Self { floor_ms, per_char_ms }
    }

    pub const fn floor(&self) -> Duration {
        Duration::from_millis(self.floor_ms)
    }
}

/// Google Translate JSON endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default = "default_library_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Pacing after a single translation (title, smoke test)
    #[serde(default = "default_library_single_pacing")]
    pub single: PacingConfig,
    /// Pacing after a whole content batch; lower slope, higher floor
    #[serde(default = "default_library_batch_pacing")]
    pub batch: PacingConfig,
}

fn default_library_endpoint() -> String {
    "https://translate.googleapis.com/translate_a/single".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_library_single_pacing() -> PacingConfig {
    PacingConfig::new(3000, 10.0)
}

const fn default_library_batch_pacing() -> PacingConfig {
    PacingConfig::new(5000, 1.0)
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            endpoint: default_library_endpoint(),
            timeout_secs: default_timeout_secs(),
            single: default_library_single_pacing(),
            batch: default_library_batch_pacing(),
        }
    }
}

/// WebDriver-driven browser settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver server (geckodriver listens on 4444 by default)
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default = "default_translate_url")]
    pub translate_url: String,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_implicit_wait_ms")]
    pub implicit_wait_ms: u64,
    /// CSS selector of the spans holding the rendered translation
    #[serde(default = "default_result_selector")]
    pub result_selector: String,
    #[serde(default = "default_browser_pacing")]
    pub pacing: PacingConfig,
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_translate_url() -> String {
    "https://translate.google.com".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_implicit_wait_ms() -> u64 {
    3000
}

fn default_result_selector() -> String {
    "span[jsname='W297wb']".to_string()
}

const fn default_browser_pacing() -> PacingConfig {
    PacingConfig::new(3000, 1.0)
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            translate_url: default_translate_url(),
            headless: true,
            implicit_wait_ms: default_implicit_wait_ms(),
            result_selector: default_result_selector(),
            pacing: default_browser_pacing(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source language
    #[serde(default = "default_source_lang")]
    pub source_lang: Lang,

    /// Target language, also the JSON key of stored translations
    #[serde(default = "default_target_lang")]
    pub target_lang: Lang,

    /// Root of the bucketed document directories
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Content segments per backend batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Translation backend
    #[serde(default)]
    pub backend: BackendKind,

    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    /// Extra terminology rules, merged over the builtin table
    #[serde(default)]
    pub rules: BTreeMap<String, String>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

const fn default_batch_size() -> usize {
    15
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
            data_dir: default_data_dir(),
            batch_size: default_batch_size(),
            backend: BackendKind::default(),
            library: LibraryConfig::default(),
            browser: BrowserConfig::default(),
            rules: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default locations, lowest priority first:
    /// ~/.config/rfc-translator/config.toml, ./config.toml, then
    /// `RFC_TRANSLATOR__*` environment variables.
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("rfc-translator").join("config.toml");
            tracing::debug!("Looking for config at {}", user_config.display());
            builder = builder.add_source(config::File::from(user_config).required(false));
        }

        let config: Self = builder
            .add_source(config::File::from(PathBuf::from("config.toml")).required(false))
            .add_source(
                config::Environment::with_prefix("RFC_TRANSLATOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .map_err(|e| Error::ConfigLoad(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Builtin terminology rules with the `[rules]` table merged over them
    pub fn rule_table(&self) -> RuleTable {
        RuleTable::builtin().extend(&self.rules)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::ConfigInvalid {
                field: "batch_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        for (field, lang) in [("source_lang", &self.source_lang), ("target_lang", &self.target_lang)] {
            if lang.as_str().trim().is_empty() {
                return Err(Error::ConfigInvalid {
                    field: field.to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }

        // Translations are stored under the language code next to these keys
        if matches!(self.target_lang.as_str(), "text" | "raw") {
            return Err(Error::ConfigInvalid {
                field: "target_lang".to_string(),
                reason: format!("`{}` clashes with a segment field", self.target_lang),
            });
        }

        let pacings = [
            ("library.single", self.library.single),
            ("library.batch", self.library.batch),
            ("browser.pacing", self.browser.pacing),
        ];
        for (field, pacing) in pacings {
            if !pacing.per_char_ms.is_finite() || pacing.per_char_ms < 0.0 {
                return Err(Error::ConfigInvalid {
                    field: format!("{field}.per_char_ms"),
                    reason: "must be a non-negative number".to_string(),
                });
            }
        }

        Ok(())
    }
}
