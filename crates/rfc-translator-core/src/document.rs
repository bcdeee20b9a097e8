//! RFC documents as stored on disk.
//!
//! ```json
//! {
//!   "title": { "text": "RFC 1 - Host Software", "zh-cn": "RFC 1 - 主机软件" },
//!   "contents": [
//!     { "text": "1. Scope", "zh-cn": "1. 范围" },
//!     { "text": "+----+", "raw": true }
//!   ]
//! }
//! ```
//!
//! Translations live under the target-language key, so a document can carry
//! several. Fields this crate does not know about are kept as-is.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::Lang;

/// Numeric RFC identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(pub u32);

impl DocId {
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    pub const fn number(self) -> u32 {
        self.0
    }

    /// Title used when the source title has no `" - "` separator
    pub fn fallback_title(self) -> String {
        format!("RFC {}", self.0)
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RFC {}", self.0)
    }
}

impl std::str::FromStr for DocId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .trim()
            .trim_start_matches("rfc")
            .trim_start_matches("RFC")
            .trim();
        digits.parse().map(Self)
    }
}

/// One paragraph (or the title)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<bool>,

    /// Translations keyed by language, plus any unknown fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Segment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            raw: None,
            fields: Map::new(),
        }
    }

    /// A segment that must never be translated
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            raw: Some(true),
            ..Self::new(text)
        }
    }

    pub fn is_raw(&self) -> bool {
        self.raw == Some(true)
    }

    /// The translation for `lang`; an empty string counts as missing.
    pub fn translation(&self, lang: &Lang) -> Option<&str> {
        self.fields
            .get(lang.as_str())
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn is_translated(&self, lang: &Lang) -> bool {
        self.translation(lang).is_some()
    }

    /// Raw or already translated: nothing left to do.
    pub fn is_complete(&self, lang: &Lang) -> bool {
        self.is_raw() || self.is_translated(lang)
    }

    /// Store a translation unless the segment is raw or already translated.
    ///
    /// Returns whether the segment changed.
    pub fn set_translation(&mut self, lang: &Lang, translation: impl Into<String>) -> bool {
        if self.is_complete(lang) {
            return false;
        }
        self.fields
            .insert(lang.as_str().to_string(), Value::String(translation.into()));
        true
    }
}

/// A whole RFC: title plus ordered paragraphs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: Segment,
    pub contents: Vec<Segment>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    pub fn new(title: impl Into<String>, contents: Vec<Segment>) -> Self {
        Self {
            title: Segment::new(title),
            contents,
            extra: Map::new(),
        }
    }

    /// Segments still waiting for a translation into `lang`
    pub fn pending_count(&self, lang: &Lang) -> usize {
        self.contents.iter().filter(|s| !s.is_complete(lang)).count()
    }

    /// Title and every content segment are done.
    pub fn is_complete(&self, lang: &Lang) -> bool {
        self.title.is_translated(lang) && self.pending_count(lang) == 0
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Pretty JSON, 2-space indent, non-ASCII kept verbatim, trailing newline
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}
