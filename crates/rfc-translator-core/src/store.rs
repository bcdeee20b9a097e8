use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::document::{DocId, Document};
use crate::error::{Error, Result};

/// On-disk locations of one document's three artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPaths {
    /// Untranslated input, deleted once the output is written
    pub source: PathBuf,
    /// Partial progress of an interrupted run ("midway" file)
    pub checkpoint: PathBuf,
    /// Fully translated document
    pub output: PathBuf,
}

/// Where a document stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    /// Final output exists
    Translated,
    /// A checkpoint from an interrupted run exists
    Partial,
    /// Only the source exists
    Pending,
    /// Nothing on disk
    Missing,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Translated => "translated",
            Self::Partial => "partially translated",
            Self::Pending => "not started",
            Self::Missing => "missing",
        })
    }
}

/// A document loaded for a run, and whether it came from a checkpoint
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document: Document,
    pub resumed: bool,
}

/// JSON documents under `<root>/<bucket>/rfc<n>[-midway|-trans].json`,
/// where the bucket is the thousands digit of the number times 1000
/// (`data/8000/rfc8446.json`).
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bucket_dir(&self, id: DocId) -> PathBuf {
        self.root.join(format!("{:04}", id.number() / 1000 % 10 * 1000))
    }

    pub fn paths(&self, id: DocId) -> DocumentPaths {
        let dir = self.bucket_dir(id);
        let n = id.number();
        DocumentPaths {
            source: dir.join(format!("rfc{n}.json")),
            checkpoint: dir.join(format!("rfc{n}-midway.json")),
            output: dir.join(format!("rfc{n}-trans.json")),
        }
    }

    pub fn status(&self, id: DocId) -> DocumentStatus {
        let paths = self.paths(id);
        if paths.output.is_file() {
            DocumentStatus::Translated
        } else if paths.checkpoint.is_file() {
            DocumentStatus::Partial
        } else if paths.source.is_file() {
            DocumentStatus::Pending
        } else {
            DocumentStatus::Missing
        }
    }

    // ==========================================================================
    // Checkpoint
    // ==========================================================================

    pub fn has_checkpoint(&self, id: DocId) -> bool {
        self.paths(id).checkpoint.is_file()
    }

    pub fn load_checkpoint(&self, id: DocId) -> Result<Document> {
        read_document(&self.paths(id).checkpoint)
    }

    pub fn save_checkpoint(&self, id: DocId, document: &Document) -> Result<PathBuf> {
        let path = self.paths(id).checkpoint;
        write_document(&path, document)?;
        info!("Saved checkpoint for {} to {}", id, path.display());
        Ok(path)
    }

    pub fn clear_checkpoint(&self, id: DocId) -> Result<()> {
        remove_if_exists(&self.paths(id).checkpoint)
    }

    // ==========================================================================
    // Source and output
    // ==========================================================================

    pub fn load_source(&self, id: DocId) -> Result<Document> {
        read_document(&self.paths(id).source)
    }

    /// Resume from a checkpoint when there is one, else start from the source.
    pub fn load(&self, id: DocId) -> Result<LoadedDocument> {
        if self.has_checkpoint(id) {
            debug!("Resuming {} from checkpoint", id);
            return Ok(LoadedDocument {
                document: self.load_checkpoint(id)?,
                resumed: true,
            });
        }

        Ok(LoadedDocument {
            document: self.load_source(id)?,
            resumed: false,
        })
    }

    /// Write the final output, then drop the source and any checkpoint.
    pub fn finalize(&self, id: DocId, document: &Document) -> Result<PathBuf> {
        let paths = self.paths(id);
        write_document(&paths.output, document)?;
        remove_if_exists(&paths.source)?;
        remove_if_exists(&paths.checkpoint)?;
        info!("Wrote {} to {}", id, paths.output.display());
        Ok(paths.output)
    }

    /// Write a source document; used to seed a data directory
    pub fn save_source(&self, id: DocId, document: &Document) -> Result<PathBuf> {
        let path = self.paths(id).source;
        write_document(&path, document)?;
        Ok(path)
    }
}

fn read_document(path: &Path) -> Result<Document> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::DocumentNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    Document::from_json(&content).map_err(|e| Error::MalformedSource {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Temp file in the same directory, then rename, so a crash never leaves a
/// half-written document behind.
fn write_document(path: &Path, document: &Document) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let json = document.to_json()?;
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(json.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
