// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Loads every plain-text file of a directory as one Document.
// Files must be UTF-8; a file that cannot be read or decoded is
// skipped with a warning rather than aborting the whole corpus.
//
// Files are visited in name order so that the vocabulary (whose
// indices follow first-seen order) is reproducible across runs.

use anyhow::{Context, Result};
use std::{fs, path::Path};

use crate::domain::document::Document;
use crate::domain::traits::DocumentSource;

/// Loads all text files from a given directory.
pub struct TextLoader {
    /// Path to the directory containing the book files
    dir: String,
}

impl TextLoader {
    /// Create a new TextLoader pointed at a directory
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DocumentSource for TextLoader {
    fn load_all(&self) -> Result<Vec<Document>> {
        let dir = Path::new(&self.dir);

        // A missing directory is an empty corpus; the vocabulary
        // builder reports that as a proper error.
        if !dir.exists() {
            tracing::warn!(
                "Corpus directory '{}' does not exist, returning empty corpus",
                self.dir
            );
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)
            .with_context(|| format!("Cannot read directory '{}'", self.dir))?
        {
            let path = entry?.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut docs = Vec::with_capacity(paths.len());
        for path in paths {
            match load_single_text(&path) {
                Ok(doc) => {
                    tracing::debug!(
                        "Loaded: {} ({} words)",
                        doc.source,
                        doc.text.split_whitespace().count()
                    );
                    docs.push(doc);
                }
                Err(e) => {
                    tracing::warn!("Skipping '{}': {:#}", path.display(), e);
                }
            }
        }

        tracing::info!("Successfully loaded {} documents", docs.len());
        Ok(docs)
    }
}

/// Read one UTF-8 file into a Document named after the file.
fn load_single_text(path: &Path) -> Result<Document> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}' as UTF-8", path.display()))?;

    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    Ok(Document::new(source, text))
}
