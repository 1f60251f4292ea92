// ============================================================
// Layer 3 — Document Domain Type
// ============================================================
// One source document of the training corpus: the file it came
// from and its raw (not yet cleaned) UTF-8 text.

use serde::{Deserialize, Serialize};

/// A raw document loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// The file name, kept so a bad character can be traced back
    pub source: String,

    /// The full text content before cleaning
    pub text: String,
}

impl Document {
    /// Create a new Document with a source name and text content.
    ///
    /// Example:
    ///   let doc = Document::new("truyen_01.txt", "Con mèo đen.");
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text:   text.into(),
        }
    }
}
