// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to these abstractions rather than
// to concrete loaders or model engines:
//   - TextLoader implements DocumentSource
//   - CorrectUseCase implements SpellCorrector

use anyhow::Result;
use crate::domain::document::Document;

// ─── DocumentSource ───────────────────────────────────────────────────────────
/// Any component that can load corpus documents from a source.
pub trait DocumentSource {
    /// Load all available documents from this source.
    fn load_all(&self) -> Result<Vec<Document>>;
}

// ─── SpellCorrector ───────────────────────────────────────────────────────────
/// Any component that can turn a misspelled sentence into a corrected one.
pub trait SpellCorrector {
    /// Correct one free-form sentence. Fails if the text contains a
    /// character the corrector has never seen.
    fn correct(&self, text: &str) -> Result<String>;
}
