// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Every failure the corrector can report to a caller.
// Gradient clipping and early stopping are not errors and do
// not appear here.

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::signature::HyperSignature;

#[derive(Error, Debug)]
pub enum SpellError {
    /// Malformed vocabulary: empty corpus, duplicate entry,
    /// missing or misplaced control symbol
    #[error("vocabulary error: {0}")]
    Vocabulary(String),

    /// A character that the vocabulary has no slot for
    #[error("unknown character {character:?} at position {position}")]
    UnknownCharacter { character: char, position: usize },

    /// Nothing survived the sentence length filter
    #[error(
        "no sentence out of {candidates} has a length within [{min_length}, {max_length}]"
    )]
    LengthFilterExhaustion {
        min_length: usize,
        max_length: usize,
        candidates: usize,
    },

    /// Checkpoint could not be written or read
    #[error("checkpoint I/O error for {path}: {reason}")]
    CheckpointIo { path: PathBuf, reason: String },

    /// Checkpoint was trained under different hyperparameters
    #[error("checkpoint was trained as '{found}', expected '{expected}'")]
    IncompatibleCheckpoint {
        expected: HyperSignature,
        found:    HyperSignature,
    },

    /// Overlapping or empty diacritic classes
    #[error("invalid equivalence classes: {0}")]
    EquivalenceClass(String),
}

impl SpellError {
    /// Wrap any displayable failure as a checkpoint I/O error for `path`.
    pub fn checkpoint_io(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        SpellError::CheckpointIo {
            path:   path.into(),
            reason: reason.to_string(),
        }
    }
}
