// ============================================================
// Layer 3 — Encoded Sentence
// ============================================================
// A sentence after vocabulary lookup. It never carries control
// symbols; the batch scheduler appends EOS and padding to copies.

use serde::{Deserialize, Serialize};

/// Ordered vocabulary indices of one sentence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodedSentence(Vec<usize>);

impl EncodedSentence {
    pub fn new(ids: Vec<usize>) -> Self {
        Self(ids)
    }

    pub fn ids(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<usize>> for EncodedSentence {
    fn from(ids: Vec<usize>) -> Self {
        Self(ids)
    }
}
