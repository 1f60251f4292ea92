// ============================================================
// Layer 4 — Character Vocabulary
// ============================================================
// Closed character inventory derived from the cleaned corpus.
//
// Index assignment:
//   - every character gets the next free index the first time
//     it is seen, scanning documents in order (no frequency cut)
//   - the three control symbols follow the last character:
//       <PAD> = n, <EOS> = n + 1, <GO> = n + 2
//
// Built once, then shared read-only by the segmenter, the noise
// generator, the model and the corrector. It is persisted inside
// every checkpoint so the corrector decodes with the exact same
// mapping the model was trained on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::error::SpellError;
use crate::domain::sentence::EncodedSentence;

pub const PAD: &str = "<PAD>";
pub const EOS: &str = "<EOS>";
pub const GO:  &str = "<GO>";

const CONTROLS: [&str; 3] = [PAD, EOS, GO];

/// Serialised form stored in checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyRecord {
    pub chars:    Vec<char>,
    pub controls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    chars: Vec<char>,
    index: HashMap<char, usize>,
}

impl Vocabulary {
    /// Scan every character of every document in order.
    pub fn build<S: AsRef<str>>(documents: &[S]) -> Result<Self, SpellError> {
        let mut chars = Vec::new();
        let mut index = HashMap::new();

        for doc in documents {
            for c in doc.as_ref().chars() {
                index.entry(c).or_insert_with(|| {
                    chars.push(c);
                    chars.len() - 1
                });
            }
        }

        if chars.is_empty() {
            return Err(SpellError::Vocabulary(
                "corpus is empty, only control symbols would remain".to_string(),
            ));
        }

        tracing::info!("The vocabulary contains {} characters.", chars.len() + CONTROLS.len());
        Ok(Self { chars, index })
    }

    /// Rebuild from a checkpoint record, validating the bijection.
    pub fn from_record(record: &VocabularyRecord) -> Result<Self, SpellError> {
        if record.controls.len() != CONTROLS.len()
            || record.controls.iter().zip(CONTROLS).any(|(a, b)| a != b)
        {
            return Err(SpellError::Vocabulary(format!(
                "expected control symbols {:?}, found {:?}",
                CONTROLS, record.controls
            )));
        }

        let mut index = HashMap::with_capacity(record.chars.len());
        for (i, &c) in record.chars.iter().enumerate() {
            if index.insert(c, i).is_some() {
                return Err(SpellError::Vocabulary(format!("duplicate character {c:?}")));
            }
        }

        if record.chars.is_empty() {
            return Err(SpellError::Vocabulary("no characters in record".to_string()));
        }

        Ok(Self { chars: record.chars.clone(), index })
    }

    pub fn to_record(&self) -> VocabularyRecord {
        VocabularyRecord {
            chars:    self.chars.clone(),
            controls: CONTROLS.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Total number of symbols, control symbols included.
    pub fn len(&self) -> usize {
        self.chars.len() + CONTROLS.len()
    }

    pub fn pad(&self) -> usize {
        self.chars.len()
    }

    pub fn eos(&self) -> usize {
        self.chars.len() + 1
    }

    pub fn go(&self) -> usize {
        self.chars.len() + 2
    }

    pub fn index_of(&self, c: char) -> Option<usize> {
        self.index.get(&c).copied()
    }

    /// Character stored at `index`; `None` for control symbols and
    /// anything outside the vocabulary.
    pub fn char_at(&self, index: usize) -> Option<char> {
        self.chars.get(index).copied()
    }

    /// Look up every character of `text`.
    pub fn encode(&self, text: &str) -> Result<EncodedSentence, SpellError> {
        text.chars()
            .enumerate()
            .map(|(position, character)| {
                self.index_of(character)
                    .ok_or(SpellError::UnknownCharacter { character, position })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(EncodedSentence::new)
    }

    /// Map indices back to text. Control symbols and indices outside the
    /// vocabulary produce no output.
    pub fn decode(&self, ids: &[usize]) -> String {
        ids.iter().filter_map(|&i| self.char_at(i)).collect()
    }
}
