// ============================================================
// Layer 4 — Noise Generator
// ============================================================
// Manufactures a plausible misspelling from a clean sentence.
//
// For every position whose character belongs to a diacritic
// equivalence class, with probability `threshold`, the character
// is replaced by a uniformly chosen member of its own class
// (which may be the original character again).
//
//   "con mèo đen."  ──threshold 0.95──▶  "cón meo den."
//
// Substitution only: the output always has the input's length.
// The caller owns the random source so one seeded RNG drives a
// whole training run.

use std::collections::HashMap;

use rand::{seq::SliceRandom, Rng};

use crate::data::vocabulary::Vocabulary;
use crate::domain::diacritics::DiacriticClasses;

pub const DEFAULT_THRESHOLD: f64 = 0.95;

#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    /// Classes translated to vocabulary indices
    classes:  Vec<Vec<usize>>,
    /// Vocabulary index → position in `classes`
    class_of: HashMap<usize, usize>,
}

impl NoiseGenerator {
    /// Group the vocabulary's characters by their class in `classes`.
    /// Members the corpus never used have no index and can never be
    /// produced as noise.
    pub fn new(classes: &DiacriticClasses, vocab: &Vocabulary) -> Self {
        let mut indexed: Vec<Vec<usize>> = Vec::new();
        let mut slot_of  = HashMap::new();
        let mut class_of = HashMap::new();

        for id in 0..vocab.pad() {
            let Some(class) = vocab.char_at(id).and_then(|c| classes.class_of(c)) else {
                continue;
            };
            let slot = *slot_of.entry(class).or_insert_with(|| {
                indexed.push(Vec::new());
                indexed.len() - 1
            });
            indexed[slot].push(id);
            class_of.insert(id, slot);
        }

        tracing::debug!(
            "Noise generator covers {} classes, {} characters",
            indexed.len(),
            class_of.len()
        );
        Self { classes: indexed, class_of }
    }

    /// Positions of `sentence` that noise may touch.
    pub fn flagged_positions(&self, sentence: &[usize]) -> Vec<usize> {
        sentence
            .iter()
            .enumerate()
            .filter(|(_, id)| self.class_of.contains_key(*id))
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Produce one noisy copy of `sentence`.
    pub fn noise<R: Rng + ?Sized>(
        &self,
        sentence:  &[usize],
        threshold: f64,
        rng:       &mut R,
    ) -> Vec<usize> {
        let mut noisy = sentence.to_vec();

        for pos in self.flagged_positions(sentence) {
            if rng.gen::<f64>() >= threshold {
                continue;
            }
            let class = &self.classes[self.class_of[&sentence[pos]]];
            if let Some(&replacement) = class.choose(rng) {
                noisy[pos] = replacement;
            }
        }

        noisy
    }
}
