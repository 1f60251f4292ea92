// ============================================================
// Layer 4 — Corpus Segmenter
// ============================================================
// Turns cleaned documents into bounded-length encoded sentences.
//
//   cleaned text ──split on ". "──▶ sentences ──vocabulary──▶ indices
//                                                │
//                               keep only min_length ≤ len ≤ max_length
//
// Sentences outside the length band are dropped, never truncated.

use crate::data::vocabulary::Vocabulary;
use crate::domain::error::SpellError;
use crate::domain::sentence::EncodedSentence;

pub const DEFAULT_MIN_LENGTH: usize = 10;
pub const DEFAULT_MAX_LENGTH: usize = 92;

#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    min_length: usize,
    max_length: usize,
}

impl Segmenter {
    pub fn new(min_length: usize, max_length: usize) -> Self {
        Self { min_length, max_length }
    }

    /// Split, encode and length-filter every document.
    pub fn segment<S: AsRef<str>>(
        &self,
        documents: &[S],
        vocab:     &Vocabulary,
    ) -> Result<Vec<EncodedSentence>, SpellError> {
        let mut candidates = 0usize;
        let mut kept       = Vec::new();

        for doc in documents {
            for sentence in split_sentences(doc.as_ref()) {
                candidates += 1;
                let encoded = vocab.encode(&sentence)?;
                if self.accepts(encoded.len()) {
                    kept.push(encoded);
                }
            }
        }

        tracing::info!("Total number of sentences are {}.", candidates);

        if kept.is_empty() {
            return Err(SpellError::LengthFilterExhaustion {
                min_length: self.min_length,
                max_length: self.max_length,
                candidates,
            });
        }

        tracing::info!(
            "Total number of {} sentences to train and test our model.",
            kept.len()
        );
        Ok(kept)
    }

    pub fn accepts(&self, length: usize) -> bool {
        (self.min_length..=self.max_length).contains(&length)
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_LENGTH, DEFAULT_MAX_LENGTH)
    }
}

/// Split on the literal ". ". Every fragment that lost its period to the
/// split gets it back; the final fragment is kept as written. Empty
/// fragments are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let fragments: Vec<&str> = text.split(". ").collect();
    let last = fragments.len().saturating_sub(1);

    fragments
        .into_iter()
        .enumerate()
        .filter(|(_, fragment)| !fragment.trim().is_empty())
        .map(|(i, fragment)| {
            if i < last {
                format!("{fragment}.")
            } else {
                fragment.to_string()
            }
        })
        .collect()
}

/// Stable sort by encoded length so neighbouring sentences need little
/// padding once they are batched.
pub fn sort_by_length(sentences: &mut [EncodedSentence]) {
    sentences.sort_by_key(EncodedSentence::len);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_reappends_periods() {
        let parts = split_sentences("Một hai. Ba bốn. Năm");
        assert_eq!(parts, vec!["Một hai.", "Ba bốn.", "Năm"]);
    }

    #[test]
    fn test_split_keeps_final_period_once() {
        assert_eq!(split_sentences("Con mèo đen."), vec!["Con mèo đen."]);
        assert_eq!(split_sentences("Con mèo đen. "), vec!["Con mèo đen."]);
    }

    #[test]
    fn test_single_sentence_scenario() {
        let corpus = ["Con mèo đen."];
        let vocab = Vocabulary::build(&corpus).unwrap();
        let sentences = Segmenter::default().segment(&corpus, &vocab).unwrap();
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].len(), 12);
        assert_eq!(vocab.decode(sentences[0].ids()), "Con mèo đen.");
    }

    #[test]
    fn test_lengths_within_bounds() {
        let corpus = ["Ngắn. Câu này vừa đủ dài. Câu này thì dài hơn rất nhiều so với giới hạn."];
        let vocab = Vocabulary::build(&corpus).unwrap();
        let segmenter = Segmenter::new(10, 30);
        let sentences = segmenter.segment(&corpus, &vocab).unwrap();
        assert_eq!(sentences.len(), 1);
        assert!(sentences.iter().all(|s| segmenter.accepts(s.len())));
    }

    #[test]
    fn test_exhausted_filter_is_an_error() {
        let corpus = ["Ngắn. Cũng ngắn."];
        let vocab = Vocabulary::build(&corpus).unwrap();
        let result = Segmenter::new(50, 92).segment(&corpus, &vocab);
        assert!(matches!(
            result,
            Err(SpellError::LengthFilterExhaustion { candidates: 2, .. })
        ));
    }

    #[test]
    fn test_sort_is_stable_and_ascending() {
        let mut sentences = vec![
            EncodedSentence::new(vec![1, 1, 1]),
            EncodedSentence::new(vec![2]),
            EncodedSentence::new(vec![3, 3, 3]),
            EncodedSentence::new(vec![4]),
        ];
        sort_by_length(&mut sentences);
        let firsts: Vec<usize> = sentences.iter().map(|s| s.ids()[0]).collect();
        assert_eq!(firsts, vec![2, 4, 1, 3]);
    }
}
