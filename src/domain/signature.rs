// ============================================================
// Layer 3 — Hyperparameter Signature
// ============================================================
// The subset of hyperparameters that defines a trained model's
// identity. A checkpoint directory is named after its signature
// key, and the corrector refuses to load a checkpoint whose
// stored signature differs from the one it was asked for.
//
// Example key:
//   rs=512,nl=2,es=128,dir=bi,kp=0.75,th=0.95

use std::fmt;

use serde::{Deserialize, Serialize};

/// Encoder direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// One left-to-right recurrence per layer
    Uni,
    /// Left-to-right and right-to-left recurrences per layer
    Bi,
}

impl Direction {
    pub fn is_bidirectional(self) -> bool {
        matches!(self, Direction::Bi)
    }

    fn label(self) -> &'static str {
        match self {
            Direction::Uni => "uni",
            Direction::Bi  => "bi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HyperSignature {
    pub rnn_size:       usize,
    pub num_layers:     usize,
    pub embedding_size: usize,
    pub direction:      Direction,
    pub keep_prob:      f64,
    pub threshold:      f64,
}

impl HyperSignature {
    /// Stable, filesystem-friendly key for this signature.
    pub fn key(&self) -> String {
        format!(
            "rs={},nl={},es={},dir={},kp={},th={}",
            self.rnn_size,
            self.num_layers,
            self.embedding_size,
            self.direction.label(),
            self.keep_prob,
            self.threshold,
        )
    }
}

impl fmt::Display for HyperSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature() -> HyperSignature {
        HyperSignature {
            rnn_size:       512,
            num_layers:     2,
            embedding_size: 128,
            direction:      Direction::Bi,
            keep_prob:      0.75,
            threshold:      0.95,
        }
    }

    #[test]
    fn test_key_lists_every_field() {
        assert_eq!(signature().key(), "rs=512,nl=2,es=128,dir=bi,kp=0.75,th=0.95");
    }

    #[test]
    fn test_keys_differ_when_any_field_differs() {
        let a = signature();
        let b = HyperSignature { threshold: 0.9, ..a };
        let c = HyperSignature { direction: Direction::Uni, ..a };
        assert_ne!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_json_round_trip_keeps_equality() {
        let json = serde_json::to_string(&signature()).unwrap();
        let back: HyperSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, signature());
    }
}
