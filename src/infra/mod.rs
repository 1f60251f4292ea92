// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem on behalf of a run:
//
//   checkpoint.rs — Saving and loading the best model
//                   Weights go through Burn's CompactRecorder;
//                   the vocabulary, signature and loss are
//                   stored alongside as JSON. Both are written
//                   atomically into a directory named after the
//                   run's hyperparameter signature.
//
//   metrics.rs    — Evaluation metrics logging
//                   One CSV row per evaluation (test loss and
//                   whether it set a new record).
//
// Reference: Burn Book §5 (Checkpointing)
//            Rust Book §9 (Error Handling)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Evaluation metrics CSV logger
pub mod metrics;
