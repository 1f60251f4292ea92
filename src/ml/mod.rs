// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn modules, the training loop and the inference engine.
// The data layer only touches Burn to build tensor batches.
//
// What's in this layer:
//
//   lstm.rs       — one LSTM step with length masking, shared by
//                   the encoder scan and the decoder step
//
//   attention.rs  — additive (Bahdanau) attention over encoder
//                   outputs, masked beyond each input's length
//
//   model.rs      — the character seq2seq corrector:
//                   • [bi]directional stacked LSTM encoder
//                   • input-fed attention decoder
//                   • teacher-forced and greedy decoding over
//                     one set of weights
//                   • masked sequence cross-entropy
//
//   progress.rs   — running-minimum early-stopping bookkeeping
//
//   trainer.rs    — training state machine: Adam with gradient
//                   clipping, periodic evaluation, checkpointing
//
//   inferencer.rs — restores a checkpoint and corrects sentences
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Bahdanau et al. (2015) Neural Machine Translation
//            by Jointly Learning to Align and Translate

pub mod lstm;

pub mod attention;

/// Seq2seq corrector model
pub mod model;

pub mod progress;

/// Training loop with evaluation and checkpointing
pub mod trainer;

/// Inference engine — loads a checkpoint and corrects text
pub mod inferencer;
