// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw book files to tensor-ready batches:
//
//   text files
//       │
//       ▼
//   TextLoader        → reads UTF-8 files into Documents
//       │
//       ▼
//   Preprocessor      → strips markup, spaces out punctuation
//       │
//       ▼
//   Vocabulary        → character ⇄ index, plus <PAD> <EOS> <GO>
//       │
//       ▼
//   Segmenter         → sentences, encoded and length-filtered
//       │
//       ▼
//   split_train_test  → seeded training / testing partitions
//       │
//       ▼
//   BatchScheduler    → per-epoch noisy/clean padded batches
//       │               (NoiseGenerator draws the typos)
//       ▼
//   Seq2SeqBatch      → Burn tensors + length masks

/// Loads plain-text corpus files from a directory
pub mod loader;

/// Cleans and normalises raw text
pub mod preprocessor;

/// Character vocabulary with control symbols
pub mod vocabulary;

/// Sentence splitting, encoding and length filtering
pub mod segmenter;

/// Seeded train/test split
pub mod splitter;

/// Diacritic substitution noise
pub mod noise;

/// Length-bucketed batches and their tensor form
pub mod batcher;
