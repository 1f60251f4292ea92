// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order, once per
// configuration of a sweep:
//
//   Step 1: Load text files           (Layer 4 - data)
//   Step 2: Clean the text            (Layer 4 - data)
//   Step 3: Build the vocabulary      (Layer 4 - data)
//   Step 4: Segment into sentences    (Layer 4 - data)
//   Step 5: Split train/test + sort   (Layer 4 - data)
//   Step 6: Save config               (Layer 6 - infra)
//   Step 7: Run training loop         (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    loader::TextLoader,
    noise::{NoiseGenerator, DEFAULT_THRESHOLD},
    preprocessor::Preprocessor,
    segmenter::{sort_by_length, Segmenter, DEFAULT_MAX_LENGTH, DEFAULT_MIN_LENGTH},
    splitter::{split_train_test, DEFAULT_TEST_FRACTION},
    vocabulary::Vocabulary,
};
use crate::domain::diacritics::DiacriticClasses;
use crate::domain::sentence::EncodedSentence;
use crate::domain::signature::{Direction, HyperSignature};
use crate::domain::traits::DocumentSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::trainer::{run_training, TrainingCorpus, TrainingSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters of one training run. Written next to the
// checkpoint as train_config.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub corpus_dir:      String,
    pub checkpoint_dir:  String,
    pub epochs:          usize,
    pub batch_size:      usize,
    pub num_layers:      usize,
    pub rnn_size:        usize,
    pub embedding_size:  usize,
    pub learning_rate:   f64,
    pub direction:       Direction,
    /// Probability of a diacritic character being re-drawn
    pub threshold:       f64,
    pub keep_prob:       f64,
    pub min_length:      usize,
    pub max_length:      usize,
    pub test_fraction:   f64,
    pub evals_per_epoch: usize,
    pub patience:        usize,
    /// Batches between progress lines
    pub display_step:    usize,
    pub seed:            u64,
}

impl TrainConfig {
    pub fn signature(&self) -> HyperSignature {
        HyperSignature {
            rnn_size:       self.rnn_size,
            num_layers:     self.num_layers,
            embedding_size: self.embedding_size,
            direction:      self.direction,
            keep_prob:      self.keep_prob,
            threshold:      self.threshold,
        }
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            corpus_dir:      "books".to_string(),
            checkpoint_dir:  "checkpoints".to_string(),
            epochs:          100,
            batch_size:      128,
            num_layers:      2,
            rnn_size:        512,
            embedding_size:  128,
            learning_rate:   0.0005,
            direction:       Direction::Bi,
            threshold:       DEFAULT_THRESHOLD,
            keep_prob:       0.75,
            min_length:      DEFAULT_MIN_LENGTH,
            max_length:      DEFAULT_MAX_LENGTH,
            test_fraction:   DEFAULT_TEST_FRACTION,
            evals_per_epoch: 4,
            patience:        3,
            display_step:    30,
            seed:            2,
        }
    }
}

// ─── PreparedCorpus ───────────────────────────────────────────────────────────
/// Output of steps 1-5: vocabulary plus two length-sorted partitions.
#[derive(Debug)]
pub struct PreparedCorpus {
    pub vocab: Vocabulary,
    pub train: Vec<EncodedSentence>,
    pub test:  Vec<EncodedSentence>,
}

pub fn prepare_corpus(cfg: &TrainConfig, source: &dyn DocumentSource) -> Result<PreparedCorpus> {
    // ── Step 1: Load all text files ───────────────────────────────────────────
    let raw_docs = source.load_all()?;
    tracing::info!("Loaded {} documents", raw_docs.len());

    // ── Step 2: Clean / normalise text ────────────────────────────────────────
    let preprocessor = Preprocessor::new();
    let clean_docs: Vec<String> = raw_docs
        .iter()
        .map(|d| preprocessor.clean(&d.text))
        .collect();

    // ── Step 3: Vocabulary over the cleaned corpus ────────────────────────────
    let vocab = Vocabulary::build(&clean_docs)?;

    // ── Step 4: Sentences within the length band ──────────────────────────────
    let segmenter = Segmenter::new(cfg.min_length, cfg.max_length);
    let sentences = segmenter.segment(&clean_docs, &vocab)?;
    tracing::info!(
        "Kept {} sentences of length {}..={}",
        sentences.len(), cfg.min_length, cfg.max_length
    );

    // ── Step 5: Seeded split, each partition sorted by length ─────────────────
    let (mut train, mut test) = split_train_test(sentences, cfg.test_fraction, cfg.seed);
    sort_by_length(&mut train);
    sort_by_length(&mut test);
    tracing::info!("Split: {} train, {} test", train.len(), test.len());

    Ok(PreparedCorpus { vocab, train, test })
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the sweep and trains each configuration in turn.
pub struct TrainUseCase {
    configs: Vec<TrainConfig>,
}

impl TrainUseCase {
    pub fn new(configs: Vec<TrainConfig>) -> Self {
        Self { configs }
    }

    /// Train every configuration, one after the other.
    pub fn execute(&self) -> Result<Vec<TrainingSummary>> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);

        let mut summaries = Vec::with_capacity(self.configs.len());
        for (i, cfg) in self.configs.iter().enumerate() {
            tracing::info!("Run {}/{}: {}", i + 1, self.configs.len(), cfg.signature());
            let summary = self.train_one(cfg, &device)?;

            tracing::info!(
                "Finished '{}': {:?} after {} iterations, {} evaluations, best test loss {}",
                summary.signature,
                summary.stop_reason,
                summary.iterations,
                summary.evaluations,
                summary.best_test_loss.map_or("n/a".to_string(), |l| format!("{l:.4}")),
            );
            summaries.push(summary);
        }
        Ok(summaries)
    }

    fn train_one(
        &self,
        cfg:    &TrainConfig,
        device: &burn::backend::wgpu::WgpuDevice,
    ) -> Result<TrainingSummary> {
        let prepared = prepare_corpus(cfg, &TextLoader::new(&cfg.corpus_dir))
            .with_context(|| format!("Cannot prepare corpus from '{}'", cfg.corpus_dir))?;
        let noise = NoiseGenerator::new(&DiacriticClasses::vietnamese()?, &prepared.vocab);

        // ── Step 6: Save config next to the checkpoint ────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir);
        checkpoints.save_config(cfg)?;

        // ── Step 7: Run training loop (Layer 5) ───────────────────────────────
        let corpus = TrainingCorpus {
            vocab: &prepared.vocab,
            noise: &noise,
            train: &prepared.train,
            test:  &prepared.test,
        };
        run_training::<burn::backend::Wgpu>(cfg, &corpus, &checkpoints, device)
    }
}
