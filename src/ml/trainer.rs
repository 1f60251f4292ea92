// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Trains one hyperparameter configuration as an explicit state
// machine:
//
//   Initializing
//        │
//        ▼
//   Epoch{e, b} ──(every `cadence` batches)──▶ Evaluating
//        ▲                                         │
//        │                       ┌─────────────────┴─────┐
//        │                       ▼                       ▼
//        ├───────────────── Improved             NoImprovement
//        │                                               │
//        └─────────────(patience left)───────────────────┤
//                                                        ▼
//   Stopped(EpochsCompleted)  ◀── last epoch done   Stopped(EarlyStopped)
//
// Key Burn 0.20 insight:
//   - Training runs on Autodiff<B> so loss.backward() works
//   - model.valid() returns the same model on B with dropout
//     disabled, used for evaluation and for checkpointing
//
// Checkpoint writes are the only side effect besides logging. A
// failed write is logged and the evaluation counts for nothing,
// so the previous best checkpoint stays the delivered artefact.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Result};
use burn::{
    backend::Autodiff,
    module::AutodiffModule,
    optim::{grad_clipping::GradientClippingConfig, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};
use rand::{rngs::StdRng, SeedableRng};

use crate::application::train_use_case::TrainConfig;
use crate::data::batcher::{BatchScheduler, Seq2SeqBatch};
use crate::data::noise::NoiseGenerator;
use crate::data::vocabulary::Vocabulary;
use crate::domain::sentence::EncodedSentence;
use crate::domain::signature::HyperSignature;
use crate::infra::checkpoint::{CheckpointManager, CheckpointMeta};
use crate::infra::metrics::{EvaluationMetrics, MetricsLogger};
use crate::ml::model::{Seq2SeqConfig, Seq2SeqModel};
use crate::ml::progress::TrainingProgress;

/// Per-component gradient bound applied before every Adam step.
const GRADIENT_CLIP: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopReason {
    EpochsCompleted,
    EarlyStopped,
}

/// Where the trainer is. `epoch` counts from 1; `batch` is the
/// number of batches of that epoch already trained on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrainerState {
    Initializing,
    Epoch         { epoch: usize, batch: usize },
    Evaluating    { epoch: usize, batch: usize },
    Improved      { epoch: usize, batch: usize, test_loss: f64 },
    NoImprovement { epoch: usize, batch: usize, test_loss: f64 },
    Stopped(StopReason),
}

/// The data a run trains and evaluates on. All of it is read-only.
pub struct TrainingCorpus<'a> {
    pub vocab: &'a Vocabulary,
    pub noise: &'a NoiseGenerator,
    /// Length-sorted training partition
    pub train: &'a [EncodedSentence],
    /// Length-sorted testing partition
    pub test:  &'a [EncodedSentence],
}

#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub signature:      HyperSignature,
    pub stop_reason:    StopReason,
    pub iterations:     usize,
    pub evaluations:    usize,
    /// Lowest total test loss that made it into a checkpoint
    pub best_test_loss: Option<f64>,
    pub run_dir:        PathBuf,
}

/// Evaluate every `cadence` batches: at least once per epoch.
pub fn evaluation_cadence(batches_per_epoch: usize, evals_per_epoch: usize) -> usize {
    (batches_per_epoch / evals_per_epoch.max(1)).max(1)
}

/// Whether to evaluate once `done` batches of the epoch are trained.
/// At most `evals_per_epoch` points per epoch: with 10 batches and 4
/// evaluations that is after batches 2, 4, 6 and 8, not also after 10.
pub fn is_evaluation_point(done: usize, cadence: usize, evals_per_epoch: usize) -> bool {
    done % cadence == 0 && done / cadence <= evals_per_epoch.max(1)
}

pub fn run_training<B: Backend>(
    cfg:         &TrainConfig,
    corpus:      &TrainingCorpus<'_>,
    checkpoints: &CheckpointManager,
    device:      &B::Device,
) -> Result<TrainingSummary> {
    let signature = cfg.signature();
    let mut rng   = StdRng::seed_from_u64(cfg.seed);

    let training = BatchScheduler::new(corpus.train, cfg.batch_size, corpus.noise, cfg.threshold, corpus.vocab);
    let testing  = BatchScheduler::new(corpus.test,  cfg.batch_size, corpus.noise, cfg.threshold, corpus.vocab);

    let batches_per_epoch = training.num_batches();
    let cadence           = evaluation_cadence(batches_per_epoch, cfg.evals_per_epoch);

    let mut model: Seq2SeqModel<Autodiff<B>> =
        Seq2SeqConfig::from_signature(&signature, corpus.vocab).init(device);

    // ── Adam optimiser, gradients clipped to ±5 ───────────────────────────────
    let mut optim = AdamConfig::new()
        .with_grad_clipping(Some(GradientClippingConfig::Value(GRADIENT_CLIP)))
        .init();

    let mut progress    = TrainingProgress::new(cfg.patience);
    let mut evaluations = 0usize;
    let mut metrics: Option<MetricsLogger> = None;

    // Running loss and clock for the progress lines
    let mut window_loss  = 0.0f64;
    let mut window_start = Instant::now();

    let mut state = TrainerState::Initializing;
    let stop_reason = loop {
        state = match state {
            // ── Initializing ──────────────────────────────────────────────────
            TrainerState::Initializing => {
                if batches_per_epoch == 0 || testing.num_batches() == 0 {
                    bail!(
                        "batch size {} is larger than the training ({}) or testing ({}) partition",
                        cfg.batch_size,
                        corpus.train.len(),
                        corpus.test.len(),
                    );
                }
                let run_dir = checkpoints.prepare(&signature)?;
                metrics = Some(MetricsLogger::new(&run_dir)?);

                tracing::info!(
                    "Training '{}': {} batches per epoch, evaluating every {} batches",
                    signature, batches_per_epoch, cadence,
                );
                TrainerState::Epoch { epoch: 1, batch: 0 }
            }

            // ── Epoch ─────────────────────────────────────────────────────────
            TrainerState::Epoch { epoch, batch } if batch >= batches_per_epoch => {
                if epoch >= cfg.epochs {
                    TrainerState::Stopped(StopReason::EpochsCompleted)
                } else {
                    TrainerState::Epoch { epoch: epoch + 1, batch: 0 }
                }
            }

            TrainerState::Epoch { epoch, batch } => {
                let Some(host) = training.batch(batch, &mut rng) else {
                    bail!("training batch {batch} is out of range");
                };
                let tensors = Seq2SeqBatch::<Autodiff<B>>::from_batch(&host, device);

                let loss = model.forward_loss(&tensors);
                window_loss += loss.clone().into_scalar().elem::<f64>();

                // Backward pass + Adam update
                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(cfg.learning_rate, model, grads);
                progress.iteration += 1;

                let done = batch + 1;
                if cfg.display_step > 0 && done % cfg.display_step == 0 {
                    tracing::info!(
                        "Epoch {:>3}/{} Batch {:>4}/{} - Loss: {:>6.3}, Seconds: {:>4.2}",
                        epoch, cfg.epochs, done, batches_per_epoch,
                        window_loss / cfg.display_step as f64,
                        window_start.elapsed().as_secs_f64(),
                    );
                    window_loss  = 0.0;
                    window_start = Instant::now();
                }

                if is_evaluation_point(done, cadence, cfg.evals_per_epoch) {
                    TrainerState::Evaluating { epoch, batch: done }
                } else {
                    TrainerState::Epoch { epoch, batch: done }
                }
            }

            // ── Evaluating ────────────────────────────────────────────────────
            TrainerState::Evaluating { epoch, batch } => {
                let (total, count) = evaluate(&model.valid(), &testing, &mut rng, device);
                evaluations += 1;
                tracing::info!("Testing Loss: {:>6.3}", total / count.max(1) as f64);

                if progress.is_improvement(total) {
                    TrainerState::Improved { epoch, batch, test_loss: total }
                } else {
                    TrainerState::NoImprovement { epoch, batch, test_loss: total }
                }
            }

            // ── Improved ──────────────────────────────────────────────────────
            TrainerState::Improved { epoch, batch, test_loss } => {
                let meta = CheckpointMeta::new(
                    signature,
                    corpus.vocab.to_record(),
                    test_loss,
                    progress.iteration,
                    epoch,
                );
                let saved = match checkpoints.save(&model.valid(), &meta) {
                    Ok(_) => {
                        progress.record_improvement(test_loss);
                        tracing::info!("New Record!");
                        true
                    }
                    Err(e) => {
                        tracing::warn!("Checkpoint write failed, keeping the previous one: {e}");
                        false
                    }
                };
                log_evaluation(metrics.as_ref(), progress.iteration, epoch, batch, test_loss, saved);
                TrainerState::Epoch { epoch, batch }
            }

            // ── NoImprovement ─────────────────────────────────────────────────
            TrainerState::NoImprovement { epoch, batch, test_loss } => {
                tracing::info!("No Improvement.");
                log_evaluation(metrics.as_ref(), progress.iteration, epoch, batch, test_loss, false);

                if progress.record_stall() {
                    tracing::info!("Stopping Training.");
                    TrainerState::Stopped(StopReason::EarlyStopped)
                } else {
                    TrainerState::Epoch { epoch, batch }
                }
            }

            TrainerState::Stopped(reason) => break reason,
        };
    };

    Ok(TrainingSummary {
        signature,
        stop_reason,
        iterations:     progress.iteration,
        evaluations,
        best_test_loss: progress.best_loss,
        run_dir:        checkpoints.run_dir(&signature),
    })
}

/// Total loss over every testing batch (freshly noised), and the batch count.
fn evaluate<B: Backend>(
    model:   &Seq2SeqModel<B>,
    testing: &BatchScheduler<'_>,
    rng:     &mut StdRng,
    device:  &B::Device,
) -> (f64, usize) {
    let mut total = 0.0f64;
    let mut count = 0usize;

    for host in testing.epoch(rng) {
        let tensors = Seq2SeqBatch::<B>::from_batch(&host, device);
        total += model.forward_loss(&tensors).into_scalar().elem::<f64>();
        count += 1;
    }
    (total, count)
}

fn log_evaluation(
    logger:    Option<&MetricsLogger>,
    iteration: usize,
    epoch:     usize,
    batch:     usize,
    test_loss: f64,
    improved:  bool,
) {
    let Some(logger) = logger else { return };
    let row = EvaluationMetrics { iteration, epoch, batch, test_loss, improved };
    if let Err(e) = logger.log(&row) {
        tracing::warn!("Could not append to '{}': {e}", logger.csv_path().display());
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::segmenter::sort_by_length;
    use crate::domain::diacritics::DiacriticClasses;
    use crate::domain::signature::Direction;
    use burn::backend::NdArray;

    fn config(dir: &std::path::Path) -> TrainConfig {
        TrainConfig {
            corpus_dir:      "unused".to_string(),
            checkpoint_dir:  dir.display().to_string(),
            epochs:          2,
            batch_size:      2,
            num_layers:      1,
            rnn_size:        8,
            embedding_size:  4,
            learning_rate:   0.01,
            direction:       Direction::Bi,
            threshold:       0.95,
            keep_prob:       0.75,
            min_length:      3,
            max_length:      20,
            test_fraction:   0.25,
            evals_per_epoch: 2,
            patience:        10,
            display_step:    1,
            seed:            2,
        }
    }

    fn sentences(vocab: &Vocabulary, texts: &[&str]) -> Vec<EncodedSentence> {
        let mut encoded: Vec<EncodedSentence> =
            texts.iter().map(|t| vocab.encode(t).unwrap()).collect();
        sort_by_length(&mut encoded);
        encoded
    }

    #[test]
    fn test_cadence() {
        assert_eq!(evaluation_cadence(100, 4), 25);
        assert_eq!(evaluation_cadence(3, 4), 1);
        assert_eq!(evaluation_cadence(0, 4), 1);
        assert_eq!(evaluation_cadence(10, 0), 10);
    }

    #[test]
    fn test_evaluation_points_per_epoch() {
        let points = |batches: usize, evals: usize| -> Vec<usize> {
            let cadence = evaluation_cadence(batches, evals);
            (1..=batches).filter(|&d| is_evaluation_point(d, cadence, evals)).collect()
        };
        assert_eq!(points(10, 4), vec![2, 4, 6, 8]);
        assert_eq!(points(100, 4), vec![25, 50, 75, 100]);
        assert_eq!(points(3, 4), vec![1, 2, 3]);
        assert_eq!(points(5, 1), vec![5]);
    }

    #[test]
    fn test_short_run_writes_checkpoint_and_metrics() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());

        let texts = ["con mèo đen.", "bà ấy về.", "tôi đi học.", "em bé ngủ.", "cá bơi.", "gà gáy."];
        let vocab = Vocabulary::build(&texts).unwrap();
        let noise = NoiseGenerator::new(&DiacriticClasses::vietnamese().unwrap(), &vocab);
        let train = sentences(&vocab, &texts[..4]);
        let test  = sentences(&vocab, &texts[4..]);

        let corpus = TrainingCorpus { vocab: &vocab, noise: &noise, train: &train, test: &test };
        let checkpoints = CheckpointManager::new(tmp.path());
        let summary = run_training::<NdArray>(&cfg, &corpus, &checkpoints, &Default::default()).unwrap();

        // 2 batches per epoch, one evaluation per batch.
        assert_eq!(summary.iterations, 4);
        assert_eq!(summary.evaluations, 4);
        assert_eq!(summary.stop_reason, StopReason::EpochsCompleted);
        assert!(summary.best_test_loss.is_some());

        let meta = checkpoints.load_meta(&cfg.signature()).unwrap();
        assert_eq!(Some(meta.test_loss), summary.best_test_loss);

        let csv = std::fs::read_to_string(summary.run_dir.join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 1 + 4);
    }

    #[test]
    fn test_flat_loss_stops_at_patience_and_keeps_first_checkpoint() {
        let tmp = tempfile::tempdir().unwrap();
        // No noise and no parameter updates: every evaluation sees the same loss.
        let cfg = TrainConfig {
            epochs:        10,
            threshold:     0.0,
            learning_rate: 0.0,
            patience:      2,
            ..config(tmp.path())
        };

        let texts = ["con mèo đen.", "bà ấy về.", "tôi đi học.", "em bé ngủ.", "cá bơi.", "gà gáy."];
        let vocab = Vocabulary::build(&texts).unwrap();
        let noise = NoiseGenerator::new(&DiacriticClasses::vietnamese().unwrap(), &vocab);
        let train = sentences(&vocab, &texts[..4]);
        let test  = sentences(&vocab, &texts[4..]);

        let corpus = TrainingCorpus { vocab: &vocab, noise: &noise, train: &train, test: &test };
        let checkpoints = CheckpointManager::new(tmp.path());
        let summary = run_training::<NdArray>(&cfg, &corpus, &checkpoints, &Default::default()).unwrap();

        assert_eq!(summary.stop_reason, StopReason::EarlyStopped);
        assert_eq!(summary.evaluations, 3);
        assert_eq!(summary.iterations, 3);

        let csv = std::fs::read_to_string(summary.run_dir.join("metrics.csv")).unwrap();
        let improved: Vec<&str> = csv.lines().skip(1).filter_map(|l| l.rsplit(',').next()).collect();
        assert_eq!(improved, vec!["true", "false", "false"]);

        let meta = checkpoints.load_meta(&cfg.signature()).unwrap();
        assert_eq!(meta.iteration, 1);
        assert_eq!(Some(meta.test_loss), summary.best_test_loss);
    }

    #[test]
    fn test_refuses_partition_smaller_than_a_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = config(tmp.path());
        cfg.batch_size = 8;

        let texts = ["con mèo đen.", "bà ấy về."];
        let vocab = Vocabulary::build(&texts).unwrap();
        let noise = NoiseGenerator::new(&DiacriticClasses::vietnamese().unwrap(), &vocab);
        let train = sentences(&vocab, &texts);

        let corpus = TrainingCorpus { vocab: &vocab, noise: &noise, train: &train, test: &train };
        let checkpoints = CheckpointManager::new(tmp.path());
        assert!(run_training::<NdArray>(&cfg, &corpus, &checkpoints, &Default::default()).is_err());
    }
}
