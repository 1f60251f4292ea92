// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `correct`
// and all their configurable flags.
//
// `--keep-prob`, `--num-layers` and `--threshold` of `train`
// take several comma-separated values; every combination is
// trained as its own run.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::data::noise::DEFAULT_THRESHOLD;
use crate::data::segmenter::{DEFAULT_MAX_LENGTH, DEFAULT_MIN_LENGTH};
use crate::data::splitter::DEFAULT_TEST_FRACTION;
use crate::domain::signature::{Direction, HyperSignature};

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the corrector on a directory of text files
    Train(TrainArgs),

    /// Correct one sentence with a trained checkpoint
    Correct(CorrectArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory of UTF-8 text files to train on
    #[arg(long, default_value = "books")]
    pub corpus_dir: String,

    /// Directory to save checkpoints, configs and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    #[arg(long, default_value_t = 128)]
    pub batch_size: usize,

    /// Stacked recurrent layers in the encoder and the decoder
    #[arg(long, value_delimiter = ',', default_values_t = [2])]
    pub num_layers: Vec<usize>,

    /// Hidden size of every LSTM cell
    #[arg(long, default_value_t = 512)]
    pub rnn_size: usize,

    #[arg(long, default_value_t = 128)]
    pub embedding_size: usize,

    #[arg(long, default_value_t = 0.0005)]
    pub learning_rate: f64,

    #[arg(long, value_enum, default_value_t = Direction::Bi)]
    pub direction: Direction,

    /// Probability that a diacritic character is re-drawn from its class
    #[arg(long, value_delimiter = ',', default_values_t = [DEFAULT_THRESHOLD])]
    pub threshold: Vec<f64>,

    /// Dropout keep probability on every recurrent input
    #[arg(long, value_delimiter = ',', default_values_t = [0.75])]
    pub keep_prob: Vec<f64>,

    /// Shortest sentence (in characters) kept for training
    #[arg(long, default_value_t = DEFAULT_MIN_LENGTH)]
    pub min_length: usize,

    /// Longest sentence (in characters) kept for training
    #[arg(long, default_value_t = DEFAULT_MAX_LENGTH)]
    pub max_length: usize,

    #[arg(long, default_value_t = DEFAULT_TEST_FRACTION)]
    pub test_fraction: f64,

    /// How many times per epoch the testing loss is measured
    #[arg(long, default_value_t = 4)]
    pub evals_per_epoch: usize,

    /// Evaluations without a new record before training stops
    #[arg(long, default_value_t = 3)]
    pub patience: usize,

    /// Batches between progress lines
    #[arg(long, default_value_t = 30)]
    pub display_step: usize,

    /// Seed for the train/test split and the noise
    #[arg(long, default_value_t = 2)]
    pub seed: u64,
}

impl TrainArgs {
    /// One TrainConfig per (keep_prob, num_layers, threshold) combination.
    pub fn into_configs(self) -> Vec<TrainConfig> {
        let mut configs = Vec::new();
        for &keep_prob in &self.keep_prob {
            for &num_layers in &self.num_layers {
                for &threshold in &self.threshold {
                    configs.push(TrainConfig {
                        corpus_dir:      self.corpus_dir.clone(),
                        checkpoint_dir:  self.checkpoint_dir.clone(),
                        epochs:          self.epochs,
                        batch_size:      self.batch_size,
                        num_layers,
                        rnn_size:        self.rnn_size,
                        embedding_size:  self.embedding_size,
                        learning_rate:   self.learning_rate,
                        direction:       self.direction,
                        threshold,
                        keep_prob,
                        min_length:      self.min_length,
                        max_length:      self.max_length,
                        test_fraction:   self.test_fraction,
                        evals_per_epoch: self.evals_per_epoch,
                        patience:        self.patience,
                        display_step:    self.display_step,
                        seed:            self.seed,
                    });
                }
            }
        }
        configs
    }
}

/// All arguments for the `correct` command. The hyperparameters
/// select which trained checkpoint to load.
#[derive(Args, Debug)]
pub struct CorrectArgs {
    /// The sentence to correct
    pub text: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value_t = 512)]
    pub rnn_size: usize,

    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 128)]
    pub embedding_size: usize,

    #[arg(long, value_enum, default_value_t = Direction::Bi)]
    pub direction: Direction,

    #[arg(long, default_value_t = 0.75)]
    pub keep_prob: f64,

    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Rows the sentence is replicated across (defaults to the
    /// training batch size of the checkpoint)
    #[arg(long)]
    pub batch_width: Option<usize>,
}

impl CorrectArgs {
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

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn train_args(extra: &[&str]) -> TrainArgs {
        let mut argv = vec!["vi-spell", "train"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Train(args) => args,
            other => panic!("expected train, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_match_training_defaults() {
        let configs = train_args(&[]).into_configs();
        assert_eq!(configs, vec![TrainConfig::default()]);
    }

    #[test]
    fn test_sweep_expands_cartesian_product() {
        let configs = train_args(&["--keep-prob", "0.5,0.75", "--num-layers", "1,2,4", "--threshold", "0.9"])
            .into_configs();
        assert_eq!(configs.len(), 6);
        assert_eq!((configs[0].keep_prob, configs[0].num_layers), (0.5, 1));
        assert_eq!((configs[5].keep_prob, configs[5].num_layers), (0.75, 4));
        assert!(configs.iter().all(|c| c.threshold == 0.9));
    }

    #[test]
    fn test_correct_args_build_signature() {
        let cli = Cli::parse_from(["vi-spell", "correct", "con meo", "--direction", "uni", "--keep-prob", "0.5"]);
        let Commands::Correct(args) = cli.command else {
            panic!("expected correct");
        };
        assert_eq!(args.text, "con meo");
        assert_eq!(args.signature().key(), "rs=512,nl=2,es=128,dir=uni,kp=0.5,th=0.95");
    }
}
