// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`   — trains one model per hyperparameter combination
//   2. `correct` — loads a checkpoint and corrects one sentence
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, CorrectArgs, TrainArgs};

use crate::domain::traits::SpellCorrector;

#[derive(Parser, Debug)]
#[command(
    name = "vi-spell",
    version = "0.1.0",
    about = "Train a character-level Vietnamese diacritic corrector, then correct sentences with it."
)]
pub struct Cli {
    /// The subcommand to run (train or correct)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Correct(args) => run_correct(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on documents in: {}", args.corpus_dir);

    let use_case  = TrainUseCase::new(args.into_configs());
    let summaries = use_case.execute()?;

    for summary in &summaries {
        println!("{} → {}", summary.signature, summary.run_dir.display());
    }
    Ok(())
}

fn run_correct(args: CorrectArgs) -> Result<()> {
    use crate::application::correct_use_case::CorrectUseCase;

    let use_case = CorrectUseCase::new(&args.checkpoint_dir, &args.signature(), args.batch_width)?;
    let corrected = use_case.correct(&args.text)?;

    println!("Text:     {}", args.text);
    println!("Response: {}", corrected);
    Ok(())
}
