// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`    — trains PGL-SUM on an annotated dataset
//   2. `evaluate` — scores a saved checkpoint
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

use crate::application::evaluate_use_case::EvalOverrides;
use crate::application::train_use_case::TrainConfig;

#[derive(Parser, Debug)]
#[command(
    name = "pgl-sum",
    version = "0.1.0",
    about = "Train and evaluate a PGL-SUM video summarization model."
)]
pub struct Cli {
    /// The subcommand to run (train or evaluate)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route to the matching use case; the CLI never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(&args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on dataset: {}", args.dataset);

    let config = TrainConfig::try_from(args)?;
    let report = TrainUseCase::new(config).execute()?;

    match report.last_eval {
        Some(eval) => println!(
            "Training complete ({:?}). Last F1 train: {:.2}, test: {:.2}",
            report.outcome, eval.f1_train, eval.f1_test
        ),
        None => println!("Training stopped before any epoch completed ({:?}).", report.outcome),
    }
    Ok(())
}

fn run_evaluate(args: &EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let overrides = EvalOverrides::try_from(args)?;
    let use_case  = EvaluateUseCase::new(&args.checkpoint_dir, overrides)?;
    let (epoch, report) = use_case.execute()?;

    println!(
        "\nCheckpoint epoch {}: f1_train={:.2} f1_test={:.2}",
        epoch, report.f1_train, report.f1_test
    );
    Ok(())
}
