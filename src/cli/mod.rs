// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap and hands the work to Layer 2 (application).
//
//   1. `train`   — builds or continues a model from two corpus files
//   2. `predict` — answers one line (--input) or stdin lines (--loop)
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PredictArgs, TrainArgs};
use std::io::{self, BufRead, Write};

/// The main CLI struct
#[derive(Parser, Debug)]
#[command(
    name = "seq2seq-bot",
    version = "0.1.0",
    about = "Train a sequence-to-sequence chatbot on paired text files, then talk to it."
)]
pub struct Cli {
    /// The subcommand to run (train or predict)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case; this layer only routes and prints.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Training on '{}' → '{}'", args.enc.display(), args.dec.display());

    let use_case = TrainUseCase::new(args.into());
    let dir = use_case.execute()?;

    println!("Model is saved at {}", dir.display());
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let mut use_case = PredictUseCase::from_config(&(&args).into())?;

    if let Some(input) = &args.input {
        println!("> {input}");
        println!(">> {}", use_case.answer(input)?);
        return Ok(());
    }

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        println!(">> {}", use_case.answer(line)?);
    }
    Ok(())
}
