// --- Файл: src/main.rs ---
//! Command-line front end: validate a run configuration or score a batch.

use clap::{Parser, Subcommand, ValueEnum};
use rustycls::config::{ConfigLoader, Phase, RunConfig};
use rustycls::data::json::batch_from_json;
use rustycls::logging::init_tracing;
use serde_json::{json, Map, Value};
use std::path::PathBuf;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "rustycls: declarative losses and metrics", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile every Loss / Metric section and list the components
    Check {
        /// YAML or JSON run configuration
        config: PathBuf,
    },
    /// Evaluate the loss and metrics of one phase on a JSON batch
    Eval {
        /// YAML or JSON run configuration
        config: PathBuf,
        /// JSON document with `output`, `labels` and optional `gallery`
        #[arg(short, long)]
        batch: PathBuf,
        #[arg(short, long, value_enum, default_value_t = PhaseArg::Eval)]
        phase: PhaseArg,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PhaseArg {
    Train,
    Eval,
}

impl From<PhaseArg> for Phase {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::Train => Phase::Train,
            PhaseArg::Eval => Phase::Eval,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    match args.command {
        Command::Check { config } => {
            let config = ConfigLoader::load_from_file(&config)?;
            check(&config)?;
        }
        Command::Eval {
            config,
            batch,
            phase,
        } => {
            let config = ConfigLoader::load_from_file(&config)?;
            let document: Value = serde_json::from_str(&std::fs::read_to_string(&batch)?)?;
            let report = evaluate(&config, phase.into(), &document)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn check(config: &RunConfig) -> Result<(), Box<dyn std::error::Error>> {
    for phase in [Phase::Train, Phase::Eval] {
        match config.build_loss(phase)? {
            Some(loss) => println!("Loss.{phase}: {loss}"),
            None => println!("Loss.{phase}: (none)"),
        }
        match config.build_metrics(phase)? {
            Some(metrics) => println!("Metric.{phase}: {metrics}"),
            None => println!("Metric.{phase}: (none)"),
        }
    }
    Ok(())
}

fn evaluate(
    config: &RunConfig,
    phase: Phase,
    document: &Value,
) -> Result<Value, Box<dyn std::error::Error>> {
    let (output, batch) = batch_from_json(document)?;
    let mut report = Map::new();

    if let Some(loss) = config.build_loss(phase)? {
        let results = loss.evaluate(&output, &batch)?;
        report.insert("loss".to_string(), serde_json::to_value(&results)?);
    }
    if let Some(metrics) = config.build_metrics(phase)? {
        let results = metrics.evaluate(&output, &batch)?;
        report.insert("metric".to_string(), serde_json::to_value(&results)?);
    }

    tracing::info!("Evaluated {} sample(s) for phase {}", batch.len(), phase);
    Ok(json!({ "phase": phase.to_string(), "results": report }))
}
