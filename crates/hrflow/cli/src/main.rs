//! hrflow - operator CLI for the HR workflow engine
//!
//! - `tables`: print every state machine's transition table
//! - `config`: print the effective configuration
//! - `run`: replay a JSON command script against an in-memory engine

use anyhow::Context;
use clap::{Parser, Subcommand};
use hrflow_engine::{
    EngineConfig, WorkflowOrchestrator, LEAVE_TRANSITIONS, ONBOARDING_TRANSITIONS,
    TICKET_TRANSITIONS,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod script;

use script::Script;

/// hrflow CLI
#[derive(Parser)]
#[command(name = "hrflow")]
#[command(about = "HR workflow engine - onboarding, leave and support tickets", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "HRFLOW_CONFIG")]
    config: Option<String>,

    /// Log level (defaults to `logging.level` from the configuration)
    #[arg(long, env = "HRFLOW_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "HRFLOW_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the transition tables
    Tables,

    /// Print the effective configuration
    Config,

    /// Replay a command script
    Run {
        /// Script file (JSON)
        script: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = EngineConfig::load(cli.config.as_deref()).context("loading configuration")?;

    // Initialize tracing
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into());

    if cli.json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    match cli.command {
        Commands::Tables => {
            print_table("onboarding", ONBOARDING_TRANSITIONS.describe());
            print_table("leave", LEAVE_TRANSITIONS.describe());
            print_table("ticket", TICKET_TRANSITIONS.describe());
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Run { script } => {
            let script = Script::load(&script)?;
            let engine = WorkflowOrchestrator::new(config)?;
            let report = script.run(&engine)?;
            tracing::info!(
                steps = report.steps.len(),
                failures = report.failures(),
                "Script replayed"
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn print_table(name: &str, lines: Vec<String>) {
    println!("{name}:");
    for line in lines {
        println!("  {line}");
    }
    println!();
}
