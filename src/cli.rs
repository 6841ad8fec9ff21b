//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;

use artifact_combiner::output::OutputConfig;

use crate::commands;

/// Artifact Combiner - Publish multi-language build outputs to their bound repositories
#[derive(Parser, Debug)]
#[command(name = "artifact-combiner")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show which publications would be sent to which repository
    Plan(commands::plan::PlanArgs),

    /// Publish every publication to the repository it is bound to
    Publish(commands::publish::PublishArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);
        let output = OutputConfig::from_env_and_flag(&self.color);

        match self.command {
            Commands::Plan(args) => commands::plan::execute(args, &output),
            Commands::Publish(args) => commands::publish::execute(args, &output),
        }
    }
}

fn init_logging(level: &str) {
    // try_init: a logger may already be installed when running under tests
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}
