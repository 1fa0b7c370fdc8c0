//! Forge — transactional project scaffolding CLI.
//!
//! # Usage
//!
//! ```text
//! forge run <template-dir> [--target DIR] [--task NAME] [--var KEY=VALUE]...
//!           [--if-exists ask|ignore|replace|throw] [--yes]
//! forge clean [--dry-run]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{clean::CleanArgs, run::RunArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "forge",
    version,
    about = "Generate files into a project, all or nothing",
    long_about = None,
)]
struct Cli {
    /// Log debug diagnostics to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a template directory into the target project.
    Run(RunArgs),

    /// Remove temp directories left behind by interrupted runs.
    Clean(CleanArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    forge_runner::init_tracing(if cli.verbose { "debug" } else { "warn" });

    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Clean(args) => args.run(),
    }
}
