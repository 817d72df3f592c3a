//! # logipard CLI
//!
//! Command-line interface for the logipard documentation compiler.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "logipard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "logipard.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter logipard.yml
    Init {
        /// Target directory (defaults to current directory)
        path: Option<PathBuf>,
    },

    /// Compile extracted inputs into the document model
    Compile {
        /// Only run the compile item at this index (0-based)
        #[arg(long)]
        item: Option<usize>,

        /// Emit a JSON summary instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print a compiled model
    Dump {
        /// Model JSON file
        model: PathBuf,

        /// Annotate content with the source file it came from
        #[arg(long)]
        sources: bool,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path } => commands::init_project(path.as_deref()),
        Commands::Compile { item, json } => commands::compile_project(&cli.config, item, json),
        Commands::Dump {
            model,
            sources,
            json,
        } => commands::dump_model(&model, sources, json),
    }
}
