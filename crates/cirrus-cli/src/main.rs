//! Cirrus command-line compiler.
//!
//! Usage: `cirrus build FILE... [--stdout] [--config FILE]`

mod build;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "cirrus")]
#[command(about = "Compile Cirrus files to deployment templates")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile each FILE to FILE.json
    Build(BuildArgs),
}

#[derive(clap::Args, Debug)]
pub struct BuildArgs {
    /// Entry point files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Print templates to stdout instead of writing files
    #[arg(long)]
    stdout: bool,

    /// Path to cirrus.yaml (default: ./cirrus.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cirrus=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build(args) => build::run(&args),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}
