//! Neardup CLI - near-duplicate image detection tool.

use std::path::PathBuf;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod store;
mod utils;

use commands::hash::OutputFormat;
use exit_codes::{ExitCode, DUPLICATE_FOUND, USAGE_ERROR};
use utils::DetectionArgs;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success (image is unique)
  1   General error
  64  Usage error or misconfigured threshold
  65  Near-duplicate found
  66  Input file or store unreadable
  74  Failed to write store";

#[derive(Parser)]
#[command(name = "neardup")]
#[command(author, version, about = "Near-duplicate image detection", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Suppress decorative output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the JSON record store
    #[arg(long, global = true, value_name = "PATH", default_value = "neardup-records.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the perceptual fingerprint of each file
    Hash {
        /// Files to fingerprint
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Check whether a file is a near-duplicate of a stored record
    Check {
        /// File to check
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        detection: DetectionArgs,
    },

    /// Add files to the store, skipping near-duplicates
    Add {
        /// Files to add
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        detection: DetectionArgs,

        /// Report what would be added without writing the store
        #[arg(long)]
        dry_run: bool,
    },

    /// List stored records
    List,

    /// Remove a stored record by id
    Remove {
        /// Record id
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Print the Hamming distance between two hex fingerprints
    Distance {
        #[arg(value_name = "A")]
        a: String,

        #[arg(value_name = "B")]
        b: String,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "neardup=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let quiet = cli.quiet;
    let store = cli.store;

    match cli.command {
        Commands::Hash { files, format } => commands::hash::execute(files, format).await,
        Commands::Check { file, detection } => {
            commands::check::execute(file, detection, &store, quiet).await
        }
        Commands::Add {
            files,
            detection,
            dry_run,
        } => commands::add::execute(files, detection, dry_run, &store, quiet).await,
        Commands::List => commands::list::execute(&store).await,
        Commands::Remove { id } => commands::remove::execute(id, &store, quiet).await,
        Commands::Distance { a, b } => commands::distance::execute(a, b).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                std::process::exit(USAGE_ERROR);
            }
        },
    };

    init_tracing(cli.verbose);
    let quiet = cli.quiet;

    let exit = match run(cli).await {
        Ok(()) => ExitCode::success(),
        Err(err) => ExitCode::from_anyhow(&err),
    };

    // The duplicate verdict has already been printed
    if let Some(message) = &exit.message {
        if !quiet && exit.code != DUPLICATE_FOUND {
            eprintln!("{} {}", "error:".red().bold(), message);
        }
    }
    std::process::exit(exit.code);
}
