#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::SessionArgs;
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "xfer: dangling-dependent checks and ownership transfer",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (overrides `FORMAT`).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Registry file declaring entity types and relationships.
    #[arg(long, global = true, default_value = "transferable.toml")]
    registry: PathBuf,

    /// SQLite database (overrides `XFER_DB` and `database.path`).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }

    fn session(&self) -> SessionArgs {
        SessionArgs {
            registry: self.registry.clone(),
            db: self.db.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "List registered entity types",
        long_about = "List registered entity types, their delete policy and declared relationships.",
        after_help = "EXAMPLES:\n    # Describe every type\n    xfer describe\n\n    # Describe one type as JSON\n    xfer describe genre --json"
    )]
    Describe(cmd::describe::DescribeArgs),

    #[command(
        about = "Count dependents of an entity",
        long_about = "Count rows referencing an entity, per declared relationship.",
        after_help = "EXAMPLES:\n    # Count what still points at genre 2\n    xfer count genre 2"
    )]
    Count(cmd::count::CountArgs),

    #[command(
        about = "Fail if an entity still has dependents",
        long_about = "Check for dangling dependents. Exits non-zero when any remain unless --no-raise is given.",
        after_help = "EXAMPLES:\n    # Fail when genre 2 still has books\n    xfer check genre 2\n\n    # Only report the count\n    xfer check genre 2 --no-raise"
    )]
    Check(cmd::check::CheckArgs),

    #[command(
        about = "Transfer dependents to another entity",
        long_about = "Atomically re-point every declared dependent of one entity to another of the same type.",
        after_help = "EXAMPLES:\n    # Preview moving Sci-Fi books to Fiction\n    xfer transfer genre 2 1 --dry-run\n\n    # Move them\n    xfer transfer genre 2 1"
    )]
    Transfer(cmd::transfer::TransferArgs),

    #[command(
        about = "Delete an entity through the deletion guard",
        long_about = "Delete an entity row. Strict types are refused while dependents remain.",
        after_help = "EXAMPLES:\n    # Delete genre 2 once it is empty\n    xfer delete genre 2"
    )]
    Delete(cmd::delete::DeleteArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("XFER_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "transferable=debug,info"
        } else {
            "transferable=info,warn"
        })
    });

    let format = env::var("XFER_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Describe(args) => cmd::describe::run_describe(args, &cli.registry, output),
        Commands::Count(args) => cmd::count::run_count(args, &cli.session(), output),
        Commands::Check(args) => cmd::check::run_check(args, &cli.session(), output),
        Commands::Transfer(args) => cmd::transfer::run_transfer(args, &cli.session(), output),
        Commands::Delete(args) => cmd::delete::run_delete(args, &cli.session(), output),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();
    match run(&cli, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if render_error(output, &CliError::from(&err)).is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
