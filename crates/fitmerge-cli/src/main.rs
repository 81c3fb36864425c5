#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use fitmerge_core::config::resolve_config;
use output::OutputMode;
use std::env;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "fitmerge: consolidate fitness-tracker backups",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Merging",
        about = "Merge every backup in a directory into one",
        long_about = "Discover backups by file-name pattern, merge them oldest to newest, \
                      and write the consolidated backup. Ambiguous deletions are settled \
                      from the decision file, or asked on the terminal.",
        after_help = "EXAMPLES:\n    # Consolidate backups in the current directory\n    fitmerge consolidate\n\n    # Never prompt; keep anything ambiguous\n    fitmerge consolidate --dir backups --on-ambiguity keep\n\n    # Emit machine-readable output\n    fitmerge consolidate --json"
    )]
    Consolidate(cmd::consolidate::ConsolidateArgs),

    #[command(
        next_help_heading = "Merging",
        about = "List remembered answers to ambiguous deletions",
        after_help = "EXAMPLES:\n    # Show all decisions\n    fitmerge decisions\n\n    # Only records that will be dropped\n    fitmerge decisions --deleted"
    )]
    Decisions(cmd::decisions::DecisionsArgs),

    #[command(
        next_help_heading = "Inspection",
        about = "Check backups for dangling references",
        after_help = "EXAMPLES:\n    # Check one backup\n    fitmerge validate fitness-tracker__2022-07-19.json\n\n    # Check several, machine-readable\n    fitmerge validate --json backups/*.json"
    )]
    Validate(cmd::validate::ValidateArgs),

    #[command(
        next_help_heading = "Export",
        about = "Write one CSV file per collection of a backup",
        after_help = "EXAMPLES:\n    # Export next to the current directory\n    fitmerge to-csv fitness-tracker__2022-07-19.json\n\n    # Export into a folder\n    fitmerge to-csv backup.json --output-dir csv"
    )]
    ToCsv(cmd::to_csv::ToCsvArgs),

    #[command(
        next_help_heading = "Export",
        about = "Load a backup into a SQLite database",
        after_help = "EXAMPLES:\n    # Create fitness-tracker__2022-07-19.sqlite\n    fitmerge to-sqlite fitness-tracker__2022-07-19.json"
    )]
    ToSqlite(cmd::to_sqlite::ToSqliteArgs),

    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    # Bash\n    fitmerge completions bash > ~/.local/share/bash-completion/completions/fitmerge"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("FITMERGE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "fitmerge=debug,fitmerge_core=debug,info"
        } else {
            "fitmerge=info,fitmerge_core=info,warn"
        })
    });

    let format = env::var("FITMERGE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // stdout is reserved for command results.
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

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        debug!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let config = resolve_config(&project_root, cli.json)?;
    let output = OutputMode::from_resolved(&config.resolved_output);
    let consolidate_config = &config.project.consolidate;

    match cli.command {
        Commands::Consolidate(ref args) => {
            cmd::consolidate::run_consolidate(args, consolidate_config, output)
        }
        Commands::Decisions(ref args) => {
            cmd::decisions::run_decisions(args, consolidate_config, output)
        }
        Commands::Validate(ref args) => cmd::validate::run_validate(args, output),
        Commands::ToCsv(ref args) => cmd::to_csv::run_to_csv(args, output),
        Commands::ToSqlite(ref args) => cmd::to_sqlite::run_to_sqlite(args, output),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}
