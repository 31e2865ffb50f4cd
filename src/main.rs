//! fretpath - compound-based practice progression for guitarists
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fretpath::config::{fretpath_home, Config};
use fretpath::engine::Coach;
use fretpath::error::exit_codes;
use fretpath::storage::FileProgressStore;

// =============================================================================
// CLI Definition
// =============================================================================

/// fretpath - what to practice next, one dimension at a time
#[derive(Parser)]
#[command(name = "fretpath")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend the next exercise
    Recommend {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
        /// Seed for a reproducible recommendation
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Log an attempt, e.g. `fretpath log scale=blues,position=d_shape --speed 410`
    Log {
        /// Compound as key=value pairs; omitted dimensions take their entry point
        compound: String,
        /// Speed score of the attempt
        #[arg(long, short)]
        speed: f64,
        /// Metronome tempo used
        #[arg(long, short)]
        bpm: Option<u32>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show progress and unlocked dimensions
    Status {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
        /// Maximum number of compounds to show
        #[arg(long, short, default_value = "20")]
        limit: usize,
    },

    /// Recompute all progress from the attempt log
    Rebuild {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Initialize fretpath in the current directory
    Init {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
        /// Overwrite an existing config file
        #[arg(long, short)]
        force: bool,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    setup_logging();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fretpath error: {}", e);
            ExitCode::from(exit_codes::FAILURE as u8)
        }
    }
}

/// Log to stderr, filtered by `FRETPATH_LOG` (default: warnings only).
fn setup_logging() {
    let filter =
        EnvFilter::try_from_env("FRETPATH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// On panic, append to ~/.fretpath/crash.log and exit with the failure code.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("fretpath panic: {}", info);

        if let Some(home) = fretpath_home() {
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::FAILURE);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Recommend { json, quiet, seed } => run_recommend(json, quiet, seed, &cwd),
        Commands::Log {
            compound,
            speed,
            bpm,
            json,
            quiet,
        } => run_log(&compound, speed, bpm, json, quiet, &cwd),
        Commands::Status { json, quiet, limit } => run_status(json, quiet, limit, &cwd),
        Commands::Rebuild { json, quiet } => run_rebuild(json, quiet, &cwd),
        Commands::Init { json, quiet, force } => run_init(json, quiet, force, &cwd),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

/// Build a coach over the project's file store.
fn open_coach(cwd: &Path) -> Result<Coach<FileProgressStore>, Box<dyn std::error::Error>> {
    let config = Config::load_from_cwd(cwd);
    let store = FileProgressStore::for_project(cwd)?;
    Ok(Coach::new(store, config)?)
}

fn print_output(formatted: &str) {
    if !formatted.is_empty() {
        println!("{}", formatted.trim_end());
    }
}

fn to_exit_code(code: i32) -> ExitCode {
    ExitCode::from(code as u8)
}

fn run_recommend(
    json: bool,
    quiet: bool,
    seed: Option<u64>,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use fretpath::cli::recommend::{RecommendCommand, RecommendOptions};

    let cmd = RecommendCommand::new(open_coach(cwd)?);
    let options = RecommendOptions { json, quiet, seed };

    let output = cmd.run(&options);
    print_output(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code()))
}

fn run_log(
    compound: &str,
    speed: f64,
    bpm: Option<u32>,
    json: bool,
    quiet: bool,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use fretpath::cli::log_cmd::{LogCommand, LogOptions};

    let cmd = LogCommand::new(open_coach(cwd)?);
    let options = LogOptions { json, quiet, bpm };

    let output = cmd.run(compound, speed, &options);
    print_output(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code()))
}

fn run_status(
    json: bool,
    quiet: bool,
    limit: usize,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use fretpath::cli::status::{StatusCommand, StatusOptions};

    let cmd = StatusCommand::new(open_coach(cwd)?);
    let options = StatusOptions { json, quiet, limit };

    let output = cmd.run(&options);
    print_output(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code()))
}

fn run_rebuild(json: bool, quiet: bool, cwd: &Path) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use fretpath::cli::rebuild::{RebuildCommand, RebuildOptions};

    let coach = open_coach(cwd)?;
    let log = coach.store().attempt_log().clone();
    let cmd = RebuildCommand::new(coach, log);
    let options = RebuildOptions { json, quiet };

    let output = cmd.run(&options);
    print_output(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code()))
}

fn run_init(
    json: bool,
    quiet: bool,
    force: bool,
    cwd: &Path,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use fretpath::cli::init::{InitCommand, InitOptions};

    let cmd = InitCommand::new(cwd.to_string_lossy().to_string());
    let options = InitOptions { json, quiet, force };

    let output = cmd.run(&options);
    print_output(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code()))
}
