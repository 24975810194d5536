//! CLI module for the firmcheck harness
//!
//! ## Commands
//!
//! - `run` - Discover, sample, build and verify example projects (default when no subcommand is given)
//! - `list` - Print the sampled test matrix without building anything
//!
//! ## Modules
//!
//! - `commands` - Command implementations (config layering, discovery)
//! - `session` - Sequential execution and pytest-style reporting
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;
pub mod session;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use crate::version::FIRMCHECK_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Build-verification harness for PlatformIO example projects
#[derive(Parser, Debug)]
#[command(name = "firmcheck")]
#[command(version = FIRMCHECK_VERSION)]
#[command(about = "Build a random sample of PlatformIO example projects and verify their firmware", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build and verify a sample of example projects
    Run(RunArgs),

    /// Print the sampled test matrix without building
    List(SelectionArgs),
}

/// Options shared by every command that selects projects.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Config file (default: ./firmcheck.toml when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Local examples root
    #[arg(long, value_name = "DIR")]
    pub examples_root: Option<PathBuf>,

    /// Additional root to search (repeatable)
    #[arg(long = "root", value_name = "DIR")]
    pub roots: Vec<PathBuf>,

    /// Do not search installed platform packages
    #[arg(long)]
    pub no_platforms: bool,

    /// PlatformIO core directory (default: $PLATFORMIO_CORE_DIR or ~/.platformio)
    #[arg(long, value_name = "DIR")]
    pub core_dir: Option<PathBuf>,

    /// Sample one project per root, as on constrained CI runners
    #[arg(long)]
    pub constrained: bool,

    /// Projects sampled per root
    #[arg(long, value_name = "N")]
    pub sample_size: Option<usize>,

    /// Seed for sampling and environment choice (random when omitted)
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Keep only projects whose path contains EXPR
    #[arg(short = 'k', value_name = "EXPR")]
    pub filter: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Build tool program
    #[arg(long, value_name = "PROGRAM")]
    pub program: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Write a JSON session report
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Some(Command::Run(args)) => commands::run_projects(&args),
        Some(Command::List(args)) => commands::list_projects(&args),
        None => commands::run_projects(&RunArgs::default()),
    }
}

// ============================================================================
// Tests
// ============================================================================
