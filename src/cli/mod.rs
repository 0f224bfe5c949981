//! Command-line interface for the ICL compiler.
//!
//! ## Commands
//!
//! - `compile` - compile source to one or many target languages
//! - `check` - validate source through semantic analysis
//! - `explain` - print AST + IR + lowered + intent-graph JSON
//! - `compress` - print the canonical compact ICL encoding
//! - `diff` - structurally diff two serialized intent graphs
//! - `pack list|validate` - inspect language packs
//! - `contract test` - run the language contract suite
//! - `alias list` - inspect the natural-alias catalog
//!
//! ## Design
//!
//! Argument parsing uses clap derive. Command functions return
//! `CliResult<ExitCode>` instead of exiting; only the top-level [`run`]
//! handles errors and calls `process::exit`. Exit codes: 0 success, 1
//! compiler error, 2 usage error, 3 internal error.

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const COMPILE_ERROR: ExitCode = ExitCode(1);
    pub const USAGE_ERROR: ExitCode = ExitCode(2);
    pub const INTERNAL_ERROR: ExitCode = ExitCode(3);
}

/// Error type for CLI operations: a user-facing message plus an exit code.
#[derive(Debug)]
pub struct CliError {
    pub message: String,
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Compiler failure (exit code 1).
    pub fn compile(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::COMPILE_ERROR)
    }

    /// Usage error (exit code 2).
    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(
            format!("CLI001: {}. Run icl --help for usage.", message.into()),
            ExitCode::USAGE_ERROR,
        )
    }

    /// Internal error (exit code 3).
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            format!("CLI999: Internal error: {}.", message.into()),
            ExitCode::INTERNAL_ERROR,
        )
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap command tree
// ============================================================================

/// The ICL compiler and tooling.
#[derive(Parser, Debug)]
#[command(name = "icl")]
#[command(version = VERSION)]
#[command(about = "ICL compiler: one symbolic source, many targets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, clap::Args)]
pub struct SourceArgs {
    /// Input .icl file
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Inline ICL source string
    #[arg(long = "code", value_name = "SOURCE")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, clap::Args)]
pub struct AliasArgs {
    /// Enable natural alias normalization
    #[arg(long)]
    pub natural: bool,

    /// Alias normalization mode when --natural is set
    #[arg(long = "alias-mode", value_parser = ["core", "extended"], default_value = "core")]
    pub alias_mode: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile ICL source to one or many target languages
    Compile {
        #[command(flatten)]
        source: SourceArgs,

        /// Single target backend name (e.g. python/js/rust/web)
        #[arg(long)]
        target: Option<String>,

        /// Target list (repeatable or comma-separated)
        #[arg(long = "targets", value_name = "TARGETS")]
        targets: Vec<String>,

        /// Output file path (single target) or directory (multi-target)
        #[arg(short = 'o', long = "output", value_name = "PATH")]
        output: Option<PathBuf>,

        /// Write intent graph JSON (single target only)
        #[arg(long = "emit-graph", value_name = "PATH")]
        emit_graph: Option<PathBuf>,

        /// Write source map JSON
        #[arg(long = "emit-sourcemap", value_name = "PATH")]
        emit_sourcemap: Option<PathBuf>,

        /// Enable graph optimizations
        #[arg(long)]
        optimize: bool,

        /// Emit debug info to stderr
        #[arg(long)]
        debug: bool,

        #[command(flatten)]
        alias: AliasArgs,

        /// Plugin spec in module[:symbol] format; can be repeated
        #[arg(long = "plugin", value_name = "SPEC")]
        plugins: Vec<String>,

        /// Custom language pack spec in module[:symbol] format; can be repeated
        #[arg(long = "pack", value_name = "SPEC")]
        packs: Vec<String>,
    },

    /// Validate source through semantic analysis
    Check {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        alias: AliasArgs,

        #[arg(long = "plugin", value_name = "SPEC")]
        plugins: Vec<String>,
    },

    /// Print AST + IR + lowered + intent-graph JSON
    Explain {
        #[command(flatten)]
        source: SourceArgs,

        /// Target for the lowering preview
        #[arg(long)]
        target: Option<String>,

        #[command(flatten)]
        alias: AliasArgs,

        /// Include applied alias replacements
        #[arg(long = "alias-trace")]
        alias_trace: bool,

        #[arg(long = "plugin", value_name = "SPEC")]
        plugins: Vec<String>,

        #[arg(long = "pack", value_name = "SPEC")]
        packs: Vec<String>,
    },

    /// Print canonical compact ICL encoding
    Compress {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Diff two serialized intent-graph JSON files
    Diff {
        /// Path to previous graph JSON
        before: PathBuf,
        /// Path to next graph JSON
        after: PathBuf,
    },

    /// Manage language packs
    Pack {
        #[command(subcommand)]
        command: PackCommand,
    },

    /// Run the language contract test suite
    Contract {
        #[command(subcommand)]
        command: ContractCommand,
    },

    /// Inspect the natural-alias catalog
    Alias {
        #[command(subcommand)]
        command: AliasCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum PackCommand {
    /// List available language packs
    List {
        /// Filter by stability
        #[arg(long, value_parser = ["stable", "beta", "experimental"])]
        stability: Option<String>,

        #[arg(long = "pack", value_name = "SPEC")]
        packs: Vec<String>,
    },
    /// Validate pack manifests
    Validate {
        /// Validate a single pack target
        #[arg(long)]
        target: Option<String>,

        #[arg(long = "pack", value_name = "SPEC")]
        packs: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ContractCommand {
    /// Run canonical contract compile checks
    Test {
        /// Target to test (repeatable)
        #[arg(long = "target", value_name = "TARGET")]
        targets: Vec<String>,

        /// Include experimental targets
        #[arg(long)]
        all: bool,

        #[arg(long = "pack", value_name = "SPEC")]
        packs: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum AliasCommand {
    /// List natural alias mappings
    List {
        /// Alias mode view
        #[arg(long, value_parser = ["core", "extended"], default_value = "core")]
        mode: String,

        /// Emit JSON payload
        #[arg(long)]
        json: bool,
    },
}

/// CLI entry point: the only place that calls `process::exit`.
pub fn run() {
    let cli = Cli::parse();
    match commands::execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(error) => {
            if !error.message.is_empty() {
                eprintln!("{error}");
            }
            process::exit(error.exit_code.0);
        }
    }
}
