// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first argument validation,
//! following the same parse-then-validate split the enterprise layers use
//! for user-supplied paths.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. Cli::parse()                    │  clap parsing
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validate_cli()                  │  path/value validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  safe, validated config
//! └─────────────────────────────────────┘
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid value for `{arg}`: {reason}")]
    InvalidValue { arg: String, reason: String },

    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("path contains forbidden component (`..` or NUL): {0}")]
    UnsafePath(PathBuf),
}

/// Raw CLI surface as clap sees it, before security validation.
#[derive(Debug, Parser)]
#[command(name = "dpam-engine", version, about = "DPAM domain-parsing batch execution engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug-level) logging.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Optional TOML configuration file overriding built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute or resume a batch against a working root.
    Run {
        /// Path to a newline-delimited list of protein identifiers.
        #[arg(long)]
        protein_list_path: PathBuf,

        /// Working root where per-protein and per-batch state/artifacts live.
        #[arg(long)]
        working_root: PathBuf,

        /// Force "sharded" or "flat" layout instead of auto-detecting on resume.
        #[arg(long, value_parser = ["sharded", "flat"])]
        layout_override: Option<String>,

        /// Override the CPU-bound worker count (rayon pool size).
        #[arg(long)]
        cpu_threads_override: Option<usize>,

        /// Override the I/O-bound concurrency limit (async semaphore permits).
        #[arg(long)]
        io_threads_override: Option<usize>,

        /// Override the scratch root (defaults to a subdirectory of working_root).
        #[arg(long)]
        scratch_root_override: Option<PathBuf>,
    },
    /// Print the end-of-batch summary for a working root without running anything.
    Status {
        #[arg(long)]
        working_root: PathBuf,
    },
    /// Emit the generated job-script text to stdout or a file.
    GenJobScript {
        #[arg(long)]
        protein_list_path: PathBuf,

        #[arg(long)]
        working_root: PathBuf,

        #[arg(long)]
        cpu_threads_override: Option<usize>,

        #[arg(long)]
        io_threads_override: Option<usize>,

        /// Write the script here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Validated CLI configuration: all paths exist (or are safe to create) and
/// all numeric values are range-checked.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Run {
        protein_list_path: PathBuf,
        working_root: PathBuf,
        layout_override: Option<String>,
        cpu_threads_override: Option<usize>,
        io_threads_override: Option<usize>,
        scratch_root_override: Option<PathBuf>,
    },
    Status {
        working_root: PathBuf,
    },
    GenJobScript {
        protein_list_path: PathBuf,
        working_root: PathBuf,
        cpu_threads_override: Option<usize>,
        io_threads_override: Option<usize>,
        output: Option<PathBuf>,
    },
}

/// Reject paths containing a `..` component; this is a batch tool reading
/// operator-supplied paths, not a multi-tenant service, so the bar is
/// "no accidental traversal" rather than a hardened sandbox.
fn reject_traversal(path: &Path) -> Result<(), ParseError> {
    if path.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        return Err(ParseError::UnsafePath(path.to_path_buf()));
    }
    Ok(())
}

fn validate_existing_path(path: &Path) -> Result<PathBuf, ParseError> {
    reject_traversal(path)?;
    if !path.exists() {
        return Err(ParseError::PathNotFound(path.to_path_buf()));
    }
    Ok(path.to_path_buf())
}

fn validate_worker_count(arg: &str, value: Option<usize>) -> Result<(), ParseError> {
    if let Some(n) = value {
        if n == 0 || n > 1024 {
            return Err(ParseError::InvalidValue {
                arg: arg.to_string(),
                reason: "must be between 1 and 1024".to_string(),
            });
        }
    }
    Ok(())
}

/// Parse and validate CLI arguments.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = Cli::parse();
    validate_cli(cli)
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = if let Some(ref path) = cli.config {
        Some(validate_existing_path(path)?)
    } else {
        None
    };

    let command = match cli.command {
        Commands::Run {
            protein_list_path,
            working_root,
            layout_override,
            cpu_threads_override,
            io_threads_override,
            scratch_root_override,
        } => {
            let protein_list_path = validate_existing_path(&protein_list_path)?;
            reject_traversal(&working_root)?;
            validate_worker_count("cpu-threads-override", cpu_threads_override)?;
            validate_worker_count("io-threads-override", io_threads_override)?;
            if let Some(ref scratch) = scratch_root_override {
                reject_traversal(scratch)?;
            }

            ValidatedCommand::Run {
                protein_list_path,
                working_root,
                layout_override,
                cpu_threads_override,
                io_threads_override,
                scratch_root_override,
            }
        }
        Commands::Status { working_root } => {
            let working_root = validate_existing_path(&working_root)?;
            ValidatedCommand::Status { working_root }
        }
        Commands::GenJobScript {
            protein_list_path,
            working_root,
            cpu_threads_override,
            io_threads_override,
            output,
        } => {
            let protein_list_path = validate_existing_path(&protein_list_path)?;
            reject_traversal(&working_root)?;
            validate_worker_count("cpu-threads-override", cpu_threads_override)?;
            validate_worker_count("io-threads-override", io_threads_override)?;
            if let Some(ref out) = output {
                reject_traversal(out)?;
            }

            ValidatedCommand::GenJobScript {
                protein_list_path,
                working_root,
                cpu_threads_override,
                io_threads_override,
                output,
            }
        }
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_parent_dir_traversal() {
        let path = PathBuf::from("../escape");
        assert!(matches!(reject_traversal(&path), Err(ParseError::UnsafePath(_))));
    }

    #[test]
    fn rejects_missing_protein_list() {
        let missing = PathBuf::from("/no/such/file/for/dpam/tests");
        assert!(matches!(validate_existing_path(&missing), Err(ParseError::PathNotFound(_))));
    }

    #[test]
    fn worker_count_bounds() {
        assert!(validate_worker_count("x", Some(0)).is_err());
        assert!(validate_worker_count("x", Some(2000)).is_err());
        assert!(validate_worker_count("x", Some(16)).is_ok());
        assert!(validate_worker_count("x", None).is_ok());
    }
}
