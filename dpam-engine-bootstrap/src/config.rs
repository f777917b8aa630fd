// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Configuration
//!
//! Layered configuration for a batch run: defaults, an optional TOML file,
//! environment variables (`DPAM_*`), then CLI flags, each layer overriding
//! the one before it. This mirrors the layering the enterprise application
//! uses for its own settings, kept separate here because bootstrap loads
//! configuration before the domain/application layers exist.

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Resource and layout settings read ahead of the CLI, then overridden by it.
///
/// Field names mirror the CLI flags documented for the `run` subcommand so
/// that a config file and an invocation line are interchangeable.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunDefaults {
    pub cpu_threads: Option<usize>,
    pub io_threads: Option<usize>,
    pub scratch_root: Option<PathBuf>,
    pub layout: Option<String>,
    pub channel_depth: usize,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            cpu_threads: None,
            io_threads: None,
            scratch_root: None,
            layout: None,
            channel_depth: 256,
        }
    }
}

/// Load `RunDefaults` from an optional file path plus the process
/// environment (`DPAM_CPU_THREADS`, `DPAM_IO_THREADS`, `DPAM_SCRATCH_ROOT`,
/// `DPAM_LAYOUT`, `DPAM_CHANNEL_DEPTH`).
pub fn load_run_defaults(config_path: Option<&std::path::Path>) -> Result<RunDefaults, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path));
    }

    builder = builder.add_source(config::Environment::with_prefix("DPAM").separator("_"));

    let settled = builder.build()?;
    let defaults: RunDefaults = settled.try_deserialize().unwrap_or_default();
    Ok(defaults)
}
