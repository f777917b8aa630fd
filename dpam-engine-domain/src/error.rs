// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error Taxonomy
//!
//! `DpamError` is the single error type threaded through the domain and
//! application layers. Each variant corresponds to one kind in the error
//! taxonomy: what failed, whether it is per-protein or batch-fatal, and
//! whether resuming the batch is a meaningful recovery path.

use thiserror::Error;

/// Broad category a `DpamError` falls into, used for log grouping and for
/// deciding whether an error is per-protein (recorded, batch continues) or
/// batch-fatal (the runner aborts).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A required input artifact was missing; per-protein, non-fatal to the batch.
    InputMissing,
    /// An adapter's executable could not be discovered; fatal if any pending
    /// protein needs it.
    ToolMissing,
    /// An external process ran but failed or produced unparseable output; per-protein.
    ToolFailed,
    /// Adapter output could not be parsed; per-protein.
    ParseError,
    /// A state file read or write failed; always fatal to the batch.
    StateIoError,
    /// Local scratch space is exhausted with no fallback; fatal to the batch.
    ScratchExhausted,
    /// A declared invariant was violated; indicates a bug, always fatal.
    InvariantViolation,
    /// Configuration or enumeration input was invalid; a programmer error, not
    /// a runtime condition a protein can trigger.
    InvalidConfiguration,
    /// An error that does not fit the taxonomy above.
    Internal,
    /// The batch was cancelled via a shutdown signal.
    Cancelled,
}

#[derive(Debug, Error)]
pub enum DpamError {
    #[error("input missing for {protein}/{artifact}: {reason}")]
    InputMissing {
        protein: String,
        artifact: String,
        reason: String,
    },

    #[error("tool not found: {tool} ({reason})")]
    ToolMissing { tool: String, reason: String },

    #[error("tool failed: {tool} exited with {exit_status}: {stderr_tail}")]
    ToolFailed {
        tool: String,
        exit_status: String,
        stderr_tail: String,
    },

    #[error("failed to parse output of {tool}: {reason}")]
    ParseError { tool: String, reason: String },

    #[error("state I/O error on {path:?}: {source}")]
    StateIoError { path: std::path::PathBuf, source: std::io::Error },

    #[error("scratch space exhausted at {path:?}: {reason}")]
    ScratchExhausted { path: std::path::PathBuf, reason: String },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("internal error: {0}")]
    InternalError(String),

    #[error("batch run cancelled")]
    Cancelled,
}

impl DpamError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DpamError::InputMissing { .. } => ErrorCategory::InputMissing,
            DpamError::ToolMissing { .. } => ErrorCategory::ToolMissing,
            DpamError::ToolFailed { .. } => ErrorCategory::ToolFailed,
            DpamError::ParseError { .. } => ErrorCategory::ParseError,
            DpamError::StateIoError { .. } => ErrorCategory::StateIoError,
            DpamError::ScratchExhausted { .. } => ErrorCategory::ScratchExhausted,
            DpamError::InvariantViolation(_) => ErrorCategory::InvariantViolation,
            DpamError::InvalidConfiguration(_) => ErrorCategory::InvalidConfiguration,
            DpamError::InternalError(_) => ErrorCategory::Internal,
            DpamError::Cancelled => ErrorCategory::Cancelled,
        }
    }

    /// Whether resuming the batch (re-invoking the runner against the same
    /// working root) is a meaningful response to this error. This is not
    /// about automatic retry — the engine never retries within a run — it
    /// answers "if the operator fixes the underlying cause and reruns, does
    /// that make progress?"
    pub fn is_recoverable(&self) -> bool {
        match self.category() {
            ErrorCategory::InputMissing
            | ErrorCategory::ToolMissing
            | ErrorCategory::ToolFailed
            | ErrorCategory::ParseError
            | ErrorCategory::ScratchExhausted => true,
            ErrorCategory::StateIoError
            | ErrorCategory::InvariantViolation
            | ErrorCategory::InvalidConfiguration
            | ErrorCategory::Internal => false,
            ErrorCategory::Cancelled => true,
        }
    }

    /// Whether this error is fatal to the whole batch, versus recorded
    /// per-protein while the batch continues.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::StateIoError
                | ErrorCategory::ScratchExhausted
                | ErrorCategory::InvariantViolation
                | ErrorCategory::InvalidConfiguration
                | ErrorCategory::Internal
                | ErrorCategory::Cancelled
        ) || matches!(self.category(), ErrorCategory::ToolMissing)
    }
}

impl From<std::io::Error> for DpamError {
    fn from(err: std::io::Error) -> Self {
        DpamError::StateIoError {
            path: std::path::PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for DpamError {
    fn from(err: serde_json::Error) -> Self {
        DpamError::ParseError {
            tool: "serde_json".to_string(),
            reason: err.to_string(),
        }
    }
}
