// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Mapping
//!
//! Maps batch-run outcomes to process exit codes.
//!
//! A batch is considered successful (exit 0) when every protein that was
//! runnable reached a terminal, non-error state — proteins skipped because
//! they depend on a critical step that failed elsewhere in the batch still
//! count as a successful run of the batch itself. Only a fatal error that
//! aborted the run before it could finish walking the work queue produces a
//! nonzero exit.

use std::process::ExitCode as StdExitCode;

/// Process exit codes for the batch runner binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every pending protein reached a terminal state.
    Success,
    /// The CLI arguments failed validation before any work started.
    UsageError,
    /// The batch aborted partway through due to an unrecoverable error
    /// (state store corruption, scratch root unwritable, panic in a worker).
    Fatal,
    /// The process received a termination signal mid-run and is exiting
    /// without completing the batch (state was checkpointed first).
    Interrupted,
}

impl ExitCode {
    pub const fn code(self) -> u8 {
        match self {
            ExitCode::Success => 0,
            ExitCode::UsageError => 64, // EX_USAGE
            ExitCode::Fatal => 1,
            ExitCode::Interrupted => 130, // 128 + SIGINT
        }
    }
}

impl From<ExitCode> for StdExitCode {
    fn from(value: ExitCode) -> Self {
        StdExitCode::from(value.code())
    }
}

/// Map a top-level run result to the exit code the process should use.
pub fn map_error_to_exit_code<E: std::fmt::Display>(err: &E) -> ExitCode {
    tracing::error!("batch run failed: {}", err);
    ExitCode::Fatal
}

/// Convert a `Result` from the application entry point into a process exit
/// code, logging the error if present.
pub fn result_to_exit_code<T, E: std::fmt::Display>(result: Result<T, E>) -> StdExitCode {
    match result {
        Ok(_) => StdExitCode::from(ExitCode::Success),
        Err(e) => StdExitCode::from(map_error_to_exit_code(&e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_zero() {
        assert_eq!(ExitCode::Success.code(), 0);
    }

    #[test]
    fn interrupted_matches_sigint_convention() {
        assert_eq!(ExitCode::Interrupted.code(), 130);
    }

    #[test]
    fn result_to_exit_code_maps_err() {
        let result: Result<(), String> = Err("boom".to_string());
        let code: StdExitCode = result_to_exit_code(result);
        assert_eq!(format!("{:?}", code), format!("{:?}", StdExitCode::from(1)));
    }
}
