// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Blocking external-process invocation, wrapped for use from async adapter
//! methods.
//!
//! The external-tool adapters never format a shell string: each invocation
//! is a direct `std::process::Command` with an explicit argument vector and
//! working directory. Adapters run the blocking call inside
//! `tokio::task::spawn_blocking`, the same domain-stays-sync /
//! infrastructure-goes-async split the teacher uses in
//! `async_checksum.rs`/`async_compression.rs` to keep a synchronous service
//! off the async runtime's worker threads.

use dpam_engine_domain::error::DpamError;
use std::path::Path;
use std::process::Command;

/// stdout/stderr captured from a finished invocation, plus its exit status.
pub struct RunOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub success: bool,
    pub exit_status: String,
}

impl RunOutput {
    /// Last few lines of stderr, for embedding in a `DpamError::ToolFailed`
    /// without flooding logs with a full tool dump.
    pub fn stderr_tail(&self, max_lines: usize) -> String {
        let text = String::from_utf8_lossy(&self.stderr);
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(max_lines);
        lines[start..].join("\n")
    }
}

/// Run `exe` with `args` in `cwd`, capturing stdout/stderr, no shell. Blocks
/// the calling thread; callers on an async runtime must wrap this in
/// `spawn_blocking`.
pub fn run(exe: &Path, args: &[&str], cwd: &Path) -> Result<RunOutput, DpamError> {
    let output = Command::new(exe).args(args).current_dir(cwd).output().map_err(|source| DpamError::ToolFailed {
        tool: exe.display().to_string(),
        exit_status: "spawn failed".to_string(),
        stderr_tail: source.to_string(),
    })?;

    Ok(RunOutput {
        success: output.status.success(),
        exit_status: output.status.to_string(),
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

/// Run the tool and turn a non-zero exit into `DpamError::ToolFailed`,
/// collapsing the common "run then check" call shape used by every adapter.
pub fn run_checked(tool_label: &str, exe: &Path, args: &[&str], cwd: &Path) -> Result<RunOutput, DpamError> {
    let out = run(exe, args, cwd)?;
    if !out.success {
        return Err(DpamError::ToolFailed {
            tool: tool_label.to_string(),
            exit_status: out.exit_status.clone(),
            stderr_tail: out.stderr_tail(20),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_run_captures_stdout() {
        let out = run(Path::new("/bin/echo"), &["hello"], Path::new("/tmp")).unwrap();
        assert!(out.success);
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hello");
    }

    #[test]
    fn failing_run_is_reported_as_tool_failed() {
        let out = run(Path::new("/bin/false"), &[], Path::new("/tmp")).unwrap();
        assert!(!out.success);
        let err = run_checked("false", Path::new("/bin/false"), &[], Path::new("/tmp")).unwrap_err();
        assert!(matches!(err, DpamError::ToolFailed { .. }));
    }

    #[test]
    fn missing_executable_is_reported_as_tool_failed() {
        let err = run(Path::new("/nonexistent/not-a-real-binary"), &[], Path::new("/tmp")).unwrap_err();
        assert!(matches!(err, DpamError::ToolFailed { .. }));
    }
}
