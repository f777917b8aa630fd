// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Signal Handling
//!
//! Listens for SIGTERM, SIGINT, and SIGHUP (SIGINT/Ctrl-Break on Windows) and
//! drives the [`ShutdownCoordinator`](crate::shutdown::ShutdownCoordinator)
//! so in-flight protein steps can finish and the batch state gets
//! checkpointed before the process exits.

use crate::shutdown::ShutdownCoordinator;

/// Spawn a task that waits for a termination signal and initiates shutdown.
///
/// Returns immediately; the signal wait happens on a background task. Call
/// this once at startup, before dispatching work to the batch runner.
#[cfg(unix)]
pub fn install(coordinator: ShutdownCoordinator) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {}", e);
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("failed to install SIGINT handler: {}", e);
                return;
            }
        };
        let mut sighup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("failed to install SIGHUP handler: {}", e);
                return;
            }
        };

        let which = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
            _ = sighup.recv() => "SIGHUP",
        };
        tracing::info!("received {}, beginning graceful shutdown", which);
        coordinator.initiate_shutdown();
    });
}

/// Windows equivalent: listens for Ctrl-C only (no SIGHUP analogue).
#[cfg(windows)]
pub fn install(coordinator: ShutdownCoordinator) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to install Ctrl-C handler: {}", e);
            return;
        }
        tracing::info!("received Ctrl-C, beginning graceful shutdown");
        coordinator.initiate_shutdown();
    });
}
