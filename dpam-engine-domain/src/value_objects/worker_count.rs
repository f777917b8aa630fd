// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Validated worker-pool sizing.

use crate::error::DpamError;
use serde::{Deserialize, Serialize};

/// The cap the pooled-fanout mode is allowed to request relative to CPU
/// count, for I/O-bound sub-unit dispatch where the critical resource is
/// filesystem operations rather than CPU cycles.
pub const MAX_IO_MULTIPLIER: usize = 4;
pub const MAX_WORKERS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerCount(usize);

impl WorkerCount {
    /// Default sizing: one worker per CPU core.
    pub fn cpu_bound(cpu_count: usize) -> Self {
        Self(cpu_count.max(1))
    }

    /// I/O-bound sizing: caller-chosen, up to `4 * cpu_count`, capped at 64.
    pub fn io_bound(requested: usize, cpu_count: usize) -> Result<Self, DpamError> {
        let ceiling = (cpu_count.max(1) * MAX_IO_MULTIPLIER).min(MAX_WORKERS);
        if requested == 0 {
            return Err(DpamError::InvalidConfiguration(
                "worker count must be at least 1".to_string(),
            ));
        }
        if requested > ceiling {
            return Err(DpamError::InvalidConfiguration(format!(
                "requested worker count {requested} exceeds the cap of {ceiling} (4x CPU count, max {MAX_WORKERS})"
            )));
        }
        Ok(Self(requested))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_bound_is_at_least_one() {
        assert_eq!(WorkerCount::cpu_bound(0).get(), 1);
        assert_eq!(WorkerCount::cpu_bound(8).get(), 8);
    }

    #[test]
    fn io_bound_rejects_zero() {
        assert!(WorkerCount::io_bound(0, 8).is_err());
    }

    #[test]
    fn io_bound_caps_at_four_times_cpu() {
        assert!(WorkerCount::io_bound(33, 8).is_ok());
        assert!(WorkerCount::io_bound(100, 8).is_err());
    }

    #[test]
    fn io_bound_caps_at_max_workers_for_large_cpu_counts() {
        // 4 * 32 = 128, but the absolute cap is 64.
        assert!(WorkerCount::io_bound(64, 32).is_ok());
        assert!(WorkerCount::io_bound(65, 32).is_err());
    }
}
