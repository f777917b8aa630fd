// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Step identity: a densely-numbered stage in the fixed 24-step chain.

use crate::error::DpamError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const STEP_COUNT: u8 = 24;

/// The alias target: step 14 is a no-op retained only for compatibility and
/// always resolves to step 13's completion record.
pub const ALIASED_STEP: u8 = 14;
pub const ALIAS_TARGET: u8 = 13;

/// The step number documented as out of scope (optional visualization).
/// Dispatching it is a clear, rejected request, not a silently-ignored one.
pub const OUT_OF_SCOPE_STEP: u8 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(u8);

impl StepId {
    /// Construct a `StepId` for one of the 24 steps in the core chain.
    pub fn new(n: u8) -> Result<Self, DpamError> {
        if n == OUT_OF_SCOPE_STEP {
            return Err(DpamError::InvalidConfiguration(
                "step 25 (visualization) is not supported by this engine".to_string(),
            ));
        }
        if n == 0 || n > STEP_COUNT {
            return Err(DpamError::InvalidConfiguration(format!(
                "step id {n} out of range 1..={STEP_COUNT}"
            )));
        }
        Ok(Self(n))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Resolve aliasing: step 14 always stands in for step 13's record.
    pub fn resolve_alias(self) -> StepId {
        if self.0 == ALIASED_STEP {
            StepId(ALIAS_TARGET)
        } else {
            self
        }
    }

    /// Whether this step is the no-op alias of step 13.
    pub fn is_alias(self) -> bool {
        self.0 == ALIASED_STEP
    }

    pub fn all() -> impl Iterator<Item = StepId> {
        (1..=STEP_COUNT).map(StepId)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_out_of_range() {
        assert!(StepId::new(0).is_err());
        assert!(StepId::new(26).is_err());
    }

    #[test]
    fn rejects_step_25_with_clear_message() {
        let err = StepId::new(25).unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }

    #[test]
    fn step_14_resolves_to_13() {
        let s14 = StepId::new(14).unwrap();
        assert!(s14.is_alias());
        assert_eq!(s14.resolve_alias().get(), 13);
    }

    #[test]
    fn all_yields_24_steps() {
        assert_eq!(StepId::all().count(), 24);
    }
}
