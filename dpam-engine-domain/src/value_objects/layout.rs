// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Working-directory layout mode.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    /// Per-step directories, `stepNN_<name>/`, under the working root.
    Sharded,
    /// All intermediate artifacts directly in the working root.
    Flat,
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sharded" => Ok(Layout::Sharded),
            "flat" => Ok(Layout::Flat),
            other => Err(format!("unknown layout `{other}`, expected `sharded` or `flat`")),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Sharded => write!(f, "sharded"),
            Layout::Flat => write!(f, "flat"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_values() {
        assert_eq!("sharded".parse::<Layout>().unwrap(), Layout::Sharded);
        assert_eq!("flat".parse::<Layout>().unwrap(), Layout::Flat);
    }

    #[test]
    fn rejects_unknown() {
        assert!("columnar".parse::<Layout>().is_err());
    }
}
