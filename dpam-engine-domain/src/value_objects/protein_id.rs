// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Protein identity as a validated, filename-safe token.

use crate::error::DpamError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque protein identifier, validated at construction to be safe for
/// direct use as a filename component (no path separator, no NUL, non-empty).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProteinId(String);

impl ProteinId {
    pub fn new(raw: impl Into<String>) -> Result<Self, DpamError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(DpamError::InvalidConfiguration("protein id must not be empty".to_string()));
        }
        if raw.contains('/') || raw.contains('\0') {
            return Err(DpamError::InvalidConfiguration(format!(
                "protein id `{raw}` contains a forbidden character"
            )));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProteinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ProteinId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_token() {
        assert!(ProteinId::new("1abc_A").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert!(ProteinId::new("").is_err());
    }

    #[test]
    fn rejects_path_separator() {
        assert!(ProteinId::new("a/b").is_err());
    }

    #[test]
    fn rejects_nul() {
        assert!(ProteinId::new("a\0b").is_err());
    }
}
