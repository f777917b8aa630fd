// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Secondary-structure assignment adapter port.

use crate::error::DpamError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait SecondaryStructureAdapter: Send + Sync {
    async fn check_availability(&self) -> bool;

    /// Run the assignment tool on a structure file, returning the path to
    /// its per-residue secondary-structure class output.
    async fn assign(&self, structure: &Path, work_dir: &Path) -> Result<PathBuf, DpamError>;
}
