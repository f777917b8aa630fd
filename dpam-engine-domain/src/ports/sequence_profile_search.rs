// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Sequence profile search adapter port.

use crate::error::DpamError;
use crate::value_objects::HitRecord;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait SequenceProfileSearchAdapter: Send + Sync {
    /// True iff the backing executable is present and runnable.
    async fn check_availability(&self) -> bool;

    async fn build_msa(&self, fasta: &Path, work_dir: &Path) -> Result<PathBuf, DpamError>;

    async fn build_profile(&self, msa: &Path, work_dir: &Path) -> Result<PathBuf, DpamError>;

    async fn search(&self, profile: &Path, db: &Path, work_dir: &Path) -> Result<Vec<HitRecord>, DpamError>;
}
