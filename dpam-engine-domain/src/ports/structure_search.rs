// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Structure search adapter port.
//!
//! Exposes the three bulk primitives the batched-bulk step composes
//! (`createdb`/`search`/`convertalis`) plus a per-protein convenience
//! method, so the same adapter backs both execution modes.

use crate::error::DpamError;
use crate::value_objects::HitRecord;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait StructureSearchAdapter: Send + Sync {
    async fn check_availability(&self) -> bool;

    /// Build a combined query structure database from a list of structure files.
    async fn createdb(&self, structures: &[PathBuf], work_dir: &Path) -> Result<PathBuf, DpamError>;

    /// Run one search of a query database against the reference database,
    /// producing a binary alignment database.
    async fn search(&self, query_db: &Path, reference_db: &Path, work_dir: &Path) -> Result<PathBuf, DpamError>;

    /// Convert a binary alignment database to tabular hit records.
    async fn convertalis(&self, alignment_db: &Path, work_dir: &Path) -> Result<Vec<HitRecord>, DpamError>;

    /// Per-protein convenience path equivalent to createdb+search+convertalis
    /// for a single structure, used outside batched-bulk mode.
    async fn easy_search(
        &self,
        structure: &Path,
        reference_db: &Path,
        work_dir: &Path,
    ) -> Result<Vec<HitRecord>, DpamError>;
}
