// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Pairwise structural alignment adapter port.
//!
//! The backing tool has a hardcoded 80-character limit on input paths;
//! implementations are expected to invoke it with paths relative to
//! `work_dir` rather than absolute paths, per the path-length workaround.

use crate::error::DpamError;
use crate::value_objects::StructuralEquivalence;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait PairwiseAlignmentAdapter: Send + Sync {
    async fn check_availability(&self) -> bool;

    /// Align one query structure against one template, returning the
    /// Z-score and paired residue equivalences.
    async fn align_one(
        &self,
        query: &Path,
        template: &Path,
        work_dir: &Path,
    ) -> Result<StructuralEquivalence, DpamError>;
}
