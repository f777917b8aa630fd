// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! State store port.
//!
//! Read methods take `&self`; mutation goes through `&mut self`, matching
//! the single-writer discipline the batch runner enforces — only the
//! runner holds the mutable handle, workers report results over a channel
//! and the runner applies them.

use crate::error::DpamError;
use crate::value_objects::{ProteinId, StepId};
use std::collections::BTreeSet;

pub trait StateStore: Send {
    /// Load (or create, if absent) the store for a working root, reconciling
    /// the batch view against per-protein views.
    fn open(working_root: &std::path::Path) -> Result<Self, DpamError>
    where
        Self: Sized;

    /// Proteins in `candidates` that still need `step` run: not already
    /// complete for `step`, and not skipped due to an earlier failure in
    /// the critical-failure set.
    fn pending_for(&self, step: StepId, candidates: &[ProteinId]) -> Vec<ProteinId>;

    /// The set of steps already complete for one protein.
    fn completed_steps(&self, protein: &ProteinId) -> BTreeSet<u8>;

    fn is_complete(&self, step: StepId, protein: &ProteinId) -> bool;

    fn has_failed(&self, step: StepId, protein: &ProteinId) -> bool;

    /// Record `step` complete for `protein`; updates and persists both views.
    fn mark_complete(&mut self, step: StepId, protein: &ProteinId) -> Result<(), DpamError>;

    /// Record `step` failed for `protein` with `reason`; updates and
    /// persists both views.
    fn mark_failed(&mut self, step: StepId, protein: &ProteinId, reason: &str) -> Result<(), DpamError>;

    /// End-of-batch summary: every protein touched, and for each the
    /// completed-step set and the failed-step -> reason map.
    fn summary(&self) -> Vec<(ProteinId, BTreeSet<u8>, Vec<(u8, String)>)>;
}
