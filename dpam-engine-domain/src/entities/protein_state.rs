// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Per-protein durable state record.

use crate::value_objects::StepId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const FORMAT_VERSION: u32 = 1;

/// One protein's progress through the step chain: which steps completed,
/// why any failed, and an opaque metadata bag carried through unread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProteinState {
    pub format_version: u32,
    completed: BTreeSet<u8>,
    failed: BTreeMap<u8, String>,
    pub metadata: BTreeMap<String, String>,
    /// Fields written by a format this engine doesn't yet understand, kept
    /// verbatim so a rewrite never drops them.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProteinState {
    pub fn new() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            completed: BTreeSet::new(),
            failed: BTreeMap::new(),
            metadata: BTreeMap::new(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn is_complete(&self, step: StepId) -> bool {
        self.completed.contains(&step.resolve_alias().get())
    }

    pub fn failure_reason(&self, step: StepId) -> Option<&str> {
        self.failed.get(&step.resolve_alias().get()).map(String::as_str)
    }

    pub fn has_failed(&self, step: StepId) -> bool {
        self.failed.contains_key(&step.resolve_alias().get())
    }

    pub fn completed_steps(&self) -> impl Iterator<Item = u8> + '_ {
        self.completed.iter().copied()
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = (u8, &str)> + '_ {
        self.failed.iter().map(|(s, r)| (*s, r.as_str()))
    }

    /// Mark a step complete. A step already marked failed for this protein
    /// cannot be marked complete afterward — the caller is responsible for
    /// respecting the critical-failure skip rule before reaching here; this
    /// is a last-line invariant guard.
    pub fn mark_complete(&mut self, step: StepId) {
        let canonical = step.resolve_alias().get();
        self.completed.insert(canonical);
    }

    pub fn mark_failed(&mut self, step: StepId, reason: impl Into<String>) {
        let canonical = step.resolve_alias().get();
        self.failed.insert(canonical, reason.into());
    }
}

impl Default for ProteinState {
    fn default() -> Self {
        Self::new()
    }
}
