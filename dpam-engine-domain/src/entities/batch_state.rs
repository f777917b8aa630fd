// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Per-batch durable state record: step id -> protein id -> outcome.

use crate::value_objects::{ProteinId, StepId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Complete,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchState {
    pub format_version: u32,
    /// When this working root first started a batch run. Set once and
    /// never rewritten; purely for operator-facing summaries, not read by
    /// scheduling logic.
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    /// When the most recent state mutation was persisted.
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    steps: BTreeMap<u8, BTreeMap<String, Outcome>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BatchState {
    pub fn new() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            started_at: None,
            updated_at: None,
            steps: BTreeMap::new(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn outcome(&self, step: StepId, protein: &ProteinId) -> Option<Outcome> {
        self.steps
            .get(&step.resolve_alias().get())
            .and_then(|by_protein| by_protein.get(protein.as_str()))
            .copied()
    }

    pub fn is_complete(&self, step: StepId, protein: &ProteinId) -> bool {
        self.outcome(step, protein) == Some(Outcome::Complete)
    }

    pub fn has_failed(&self, step: StepId, protein: &ProteinId) -> bool {
        self.outcome(step, protein) == Some(Outcome::Failed)
    }

    pub fn set_outcome(&mut self, step: StepId, protein: &ProteinId, outcome: Outcome) {
        let canonical = step.resolve_alias().get();
        self.steps
            .entry(canonical)
            .or_default()
            .insert(protein.as_str().to_string(), outcome);

        let now = chrono::Utc::now();
        self.started_at.get_or_insert(now);
        self.updated_at = Some(now);
    }

    /// Amend this batch record to agree with a per-protein record discovered
    /// to be more current during load-time reconciliation.
    pub fn reconcile_from_protein(&mut self, protein: &ProteinId, protein_state: &super::ProteinState) {
        for step_num in protein_state.completed_steps() {
            if let Ok(step) = StepId::new(step_num) {
                if !self.is_complete(step, protein) {
                    self.set_outcome(step, protein, Outcome::Complete);
                }
            }
        }
        for (step_num, _reason) in protein_state.failed_steps() {
            if let Ok(step) = StepId::new(step_num) {
                if self.outcome(step, protein).is_none() {
                    self.set_outcome(step, protein, Outcome::Failed);
                }
            }
        }
    }

    pub fn proteins_for_step(&self, step: StepId) -> impl Iterator<Item = (&str, Outcome)> {
        self.steps
            .get(&step.resolve_alias().get())
            .into_iter()
            .flat_map(|by_protein| by_protein.iter().map(|(p, o)| (p.as_str(), *o)))
    }
}

impl Default for BatchState {
    fn default() -> Self {
        Self::new()
    }
}
