// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Tabular hit records and pairwise-alignment equivalence records.
//!
//! Immutable value objects, constructed once by an adapter's parser and
//! passed by value (or behind `Arc` for large hit lists) to the state
//! store and to bulk-mode splitting logic.

use crate::value_objects::ProteinId;
use serde::{Deserialize, Serialize};

/// One row of a profile-search or structure-search tabular hit list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitRecord {
    pub query_id: ProteinId,
    pub template_id: String,
    pub identity: f64,
    pub alignment_length: u32,
    pub mismatches: u32,
    pub gap_opens: u32,
    pub query_start: u32,
    pub query_end: u32,
    pub template_start: u32,
    pub template_end: u32,
    pub e_value: f64,
    pub bit_score: f64,
}

/// One paired residue range from a pairwise-alignment tool's structural
/// equivalence section: `(query_start..query_end)` aligns with
/// `(template_start..template_end)`, with equal span length on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidueRange {
    pub start: u32,
    pub end: u32,
}

impl ResidueRange {
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralEquivalence {
    pub template_id: String,
    pub z_score: f64,
    pub query_ranges: Vec<ResidueRange>,
    pub template_ranges: Vec<ResidueRange>,
}

impl StructuralEquivalence {
    /// Validate that paired query/template ranges have identical spans, as
    /// the adapter's parser is required to do before accepting a record.
    pub fn validate_equal_spans(&self) -> Result<(), String> {
        if self.query_ranges.len() != self.template_ranges.len() {
            return Err(format!(
                "mismatched equivalence range counts: {} query vs {} template",
                self.query_ranges.len(),
                self.template_ranges.len()
            ));
        }
        for (q, t) in self.query_ranges.iter().zip(&self.template_ranges) {
            if q.len() != t.len() {
                return Err(format!(
                    "mismatched range lengths: query {:?} (len {}) vs template {:?} (len {})",
                    q,
                    q.len(),
                    t,
                    t.len()
                ));
            }
        }
        Ok(())
    }

    /// Expand paired ranges into the cross-product of aligned residue pairs.
    pub fn expand_residue_pairs(&self) -> Vec<(u32, u32)> {
        self.query_ranges
            .iter()
            .zip(&self.template_ranges)
            .flat_map(|(q, t)| (q.start..=q.end).zip(t.start..=t.end))
            .collect()
    }
}
