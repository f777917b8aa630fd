// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Closed artifact-kind enumeration.
//!
//! Named variants cover the artifacts the batch execution engine itself
//! must recognize (raw inputs, and the outputs of the five external-tool
//! classes it drives). Steps whose intermediate file format is out of scope
//! for the orchestration layer (the per-step numeric algorithms named out
//! of scope in the domain model) are addressed through `Intermediate`,
//! keyed by the step that produced them — the resolver still maps every
//! `(protein, step, kind)` triple to a path, it just doesn't need a named
//! variant per undocumented intermediate format.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// Raw structure input (read-only, lives at the working root in both layouts).
    Structure,
    /// Raw per-residue pairwise-confidence matrix (read-only).
    ConfidenceMatrix,
    /// Multiple sequence alignment built from the profile search's first stage.
    Msa,
    /// Sequence profile built from the MSA.
    Profile,
    /// Tabular hit list from a profile-vs-database search.
    ProfileHits,
    /// Combined query structure database for batched-bulk structure search.
    StructureDb,
    /// Tabular hit list from a structure search.
    StructureHits,
    /// Pairwise structural alignment summary (Z-score + residue equivalences).
    PairwiseAlignment,
    /// Per-residue secondary-structure class assignment.
    SecondaryStructure,
    /// Feature matrix assembled for neural-net inference.
    NnFeatures,
    /// Per-residue domain-boundary probabilities from neural-net inference.
    NnProbabilities,
    /// Final integrated domain-boundary assignment (step 24's output).
    IntegratedDomains,
    /// A step-specific intermediate whose format is out of scope for the
    /// orchestration layer; identified by the producing step's ordinal and a
    /// short slot name so distinct outputs of one step stay distinguishable.
    Intermediate { step: u8, slot: &'static str },
}

impl ArtifactKind {
    /// A filesystem-safe fragment used when building file names.
    pub fn file_stem(&self) -> String {
        match self {
            ArtifactKind::Structure => "structure".to_string(),
            ArtifactKind::ConfidenceMatrix => "confidence".to_string(),
            ArtifactKind::Msa => "msa".to_string(),
            ArtifactKind::Profile => "profile".to_string(),
            ArtifactKind::ProfileHits => "profile_hits".to_string(),
            ArtifactKind::StructureDb => "structure_db".to_string(),
            ArtifactKind::StructureHits => "structure_hits".to_string(),
            ArtifactKind::PairwiseAlignment => "pairwise".to_string(),
            ArtifactKind::SecondaryStructure => "secstruct".to_string(),
            ArtifactKind::NnFeatures => "nn_features".to_string(),
            ArtifactKind::NnProbabilities => "nn_probabilities".to_string(),
            ArtifactKind::IntegratedDomains => "domains".to_string(),
            ArtifactKind::Intermediate { step, slot } => format!("step{step:02}_{slot}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intermediate_stem_includes_step_and_slot() {
        let kind = ArtifactKind::Intermediate { step: 9, slot: "ranges" };
        assert_eq!(kind.file_stem(), "step09_ranges");
    }

    #[test]
    fn named_kinds_have_stable_stems() {
        assert_eq!(ArtifactKind::IntegratedDomains.file_stem(), "domains");
    }
}
