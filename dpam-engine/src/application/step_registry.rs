// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The fixed 24-step registry.
//!
//! Built once at startup by `step_registry()`; no runtime mutation, no
//! dynamic addition of step kinds. The batch runner dispatches on each
//! step's `ExecutionMode`, never on its name or ordinal, so this table is
//! the only place step identity and step behavior are joined.

use dpam_engine_domain::entities::{ExecutionMode, StepDefinition};
use dpam_engine_domain::value_objects::{ArtifactKind, StepId};

fn intermediate(step: u8, slot: &'static str) -> ArtifactKind {
    ArtifactKind::Intermediate { step, slot }
}

fn step(n: u8, name: &'static str, inputs: Vec<ArtifactKind>, outputs: Vec<ArtifactKind>, mode: ExecutionMode) -> StepDefinition {
    StepDefinition::new(StepId::new(n).expect("step_registry only constructs ids 1..=24"), name, inputs, outputs, mode)
}

/// Build the ordered step table. Step 14 is declared as a no-op alias of
/// step 13 (same name, empty input/output declarations, `PerProtein` mode
/// purely as a dispatch placeholder — the runner never actually invokes
/// its body, see `BatchRunner::run_step`).
pub fn step_registry() -> Vec<StepDefinition> {
    vec![
        step(1, "prepare", vec![ArtifactKind::Structure, ArtifactKind::ConfidenceMatrix], vec![intermediate(1, "prepared")], ExecutionMode::PerProtein),
        step(2, "hhsearch_msa", vec![intermediate(1, "prepared")], vec![ArtifactKind::Msa], ExecutionMode::PerProtein),
        step(3, "hhsearch_profile", vec![ArtifactKind::Msa], vec![ArtifactKind::Profile], ExecutionMode::PerProtein),
        step(4, "hhsearch_search", vec![ArtifactKind::Profile], vec![ArtifactKind::ProfileHits], ExecutionMode::SharedResource),
        step(5, "foldseek_createdb", vec![ArtifactKind::Structure], vec![ArtifactKind::StructureDb], ExecutionMode::BatchedBulk),
        step(6, "foldseek_search", vec![ArtifactKind::StructureDb], vec![ArtifactKind::StructureHits], ExecutionMode::BatchedBulk),
        step(7, "foldseek_convertalis", vec![ArtifactKind::StructureHits], vec![ArtifactKind::StructureHits], ExecutionMode::BatchedBulk),
        step(8, "template_select", vec![ArtifactKind::StructureHits, ArtifactKind::ProfileHits], vec![intermediate(8, "candidate_templates")], ExecutionMode::PerProtein),
        step(9, "pairwise_align", vec![intermediate(8, "candidate_templates")], vec![ArtifactKind::PairwiseAlignment], ExecutionMode::PooledFanout),
        step(10, "equivalence_merge", vec![ArtifactKind::PairwiseAlignment], vec![intermediate(10, "merged_equivalences")], ExecutionMode::PerProtein),
        step(11, "dssp_assign", vec![ArtifactKind::Structure], vec![ArtifactKind::SecondaryStructure], ExecutionMode::PerProtein),
        step(12, "feature_assemble", vec![ArtifactKind::SecondaryStructure, intermediate(10, "merged_equivalences"), ArtifactKind::ConfidenceMatrix], vec![ArtifactKind::NnFeatures], ExecutionMode::PerProtein),
        step(13, "nn_predict", vec![ArtifactKind::NnFeatures], vec![ArtifactKind::NnProbabilities], ExecutionMode::SharedResource),
        step(14, "nn_predict_alias", vec![], vec![], ExecutionMode::PerProtein),
        step(15, "boundary_candidates", vec![ArtifactKind::NnProbabilities], vec![intermediate(15, "boundary_candidates")], ExecutionMode::PerProtein),
        step(16, "segment_graph", vec![intermediate(15, "boundary_candidates")], vec![intermediate(16, "segment_graph")], ExecutionMode::PerProtein),
        step(17, "segment_score", vec![intermediate(16, "segment_graph")], vec![intermediate(17, "segment_scores")], ExecutionMode::PerProtein),
        step(18, "domain_cluster", vec![intermediate(17, "segment_scores")], vec![intermediate(18, "domain_clusters")], ExecutionMode::PerProtein),
        step(19, "domain_consensus", vec![intermediate(18, "domain_clusters")], vec![intermediate(19, "domain_consensus")], ExecutionMode::PerProtein),
        step(20, "boundary_refine", vec![intermediate(19, "domain_consensus")], vec![intermediate(20, "refined_boundaries")], ExecutionMode::PerProtein),
        step(21, "overlap_resolve", vec![intermediate(20, "refined_boundaries")], vec![intermediate(21, "resolved_domains")], ExecutionMode::PerProtein),
        step(22, "confidence_score", vec![intermediate(21, "resolved_domains"), ArtifactKind::ConfidenceMatrix], vec![intermediate(22, "scored_domains")], ExecutionMode::PerProtein),
        step(23, "domain_name", vec![intermediate(22, "scored_domains"), ArtifactKind::ProfileHits], vec![intermediate(23, "named_domains")], ExecutionMode::PerProtein),
        step(24, "integrate", vec![intermediate(23, "named_domains")], vec![ArtifactKind::IntegratedDomains], ExecutionMode::PerProtein),
    ]
}

/// Look up a step's definition by id (after alias resolution).
pub fn lookup(registry: &[StepDefinition], id: StepId) -> &StepDefinition {
    let canonical = id.resolve_alias();
    registry
        .iter()
        .find(|def| def.id == canonical)
        .expect("step_registry declares a definition for every 1..=24")
}
