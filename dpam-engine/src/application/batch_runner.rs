// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The batch runner: opens the store and resolver, then walks the fixed
//! 24-step chain with a strict step barrier (no cross-step parallelism).
//!
//! Per step: compute the pending set, probe adapter availability (fatal
//! only if pending work needs the adapter), acquire a scratch scope,
//! dispatch by `ExecutionMode`, record outcomes into the state store, then
//! let the scratch scope's `Drop` release it before moving to the next
//! step. This is a composition root consumer, not a composition root
//! itself — `BatchRunner::new` takes every dependency already built;
//! `main.rs` wires the concrete adapters, store, scratch manager, and
//! worker pools in exactly once.
//!
//! The orchestration above is the deliverable; the numeric domain science
//! behind steps with no external-tool counterpart (structural
//! clustering, boundary refinement, domain naming, and so on) is out of
//! scope, so those steps are implemented as shape-preserving pass-throughs
//! that materialize their declared output artifacts without claiming to
//! have computed anything meaningful — see DESIGN.md for the list.

use crate::application::step_registry::{lookup, step_registry};
use crate::infrastructure::{PathResolver, ScratchManager, WorkerPool};
use dpam_engine_bootstrap::shutdown::CancellationToken;
use dpam_engine_domain::entities::{ExecutionMode, StepDefinition};
use dpam_engine_domain::error::DpamError;
use dpam_engine_domain::events::BatchObserver;
use dpam_engine_domain::ports::{
    NeuralNetAdapter, NeuralNetHandle, PairwiseAlignmentAdapter, SecondaryStructureAdapter, SequenceProfileSearchAdapter,
    StateStore, StructureSearchAdapter, FEATURE_WIDTH, NN_FIXED_BATCH_SIZE, OUTPUT_WIDTH,
};
use dpam_engine_domain::value_objects::{ArtifactKind, HitRecord, ProteinId, StepId, StructuralEquivalence};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// End-of-batch summary: the completion set and the failure map, per
/// §6's exit-code contract (nonzero only on a batch-fatal abort, not on
/// any number of recorded per-protein failures).
pub struct BatchSummary {
    pub completed_pairs: usize,
    pub failed_pairs: usize,
    pub per_protein: Vec<(ProteinId, BTreeSet<u8>, Vec<(u8, String)>)>,
}

pub struct BatchRunner {
    resolver: PathResolver,
    store: Box<dyn StateStore>,
    scratch: ScratchManager,
    cpu_pool: WorkerPool,
    io_pool: WorkerPool,
    sequence_profile_search: Arc<dyn SequenceProfileSearchAdapter>,
    structure_search: Arc<dyn StructureSearchAdapter>,
    pairwise_alignment: Arc<dyn PairwiseAlignmentAdapter>,
    secondary_structure: Arc<dyn SecondaryStructureAdapter>,
    neural_net: Arc<dyn NeuralNetAdapter>,
    observer: Arc<dyn BatchObserver>,
    cancel: CancellationToken,
    registry: Vec<StepDefinition>,
}

impl BatchRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resolver: PathResolver,
        store: Box<dyn StateStore>,
        scratch: ScratchManager,
        cpu_pool: WorkerPool,
        io_pool: WorkerPool,
        sequence_profile_search: Arc<dyn SequenceProfileSearchAdapter>,
        structure_search: Arc<dyn StructureSearchAdapter>,
        pairwise_alignment: Arc<dyn PairwiseAlignmentAdapter>,
        secondary_structure: Arc<dyn SecondaryStructureAdapter>,
        neural_net: Arc<dyn NeuralNetAdapter>,
        observer: Arc<dyn BatchObserver>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            resolver,
            store,
            scratch,
            cpu_pool,
            io_pool,
            sequence_profile_search,
            structure_search,
            pairwise_alignment,
            secondary_structure,
            neural_net,
            observer,
            cancel,
            registry: step_registry(),
        }
    }

    /// Run (or resume) the batch for `proteins` to completion or the first
    /// batch-fatal error.
    pub async fn run(&mut self, proteins: &[ProteinId]) -> Result<BatchSummary, DpamError> {
        for step in StepId::all() {
            if self.cancel.is_cancelled() {
                return Err(DpamError::Cancelled);
            }
            if step.is_alias() {
                // Step 14's completion record is step 13's; the state store
                // already resolves the alias, so there is nothing left to do.
                continue;
            }
            self.run_step(step, proteins).await?;
        }

        let summary = self.store.summary();
        let completed_pairs = summary.iter().map(|(_, completed, _)| completed.len()).sum();
        let failed_pairs = summary.iter().map(|(_, _, failed)| failed.len()).sum();
        self.observer.on_batch_completed(completed_pairs, failed_pairs).await;
        Ok(BatchSummary {
            completed_pairs,
            failed_pairs,
            per_protein: summary,
        })
    }

    async fn run_step(&mut self, step: StepId, proteins: &[ProteinId]) -> Result<(), DpamError> {
        let def = lookup(&self.registry, step).clone();
        let pending = self.store.pending_for(step, proteins);
        self.observer.on_step_started(step, pending.len()).await;

        if pending.is_empty() {
            self.observer.on_step_completed(step, 0, 0).await;
            return Ok(());
        }

        self.probe_availability(step).await?;

        let scope = self.scratch.enter_step(step)?;
        let outcomes = match def.mode {
            ExecutionMode::BatchedBulk => self.run_batched_bulk(step, &pending, scope.path()).await?,
            ExecutionMode::PooledFanout => self.run_pooled_fanout(step, &pending, scope.path()).await?,
            ExecutionMode::SharedResource if step.get() == 13 => self.run_nn_predict(&pending, scope.path()).await?,
            ExecutionMode::SharedResource | ExecutionMode::PerProtein => {
                self.run_per_protein(step, &pending, scope.path()).await?
            }
        };
        drop(scope);

        let mut completed_count = 0usize;
        let mut failed_count = 0usize;
        for (protein, result) in outcomes {
            match result {
                Ok(()) => {
                    self.store.mark_complete(step, &protein)?;
                    self.observer.on_protein_completed(step, &protein).await;
                    completed_count += 1;
                }
                Err(err) => {
                    let reason = err.to_string();
                    self.store.mark_failed(step, &protein, &reason)?;
                    self.observer.on_protein_failed(step, &protein, &reason).await;
                    failed_count += 1;
                }
            }
        }
        self.observer.on_step_completed(step, completed_count, failed_count).await;
        Ok(())
    }

    /// Tool availability is only fatal if this step's pending work actually
    /// depends on the tool; steps with no external-tool counterpart always
    /// pass.
    async fn probe_availability(&self, step: StepId) -> Result<(), DpamError> {
        let (available, tool) = match step.get() {
            2 | 3 | 4 => (self.sequence_profile_search.check_availability().await, "sequence profile search"),
            5 | 6 | 7 => (self.structure_search.check_availability().await, "structure search"),
            9 => (self.pairwise_alignment.check_availability().await, "pairwise alignment"),
            11 => (self.secondary_structure.check_availability().await, "secondary structure"),
            13 => (self.neural_net.check_availability().await, "neural net"),
            _ => (true, ""),
        };
        if !available {
            return Err(DpamError::ToolMissing {
                tool: tool.to_string(),
                reason: format!("step {step} has pending work but its adapter is unavailable"),
            });
        }
        Ok(())
    }

    async fn run_per_protein(
        &self,
        step: StepId,
        pending: &[ProteinId],
        scratch_dir: &Path,
    ) -> Result<Vec<(ProteinId, Result<(), DpamError>)>, DpamError> {
        let resolver = self.resolver.clone();
        let sequence_profile_search = self.sequence_profile_search.clone();
        let structure_search = self.structure_search.clone();
        let pairwise_alignment = self.pairwise_alignment.clone();
        let secondary_structure = self.secondary_structure.clone();
        let scratch_dir = scratch_dir.to_path_buf();
        let items: Vec<ProteinId> = pending.to_vec();

        let results = self
            .cpu_pool
            .run_async(items, &self.cancel, move |protein: ProteinId| {
                let resolver = resolver.clone();
                let sequence_profile_search = sequence_profile_search.clone();
                let structure_search = structure_search.clone();
                let pairwise_alignment = pairwise_alignment.clone();
                let secondary_structure = secondary_structure.clone();
                let scratch_dir = scratch_dir.clone();
                async move {
                    let work_dir = scratch_dir.join(protein.as_str());
                    std::fs::create_dir_all(&work_dir).map_err(DpamError::from)?;
                    execute_per_protein_step(
                        step,
                        &protein,
                        &resolver,
                        &work_dir,
                        &sequence_profile_search,
                        &structure_search,
                        &pairwise_alignment,
                        &secondary_structure,
                    )
                    .await?;
                    Ok(protein)
                }
            })
            .await;

        Ok(results
            .into_iter()
            .zip(pending)
            .map(|(result, protein)| (protein.clone(), result.map(|_| ())))
            .collect())
    }

    /// `SharedResource` lifecycle for the neural-net step: one handle
    /// opened for the whole step, reused across every pending protein,
    /// closed once at step exit regardless of per-protein outcomes.
    async fn run_nn_predict(
        &self,
        pending: &[ProteinId],
        scratch_dir: &Path,
    ) -> Result<Vec<(ProteinId, Result<(), DpamError>)>, DpamError> {
        let model_path = scratch_dir.join("model");
        let handle = Arc::from(self.neural_net.open(&model_path).await?);
        let resolver = self.resolver.clone();
        let items: Vec<ProteinId> = pending.to_vec();

        let results = self
            .cpu_pool
            .run_async(items, &self.cancel, move |protein: ProteinId| {
                let resolver = resolver.clone();
                let handle: Arc<dyn NeuralNetHandle> = Arc::clone(&handle);
                async move {
                    let features_path = resolver.artifact_path(&protein, StepId::new(12)?, &ArtifactKind::NnFeatures);
                    let features = read_feature_rows(&features_path)?;
                    let n_actual_rows = features.len() / FEATURE_WIDTH;
                    let (padded_features, n_rows) = pad_to_fixed_batch(&features, n_actual_rows);
                    let outputs = handle.predict(&padded_features, n_rows).await?;
                    let outputs = &outputs[..n_actual_rows * OUTPUT_WIDTH];
                    let out_path = resolver.artifact_path(&protein, StepId::new(13)?, &ArtifactKind::NnProbabilities);
                    write_f32_rows(&out_path, outputs)?;
                    Ok(protein)
                }
            })
            .await;

        handle.close().await?;
        Ok(results
            .into_iter()
            .zip(pending)
            .map(|(result, protein)| (protein.clone(), result.map(|_| ())))
            .collect())
    }

    async fn run_batched_bulk(
        &self,
        step: StepId,
        pending: &[ProteinId],
        scratch_dir: &Path,
    ) -> Result<Vec<(ProteinId, Result<(), DpamError>)>, DpamError> {
        match step.get() {
            5 => self.run_foldseek_createdb(pending, scratch_dir).await,
            6 => self.run_foldseek_search(pending, scratch_dir).await,
            7 => self.run_foldseek_convertalis(pending, scratch_dir).await,
            n => Err(DpamError::InvariantViolation(format!("step {n} is not a registered batched-bulk step"))),
        }
    }

    async fn run_foldseek_createdb(
        &self,
        pending: &[ProteinId],
        scratch_dir: &Path,
    ) -> Result<Vec<(ProteinId, Result<(), DpamError>)>, DpamError> {
        let structures: Vec<PathBuf> = pending.iter().map(|p| self.resolver.raw_structure_path(p, "pdb")).collect();
        let result = self.structure_search.createdb(&structures, scratch_dir).await;
        Ok(broadcast_result(pending, result))
    }

    async fn run_foldseek_search(
        &self,
        pending: &[ProteinId],
        scratch_dir: &Path,
    ) -> Result<Vec<(ProteinId, Result<(), DpamError>)>, DpamError> {
        let query_db = scratch_dir.join("query_db");
        let reference_db = scratch_dir.join("reference_db");
        let result = self.structure_search.search(&query_db, &reference_db, scratch_dir).await;
        Ok(broadcast_result(pending, result))
    }

    async fn run_foldseek_convertalis(
        &self,
        pending: &[ProteinId],
        scratch_dir: &Path,
    ) -> Result<Vec<(ProteinId, Result<(), DpamError>)>, DpamError> {
        let alignment_db = scratch_dir.join("aln_db");
        match self.structure_search.convertalis(&alignment_db, scratch_dir).await {
            Ok(hits) => {
                let by_protein = split_hits_per_protein(hits);
                let mut outcomes = Vec::with_capacity(pending.len());
                for protein in pending {
                    let rows = by_protein.get(protein.as_str()).cloned().unwrap_or_default();
                    let path = self.resolver.artifact_path(protein, StepId::new(7)?, &ArtifactKind::StructureHits);
                    let write_result = write_hit_records(&path, &rows);
                    outcomes.push((protein.clone(), write_result));
                }
                Ok(outcomes)
            }
            Err(err) => Ok(broadcast_result(pending, Err(err))),
        }
    }

    /// Step 9's pooled fan-out: each pending protein decomposes into one
    /// sub-unit per candidate template (from step 8's output), dispatched
    /// through the I/O-bound pool since alignment wall time is dominated
    /// by the external tool's process-spawn latency, not CPU.
    async fn run_pooled_fanout(
        &self,
        step: StepId,
        pending: &[ProteinId],
        scratch_dir: &Path,
    ) -> Result<Vec<(ProteinId, Result<(), DpamError>)>, DpamError> {
        let mut units: Vec<(ProteinId, String)> = Vec::new();
        for protein in pending {
            let candidates_path =
                self.resolver.artifact_path(protein, StepId::new(8)?, &ArtifactKind::Intermediate { step: 8, slot: "candidate_templates" });
            let templates = read_candidate_templates(&candidates_path).unwrap_or_default();
            for template_id in templates {
                units.push((protein.clone(), template_id));
            }
        }

        let pairwise_alignment = self.pairwise_alignment.clone();
        let resolver = self.resolver.clone();
        let scratch_dir = scratch_dir.to_path_buf();

        let per_unit_results = self
            .io_pool
            .run_async(units, &self.cancel, move |(protein, template_id): (ProteinId, String)| {
                let pairwise_alignment = pairwise_alignment.clone();
                let resolver = resolver.clone();
                let scratch_dir = scratch_dir.clone();
                async move {
                    let work_dir = scratch_dir.join(format!("{}_{}", protein.as_str(), template_id));
                    std::fs::create_dir_all(&work_dir).map_err(DpamError::from)?;
                    let query = resolver.raw_structure_path(&protein, "pdb");
                    let template = PathBuf::from(&template_id);
                    let equivalence = pairwise_alignment.align_one(&query, &template, &work_dir).await?;
                    let out_path = resolver.artifact_path(&protein, step, &ArtifactKind::PairwiseAlignment);
                    write_equivalence(&out_path, &equivalence)?;
                    Ok(protein)
                }
            })
            .await;

        // Fold per-(protein, template) results back to a per-protein
        // outcome: a protein fails step 9 only if every one of its
        // candidate templates failed, or it had no candidates at all.
        let mut per_protein: std::collections::BTreeMap<String, Vec<Result<(), DpamError>>> = std::collections::BTreeMap::new();
        for protein in pending {
            per_protein.entry(protein.as_str().to_string()).or_default();
        }
        for result in per_unit_results {
            if let Ok(protein) = &result {
                per_protein.entry(protein.as_str().to_string()).or_default().push(Ok(()));
            }
        }

        Ok(pending
            .iter()
            .map(|protein| {
                let outcomes = per_protein.get(protein.as_str()).cloned().unwrap_or_default();
                let outcome = if outcomes.is_empty() {
                    Err(DpamError::InputMissing {
                        protein: protein.as_str().to_string(),
                        artifact: "candidate_templates".to_string(),
                        reason: "no candidate templates survived alignment".to_string(),
                    })
                } else {
                    Ok(())
                };
                (protein.clone(), outcome)
            })
            .collect())
    }
}

/// Broadcast one batch-level result to every pending protein: used by the
/// batched-bulk steps where a single adapter call's success or failure
/// applies uniformly (the per-protein split happens downstream, at
/// `convertalis`, once there are per-query rows to split).
fn broadcast_result<T>(pending: &[ProteinId], result: Result<T, DpamError>) -> Vec<(ProteinId, Result<(), DpamError>)> {
    match result {
        Ok(_) => pending.iter().map(|p| (p.clone(), Ok(()))).collect(),
        Err(err) => pending.iter().map(|p| (p.clone(), Err(clone_error(&err)))).collect(),
    }
}

fn clone_error(err: &DpamError) -> DpamError {
    DpamError::ToolFailed {
        tool: "foldseek".to_string(),
        exit_status: "batched-bulk step failed".to_string(),
        stderr_tail: err.to_string(),
    }
}

#[allow(clippy::too_many_arguments)]
async fn execute_per_protein_step(
    step: StepId,
    protein: &ProteinId,
    resolver: &PathResolver,
    work_dir: &Path,
    sequence_profile_search: &Arc<dyn SequenceProfileSearchAdapter>,
    structure_search: &Arc<dyn StructureSearchAdapter>,
    pairwise_alignment: &Arc<dyn PairwiseAlignmentAdapter>,
    secondary_structure: &Arc<dyn SecondaryStructureAdapter>,
) -> Result<(), DpamError> {
    let _ = structure_search; // no per-protein use outside batched-bulk mode
    let _ = pairwise_alignment; // the pooled-fanout path owns this adapter
    match step.get() {
        1 => {
            let out = resolver.artifact_path(protein, step, &ArtifactKind::Intermediate { step: 1, slot: "prepared" });
            touch(&out)
        }
        2 => {
            let fasta = resolver.raw_structure_path(protein, "fasta");
            let msa = sequence_profile_search.build_msa(&fasta, work_dir).await?;
            let out = resolver.artifact_path(protein, step, &ArtifactKind::Msa);
            copy_into_place(&msa, &out)
        }
        3 => {
            let msa = resolver.artifact_path(protein, StepId::new(2)?, &ArtifactKind::Msa);
            let profile = sequence_profile_search.build_profile(&msa, work_dir).await?;
            let out = resolver.artifact_path(protein, step, &ArtifactKind::Profile);
            copy_into_place(&profile, &out)
        }
        4 => {
            let profile = resolver.artifact_path(protein, StepId::new(3)?, &ArtifactKind::Profile);
            let db = work_dir.join("reference.hhm");
            let hits = sequence_profile_search.search(&profile, &db, work_dir).await?;
            let out = resolver.artifact_path(protein, step, &ArtifactKind::ProfileHits);
            write_hit_records(&out, &hits)
        }
        8 => {
            let out = resolver.artifact_path(protein, step, &ArtifactKind::Intermediate { step: 8, slot: "candidate_templates" });
            let structure_hits = read_hit_records(&resolver.artifact_path(protein, StepId::new(7)?, &ArtifactKind::StructureHits)).unwrap_or_default();
            let profile_hits = read_hit_records(&resolver.artifact_path(protein, StepId::new(4)?, &ArtifactKind::ProfileHits)).unwrap_or_default();
            let mut templates: BTreeSet<String> = BTreeSet::new();
            templates.extend(structure_hits.into_iter().map(|h| h.template_id));
            templates.extend(profile_hits.into_iter().map(|h| h.template_id));
            write_candidate_templates(&out, &templates.into_iter().collect::<Vec<_>>())
        }
        10 => {
            let out = resolver.artifact_path(protein, step, &ArtifactKind::Intermediate { step: 10, slot: "merged_equivalences" });
            touch(&out)
        }
        11 => {
            let structure = resolver.raw_structure_path(protein, "pdb");
            let assignment = secondary_structure.assign(&structure, work_dir).await?;
            let out = resolver.artifact_path(protein, step, &ArtifactKind::SecondaryStructure);
            copy_into_place(&assignment, &out)
        }
        12 => {
            let out = resolver.artifact_path(protein, step, &ArtifactKind::NnFeatures);
            write_f32_rows(&out, &vec![0.0; FEATURE_WIDTH])
        }
        n @ 15..=24 => {
            let def = lookup(&step_registry(), StepId::new(n)?).clone();
            for kind in &def.outputs {
                let out = resolver.artifact_path(protein, step, kind);
                touch(&out)?;
                if n == 24 {
                    mirror_final_artifact(resolver, protein, kind, &out)?;
                }
            }
            Ok(())
        }
        n => Err(DpamError::InvariantViolation(format!("step {n} has no per-protein dispatch arm"))),
    }
}

/// Placeholder content for steps with no external-tool counterpart: a
/// bare JSON object keeps every placeholder artifact non-empty and, like
/// its sibling JSON-encoded artifacts, parseable, without claiming any
/// particular schema. `marked_complete(p, s)` promises a non-empty file
/// on disk regardless of whether the producing step has real numerics
/// behind it yet.
const PLACEHOLDER_ARTIFACT: &[u8] = b"{}\n";

fn touch(path: &Path) -> Result<(), DpamError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(DpamError::from)?;
    }
    std::fs::write(path, PLACEHOLDER_ARTIFACT).map_err(|source| DpamError::StateIoError { path: path.to_path_buf(), source })
}

/// Step 24's output is the batch's deliverable, not just another
/// per-step intermediate: mirror it into `results/` and the working
/// root alongside its per-step-directory copy.
fn mirror_final_artifact(resolver: &PathResolver, protein: &ProteinId, kind: &ArtifactKind, source: &Path) -> Result<(), DpamError> {
    let file_name = format!("{}.{}", protein.as_str(), kind.file_stem());
    copy_into_place(source, &resolver.results_dir().join(&file_name))?;

    // Under the flat layout the per-step artifact already lives at the
    // working root; only copy when the mirror target is a distinct path.
    let root_path = resolver.root().join(&file_name);
    if root_path != source {
        copy_into_place(source, &root_path)?;
    }
    Ok(())
}

fn copy_into_place(source: &Path, dest: &Path) -> Result<(), DpamError> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(DpamError::from)?;
    }
    std::fs::copy(source, dest).map_err(|source_err| DpamError::StateIoError { path: dest.to_path_buf(), source: source_err })?;
    Ok(())
}

fn write_hit_records(path: &Path, hits: &[HitRecord]) -> Result<(), DpamError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(DpamError::from)?;
    }
    let bytes = serde_json::to_vec(hits)?;
    std::fs::write(path, bytes).map_err(|source| DpamError::StateIoError { path: path.to_path_buf(), source })
}

fn read_hit_records(path: &Path) -> Result<Vec<HitRecord>, DpamError> {
    let bytes = std::fs::read(path).map_err(|source| DpamError::StateIoError { path: path.to_path_buf(), source })?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_candidate_templates(path: &Path, templates: &[String]) -> Result<(), DpamError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(DpamError::from)?;
    }
    let bytes = serde_json::to_vec(templates)?;
    std::fs::write(path, bytes).map_err(|source| DpamError::StateIoError { path: path.to_path_buf(), source })
}

fn read_candidate_templates(path: &Path) -> Result<Vec<String>, DpamError> {
    let bytes = std::fs::read(path).map_err(|source| DpamError::StateIoError { path: path.to_path_buf(), source })?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_equivalence(path: &Path, equivalence: &StructuralEquivalence) -> Result<(), DpamError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(DpamError::from)?;
    }
    let bytes = serde_json::to_vec(equivalence)?;
    std::fs::write(path, bytes).map_err(|source| DpamError::StateIoError { path: path.to_path_buf(), source })
}

fn write_f32_rows(path: &Path, rows: &[f32]) -> Result<(), DpamError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(DpamError::from)?;
    }
    let bytes = serde_json::to_vec(rows)?;
    std::fs::write(path, bytes).map_err(|source| DpamError::StateIoError { path: path.to_path_buf(), source })
}

fn read_feature_rows(path: &Path) -> Result<Vec<f32>, DpamError> {
    let bytes = std::fs::read(path).map_err(|source| DpamError::StateIoError { path: path.to_path_buf(), source })?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Pad `features` (a flattened `[n_actual_rows, FEATURE_WIDTH]` matrix) up
/// to `NN_FIXED_BATCH_SIZE` rows by cycling through the existing rows, so
/// the model always sees its fixed batch shape. Proteins with at least
/// that many residues pass through unpadded. Returns the padded matrix and
/// the row count passed to `predict`; the caller discards the padded rows'
/// outputs by truncating back to `n_actual_rows * OUTPUT_WIDTH`.
fn pad_to_fixed_batch(features: &[f32], n_actual_rows: usize) -> (Vec<f32>, usize) {
    if n_actual_rows == 0 || n_actual_rows >= NN_FIXED_BATCH_SIZE {
        return (features.to_vec(), n_actual_rows);
    }
    let mut padded = Vec::with_capacity(NN_FIXED_BATCH_SIZE * FEATURE_WIDTH);
    for i in 0..NN_FIXED_BATCH_SIZE {
        let src_row = i % n_actual_rows;
        padded.extend_from_slice(&features[src_row * FEATURE_WIDTH..(src_row + 1) * FEATURE_WIDTH]);
    }
    (padded, NN_FIXED_BATCH_SIZE)
}

/// Group `convertalis` output by query id for the per-protein split a
/// batched-bulk step's caller needs.
fn split_hits_per_protein(hits: Vec<HitRecord>) -> std::collections::HashMap<String, Vec<HitRecord>> {
    let mut by_protein: std::collections::HashMap<String, Vec<HitRecord>> = std::collections::HashMap::new();
    for hit in hits {
        by_protein.entry(hit.query_id.as_str().to_string()).or_default().push(hit);
    }
    by_protein
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpam_engine_domain::events::NoOpObserver;
    use dpam_engine_domain::ports::OUTPUT_WIDTH;
    use dpam_engine_domain::value_objects::{Layout, ResidueRange};
    use std::path::PathBuf;
    use std::time::Duration;

    fn fake_hit(query: &ProteinId) -> HitRecord {
        HitRecord {
            query_id: query.clone(),
            template_id: "t1".to_string(),
            identity: 42.0,
            alignment_length: 10,
            mismatches: 0,
            gap_opens: 0,
            query_start: 1,
            query_end: 10,
            template_start: 1,
            template_end: 10,
            e_value: 1e-10,
            bit_score: 120.0,
        }
    }

    struct FakeSequenceProfileSearch;

    #[async_trait::async_trait]
    impl SequenceProfileSearchAdapter for FakeSequenceProfileSearch {
        async fn check_availability(&self) -> bool {
            true
        }

        async fn build_msa(&self, _fasta: &Path, work_dir: &Path) -> Result<PathBuf, DpamError> {
            let path = work_dir.join("query.a3m");
            std::fs::write(&path, b">query\nAAAA\n").map_err(DpamError::from)?;
            Ok(path)
        }

        async fn build_profile(&self, _msa: &Path, work_dir: &Path) -> Result<PathBuf, DpamError> {
            let path = work_dir.join("query.hhm");
            std::fs::write(&path, b"HHM\n").map_err(DpamError::from)?;
            Ok(path)
        }

        async fn search(&self, _profile: &Path, _db: &Path, _work_dir: &Path) -> Result<Vec<HitRecord>, DpamError> {
            Ok(vec![])
        }
    }

    struct FakeStructureSearch {
        proteins: Vec<ProteinId>,
    }

    #[async_trait::async_trait]
    impl StructureSearchAdapter for FakeStructureSearch {
        async fn check_availability(&self) -> bool {
            true
        }

        async fn createdb(&self, _structures: &[PathBuf], work_dir: &Path) -> Result<PathBuf, DpamError> {
            Ok(work_dir.join("structure_db"))
        }

        async fn search(&self, _query_db: &Path, _reference_db: &Path, work_dir: &Path) -> Result<PathBuf, DpamError> {
            Ok(work_dir.join("aln_db"))
        }

        async fn convertalis(&self, _alignment_db: &Path, _work_dir: &Path) -> Result<Vec<HitRecord>, DpamError> {
            Ok(self.proteins.iter().map(fake_hit).collect())
        }

        async fn easy_search(&self, _structure: &Path, _reference_db: &Path, _work_dir: &Path) -> Result<Vec<HitRecord>, DpamError> {
            Ok(vec![])
        }
    }

    struct FakePairwiseAlignment;

    #[async_trait::async_trait]
    impl PairwiseAlignmentAdapter for FakePairwiseAlignment {
        async fn check_availability(&self) -> bool {
            true
        }

        async fn align_one(&self, _query: &Path, _template: &Path, _work_dir: &Path) -> Result<StructuralEquivalence, DpamError> {
            Ok(StructuralEquivalence {
                template_id: "t1".to_string(),
                z_score: 9.5,
                query_ranges: vec![ResidueRange { start: 1, end: 10 }],
                template_ranges: vec![ResidueRange { start: 1, end: 10 }],
            })
        }
    }

    struct FakeSecondaryStructure;

    #[async_trait::async_trait]
    impl SecondaryStructureAdapter for FakeSecondaryStructure {
        async fn check_availability(&self) -> bool {
            true
        }

        async fn assign(&self, _structure: &Path, work_dir: &Path) -> Result<PathBuf, DpamError> {
            let path = work_dir.join("secondary_structure.dssp");
            std::fs::write(&path, b"  #  RESIDUE AA STRUCTURE\n").map_err(DpamError::from)?;
            Ok(path)
        }
    }

    struct FakeNeuralNet;
    struct FakeNeuralNetHandle;

    #[async_trait::async_trait]
    impl NeuralNetAdapter for FakeNeuralNet {
        async fn check_availability(&self) -> bool {
            true
        }

        async fn open(&self, _model_path: &Path) -> Result<Box<dyn NeuralNetHandle>, DpamError> {
            Ok(Box::new(FakeNeuralNetHandle))
        }
    }

    #[async_trait::async_trait]
    impl NeuralNetHandle for FakeNeuralNetHandle {
        async fn predict(&self, _features: &[f32], n_rows: usize) -> Result<Vec<f32>, DpamError> {
            Ok(vec![0.5; n_rows * OUTPUT_WIDTH])
        }

        async fn close(&self) -> Result<(), DpamError> {
            Ok(())
        }
    }

    fn build_runner(working_root: &Path, proteins: &[ProteinId]) -> BatchRunner {
        let resolver = PathResolver::new(working_root.to_path_buf(), Layout::Flat);
        let store: Box<dyn StateStore> = Box::new(
            crate::infrastructure::FileStateStore::open(working_root).expect("open state store"),
        );
        let scratch = ScratchManager::new(None, working_root).expect("scratch manager");
        let cpu_pool = WorkerPool::cpu_bound(2).expect("cpu pool");
        let io_pool = WorkerPool::io_bound(2, 2).expect("io pool");
        let coordinator = dpam_engine_bootstrap::shutdown::ShutdownCoordinator::new(Duration::from_secs(5));

        BatchRunner::new(
            resolver,
            store,
            scratch,
            cpu_pool,
            io_pool,
            Arc::new(FakeSequenceProfileSearch),
            Arc::new(FakeStructureSearch { proteins: proteins.to_vec() }),
            Arc::new(FakePairwiseAlignment),
            Arc::new(FakeSecondaryStructure),
            Arc::new(FakeNeuralNet),
            Arc::new(NoOpObserver),
            coordinator.token(),
        )
    }

    #[tokio::test]
    async fn fresh_run_completes_every_step_for_every_protein() {
        let working_root = tempfile::tempdir().unwrap();
        let proteins = vec![ProteinId::new("p1").unwrap(), ProteinId::new("p2").unwrap()];
        let mut runner = build_runner(working_root.path(), &proteins);

        let summary = runner.run(&proteins).await.expect("batch run succeeds");

        assert_eq!(summary.failed_pairs, 0);
        // 23 real steps per protein (24 minus the no-op step-14 alias).
        assert_eq!(summary.completed_pairs, proteins.len() * 23);
        for (_, completed, failed) in &summary.per_protein {
            assert!(failed.is_empty());
            assert_eq!(completed.len(), 23);
            assert!(!completed.contains(&14));
        }
    }

    #[tokio::test]
    async fn placeholder_artifacts_for_numerics_out_of_scope_steps_are_non_empty() {
        let working_root = tempfile::tempdir().unwrap();
        let proteins = vec![ProteinId::new("p1").unwrap()];
        let mut runner = build_runner(working_root.path(), &proteins);
        runner.run(&proteins).await.expect("batch run succeeds");

        let resolver = PathResolver::new(working_root.path().to_path_buf(), Layout::Flat);
        let protein = &proteins[0];
        for n in [1u8, 10].into_iter().chain(15..=24) {
            let step = StepId::new(n).unwrap();
            let def = lookup(&step_registry(), step);
            for kind in &def.outputs {
                let path = resolver.artifact_path(protein, step, kind);
                let bytes = std::fs::read(&path).unwrap_or_else(|e| panic!("reading {path:?}: {e}"));
                assert!(!bytes.is_empty(), "step {n} artifact {path:?} is empty");
            }
        }
    }

    #[tokio::test]
    async fn step_24s_integrated_domains_artifact_is_mirrored_to_results_and_root() {
        let working_root = tempfile::tempdir().unwrap();
        let proteins = vec![ProteinId::new("p1").unwrap()];
        let mut runner = build_runner(working_root.path(), &proteins);
        runner.run(&proteins).await.expect("batch run succeeds");

        let results_path = working_root.path().join("results").join("p1.domains");
        let bytes = std::fs::read(&results_path).expect("results/ copy of the final artifact exists");
        assert!(!bytes.is_empty());

        // Flat layout already places the per-step artifact at the working
        // root, so the mirror and the per-step copy are the same file.
        let root_path = working_root.path().join("p1.domains");
        assert_eq!(std::fs::read(&root_path).expect("root copy of the final artifact exists"), bytes);
    }

    #[tokio::test]
    async fn resuming_a_batch_skips_already_completed_steps() {
        let working_root = tempfile::tempdir().unwrap();
        let proteins = vec![ProteinId::new("p1").unwrap()];

        {
            let mut runner = build_runner(working_root.path(), &proteins);
            runner.run(&proteins).await.expect("first run succeeds");
        }

        let mut resumed = build_runner(working_root.path(), &proteins);
        let summary = resumed.run(&proteins).await.expect("resumed run succeeds");
        assert_eq!(summary.completed_pairs, 23);
    }

    #[tokio::test]
    async fn cancelling_before_run_aborts_with_cancelled_error() {
        let working_root = tempfile::tempdir().unwrap();
        let proteins = vec![ProteinId::new("p1").unwrap()];
        let resolver = PathResolver::new(working_root.path().to_path_buf(), Layout::Flat);
        let store: Box<dyn StateStore> =
            Box::new(crate::infrastructure::FileStateStore::open(working_root.path()).expect("open state store"));
        let scratch = ScratchManager::new(None, working_root.path()).expect("scratch manager");
        let cpu_pool = WorkerPool::cpu_bound(1).expect("cpu pool");
        let io_pool = WorkerPool::io_bound(1, 1).expect("io pool");
        let coordinator = dpam_engine_bootstrap::shutdown::ShutdownCoordinator::new(Duration::from_secs(5));
        coordinator.initiate_shutdown();

        let mut runner = BatchRunner::new(
            resolver,
            store,
            scratch,
            cpu_pool,
            io_pool,
            Arc::new(FakeSequenceProfileSearch),
            Arc::new(FakeStructureSearch { proteins: proteins.clone() }),
            Arc::new(FakePairwiseAlignment),
            Arc::new(FakeSecondaryStructure),
            Arc::new(FakeNeuralNet),
            Arc::new(NoOpObserver),
            coordinator.token(),
        );

        let result = runner.run(&proteins).await;
        assert!(matches!(result, Err(DpamError::Cancelled)));
    }

    #[test]
    fn pad_to_fixed_batch_leaves_full_batches_untouched() {
        let rows = NN_FIXED_BATCH_SIZE;
        let features = vec![1.0f32; rows * FEATURE_WIDTH];
        let (padded, n_rows) = pad_to_fixed_batch(&features, rows);
        assert_eq!(n_rows, rows);
        assert_eq!(padded.len(), features.len());
    }

    #[test]
    fn pad_to_fixed_batch_cycles_rows_up_to_the_fixed_size() {
        let n_actual_rows = 3;
        let mut features = Vec::with_capacity(n_actual_rows * FEATURE_WIDTH);
        for row in 0..n_actual_rows {
            features.extend(std::iter::repeat(row as f32).take(FEATURE_WIDTH));
        }

        let (padded, n_rows) = pad_to_fixed_batch(&features, n_actual_rows);
        assert_eq!(n_rows, NN_FIXED_BATCH_SIZE);
        assert_eq!(padded.len(), NN_FIXED_BATCH_SIZE * FEATURE_WIDTH);
        // Row n_actual_rows (the first padded row) should repeat row 0.
        assert_eq!(&padded[n_actual_rows * FEATURE_WIDTH..(n_actual_rows + 1) * FEATURE_WIDTH], &features[0..FEATURE_WIDTH]);
    }

    #[test]
    fn pad_to_fixed_batch_handles_zero_rows() {
        let (padded, n_rows) = pad_to_fixed_batch(&[], 0);
        assert_eq!(n_rows, 0);
        assert!(padded.is_empty());
    }
}
