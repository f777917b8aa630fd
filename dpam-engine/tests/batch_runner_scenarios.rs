// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end `BatchRunner` scenarios that exercise more than one
//! component at once: critical-step failure propagation, layout
//! auto-detection on resume, and scratch cleanup after a batch-fatal
//! abort. Single-component behavior (state store reconciliation, scratch
//! scope `Drop`, step registry aliasing) already has focused unit tests
//! next to the code it covers.

use dpam_engine::infrastructure::adapters::{DaliAdapter, DsspAdapter, ModelServerAdapter};
use dpam_engine::{BatchRunner, FileStateStore, PathResolver, ScratchManager, WorkerPool};
use dpam_engine_domain::error::DpamError;
use dpam_engine_domain::events::NoOpObserver;
use dpam_engine_domain::ports::{
    NeuralNetAdapter, NeuralNetHandle, OUTPUT_WIDTH, PairwiseAlignmentAdapter, SecondaryStructureAdapter,
    SequenceProfileSearchAdapter, StateStore, StructureSearchAdapter,
};
use dpam_engine_domain::value_objects::{HitRecord, Layout, ProteinId, StructuralEquivalence};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct FakeSequenceProfileSearch {
    fail_for: Option<ProteinId>,
}

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

    async fn search(&self, profile: &Path, _db: &Path, _work_dir: &Path) -> Result<Vec<HitRecord>, DpamError> {
        if let Some(target) = &self.fail_for {
            if profile.to_string_lossy().contains(target.as_str()) {
                return Err(DpamError::ToolFailed {
                    tool: "hhsearch".to_string(),
                    exit_status: "1".to_string(),
                    stderr_tail: "simulated search failure".to_string(),
                });
            }
        }
        Ok(vec![])
    }
}

struct FakeStructureSearch {
    proteins: Vec<ProteinId>,
}

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
            query_ranges: vec![],
            template_ranges: vec![],
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

struct FakeNeuralNet {
    opens: Arc<AtomicUsize>,
}

struct FakeNeuralNetHandle;

#[async_trait::async_trait]
impl NeuralNetAdapter for FakeNeuralNet {
    async fn check_availability(&self) -> bool {
        true
    }

    async fn open(&self, _model_path: &Path) -> Result<Box<dyn NeuralNetHandle>, DpamError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
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

#[allow(clippy::too_many_arguments)]
fn build_runner(
    working_root: &Path,
    layout: Layout,
    proteins: &[ProteinId],
    fail_profile_search_for: Option<ProteinId>,
) -> BatchRunner {
    let resolver = PathResolver::new(working_root.to_path_buf(), layout);
    let store: Box<dyn StateStore> = Box::new(FileStateStore::open(working_root).expect("open state store"));
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
        Arc::new(FakeSequenceProfileSearch { fail_for: fail_profile_search_for }),
        Arc::new(FakeStructureSearch { proteins: proteins.to_vec() }),
        Arc::new(FakePairwiseAlignment),
        Arc::new(FakeSecondaryStructure),
        Arc::new(FakeNeuralNet { opens: Arc::new(AtomicUsize::new(0)) }),
        Arc::new(NoOpObserver),
        coordinator.token(),
    )
}

/// Real adapter constructors should accept `None` overrides without
/// panicking even when the underlying executables are not installed; the
/// missing-tool case is only supposed to surface once a step with pending
/// work actually probes `check_availability`.
#[test]
fn real_adapters_construct_without_touching_the_filesystem() {
    let _ = DaliAdapter::new(None);
    let _ = DsspAdapter::new(None);
    let _ = ModelServerAdapter::new(None);
}

#[tokio::test]
async fn a_critical_step_failure_poisons_only_that_proteins_downstream_steps() {
    let working_root = tempfile::tempdir().unwrap();
    let healthy = ProteinId::new("healthy").unwrap();
    let doomed = ProteinId::new("doomed").unwrap();
    let proteins = vec![healthy.clone(), doomed.clone()];

    let mut runner = build_runner(working_root.path(), Layout::Flat, &proteins, Some(doomed.clone()));
    let summary = runner.run(&proteins).await.expect("batch run completes despite a per-protein failure");

    assert_eq!(summary.failed_pairs, 1);

    let healthy_entry = summary.per_protein.iter().find(|(p, _, _)| p == &healthy).unwrap();
    assert!(healthy_entry.2.is_empty(), "the healthy protein should have no failures");
    assert_eq!(healthy_entry.1.len(), 23, "the healthy protein should finish every real step");

    let doomed_entry = summary.per_protein.iter().find(|(p, _, _)| p == &doomed).unwrap();
    assert_eq!(doomed_entry.2.len(), 1, "only step 4 itself should be recorded as failed");
    assert_eq!(doomed_entry.2[0].0, 4);
    // Steps 5 and onward depend on step 4 (directly or transitively) and
    // must never appear as completed for the doomed protein.
    for step in 5..=24u8 {
        assert!(!doomed_entry.1.contains(&step), "step {step} should have been skipped for the doomed protein");
    }
}

#[tokio::test]
async fn resuming_without_a_layout_override_auto_detects_the_original_layout() {
    let working_root = tempfile::tempdir().unwrap();
    let proteins = vec![ProteinId::new("p1").unwrap()];

    {
        let mut runner = build_runner(working_root.path(), Layout::Sharded, &proteins, None);
        runner.run(&proteins).await.expect("first run succeeds under sharded layout");
    }

    let detected = PathResolver::detect_layout(working_root.path());
    assert_eq!(detected, Layout::Sharded);

    let mut resumed = build_runner(working_root.path(), detected, &proteins, None);
    let summary = resumed.run(&proteins).await.expect("resumed run succeeds under the detected layout");
    assert_eq!(summary.completed_pairs, 23);
    assert_eq!(summary.failed_pairs, 0);
}

#[tokio::test]
async fn scratch_scopes_are_removed_even_after_a_step_records_failures() {
    let working_root = tempfile::tempdir().unwrap();
    let scratch_base = tempfile::tempdir().unwrap();
    let doomed = ProteinId::new("doomed").unwrap();
    let proteins = vec![doomed.clone()];

    let resolver = PathResolver::new(working_root.path().to_path_buf(), Layout::Flat);
    let store: Box<dyn StateStore> = Box::new(FileStateStore::open(working_root.path()).expect("open state store"));
    let scratch = ScratchManager::new(Some(scratch_base.path().to_path_buf()), working_root.path()).expect("scratch manager");
    let scratch_root = scratch.root().to_path_buf();
    let cpu_pool = WorkerPool::cpu_bound(2).expect("cpu pool");
    let io_pool = WorkerPool::io_bound(2, 2).expect("io pool");
    let coordinator = dpam_engine_bootstrap::shutdown::ShutdownCoordinator::new(Duration::from_secs(5));

    let mut runner = BatchRunner::new(
        resolver,
        store,
        scratch,
        cpu_pool,
        io_pool,
        Arc::new(FakeSequenceProfileSearch { fail_for: Some(doomed.clone()) }),
        Arc::new(FakeStructureSearch { proteins: proteins.clone() }),
        Arc::new(FakePairwiseAlignment),
        Arc::new(FakeSecondaryStructure),
        Arc::new(FakeNeuralNet { opens: Arc::new(AtomicUsize::new(0)) }),
        Arc::new(NoOpObserver),
        coordinator.token(),
    );

    runner.run(&proteins).await.expect("batch run completes despite a per-protein failure");

    // Each step's scratch scope is dropped at the end of `run_step`
    // regardless of per-protein outcome, so by the time the run returns
    // (the scratch manager itself is still alive, held by `runner`) no
    // per-step subdirectory should remain under the batch scratch root.
    let leftover: Vec<_> = std::fs::read_dir(&scratch_root).unwrap().filter_map(|e| e.ok()).collect();
    assert!(leftover.is_empty(), "no per-step scratch directories should remain after the run finishes");

    drop(runner);
}
