// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! JSON dual-view state store: one `BatchState` file plus one
//! `ProteinState` file per protein. Writes are atomic (temp file in the
//! same directory, `sync_all`, then rename) so a crash mid-write never
//! leaves a torn file behind. Load reconciles the batch view against
//! whatever per-protein views are on disk, one-directional: a per-protein
//! record only fills gaps in the batch view, it never overrides an
//! existing batch opinion, since the batch view is the one future runs
//! actually schedule against.

use dpam_engine_domain::entities::{BatchState, ProteinState};
use dpam_engine_domain::error::DpamError;
use dpam_engine_domain::ports::StateStore;
use dpam_engine_domain::value_objects::{ProteinId, StepId};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Steps whose failure for a protein poisons every later step for that
/// protein: sequence profile search (step 4), structure search (step 6),
/// and pairwise structural alignment (step 9). A protein that can't be
/// searched or aligned has nothing for the domain-assembly steps to work
/// from, so there is no point scheduling them.
const CRITICAL_STEPS: [u8; 3] = [4, 6, 9];

pub struct FileStateStore {
    root: PathBuf,
    batch: BatchState,
    proteins: BTreeMap<String, ProteinState>,
}

impl FileStateStore {
    fn batch_path(root: &Path) -> PathBuf {
        root.join("_batch.state")
    }

    fn protein_path(root: &Path, protein: &str) -> PathBuf {
        root.join(format!(".{protein}.state"))
    }

    fn load_json<T: serde::de::DeserializeOwned + Default>(path: &Path) -> Result<T, DpamError> {
        match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| DpamError::StateIoError {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(DpamError::StateIoError { path: path.to_path_buf(), source: e }),
        }
    }

    /// Write `value` atomically: a temp file in the same directory as
    /// `path`, fsynced, then renamed over the destination.
    fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), DpamError> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| DpamError::StateIoError { path: path.to_path_buf(), source: e })?;
        let bytes = serde_json::to_vec_pretty(value)?;
        tmp.write_all(&bytes).map_err(|e| DpamError::StateIoError { path: path.to_path_buf(), source: e })?;
        tmp.as_file().sync_all().map_err(|e| DpamError::StateIoError { path: path.to_path_buf(), source: e })?;
        tmp.persist(path).map_err(|e| DpamError::StateIoError { path: path.to_path_buf(), source: e.error })?;
        Ok(())
    }

    fn discover_protein_state_files(root: &Path) -> Result<Vec<String>, DpamError> {
        let mut found = Vec::new();
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
            Err(e) => return Err(DpamError::StateIoError { path: root.to_path_buf(), source: e }),
        };
        for entry in entries {
            let entry = entry.map_err(|e| DpamError::StateIoError { path: root.to_path_buf(), source: e })?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(stripped) = name.strip_prefix('.').and_then(|s| s.strip_suffix(".state")) {
                if !stripped.is_empty() {
                    found.push(stripped.to_string());
                }
            }
        }
        Ok(found)
    }

    fn persist_protein(&self, protein: &str) -> Result<(), DpamError> {
        let state = self.proteins.get(protein).expect("caller guarantees protein is tracked");
        Self::write_json_atomic(&Self::protein_path(&self.root, protein), state)
    }

    fn persist_batch(&self) -> Result<(), DpamError> {
        Self::write_json_atomic(&Self::batch_path(&self.root), &self.batch)
    }

    fn upstream_critical_failure(&self, step: StepId, protein: &ProteinId) -> bool {
        let target = step.resolve_alias().get();
        CRITICAL_STEPS
            .iter()
            .filter(|&&critical| critical < target)
            .any(|&critical| {
                StepId::new(critical)
                    .map(|s| self.has_failed(s, protein))
                    .unwrap_or(false)
            })
    }
}

impl StateStore for FileStateStore {
    fn open(working_root: &Path) -> Result<Self, DpamError> {
        std::fs::create_dir_all(working_root).map_err(|e| DpamError::StateIoError { path: working_root.to_path_buf(), source: e })?;

        let mut batch: BatchState = Self::load_json(&Self::batch_path(working_root))?;

        let mut proteins = BTreeMap::new();
        for name in Self::discover_protein_state_files(working_root)? {
            let state: ProteinState = Self::load_json(&Self::protein_path(working_root, &name))?;
            if let Ok(protein_id) = ProteinId::new(&name) {
                batch.reconcile_from_protein(&protein_id, &state);
            }
            proteins.insert(name, state);
        }

        let mut store = Self { root: working_root.to_path_buf(), batch, proteins };
        store.persist_batch()?;
        Ok(store)
    }

    fn pending_for(&self, step: StepId, candidates: &[ProteinId]) -> Vec<ProteinId> {
        candidates
            .iter()
            .filter(|protein| {
                !self.is_complete(step, protein) && !self.has_failed(step, protein) && !self.upstream_critical_failure(step, protein)
            })
            .cloned()
            .collect()
    }

    fn completed_steps(&self, protein: &ProteinId) -> BTreeSet<u8> {
        self.proteins
            .get(protein.as_str())
            .map(|state| state.completed_steps().collect())
            .unwrap_or_default()
    }

    fn is_complete(&self, step: StepId, protein: &ProteinId) -> bool {
        self.proteins.get(protein.as_str()).is_some_and(|state| state.is_complete(step))
    }

    fn has_failed(&self, step: StepId, protein: &ProteinId) -> bool {
        self.proteins.get(protein.as_str()).is_some_and(|state| state.has_failed(step))
    }

    fn mark_complete(&mut self, step: StepId, protein: &ProteinId) -> Result<(), DpamError> {
        let state = self.proteins.entry(protein.as_str().to_string()).or_default();
        state.mark_complete(step);
        self.persist_protein(protein.as_str())?;

        self.batch.set_outcome(step, protein, dpam_engine_domain::entities::Outcome::Complete);
        self.persist_batch()
    }

    fn mark_failed(&mut self, step: StepId, protein: &ProteinId, reason: &str) -> Result<(), DpamError> {
        let state = self.proteins.entry(protein.as_str().to_string()).or_default();
        state.mark_failed(step, reason);
        self.persist_protein(protein.as_str())?;

        self.batch.set_outcome(step, protein, dpam_engine_domain::entities::Outcome::Failed);
        self.persist_batch()
    }

    fn summary(&self) -> Vec<(ProteinId, BTreeSet<u8>, Vec<(u8, String)>)> {
        self.proteins
            .iter()
            .filter_map(|(name, state)| {
                let protein = ProteinId::new(name).ok()?;
                let completed = state.completed_steps().collect();
                let failed = state.failed_steps().map(|(s, r)| (s, r.to_string())).collect();
                Some((protein, completed, failed))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_complete_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let protein = ProteinId::new("p1").unwrap();
        let step = StepId::new(2).unwrap();

        {
            let mut store = FileStateStore::open(dir.path()).unwrap();
            store.mark_complete(step, &protein).unwrap();
        }

        let reopened = FileStateStore::open(dir.path()).unwrap();
        assert!(reopened.is_complete(step, &protein));
    }

    #[test]
    fn pending_for_excludes_complete_and_failed() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStateStore::open(dir.path()).unwrap();
        let p1 = ProteinId::new("p1").unwrap();
        let p2 = ProteinId::new("p2").unwrap();
        let p3 = ProteinId::new("p3").unwrap();
        let step = StepId::new(2).unwrap();

        store.mark_complete(step, &p1).unwrap();
        store.mark_failed(step, &p2, "boom").unwrap();

        let pending = store.pending_for(step, &[p1, p2, p3.clone()]);
        assert_eq!(pending, vec![p3]);
    }

    #[test]
    fn critical_step_failure_skips_downstream_steps() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStateStore::open(dir.path()).unwrap();
        let protein = ProteinId::new("p1").unwrap();

        // step 6 (foldseek_search) is a critical step.
        store.mark_failed(StepId::new(6).unwrap(), &protein, "no hits").unwrap();

        let downstream = StepId::new(8).unwrap();
        let pending = store.pending_for(downstream, &[protein]);
        assert!(pending.is_empty());
    }

    #[test]
    fn resume_reconciles_batch_view_from_protein_files() {
        let dir = tempfile::tempdir().unwrap();
        let protein = ProteinId::new("p1").unwrap();
        let step = StepId::new(1).unwrap();

        {
            let mut store = FileStateStore::open(dir.path()).unwrap();
            store.mark_complete(step, &protein).unwrap();
        }
        // Simulate a crash that lost the batch file but kept the per-protein file.
        std::fs::remove_file(FileStateStore::batch_path(dir.path())).unwrap();

        let reopened = FileStateStore::open(dir.path()).unwrap();
        assert!(reopened.is_complete(step, &protein));
        assert!(reopened.batch.is_complete(step, &protein));
    }

    #[test]
    fn unrelated_files_in_working_root_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p1.pdb"), b"ATOM ...").unwrap();
        let store = FileStateStore::open(dir.path()).unwrap();
        assert!(store.summary().is_empty());
    }
}
