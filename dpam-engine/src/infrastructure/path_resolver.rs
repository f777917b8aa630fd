// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Path resolver: a pure, total function set mapping `(root, layout,
//! protein, step, artifact kind)` to an absolute path. No I/O, no
//! directory creation — callers materialize parent directories on first
//! write. `PathResolver` is constructed once per batch run with a fixed
//! `(root, layout)` and is cheap to clone, a small value-object-style
//! service handle.

use crate::application::step_registry::{lookup, step_registry};
use dpam_engine_domain::value_objects::{ArtifactKind, Layout, ProteinId, StepId};
use std::path::{Path, PathBuf};

/// The file checked to auto-detect sharded layout on resume.
const SHARDED_PROBE_DIR: &str = "step01_prepare";

#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    layout: Layout,
    registry: Vec<dpam_engine_domain::entities::StepDefinition>,
}

impl PathResolver {
    pub fn new(root: PathBuf, layout: Layout) -> Self {
        Self {
            root,
            layout,
            registry: step_registry(),
        }
    }

    /// Probe an existing working root for a sharded-layout marker. Used on
    /// resume when no explicit layout override was given.
    pub fn detect_layout(root: &Path) -> Layout {
        if root.join(SHARDED_PROBE_DIR).is_dir() {
            Layout::Sharded
        } else {
            Layout::Flat
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn raw_structure_path(&self, protein: &ProteinId, ext: &str) -> PathBuf {
        self.root.join(format!("{}.{}", protein.as_str(), ext))
    }

    pub fn raw_confidence_path(&self, protein: &ProteinId, ext: &str) -> PathBuf {
        self.root.join(format!("{}.{}", protein.as_str(), ext))
    }

    pub fn protein_state_path(&self, protein: &ProteinId) -> PathBuf {
        self.root.join(format!(".{}.state", protein.as_str()))
    }

    pub fn batch_state_path(&self) -> PathBuf {
        self.root.join("_batch.state")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join("results")
    }

    /// The per-batch scratch subdirectory name (not a full path — the
    /// scratch manager resolves this against its own chosen root, which
    /// may not be `self.root` at all).
    pub fn scratch_dir_name(&self) -> &'static str {
        "_batch"
    }

    fn step_dir(&self, step: StepId) -> PathBuf {
        match self.layout {
            Layout::Flat => self.root.clone(),
            Layout::Sharded => {
                let def = lookup(&self.registry, step);
                self.root.join(def.dir_name())
            }
        }
    }

    /// The path for one protein's artifact of a given kind at a given step.
    pub fn artifact_path(&self, protein: &ProteinId, step: StepId, kind: &ArtifactKind) -> PathBuf {
        let dir = self.step_dir(step);
        let file_name = format!("{}.{}", protein.as_str(), kind.file_stem());
        dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_layout_collapses_to_root() {
        let resolver = PathResolver::new(PathBuf::from("/work"), Layout::Flat);
        let protein = ProteinId::new("p1").unwrap();
        let path = resolver.artifact_path(&protein, StepId::new(2).unwrap(), &ArtifactKind::Msa);
        assert_eq!(path, PathBuf::from("/work/p1.msa"));
    }

    #[test]
    fn sharded_layout_uses_per_step_directory() {
        let resolver = PathResolver::new(PathBuf::from("/work"), Layout::Sharded);
        let protein = ProteinId::new("p1").unwrap();
        let path = resolver.artifact_path(&protein, StepId::new(2).unwrap(), &ArtifactKind::Msa);
        assert_eq!(path, PathBuf::from("/work/step02_hhsearch_msa/p1.msa"));
    }

    #[test]
    fn step_14_resolves_to_step_13s_directory() {
        let resolver = PathResolver::new(PathBuf::from("/work"), Layout::Sharded);
        let protein = ProteinId::new("p1").unwrap();
        let via_13 = resolver.artifact_path(&protein, StepId::new(13).unwrap(), &ArtifactKind::NnProbabilities);
        let via_14 = resolver.artifact_path(&protein, StepId::new(14).unwrap(), &ArtifactKind::NnProbabilities);
        assert_eq!(via_13, via_14);
    }

    #[test]
    fn state_and_raw_input_paths_are_layout_independent() {
        let sharded = PathResolver::new(PathBuf::from("/work"), Layout::Sharded);
        let flat = PathResolver::new(PathBuf::from("/work"), Layout::Flat);
        let protein = ProteinId::new("p1").unwrap();
        assert_eq!(sharded.protein_state_path(&protein), flat.protein_state_path(&protein));
        assert_eq!(sharded.batch_state_path(), flat.batch_state_path());
    }

    #[test]
    fn detect_layout_finds_sharded_marker() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(SHARDED_PROBE_DIR)).unwrap();
        assert_eq!(PathResolver::detect_layout(dir.path()), Layout::Sharded);
    }

    #[test]
    fn detect_layout_defaults_to_flat_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(PathResolver::detect_layout(dir.path()), Layout::Flat);
    }

    proptest::proptest! {
        #[test]
        fn artifact_path_is_total_for_every_declared_step(step_num in 1u8..=24) {
            let resolver = PathResolver::new(PathBuf::from("/work"), Layout::Sharded);
            let protein = ProteinId::new("p").unwrap();
            let step = StepId::new(step_num).unwrap();
            let def = lookup(&resolver.registry, step);
            for kind in def.outputs.iter().chain(def.inputs.iter()) {
                let _ = resolver.artifact_path(&protein, step, kind);
            }
        }
    }
}
