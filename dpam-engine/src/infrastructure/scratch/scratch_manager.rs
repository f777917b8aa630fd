// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Scratch-disk management.
//!
//! A single `dpam_<batch>/` root is selected once per batch run (an
//! explicit override, falling back to a canonical local temp location,
//! falling back to the system temp directory) and reused for every step.
//! Per-step work happens under a `ScratchScope`, an RAII guard returned by
//! `enter_step` that removes its directory on drop so a step's leftovers
//! never bleed into the next one's working set.

use dpam_engine_domain::error::DpamError;
use dpam_engine_domain::value_objects::StepId;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// A lazily populated, step-scoped scratch directory. Dropping it removes
/// the directory tree; callers that want to keep results must copy them
/// out to the batch's permanent artifact paths before the scope ends.
pub struct ScratchScope {
    path: PathBuf,
}

impl ScratchScope {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchScope {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to clean up scratch scope");
            }
        }
    }
}

pub struct ScratchManager {
    root: PathBuf,
}

impl ScratchManager {
    /// Select the batch's scratch root: `override_dir` if given, otherwise
    /// a `dpam_<uuid>` directory under the system temp directory. Falls
    /// back to the working root itself (with a warning) if neither location
    /// is writable — slower, but keeps the batch moving instead of aborting.
    pub fn new(override_dir: Option<PathBuf>, working_root: &Path) -> Result<Self, DpamError> {
        let base = override_dir.unwrap_or_else(std::env::temp_dir);
        let root = base.join(format!("dpam_{}", Uuid::new_v4()));

        match std::fs::create_dir_all(&root) {
            Ok(()) => Ok(Self { root }),
            Err(e) => {
                warn!(
                    attempted = %root.display(),
                    error = %e,
                    "scratch root not writable, degrading to a subdirectory of the working root"
                );
                let fallback = working_root.join(format!("_scratch_dpam_{}", Uuid::new_v4()));
                std::fs::create_dir_all(&fallback).map_err(|e| DpamError::ScratchExhausted {
                    path: fallback.clone(),
                    reason: e.to_string(),
                })?;
                Ok(Self { root: fallback })
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Idempotently populate a template cache entry: copy `source` into
    /// the scratch root under `name` via a `.tmp` staging file, then
    /// rename into place, so concurrent callers never observe a partial copy.
    pub fn ensure_template(&self, name: &str, source: &Path) -> Result<PathBuf, DpamError> {
        let dest = self.root.join(name);
        if dest.exists() {
            return Ok(dest);
        }

        let staging = self.root.join(format!("{name}.tmp.{}", Uuid::new_v4()));
        std::fs::copy(source, &staging).map_err(|e| DpamError::ScratchExhausted {
            path: staging.clone(),
            reason: e.to_string(),
        })?;
        std::fs::rename(&staging, &dest).map_err(|e| DpamError::ScratchExhausted {
            path: dest.clone(),
            reason: e.to_string(),
        })?;
        Ok(dest)
    }

    /// Enter a fresh scope for `step`. The directory is created eagerly;
    /// callers get a clean, empty working directory for the step's duration.
    pub fn enter_step(&self, step: StepId) -> Result<ScratchScope, DpamError> {
        let path = self.root.join(format!("step{:02}", step.resolve_alias().get()));
        std::fs::create_dir_all(&path).map_err(|e| DpamError::ScratchExhausted {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(ScratchScope { path })
    }
}

impl Drop for ScratchManager {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.root.display(), error = %e, "failed to clean up batch scratch root");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_step_creates_an_empty_directory() {
        let working_root = tempfile::tempdir().unwrap();
        let scratch_base = tempfile::tempdir().unwrap();
        let manager = ScratchManager::new(Some(scratch_base.path().to_path_buf()), working_root.path()).unwrap();

        let scope = manager.enter_step(StepId::new(5).unwrap()).unwrap();
        assert!(scope.path().is_dir());
        assert_eq!(std::fs::read_dir(scope.path()).unwrap().count(), 0);
    }

    #[test]
    fn scope_drop_removes_its_directory() {
        let working_root = tempfile::tempdir().unwrap();
        let scratch_base = tempfile::tempdir().unwrap();
        let manager = ScratchManager::new(Some(scratch_base.path().to_path_buf()), working_root.path()).unwrap();

        let path = {
            let scope = manager.enter_step(StepId::new(1).unwrap()).unwrap();
            scope.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn ensure_template_is_idempotent() {
        let working_root = tempfile::tempdir().unwrap();
        let scratch_base = tempfile::tempdir().unwrap();
        let manager = ScratchManager::new(Some(scratch_base.path().to_path_buf()), working_root.path()).unwrap();

        let source_dir = tempfile::tempdir().unwrap();
        let source = source_dir.path().join("template.db");
        std::fs::write(&source, b"template contents").unwrap();

        let first = manager.ensure_template("template.db", &source).unwrap();
        let second = manager.ensure_template("template.db", &source).unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), b"template contents");
    }

    #[test]
    fn manager_drop_removes_batch_root() {
        let working_root = tempfile::tempdir().unwrap();
        let scratch_base = tempfile::tempdir().unwrap();
        let root_path = {
            let manager = ScratchManager::new(Some(scratch_base.path().to_path_buf()), working_root.path()).unwrap();
            manager.root().to_path_buf()
        };
        assert!(!root_path.exists());
    }
}
