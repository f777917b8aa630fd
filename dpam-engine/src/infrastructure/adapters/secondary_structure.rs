// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! DSSP-style secondary-structure assignment adapter.

use super::process_runner::run_checked;
use super::tool_locator::ToolLocator;
use async_trait::async_trait;
use dpam_engine_domain::error::DpamError;
use dpam_engine_domain::ports::SecondaryStructureAdapter;
use std::path::{Path, PathBuf};

pub struct DsspAdapter {
    locator: ToolLocator,
    explicit_override: Option<PathBuf>,
}

impl DsspAdapter {
    pub fn new(explicit_override: Option<PathBuf>) -> Self {
        Self {
            locator: ToolLocator::new("mkdssp", "DPAM_DSSP_PATH", "/usr/local/dssp/bin"),
            explicit_override,
        }
    }

    fn resolve(&self) -> Result<PathBuf, DpamError> {
        self.locator.resolve(self.explicit_override.as_deref()).ok_or_else(|| DpamError::ToolMissing {
            tool: self.locator.exe_name().to_string(),
            reason: "not found via override, env var, canonical prefix, or PATH".to_string(),
        })
    }
}

#[async_trait]
impl SecondaryStructureAdapter for DsspAdapter {
    async fn check_availability(&self) -> bool {
        self.resolve().is_ok()
    }

    async fn assign(&self, structure: &Path, work_dir: &Path) -> Result<PathBuf, DpamError> {
        let exe = self.resolve()?;
        let structure = structure.to_path_buf();
        let work_dir = work_dir.to_path_buf();
        let out_path = work_dir.join("secondary_structure.dssp");

        let out_path_clone = out_path.clone();
        tokio::task::spawn_blocking(move || {
            let structure_arg = structure.display().to_string();
            let out_arg = out_path_clone.display().to_string();
            run_checked("mkdssp", &exe, &["--output-format", "dssp", &structure_arg, &out_arg], &work_dir)
        })
        .await
        .map_err(|e| DpamError::InternalError(format!("mkdssp task join error: {e}")))??;

        Ok(out_path)
    }
}
