// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Dali-style pairwise structural alignment adapter.
//!
//! The backing tool truncates any input path over 80 characters with no
//! warning, silently misreading the structure file. The workaround is to
//! never hand it an absolute path: `query` and `template` are copied (or
//! symlinked) into `work_dir` under short names and the tool is invoked
//! with `work_dir` as its current directory, so every path it sees is a
//! bare filename.

use super::process_runner::run_checked;
use super::tool_locator::ToolLocator;
use async_trait::async_trait;
use dpam_engine_domain::error::DpamError;
use dpam_engine_domain::ports::PairwiseAlignmentAdapter;
use dpam_engine_domain::value_objects::{ResidueRange, StructuralEquivalence};
use std::path::{Path, PathBuf};

/// Hard limit enforced by the backing tool on any path it is given.
const MAX_TOOL_PATH_LEN: usize = 80;

pub struct DaliAdapter {
    locator: ToolLocator,
    explicit_override: Option<PathBuf>,
}

impl DaliAdapter {
    pub fn new(explicit_override: Option<PathBuf>) -> Self {
        Self {
            locator: ToolLocator::new("dali.pl", "DPAM_DALI_PATH", "/usr/local/dali/bin"),
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

/// Copy `source` into `work_dir` under a short, caller-relative name,
/// returning that bare name. Errors if even the short name would exceed
/// the tool's path limit (programmer error: caller picked a bad name).
fn stage_short_name(source: &Path, work_dir: &Path, short_name: &str) -> Result<String, DpamError> {
    if short_name.len() > MAX_TOOL_PATH_LEN {
        return Err(DpamError::InvariantViolation(format!(
            "staged name `{short_name}` itself exceeds the {MAX_TOOL_PATH_LEN}-character tool path limit"
        )));
    }
    let dest = work_dir.join(short_name);
    std::fs::copy(source, &dest).map_err(|source_err| DpamError::InputMissing {
        protein: short_name.to_string(),
        artifact: "structure".to_string(),
        reason: format!("could not stage {} into {}: {source_err}", source.display(), work_dir.display()),
    })?;
    Ok(short_name.to_string())
}

#[async_trait]
impl PairwiseAlignmentAdapter for DaliAdapter {
    async fn check_availability(&self) -> bool {
        self.resolve().is_ok()
    }

    async fn align_one(
        &self,
        query: &Path,
        template: &Path,
        work_dir: &Path,
    ) -> Result<StructuralEquivalence, DpamError> {
        let exe = self.resolve()?;
        let query = query.to_path_buf();
        let template = template.to_path_buf();
        let work_dir = work_dir.to_path_buf();
        let template_id = template
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "template".to_string());
        let out_path = work_dir.join("dali.out");

        let out_path_clone = out_path.clone();
        tokio::task::spawn_blocking(move || {
            let query_name = stage_short_name(&query, &work_dir, "q.pdb")?;
            let template_name = stage_short_name(&template, &work_dir, "t.pdb")?;
            let out_name = "dali.out";
            run_checked(
                "dali.pl",
                &exe,
                &["--query", &query_name, "--template", &template_name, "--out", out_name],
                &work_dir,
            )?;
            Ok(())
        })
        .await
        .map_err(|e| DpamError::InternalError(format!("dali.pl task join error: {e}")))??;

        parse_equivalence(&out_path_clone, &template_id)
    }
}

/// Parse a Dali-style summary section: a Z-score line followed by a block
/// of paired residue ranges, one pair per line, `qstart-qend tstart-tend`.
fn parse_equivalence(out_path: &Path, template_id: &str) -> Result<StructuralEquivalence, DpamError> {
    let text = std::fs::read_to_string(out_path).map_err(|source| DpamError::ParseError {
        tool: "dali.pl".to_string(),
        reason: format!("could not read alignment summary {}: {source}", out_path.display()),
    })?;

    let mut z_score = None;
    let mut query_ranges = Vec::new();
    let mut template_ranges = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Z-score:") {
            z_score = rest.trim().parse::<f64>().ok();
            continue;
        }
        if let Some((q, t)) = line.split_once(' ') {
            if let (Some(q_range), Some(t_range)) = (parse_range(q), parse_range(t)) {
                query_ranges.push(q_range);
                template_ranges.push(t_range);
            }
        }
    }

    let z_score = z_score.ok_or_else(|| DpamError::ParseError {
        tool: "dali.pl".to_string(),
        reason: format!("no Z-score line found in {}", out_path.display()),
    })?;

    let equiv = StructuralEquivalence {
        template_id: template_id.to_string(),
        z_score,
        query_ranges,
        template_ranges,
    };
    equiv.validate_equal_spans().map_err(|reason| DpamError::ParseError { tool: "dali.pl".to_string(), reason })?;
    Ok(equiv)
}

fn parse_range(field: &str) -> Option<ResidueRange> {
    let (start, end) = field.split_once('-')?;
    Some(ResidueRange {
        start: start.parse().ok()?,
        end: end.parse().ok()?,
    })
}
