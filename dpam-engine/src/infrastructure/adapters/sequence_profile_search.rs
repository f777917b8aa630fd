// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! HH-suite-style sequence profile search adapter: MSA construction, profile
//! building, then a tabular database search.

use super::process_runner::{run_checked, RunOutput};
use super::tool_locator::ToolLocator;
use async_trait::async_trait;
use dpam_engine_domain::error::DpamError;
use dpam_engine_domain::ports::SequenceProfileSearchAdapter;
use dpam_engine_domain::value_objects::{HitRecord, ProteinId};
use std::path::{Path, PathBuf};

pub struct HhsuiteAdapter {
    msa_locator: ToolLocator,
    profile_locator: ToolLocator,
    search_locator: ToolLocator,
    explicit_override: Option<PathBuf>,
}

impl HhsuiteAdapter {
    pub fn new(explicit_override: Option<PathBuf>) -> Self {
        Self {
            msa_locator: ToolLocator::new("hhblits", "DPAM_HHBLITS_PATH", "/usr/local/hhsuite/bin"),
            profile_locator: ToolLocator::new("hhmake", "DPAM_HHMAKE_PATH", "/usr/local/hhsuite/bin"),
            search_locator: ToolLocator::new("hhsearch", "DPAM_HHSEARCH_PATH", "/usr/local/hhsuite/bin"),
            explicit_override,
        }
    }

    fn resolve(&self, locator: &ToolLocator) -> Result<PathBuf, DpamError> {
        locator.resolve(self.explicit_override.as_deref()).ok_or_else(|| DpamError::ToolMissing {
            tool: locator.exe_name().to_string(),
            reason: "not found via override, env var, canonical prefix, or PATH".to_string(),
        })
    }
}

#[async_trait]
impl SequenceProfileSearchAdapter for HhsuiteAdapter {
    async fn check_availability(&self) -> bool {
        self.resolve(&self.msa_locator).is_ok()
            && self.resolve(&self.profile_locator).is_ok()
            && self.resolve(&self.search_locator).is_ok()
    }

    async fn build_msa(&self, fasta: &Path, work_dir: &Path) -> Result<PathBuf, DpamError> {
        let exe = self.resolve(&self.msa_locator)?;
        let fasta = fasta.to_path_buf();
        let work_dir = work_dir.to_path_buf();
        let out_path = work_dir.join("query.a3m");

        tokio::task::spawn_blocking(move || {
            let fasta_arg = fasta.display().to_string();
            let out_arg = out_path.display().to_string();
            run_checked(
                "hhblits",
                &exe,
                &["-i", &fasta_arg, "-oa3m", &out_arg, "-n", "2", "-cpu", "1"],
                &work_dir,
            )?;
            Ok(out_path)
        })
        .await
        .map_err(|e| DpamError::InternalError(format!("hhblits task join error: {e}")))?
    }

    async fn build_profile(&self, msa: &Path, work_dir: &Path) -> Result<PathBuf, DpamError> {
        let exe = self.resolve(&self.profile_locator)?;
        let msa = msa.to_path_buf();
        let work_dir = work_dir.to_path_buf();
        let out_path = work_dir.join("query.hhm");

        tokio::task::spawn_blocking(move || {
            let msa_arg = msa.display().to_string();
            let out_arg = out_path.display().to_string();
            run_checked("hhmake", &exe, &["-i", &msa_arg, "-o", &out_arg], &work_dir)?;
            Ok(out_path)
        })
        .await
        .map_err(|e| DpamError::InternalError(format!("hhmake task join error: {e}")))?
    }

    async fn search(&self, profile: &Path, db: &Path, work_dir: &Path) -> Result<Vec<HitRecord>, DpamError> {
        let exe = self.resolve(&self.search_locator)?;
        let profile = profile.to_path_buf();
        let db = db.to_path_buf();
        let work_dir = work_dir.to_path_buf();
        let hits_path = work_dir.join("hits.tsv");

        let output = tokio::task::spawn_blocking(move || -> Result<RunOutput, DpamError> {
            let profile_arg = profile.display().to_string();
            let db_arg = db.display().to_string();
            let hits_arg = hits_path.display().to_string();
            run_checked(
                "hhsearch",
                &exe,
                &["-i", &profile_arg, "-d", &db_arg, "-blasttab", &hits_arg],
                &work_dir,
            )
        })
        .await
        .map_err(|e| DpamError::InternalError(format!("hhsearch task join error: {e}")))??;

        parse_tabular_hits(&output, &work_dir.join("hits.tsv"))
    }
}

/// Parse blast-tab-style 12-column output into `HitRecord`s. `_output` is
/// kept only so callers can surface its stderr tail on a parse failure.
fn parse_tabular_hits(_output: &RunOutput, hits_path: &Path) -> Result<Vec<HitRecord>, DpamError> {
    let text = std::fs::read_to_string(hits_path).map_err(|source| DpamError::ParseError {
        tool: "hhsearch".to_string(),
        reason: format!("could not read hit table {}: {source}", hits_path.display()),
    })?;

    text.lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .map(parse_hit_line)
        .collect()
}

fn parse_hit_line(line: &str) -> Result<HitRecord, DpamError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 12 {
        return Err(DpamError::ParseError {
            tool: "hhsearch".to_string(),
            reason: format!("expected 12 tab-separated columns, got {}: `{line}`", fields.len()),
        });
    }
    let field = |i: usize| -> &str { fields[i] };
    let parse_u32 = |i: usize, name: &str| -> Result<u32, DpamError> {
        field(i).parse().map_err(|_| DpamError::ParseError {
            tool: "hhsearch".to_string(),
            reason: format!("column {i} ({name}) is not an integer: `{}`", field(i)),
        })
    };
    let parse_f64 = |i: usize, name: &str| -> Result<f64, DpamError> {
        field(i).parse().map_err(|_| DpamError::ParseError {
            tool: "hhsearch".to_string(),
            reason: format!("column {i} ({name}) is not a number: `{}`", field(i)),
        })
    };

    Ok(HitRecord {
        query_id: ProteinId::new(field(0))?,
        template_id: field(1).to_string(),
        identity: parse_f64(2, "identity")?,
        alignment_length: parse_u32(3, "alignment_length")?,
        mismatches: parse_u32(4, "mismatches")?,
        gap_opens: parse_u32(5, "gap_opens")?,
        query_start: parse_u32(6, "query_start")?,
        query_end: parse_u32(7, "query_end")?,
        template_start: parse_u32(8, "template_start")?,
        template_end: parse_u32(9, "template_end")?,
        e_value: parse_f64(10, "e_value")?,
        bit_score: parse_f64(11, "bit_score")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_line() {
        let line = "p1\ttmpl1\t45.2\t120\t60\t2\t1\t120\t5\t124\t1e-20\t88.5";
        let hit = parse_hit_line(line).unwrap();
        assert_eq!(hit.query_id.as_str(), "p1");
        assert_eq!(hit.template_id, "tmpl1");
        assert_eq!(hit.alignment_length, 120);
        assert!((hit.e_value - 1e-20).abs() < 1e-30);
    }

    #[test]
    fn rejects_short_line() {
        let line = "p1\ttmpl1\t45.2";
        assert!(parse_hit_line(line).is_err());
    }

    #[test]
    fn rejects_non_numeric_column() {
        let line = "p1\ttmpl1\tnotanumber\t120\t60\t2\t1\t120\t5\t124\t1e-20\t88.5";
        assert!(parse_hit_line(line).is_err());
    }
}
