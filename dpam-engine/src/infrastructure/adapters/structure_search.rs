// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Foldseek-style structure search adapter: `createdb`/`search`/`convertalis`
//! bulk primitives plus an `easy_search` convenience wrapper for the
//! per-protein (non-bulk-mode) path.

use super::process_runner::run_checked;
use super::tool_locator::ToolLocator;
use async_trait::async_trait;
use dpam_engine_domain::error::DpamError;
use dpam_engine_domain::ports::StructureSearchAdapter;
use dpam_engine_domain::value_objects::{HitRecord, ProteinId};
use std::path::{Path, PathBuf};

pub struct FoldseekAdapter {
    locator: ToolLocator,
    explicit_override: Option<PathBuf>,
}

impl FoldseekAdapter {
    pub fn new(explicit_override: Option<PathBuf>) -> Self {
        Self {
            locator: ToolLocator::new("foldseek", "DPAM_FOLDSEEK_PATH", "/usr/local/foldseek/bin"),
            explicit_override,
        }
    }

    fn resolve(&self) -> Result<PathBuf, DpamError> {
        self.locator.resolve(self.explicit_override.as_deref()).ok_or_else(|| DpamError::ToolMissing {
            tool: self.locator.exe_name().to_string(),
            reason: "not found via override, env var, canonical prefix, or PATH".to_string(),
        })
    }

    const TABULAR_COLUMNS: &'static str =
        "query,target,pident,alnlen,mismatch,gapopen,qstart,qend,tstart,tend,evalue,bits";
}

#[async_trait]
impl StructureSearchAdapter for FoldseekAdapter {
    async fn check_availability(&self) -> bool {
        self.resolve().is_ok()
    }

    async fn createdb(&self, structures: &[PathBuf], work_dir: &Path) -> Result<PathBuf, DpamError> {
        let exe = self.resolve()?;
        let structures = structures.to_vec();
        let work_dir = work_dir.to_path_buf();
        let db_path = work_dir.join("query_db");

        tokio::task::spawn_blocking(move || {
            let mut args: Vec<String> = vec!["createdb".to_string()];
            args.extend(structures.iter().map(|p| p.display().to_string()));
            args.push(db_path.display().to_string());
            let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
            run_checked("foldseek createdb", &exe, &arg_refs, &work_dir)?;
            Ok(db_path)
        })
        .await
        .map_err(|e| DpamError::InternalError(format!("foldseek createdb task join error: {e}")))?
    }

    async fn search(&self, query_db: &Path, reference_db: &Path, work_dir: &Path) -> Result<PathBuf, DpamError> {
        let exe = self.resolve()?;
        let query_db = query_db.to_path_buf();
        let reference_db = reference_db.to_path_buf();
        let work_dir = work_dir.to_path_buf();
        let aln_db = work_dir.join("aln_db");
        let tmp_dir = work_dir.join("tmp");

        tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&tmp_dir).map_err(|source| DpamError::ScratchExhausted {
                path: tmp_dir.clone(),
                reason: source.to_string(),
            })?;
            let query_arg = query_db.display().to_string();
            let reference_arg = reference_db.display().to_string();
            let aln_arg = aln_db.display().to_string();
            let tmp_arg = tmp_dir.display().to_string();
            run_checked(
                "foldseek search",
                &exe,
                &["search", &query_arg, &reference_arg, &aln_arg, &tmp_arg],
                &work_dir,
            )?;
            Ok(aln_db)
        })
        .await
        .map_err(|e| DpamError::InternalError(format!("foldseek search task join error: {e}")))?
    }

    async fn convertalis(&self, alignment_db: &Path, work_dir: &Path) -> Result<Vec<HitRecord>, DpamError> {
        let exe = self.resolve()?;
        let alignment_db = alignment_db.to_path_buf();
        let work_dir = work_dir.to_path_buf();
        let hits_path = work_dir.join("hits.tsv");

        tokio::task::spawn_blocking({
            let hits_path = hits_path.clone();
            move || {
                let aln_arg = alignment_db.display().to_string();
                let hits_arg = hits_path.display().to_string();
                run_checked(
                    "foldseek convertalis",
                    &exe,
                    &["convertalis", &aln_arg, &hits_arg, "--format-output", Self::TABULAR_COLUMNS],
                    &work_dir,
                )
            }
        })
        .await
        .map_err(|e| DpamError::InternalError(format!("foldseek convertalis task join error: {e}")))??;

        parse_tabular_hits(&hits_path)
    }

    async fn easy_search(
        &self,
        structure: &Path,
        reference_db: &Path,
        work_dir: &Path,
    ) -> Result<Vec<HitRecord>, DpamError> {
        let exe = self.resolve()?;
        let structure = structure.to_path_buf();
        let reference_db = reference_db.to_path_buf();
        let work_dir = work_dir.to_path_buf();
        let hits_path = work_dir.join("hits.tsv");
        let tmp_dir = work_dir.join("tmp");

        tokio::task::spawn_blocking({
            let hits_path = hits_path.clone();
            move || {
                std::fs::create_dir_all(&tmp_dir).map_err(|source| DpamError::ScratchExhausted {
                    path: tmp_dir.clone(),
                    reason: source.to_string(),
                })?;
                let structure_arg = structure.display().to_string();
                let reference_arg = reference_db.display().to_string();
                let hits_arg = hits_path.display().to_string();
                let tmp_arg = tmp_dir.display().to_string();
                run_checked(
                    "foldseek easy-search",
                    &exe,
                    &[
                        "easy-search",
                        &structure_arg,
                        &reference_arg,
                        &hits_arg,
                        &tmp_arg,
                        "--format-output",
                        Self::TABULAR_COLUMNS,
                    ],
                    &work_dir,
                )
            }
        })
        .await
        .map_err(|e| DpamError::InternalError(format!("foldseek easy-search task join error: {e}")))??;

        parse_tabular_hits(&hits_path)
    }
}

fn parse_tabular_hits(hits_path: &Path) -> Result<Vec<HitRecord>, DpamError> {
    let text = std::fs::read_to_string(hits_path).map_err(|source| DpamError::ParseError {
        tool: "foldseek".to_string(),
        reason: format!("could not read hit table {}: {source}", hits_path.display()),
    })?;

    text.lines().filter(|line| !line.trim().is_empty()).map(parse_hit_line).collect()
}

fn parse_hit_line(line: &str) -> Result<HitRecord, DpamError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 12 {
        return Err(DpamError::ParseError {
            tool: "foldseek".to_string(),
            reason: format!("expected 12 tab-separated columns, got {}: `{line}`", fields.len()),
        });
    }
    let field = |i: usize| -> &str { fields[i] };
    let parse_u32 = |i: usize, name: &str| -> Result<u32, DpamError> {
        field(i).parse().map_err(|_| DpamError::ParseError {
            tool: "foldseek".to_string(),
            reason: format!("column {i} ({name}) is not an integer: `{}`", field(i)),
        })
    };
    let parse_f64 = |i: usize, name: &str| -> Result<f64, DpamError> {
        field(i).parse().map_err(|_| DpamError::ParseError {
            tool: "foldseek".to_string(),
            reason: format!("column {i} ({name}) is not a number: `{}`", field(i)),
        })
    };

    Ok(HitRecord {
        query_id: ProteinId::new(field(0))?,
        template_id: field(1).to_string(),
        identity: parse_f64(2, "pident")?,
        alignment_length: parse_u32(3, "alnlen")?,
        mismatches: parse_u32(4, "mismatch")?,
        gap_opens: parse_u32(5, "gapopen")?,
        query_start: parse_u32(6, "qstart")?,
        query_end: parse_u32(7, "qend")?,
        template_start: parse_u32(8, "tstart")?,
        template_end: parse_u32(9, "tend")?,
        e_value: parse_f64(10, "evalue")?,
        bit_score: parse_f64(11, "bits")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_line() {
        let line = "p1\ttmpl9\t62.0\t200\t50\t1\t1\t200\t10\t209\t3e-45\t150.2";
        let hit = parse_hit_line(line).unwrap();
        assert_eq!(hit.query_id.as_str(), "p1");
        assert_eq!(hit.template_id, "tmpl9");
        assert_eq!(hit.alignment_length, 200);
    }

    #[test]
    fn rejects_malformed_line() {
        assert!(parse_hit_line("too\tfew\tcolumns").is_err());
    }
}
