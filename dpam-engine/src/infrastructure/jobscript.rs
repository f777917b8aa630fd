// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Job-script text generation.
//!
//! `gen-job-script` exists so an operator can paste the resulting shell
//! script into whatever submission system (Slurm, a cron entry, a plain
//! terminal) their site uses; this engine never submits anything itself.
//! The output is a plain `String` built with `format!`, not a templating
//! engine — a handful of interpolated flags doesn't justify the
//! dependency.

use std::path::Path;

pub struct JobScriptParams<'a> {
    pub protein_list_path: &'a Path,
    pub working_root: &'a Path,
    pub cpu_threads_override: Option<usize>,
    pub io_threads_override: Option<usize>,
}

/// Render the single-node shell script: environment activation (a
/// placeholder comment an operator customizes for their site) plus the
/// `dpam-engine run` invocation with every flag the batch needs.
pub fn render(params: &JobScriptParams<'_>) -> String {
    let mut script = String::new();
    script.push_str("#!/usr/bin/env bash\n");
    script.push_str("set -euo pipefail\n\n");
    script.push_str("# Activate the site's runtime environment for the external tools\n");
    script.push_str("# this batch depends on (hhsuite, foldseek, dali, dssp) before\n");
    script.push_str("# invoking the engine, e.g.:\n");
    script.push_str("#   module load hhsuite foldseek dali dssp\n\n");

    script.push_str("dpam-engine run \\\n");
    script.push_str(&format!("  --protein-list-path {} \\\n", shell_quote(params.protein_list_path)));
    script.push_str(&format!("  --working-root {}", shell_quote(params.working_root)));

    if let Some(cpu) = params.cpu_threads_override {
        script.push_str(&format!(" \\\n  --cpu-threads-override {cpu}"));
    }
    if let Some(io) = params.io_threads_override {
        script.push_str(&format!(" \\\n  --io-threads-override {io}"));
    }
    script.push('\n');
    script
}

fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', r"'\''"))
}
