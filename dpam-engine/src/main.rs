// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Composition root for the `dpam-engine` binary.
//!
//! Everything the application layer needs — the five external-tool
//! adapters, the state store, the scratch manager, the two worker pools,
//! and the cancellation token fed by the signal handler — is built here
//! and wired into a single `BatchRunner` through the domain's port
//! traits. `lib.rs` and everything under it never constructs its own
//! infrastructure; this is the one place that does.

use dpam_engine::application::TracingObserver;
use dpam_engine::infrastructure::adapters::{DaliAdapter, DsspAdapter, FoldseekAdapter, HhsuiteAdapter, ModelServerAdapter};
use dpam_engine::infrastructure::jobscript::{self, JobScriptParams};
use dpam_engine::{BatchRunner, FileStateStore, PathResolver, ScratchManager, WorkerPool};
use dpam_engine_bootstrap::shutdown::ShutdownCoordinator;
use dpam_engine_bootstrap::{config, exit_code, platform, signals, ValidatedCli, ValidatedCommand};
use dpam_engine_domain::error::DpamError;
use dpam_engine_domain::ports::StateStore;
use dpam_engine_domain::value_objects::{Layout, ProteinId};
use std::path::{Path, PathBuf};
use std::process::ExitCode as StdExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> StdExitCode {
    let cli = match dpam_engine_bootstrap::bootstrap_cli() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {e}");
            return StdExitCode::from(exit_code::ExitCode::UsageError);
        }
    };

    init_tracing(cli.verbose);

    let result = dispatch(cli).await;
    exit_code_for(&result)
}

fn init_tracing(verbose: bool) {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
        .finish();
    // Already-set is a no-op in tests that install their own subscriber.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Map a run result to a process exit code, giving `Cancelled` its own
/// signal-convention code instead of folding it into the generic fatal
/// path `exit_code::map_error_to_exit_code` uses for everything else.
fn exit_code_for(result: &Result<(), DpamError>) -> StdExitCode {
    match result {
        Ok(()) => StdExitCode::from(exit_code::ExitCode::Success),
        Err(DpamError::Cancelled) => StdExitCode::from(exit_code::ExitCode::Interrupted),
        Err(e) => StdExitCode::from(exit_code::map_error_to_exit_code(e)),
    }
}

async fn dispatch(cli: ValidatedCli) -> Result<(), DpamError> {
    let run_defaults = config::load_run_defaults(cli.config.as_deref())
        .map_err(|e| DpamError::InvalidConfiguration(format!("failed to load configuration: {e}")))?;

    match cli.command {
        ValidatedCommand::Run {
            protein_list_path,
            working_root,
            layout_override,
            cpu_threads_override,
            io_threads_override,
            scratch_root_override,
        } => {
            run_batch(RunBatchArgs {
                protein_list_path,
                working_root,
                layout_override: layout_override.or(run_defaults.layout),
                cpu_threads_override: cpu_threads_override.or(run_defaults.cpu_threads),
                io_threads_override: io_threads_override.or(run_defaults.io_threads),
                scratch_root_override: scratch_root_override.or(run_defaults.scratch_root),
            })
            .await
        }
        ValidatedCommand::Status { working_root } => print_status(&working_root),
        ValidatedCommand::GenJobScript {
            protein_list_path,
            working_root,
            cpu_threads_override,
            io_threads_override,
            output,
        } => gen_job_script(
            &protein_list_path,
            &working_root,
            cpu_threads_override.or(run_defaults.cpu_threads),
            io_threads_override.or(run_defaults.io_threads),
            output.as_deref(),
        ),
    }
}

struct RunBatchArgs {
    protein_list_path: PathBuf,
    working_root: PathBuf,
    layout_override: Option<String>,
    cpu_threads_override: Option<usize>,
    io_threads_override: Option<usize>,
    scratch_root_override: Option<PathBuf>,
}

async fn run_batch(args: RunBatchArgs) -> Result<(), DpamError> {
    let proteins = read_protein_list(&args.protein_list_path)?;
    tracing::info!(count = proteins.len(), "loaded protein list");

    let layout = match args.layout_override {
        Some(raw) => raw.parse::<Layout>().map_err(DpamError::InvalidConfiguration)?,
        None => PathResolver::detect_layout(&args.working_root),
    };
    let resolver = PathResolver::new(args.working_root.clone(), layout);
    let store: Box<dyn StateStore> = Box::new(FileStateStore::open(&args.working_root)?);
    let scratch = ScratchManager::new(args.scratch_root_override, &args.working_root)?;

    let cpu_count = platform::create_platform().cpu_count();
    let cpu_pool = WorkerPool::cpu_bound(args.cpu_threads_override.unwrap_or(cpu_count))?;
    let io_requested = args.io_threads_override.unwrap_or_else(|| (cpu_count * 4).min(64));
    let io_pool = WorkerPool::io_bound(io_requested, cpu_count)?;

    let coordinator = ShutdownCoordinator::default();
    signals::install(coordinator.clone());

    let mut runner = BatchRunner::new(
        resolver,
        store,
        scratch,
        cpu_pool,
        io_pool,
        Arc::new(HhsuiteAdapter::new(None)),
        Arc::new(FoldseekAdapter::new(None)),
        Arc::new(DaliAdapter::new(None)),
        Arc::new(DsspAdapter::new(None)),
        Arc::new(ModelServerAdapter::new(None)),
        Arc::new(TracingObserver),
        coordinator.token(),
    );

    let summary = runner.run(&proteins).await?;
    println!(
        "batch finished: {} completed step/protein pairs, {} failed",
        summary.completed_pairs, summary.failed_pairs
    );
    for (protein, completed, failed) in &summary.per_protein {
        if !failed.is_empty() {
            println!("  {protein}: {} steps complete, failed at {:?}", completed.len(), failed);
        }
    }
    Ok(())
}

fn print_status(working_root: &Path) -> Result<(), DpamError> {
    let store = FileStateStore::open(working_root)?;
    let summary = store.summary();
    if summary.is_empty() {
        println!("no recorded state under {}", working_root.display());
        return Ok(());
    }
    for (protein, completed, failed) in &summary {
        println!(
            "{protein}: {}/{} steps complete, {} failed",
            completed.len(),
            dpam_engine_domain::value_objects::STEP_COUNT,
            failed.len()
        );
        for (step, reason) in failed {
            println!("    step {step} failed: {reason}");
        }
    }
    Ok(())
}

fn gen_job_script(
    protein_list_path: &Path,
    working_root: &Path,
    cpu_threads_override: Option<usize>,
    io_threads_override: Option<usize>,
    output: Option<&Path>,
) -> Result<(), DpamError> {
    let params = JobScriptParams {
        protein_list_path,
        working_root,
        cpu_threads_override,
        io_threads_override,
    };
    let script = jobscript::render(&params);
    match output {
        Some(path) => std::fs::write(path, script).map_err(|source| DpamError::StateIoError { path: path.to_path_buf(), source }),
        None => {
            print!("{script}");
            Ok(())
        }
    }
}

/// Read a newline-delimited protein list: one identifier per line, blank
/// lines and `#`-prefixed comment lines ignored.
fn read_protein_list(path: &Path) -> Result<Vec<ProteinId>, DpamError> {
    let text = std::fs::read_to_string(path).map_err(|source| DpamError::StateIoError { path: path.to_path_buf(), source })?;
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ProteinId::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_protein_list_skips_blank_and_comment_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proteins.txt");
        std::fs::write(&path, "p1\n\n# a comment\np2\n  \np3\n").unwrap();

        let proteins = read_protein_list(&path).unwrap();
        let ids: Vec<&str> = proteins.iter().map(ProteinId::as_str).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn read_protein_list_rejects_invalid_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proteins.txt");
        std::fs::write(&path, "a/b\n").unwrap();
        assert!(read_protein_list(&path).is_err());
    }

    #[test]
    fn exit_code_maps_cancelled_to_interrupted() {
        let code = exit_code_for(&Err(DpamError::Cancelled));
        assert_eq!(format!("{code:?}"), format!("{:?}", StdExitCode::from(exit_code::ExitCode::Interrupted)));
    }

    #[test]
    fn exit_code_maps_success() {
        let code = exit_code_for(&Ok(()));
        assert_eq!(format!("{code:?}"), format!("{:?}", StdExitCode::from(exit_code::ExitCode::Success)));
    }
}
