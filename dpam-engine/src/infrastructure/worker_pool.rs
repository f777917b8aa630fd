// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Bounded worker pool dispatching units of work (one per pending protein,
//! or one per pending template for the pairwise-alignment fan-out) at a
//! caller-chosen width.
//!
//! Two dispatch strategies, splitting a CPU-bound `rayon::ThreadPool` from
//! a `tokio::sync::Semaphore`-gated spawn loop for I/O concurrency:
//!
//! - `cpu_bound`: one `rayon::ThreadPool` sized to `WorkerCount::cpu_bound`,
//!   used for steps whose dominant cost is CPU-bound external-process
//!   wall time at one unit per core.
//! - `io_bound`: a `tokio::sync::Semaphore` sized to a caller-requested
//!   `WorkerCount::io_bound`, used for the pairwise-alignment pooled fan-out
//!   where filesystem and process-spawn concurrency, not CPU, is the limit.
//!
//! Each unit of work is isolated: a panic or error in one unit never
//! aborts the others, and results come back paired with the input so the
//! caller can route per-unit failures into the state store. Cancellation
//! is checked before starting each not-yet-started unit; units already
//! running are allowed to finish (best-effort drain), matching the
//! runner's grace-period shutdown policy.

use dpam_engine_bootstrap::shutdown::CancellationToken;
use dpam_engine_domain::error::DpamError;
use dpam_engine_domain::value_objects::WorkerCount;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

enum Strategy {
    Cpu(Arc<rayon::ThreadPool>),
    Io(Arc<Semaphore>),
}

/// A bounded dispatcher over one step's pending units of work.
pub struct WorkerPool {
    strategy: Strategy,
    worker_count: WorkerCount,
}

impl WorkerPool {
    /// Default sizing: one worker per CPU core, backed by a dedicated
    /// `rayon::ThreadPool` so adapter calls that block on external
    /// processes never starve the pool the async runtime itself uses.
    pub fn cpu_bound(cpu_count: usize) -> Result<Self, DpamError> {
        let worker_count = WorkerCount::cpu_bound(cpu_count);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count.get())
            .thread_name(|i| format!("dpam-worker-cpu-{i}"))
            .build()
            .map_err(|e| DpamError::InternalError(format!("failed to build CPU worker pool: {e}")))?;
        Ok(Self {
            strategy: Strategy::Cpu(Arc::new(pool)),
            worker_count,
        })
    }

    /// I/O-bound override: up to 4x CPU count, capped at 64, for steps
    /// that fan out more units than there are cores because the unit
    /// itself spends most of its time blocked on process I/O rather than
    /// consuming a CPU.
    pub fn io_bound(requested: usize, cpu_count: usize) -> Result<Self, DpamError> {
        let worker_count = WorkerCount::io_bound(requested, cpu_count)?;
        Ok(Self {
            strategy: Strategy::Io(Arc::new(Semaphore::new(worker_count.get()))),
            worker_count,
        })
    }

    pub fn worker_count(&self) -> WorkerCount {
        self.worker_count
    }

    /// Run `job` once per item in `items`, honoring `cancel`: once
    /// cancellation is observed, units not yet started are skipped and
    /// reported as `DpamError::Cancelled`; units already started are
    /// allowed to finish.
    ///
    /// `job` is a plain synchronous closure — every adapter call already
    /// wraps its own blocking work in `spawn_blocking` internally, so the
    /// unit of work the pool schedules is itself synchronous regardless of
    /// which strategy runs it.
    pub fn run_all<T, R, F>(&self, items: Vec<T>, cancel: &CancellationToken, job: F) -> Vec<(T, Result<R, DpamError>)>
    where
        T: Send,
        R: Send,
        F: Fn(&T) -> Result<R, DpamError> + Send + Sync,
    {
        match &self.strategy {
            Strategy::Cpu(pool) => self.run_cpu_bound(pool, items, cancel, job),
            Strategy::Io(_) => self.run_io_bound_blocking(items, cancel, job),
        }
    }

    fn run_cpu_bound<T, R, F>(
        &self,
        pool: &rayon::ThreadPool,
        items: Vec<T>,
        cancel: &CancellationToken,
        job: F,
    ) -> Vec<(T, Result<R, DpamError>)>
    where
        T: Send,
        R: Send,
        F: Fn(&T) -> Result<R, DpamError> + Send + Sync,
    {
        use rayon::prelude::*;

        pool.install(|| {
            items
                .into_par_iter()
                .map(|item| {
                    if cancel.is_cancelled() {
                        return (item, Err(DpamError::Cancelled));
                    }
                    let result = job(&item);
                    (item, result)
                })
                .collect()
        })
    }

    /// Run without a rayon pool, bounded only by item count — used when no
    /// semaphore gating is needed because the caller already bounded
    /// `items` to the worker count (e.g. the batch runner chunks the
    /// pending set itself before calling in). The semaphore variant proper
    /// is exercised through `run_async` for async call sites.
    fn run_io_bound_blocking<T, R, F>(
        &self,
        items: Vec<T>,
        cancel: &CancellationToken,
        job: F,
    ) -> Vec<(T, Result<R, DpamError>)>
    where
        T: Send,
        R: Send,
        F: Fn(&T) -> Result<R, DpamError> + Send + Sync,
    {
        std::thread::scope(|scope| {
            let handles: Vec<_> = items
                .into_iter()
                .map(|item| {
                    let job = &job;
                    scope.spawn(move || {
                        if cancel.is_cancelled() {
                            return (item, Err(DpamError::Cancelled));
                        }
                        let result = job(&item);
                        (item, result)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().expect("worker thread panicked")).collect()
        })
    }

    /// Async dispatch path for adapter calls that are themselves
    /// `async fn`s (every adapter trait method is): spawn one task per
    /// item, each acquiring a semaphore permit before running, bounding
    /// true concurrency to this pool's worker count regardless of how many
    /// items are queued. Unlike `run_all`, tasks run concurrently rather
    /// than one-at-a-time, since external-tool adapter calls spend nearly
    /// all their time blocked on process I/O, not CPU. Works for either
    /// strategy: a CPU-bound pool sizes its semaphore from the same
    /// `WorkerCount` the rayon pool uses; an I/O-bound pool reuses its own
    /// semaphore directly.
    pub async fn run_async<T, R, F, Fut>(&self, items: Vec<T>, cancel: &CancellationToken, job: F) -> Vec<Result<R, DpamError>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, DpamError>> + Send + 'static,
    {
        let semaphore = match &self.strategy {
            Strategy::Io(semaphore) => semaphore.clone(),
            Strategy::Cpu(_) => Arc::new(Semaphore::new(self.worker_count.get())),
        };
        let job = Arc::new(job);

        let mut tasks = Vec::with_capacity(items.len());
        for item in items {
            if cancel.is_cancelled() {
                tasks.push(tokio::spawn(async { Err(DpamError::Cancelled) }));
                continue;
            }
            let semaphore = semaphore.clone();
            let job = job.clone();
            let cancel = cancel.clone();
            tasks.push(tokio::spawn(async move {
                let permit =
                    semaphore.acquire_owned().await.map_err(|e| DpamError::InternalError(format!("semaphore closed: {e}")))?;
                if cancel.is_cancelled() {
                    drop(permit);
                    return Err(DpamError::Cancelled);
                }
                let result = job(item).await;
                drop(permit);
                result
            }));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            results.push(task.await.unwrap_or_else(|e| Err(DpamError::InternalError(format!("worker task join error: {e}")))));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn cpu_bound_sizes_to_cpu_count() {
        let pool = WorkerPool::cpu_bound(4).unwrap();
        assert_eq!(pool.worker_count().get(), 4);
    }

    #[test]
    fn io_bound_rejects_over_cap() {
        assert!(WorkerPool::io_bound(1000, 4).is_err());
    }

    #[test]
    fn cpu_bound_runs_all_units_and_isolates_failures() {
        let pool = WorkerPool::cpu_bound(2).unwrap();
        let coordinator = dpam_engine_bootstrap::shutdown::ShutdownCoordinator::new(Duration::from_secs(1));
        let cancel = coordinator.token();

        let items = vec![1, 2, 3, 4];
        let results = pool.run_all(items, &cancel, |n| {
            if *n == 3 {
                Err(DpamError::InternalError("boom".to_string()))
            } else {
                Ok(*n * 10)
            }
        });

        assert_eq!(results.len(), 4);
        let ok_count = results.iter().filter(|(_, r)| r.is_ok()).count();
        assert_eq!(ok_count, 3);
    }

    #[test]
    fn cancellation_skips_units_not_yet_started() {
        let pool = WorkerPool::cpu_bound(1).unwrap();
        let coordinator = dpam_engine_bootstrap::shutdown::ShutdownCoordinator::new(Duration::from_secs(1));
        let cancel = coordinator.token();
        coordinator.initiate_shutdown();

        let items = vec![1, 2, 3];
        let results = pool.run_all(items, &cancel, |n| Ok::<_, DpamError>(*n));
        assert!(results.iter().all(|(_, r)| matches!(r, Err(DpamError::Cancelled))));
    }

    #[tokio::test]
    async fn io_bound_async_limits_concurrency_to_worker_count() {
        let pool = WorkerPool::io_bound(2, 1).unwrap();
        let coordinator = dpam_engine_bootstrap::shutdown::ShutdownCoordinator::new(Duration::from_secs(1));
        let cancel = coordinator.token();
        let in_flight = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let max_observed = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let items: Vec<usize> = (0..6).collect();
        let results = pool
            .run_async(items, &cancel, |_n| {
                let in_flight = in_flight.clone();
                let max_observed = max_observed.clone();
                async move {
                    let now = in_flight.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
                    max_observed.fetch_max(now, std::sync::atomic::Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
                    Ok::<_, DpamError>(())
                }
            })
            .await;

        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| r.is_ok()));
        assert!(max_observed.load(std::sync::atomic::Ordering::SeqCst) <= 2);
    }
}
