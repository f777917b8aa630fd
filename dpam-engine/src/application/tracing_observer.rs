// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A `BatchObserver` that logs progress through `tracing`, the default the
//! composition root wires in place of `NoOpObserver` for interactive runs.

use async_trait::async_trait;
use dpam_engine_domain::events::BatchObserver;
use dpam_engine_domain::value_objects::{ProteinId, StepId};

pub struct TracingObserver;

#[async_trait]
impl BatchObserver for TracingObserver {
    async fn on_step_started(&self, step: StepId, pending_count: usize) {
        tracing::info!(step = step.get(), pending = pending_count, "step started");
    }

    async fn on_protein_completed(&self, step: StepId, protein: &ProteinId) {
        tracing::debug!(step = step.get(), protein = protein.as_str(), "protein completed");
    }

    async fn on_protein_failed(&self, step: StepId, protein: &ProteinId, reason: &str) {
        tracing::warn!(step = step.get(), protein = protein.as_str(), reason, "protein failed");
    }

    async fn on_step_completed(&self, step: StepId, completed_count: usize, failed_count: usize) {
        tracing::info!(step = step.get(), completed = completed_count, failed = failed_count, "step completed");
    }

    async fn on_batch_completed(&self, completed_pairs: usize, failed_pairs: usize) {
        tracing::info!(completed = completed_pairs, failed = failed_pairs, "batch completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn observer_methods_do_not_panic() {
        let observer = TracingObserver;
        let step = StepId::new(1).unwrap();
        let protein = ProteinId::new("p1").unwrap();
        observer.on_step_started(step, 1).await;
        observer.on_protein_completed(step, &protein).await;
        observer.on_protein_failed(step, &protein, "boom").await;
        observer.on_step_completed(step, 1, 0).await;
        observer.on_batch_completed(1, 0).await;
    }
}
