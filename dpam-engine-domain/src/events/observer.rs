// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Batch progress observer.
//!
//! Default-bodied async trait methods: most observers care about one or
//! two events and should not have to implement the rest.

use crate::value_objects::{ProteinId, StepId};
use async_trait::async_trait;

#[async_trait]
pub trait BatchObserver: Send + Sync {
    async fn on_step_started(&self, _step: StepId, _pending_count: usize) {}

    async fn on_protein_completed(&self, _step: StepId, _protein: &ProteinId) {}

    async fn on_protein_failed(&self, _step: StepId, _protein: &ProteinId, _reason: &str) {}

    async fn on_step_completed(&self, _step: StepId, _completed_count: usize, _failed_count: usize) {}

    async fn on_batch_completed(&self, _completed_pairs: usize, _failed_pairs: usize) {}
}

/// No-op observer for callers that don't need progress reporting.
pub struct NoOpObserver;

#[async_trait]
impl BatchObserver for NoOpObserver {}
