// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Step declarations: one `StepDefinition` per entry in the fixed 24-step
//! chain, tagged with an `ExecutionMode` the batch runner dispatches on.

use crate::value_objects::{ArtifactKind, StepId};

/// One of the four execution modes a step declares, plus the escape-hatch
/// default. The runner matches on this tag rather than on the step's name,
/// so adding a new step only ever requires choosing one of these four
/// shapes, never a bespoke dispatch path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One call per pending protein; any internal parallelism is the step's concern.
    PerProtein,
    /// One call for the whole batch; the engine splits the combined output per protein.
    BatchedBulk,
    /// A process-wide expensive resource is acquired once, scoped to the step.
    SharedResource,
    /// The per-protein unit decomposes into independent sub-units dispatched
    /// through the worker pool.
    PooledFanout,
}

impl ExecutionMode {
    /// The escape-hatch default for steps that declare no special mode.
    pub const DEFAULT: ExecutionMode = ExecutionMode::PerProtein;
}

#[derive(Debug, Clone)]
pub struct StepDefinition {
    pub id: StepId,
    pub name: &'static str,
    pub inputs: Vec<ArtifactKind>,
    pub outputs: Vec<ArtifactKind>,
    pub mode: ExecutionMode,
}

impl StepDefinition {
    pub fn new(
        id: StepId,
        name: &'static str,
        inputs: Vec<ArtifactKind>,
        outputs: Vec<ArtifactKind>,
        mode: ExecutionMode,
    ) -> Self {
        Self {
            id,
            name,
            inputs,
            outputs,
            mode,
        }
    }

    /// The directory fragment used for this step in sharded layout, e.g. `step02_hhsearch`.
    pub fn dir_name(&self) -> String {
        format!("step{:02}_{}", self.id.get(), self.name)
    }
}
