// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Small, validated value objects shared across the domain and application layers.

mod artifact_kind;
mod hit_record;
mod layout;
mod protein_id;
mod step_id;
mod worker_count;

pub use artifact_kind::ArtifactKind;
pub use hit_record::{HitRecord, ResidueRange, StructuralEquivalence};
pub use layout::Layout;
pub use protein_id::ProteinId;
pub use step_id::{StepId, ALIASED_STEP, ALIAS_TARGET, OUT_OF_SCOPE_STEP, STEP_COUNT};
pub use worker_count::{WorkerCount, MAX_IO_MULTIPLIER, MAX_WORKERS};
