// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

mod batch_state;
mod protein_state;
mod step_definition;

pub use batch_state::{BatchState, Outcome};
pub use protein_state::ProteinState;
pub use step_definition::{ExecutionMode, StepDefinition};
