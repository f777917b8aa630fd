// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Port traits: domain-defined contracts that infrastructure adapters
//! implement. Keeping these in the domain crate, with concrete
//! implementations in `dpam-engine::infrastructure::adapters`, keeps the
//! domain layer swappable behind a hexagonal boundary.

mod neural_net;
mod pairwise_alignment;
mod secondary_structure;
mod sequence_profile_search;
mod state_store;
mod structure_search;

pub use neural_net::{NeuralNetAdapter, NeuralNetHandle, FEATURE_WIDTH, OUTPUT_WIDTH};
pub use pairwise_alignment::PairwiseAlignmentAdapter;
pub use secondary_structure::SecondaryStructureAdapter;
pub use sequence_profile_search::SequenceProfileSearchAdapter;
pub use state_store::StateStore;
pub use structure_search::StructureSearchAdapter;
