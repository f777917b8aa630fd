// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Concrete implementations of the five domain-defined external-tool
//! ports, plus the executable-discovery and process-invocation helpers
//! they share.

mod neural_net;
mod pairwise_alignment;
mod process_runner;
mod secondary_structure;
mod sequence_profile_search;
mod structure_search;
mod tool_locator;

pub use neural_net::ModelServerAdapter;
pub use pairwise_alignment::DaliAdapter;
pub use secondary_structure::DsspAdapter;
pub use sequence_profile_search::HhsuiteAdapter;
pub use structure_search::FoldseekAdapter;
pub use tool_locator::ToolLocator;
