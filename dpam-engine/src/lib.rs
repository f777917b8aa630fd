// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # DPAM Batch Execution Engine
//!
//! Application and infrastructure layers for the 24-step DPAM domain
//! assignment pipeline: step registry, batch runner, and the concrete
//! adapters, state store, scratch manager, and worker pools the runner is
//! composed from.
//!
//! ## Architecture Position
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │      dpam-engine-bootstrap                  │
//! │  Entry point, CLI, signals, shutdown        │
//! └─────────────────────┬───────────────────────┘
//!                       ▼
//! ┌─────────────────────────────────────────────┐
//! │      dpam-engine (this crate)                │
//! │  application:   step registry, batch runner  │
//! │  infrastructure: adapters, state store,      │
//! │                  scratch, path resolver,     │
//! │                  worker pools                │
//! └─────────────────────┬───────────────────────┘
//!                       ▼
//! ┌─────────────────────────────────────────────┐
//! │      dpam-engine-domain                      │
//! │  Value objects, entities, ports, errors      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! `main.rs` is the composition root: it builds every concrete dependency
//! the application layer needs and wires them into a `BatchRunner` through
//! the domain's port traits. Nothing in this crate's library code
//! constructs its own infrastructure.

pub mod application;
pub mod infrastructure;

pub use application::BatchRunner;
pub use infrastructure::{FileStateStore, PathResolver, ScratchManager, WorkerPool};
