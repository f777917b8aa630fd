// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Neural-net inference adapter port: scoped model handle.
//!
//! `open` acquires an expensive, process-wide resource scoped to the
//! shared-resource step; `predict` is called once per pending protein
//! reusing the same handle; `close` releases it at step exit. Short inputs
//! are padded to the model's fixed batch size by the caller before
//! `predict`, and the corresponding padded rows of the output are
//! discarded — the handle itself has no opinion about padding.

use crate::error::DpamError;
use async_trait::async_trait;
use std::path::Path;

/// Feature width the inference model expects per residue row.
pub const FEATURE_WIDTH: usize = 13;
/// Output width: a two-class probability per residue row.
pub const OUTPUT_WIDTH: usize = 2;
/// Fixed batch size the model graph is built for. Callers with fewer rows
/// than this pad up to it by repeating existing rows; callers with more
/// rows pass their true count through unpadded.
pub const NN_FIXED_BATCH_SIZE: usize = 500;

#[async_trait]
pub trait NeuralNetAdapter: Send + Sync {
    async fn check_availability(&self) -> bool;

    /// Load the model, returning a handle safe to reuse across many
    /// per-protein predict calls.
    async fn open(&self, model_path: &Path) -> Result<Box<dyn NeuralNetHandle>, DpamError>;
}

#[async_trait]
pub trait NeuralNetHandle: Send + Sync {
    /// `features` is a flattened row-major `[n_rows, FEATURE_WIDTH]` matrix,
    /// already padded by the caller to the model's fixed batch size.
    /// Returns a flattened row-major `[n_rows, OUTPUT_WIDTH]` matrix.
    async fn predict(&self, features: &[f32], n_rows: usize) -> Result<Vec<f32>, DpamError>;

    /// Release the underlying session/resources. Called once at step exit;
    /// implementations should make repeated calls harmless.
    async fn close(&self) -> Result<(), DpamError>;
}
