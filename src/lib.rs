// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! vertexweld
//!
//! Duplicate vertex detection and mesh compaction. Points are indexed by an
//! incrementally built bounding volume hierarchy whose broad phase reports
//! near-coincident pairs; the resolver confirms them by distance, merges
//! them, and re-indexes the faces.

pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod utils;

pub use config::WeldConfig;
pub use error::{Result, WeldError};
pub use geometry::{remove_duplicates, Aabb, Bvh, CandidatePairs, Face, Mesh, WeldResult, WeldStats};

/// Load a mesh file and weld its vertices with `epsilon`
pub fn weld_file(path: &str, epsilon: f64) -> anyhow::Result<(Mesh, WeldStats)> {
    let mut mesh = io::import_mesh(path)?;
    let stats = mesh.weld_vertices(epsilon)?;
    Ok((mesh, stats))
}
