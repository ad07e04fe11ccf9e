// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - boxes, hierarchy, mesh representation and welding

mod bbox;
pub mod bvh;
mod mesh;
pub mod mesh_utils;
pub mod weld;

pub use bbox::Aabb;
pub use bvh::{Bvh, BvhNode, BvhStats, CandidatePairs, NodeId};
pub use mesh::{Face, Mesh};
pub use mesh_utils::{validate_mesh, MeshValidation};
pub use weld::{remove_duplicates, remove_duplicates_with_rng, EquivalenceMap, WeldResult, WeldStats};
