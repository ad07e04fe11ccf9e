// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh topology checks

use super::Mesh;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Undirected edge, smaller index first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub v0: usize,
    pub v1: usize,
}

impl Edge {
    pub fn new(v0: usize, v1: usize) -> Self {
        if v0 < v1 {
            Self { v0, v1 }
        } else {
            Self { v0: v1, v1: v0 }
        }
    }
}

/// Number of faces using each edge
pub fn build_edge_counts(mesh: &Mesh) -> HashMap<Edge, u32> {
    let mut edge_counts: HashMap<Edge, u32> = HashMap::new();

    for face in &mesh.faces {
        for (a, b) in face.edges() {
            if a != b {
                *edge_counts.entry(Edge::new(a, b)).or_insert(0) += 1;
            }
        }
    }

    edge_counts
}

/// Every edge shared by at most two faces
pub fn is_manifold(mesh: &Mesh) -> bool {
    build_edge_counts(mesh).values().all(|&count| count <= 2)
}

/// Every edge shared by exactly two faces
pub fn is_closed(mesh: &Mesh) -> bool {
    let edge_counts = build_edge_counts(mesh);
    !edge_counts.is_empty() && edge_counts.values().all(|&count| count == 2)
}

/// Edges used by exactly one face
pub fn find_boundary_edges(mesh: &Mesh) -> HashSet<Edge> {
    build_edge_counts(mesh)
        .into_iter()
        .filter(|&(_, count)| count == 1)
        .map(|(edge, _)| edge)
        .collect()
}

/// Faces with fewer than three distinct corners
pub fn count_degenerate_faces(mesh: &Mesh) -> usize {
    mesh.faces
        .iter()
        .filter(|face| {
            let distinct: HashSet<usize> = face.indices.iter().copied().collect();
            distinct.len() < 3
        })
        .count()
}

/// Topology report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshValidation {
    pub is_manifold: bool,
    pub is_closed: bool,
    pub edge_count: usize,
    pub boundary_edge_count: usize,
    pub degenerate_face_count: usize,
}

pub fn validate_mesh(mesh: &Mesh) -> MeshValidation {
    let edge_counts = build_edge_counts(mesh);

    let boundary_edge_count = edge_counts.values().filter(|&&count| count == 1).count();

    MeshValidation {
        is_manifold: edge_counts.values().all(|&count| count <= 2),
        is_closed: !edge_counts.is_empty() && edge_counts.values().all(|&count| count == 2),
        edge_count: edge_counts.len(),
        boundary_edge_count,
        degenerate_face_count: count_degenerate_faces(mesh),
    }
}
