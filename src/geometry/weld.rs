// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Duplicate vertex resolution and mesh compaction
//!
//! Candidate pairs come from the hierarchy's broad phase. A candidate is
//! confirmed when the two points are strictly closer than `epsilon`, and the
//! confirmed pairs are folded into an [`EquivalenceMap`] in ascending order.

use super::{Bvh, Face};
use crate::error::{Result, WeldError};
use nalgebra::Point3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Representative forest over vertex indices.
///
/// `find` follows parent links without path compression and merges do not
/// rank, so results depend on merge order. Every link points at an index no
/// greater than its own, which keeps the forest acyclic.
#[derive(Debug, Clone)]
pub struct EquivalenceMap {
    parent: Vec<usize>,
}

impl EquivalenceMap {
    /// Every index starts as its own representative
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn find(&self, mut index: usize) -> usize {
        while self.parent[index] != index {
            index = self.parent[index];
        }
        index
    }

    /// Point `j` at the representative currently reached from `i`.
    ///
    /// Callers pass canonical pairs with `i < j`.
    pub fn merge_into(&mut self, j: usize, i: usize) {
        let representative = self.find(i);
        self.parent[j] = representative;
    }

    pub fn is_representative(&self, index: usize) -> bool {
        self.parent[index] == index
    }
}

/// Counters describing one welding pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeldStats {
    pub input_vertices: usize,
    pub output_vertices: usize,
    pub input_faces: usize,
    pub output_faces: usize,
    /// Pairs whose inflated boxes overlap
    pub candidate_pairs: usize,
    /// Candidates confirmed by exact distance
    pub confirmed_pairs: usize,
    /// Faces that collapsed below their original arity
    pub dropped_faces: usize,
}

impl WeldStats {
    pub fn removed_vertices(&self) -> usize {
        self.input_vertices - self.output_vertices
    }
}

/// Compacted geometry produced by [`remove_duplicates`]
#[derive(Debug, Clone)]
pub struct WeldResult {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<Face>,
    /// `old_to_new[i]` is the output index of input vertex `i`
    pub old_to_new: Vec<usize>,
    pub stats: WeldStats,
}

/// Merge vertices closer than `epsilon` and re-index `faces`.
pub fn remove_duplicates(
    vertices: &[Point3<f64>],
    faces: &[Face],
    epsilon: f64,
) -> Result<WeldResult> {
    remove_duplicates_with_rng(vertices, faces, epsilon, &mut rand::thread_rng())
}

/// Like [`remove_duplicates`], with the hierarchy's insertion order drawn
/// from `rng`.
pub fn remove_duplicates_with_rng<R: Rng + ?Sized>(
    vertices: &[Point3<f64>],
    faces: &[Face],
    epsilon: f64,
    rng: &mut R,
) -> Result<WeldResult> {
    check_face_indices(faces, vertices.len())?;

    let bvh = Bvh::build_with_rng(vertices, epsilon, rng)?;
    let candidates = bvh.broad_phase_detect();

    let mut equivalence = EquivalenceMap::new(vertices.len());
    let mut confirmed_pairs = 0;
    for &(i, j) in &candidates {
        if (vertices[i] - vertices[j]).norm() < epsilon {
            equivalence.merge_into(j, i);
            confirmed_pairs += 1;
        }
    }

    let (new_vertices, old_to_new) = compact_vertices(vertices, &equivalence);
    let new_faces = reindex_faces(faces, &old_to_new);

    let stats = WeldStats {
        input_vertices: vertices.len(),
        output_vertices: new_vertices.len(),
        input_faces: faces.len(),
        output_faces: new_faces.len(),
        candidate_pairs: candidates.len(),
        confirmed_pairs,
        dropped_faces: faces.len() - new_faces.len(),
    };

    tracing::info!(
        removed = stats.removed_vertices(),
        candidates = stats.candidate_pairs,
        confirmed = stats.confirmed_pairs,
        dropped_faces = stats.dropped_faces,
        "welded vertices"
    );

    Ok(WeldResult {
        vertices: new_vertices,
        faces: new_faces,
        old_to_new,
        stats,
    })
}

pub(crate) fn check_face_indices(faces: &[Face], vertex_count: usize) -> Result<()> {
    for (face, f) in faces.iter().enumerate() {
        if let Some(&index) = f.indices.iter().find(|&&index| index >= vertex_count) {
            return Err(WeldError::FaceIndexOutOfRange {
                face,
                index,
                vertex_count,
            });
        }
    }
    Ok(())
}

/// One vertex per representative, in first-seen order.
fn compact_vertices(
    vertices: &[Point3<f64>],
    equivalence: &EquivalenceMap,
) -> (Vec<Point3<f64>>, Vec<usize>) {
    let mut new_vertices = Vec::new();
    let mut slot_of: Vec<Option<usize>> = vec![None; vertices.len()];
    let mut old_to_new = Vec::with_capacity(vertices.len());

    for index in 0..vertices.len() {
        let representative = equivalence.find(index);
        let slot = *slot_of[representative].get_or_insert_with(|| {
            new_vertices.push(vertices[representative]);
            new_vertices.len() - 1
        });
        old_to_new.push(slot);
    }

    (new_vertices, old_to_new)
}

/// Map faces through `old_to_new`, dropping those that lost a corner.
fn reindex_faces(faces: &[Face], old_to_new: &[usize]) -> Vec<Face> {
    faces
        .iter()
        .filter_map(|face| {
            let indices: Vec<usize> = face.indices.iter().map(|&i| old_to_new[i]).collect();
            let mut distinct = indices.clone();
            distinct.sort_unstable();
            distinct.dedup();
            (distinct.len() == face.indices.len()).then(|| Face::new(indices))
        })
        .collect()
}
