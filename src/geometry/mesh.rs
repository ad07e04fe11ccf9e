// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh representation and utilities

use super::weld::{check_face_indices, remove_duplicates_with_rng, WeldStats};
use super::Aabb;
use crate::error::Result;
use nalgebra::Point3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Polygon defined by vertex indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    pub indices: Vec<usize>,
}

impl Face {
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn triangle(indices: [usize; 3]) -> Self {
        Self::new(indices.to_vec())
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Consecutive index pairs, closing back to the first corner
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.indices.len();
        (0..n).map(move |k| (self.indices[k], self.indices[(k + 1) % n]))
    }

    /// Fan triangulation around the first corner
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        (1..self.indices.len().saturating_sub(1))
            .map(move |k| [self.indices[0], self.indices[k], self.indices[k + 1]])
    }
}

/// Polygon mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<Face>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    /// Unshared triangles, three fresh vertices per triangle
    pub fn from_triangle_soup(triangles: &[[Point3<f64>; 3]]) -> Self {
        let mut mesh = Self::with_capacity(triangles.len() * 3, triangles.len());
        for triangle in triangles {
            let a = mesh.add_vertex(triangle[0]);
            let b = mesh.add_vertex(triangle[1]);
            let c = mesh.add_vertex(triangle[2]);
            mesh.add_face(Face::triangle([a, b, c]));
        }
        mesh
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, position: Point3<f64>) -> usize {
        let index = self.vertices.len();
        self.vertices.push(position);
        index
    }

    pub fn add_face(&mut self, face: Face) {
        self.faces.push(face);
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check that every face index refers to an existing vertex
    pub fn validate_indices(&self) -> Result<()> {
        check_face_indices(&self.faces, self.vertices.len())
    }

    /// Weld vertices that are closer than `epsilon` to each other.
    ///
    /// Faces that collapse are removed. Vertex order is preserved among the
    /// survivors.
    pub fn weld_vertices(&mut self, epsilon: f64) -> Result<WeldStats> {
        self.weld_vertices_with_rng(epsilon, &mut rand::thread_rng())
    }

    pub fn weld_vertices_with_rng<R: Rng + ?Sized>(
        &mut self,
        epsilon: f64,
        rng: &mut R,
    ) -> Result<WeldStats> {
        let result = remove_duplicates_with_rng(&self.vertices, &self.faces, epsilon, rng)?;
        self.vertices = result.vertices;
        self.faces = result.faces;
        Ok(result.stats)
    }

    /// Remove vertices no face references.
    /// Returns the number of vertices removed
    pub fn remove_orphaned_vertices(&mut self) -> usize {
        let mut used_vertices = vec![false; self.vertices.len()];
        for face in &self.faces {
            for &index in &face.indices {
                used_vertices[index] = true;
            }
        }

        // Build remapping: old_index -> new_index
        let mut new_indices = vec![0; self.vertices.len()];
        let mut new_vertices = Vec::new();
        for (old_idx, &used) in used_vertices.iter().enumerate() {
            if used {
                new_indices[old_idx] = new_vertices.len();
                new_vertices.push(self.vertices[old_idx]);
            }
        }

        for face in &mut self.faces {
            for index in &mut face.indices {
                *index = new_indices[*index];
            }
        }

        let removed = self.vertices.len() - new_vertices.len();
        self.vertices = new_vertices;
        removed
    }
}
