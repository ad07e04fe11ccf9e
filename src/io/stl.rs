// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! STL import and export

use crate::geometry::Mesh;
use crate::utils::math::{to_f32, triangle_normal};
use anyhow::{Context, Result};
use nalgebra::Point3;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use stl_io::{Normal, Triangle as StlTriangle, Vertex as StlVertex};

/// Read an ASCII or binary STL file as a triangle soup.
///
/// Every facet gets three fresh vertices, exactly as stored in the file.
pub fn import_stl(path: &Path) -> Result<Mesh> {
    let file = File::open(path).with_context(|| format!("Failed to open STL file: {:?}", path))?;
    let mut reader = BufReader::new(file);

    let triangles = stl_io::create_stl_reader(&mut reader)
        .with_context(|| format!("Failed to read STL header: {:?}", path))?
        .map(|facet| {
            let facet = facet?;
            Ok(facet.vertices.map(|v| {
                Point3::new(f64::from(v[0]), f64::from(v[1]), f64::from(v[2]))
            }))
        })
        .collect::<std::io::Result<Vec<[Point3<f64>; 3]>>>()
        .with_context(|| format!("Failed to read STL facets: {:?}", path))?;

    tracing::debug!(facets = triangles.len(), "imported STL");
    Ok(Mesh::from_triangle_soup(&triangles))
}

/// Write a binary STL file, fan-triangulating polygons
pub fn export_stl(mesh: &Mesh, path: &Path) -> Result<()> {
    let triangles: Vec<StlTriangle> = mesh
        .faces
        .iter()
        .flat_map(|face| face.triangles())
        .map(|[a, b, c]| {
            let (v0, v1, v2) = (&mesh.vertices[a], &mesh.vertices[b], &mesh.vertices[c]);
            let normal = triangle_normal(v0, v1, v2);

            StlTriangle {
                normal: Normal::new([normal.x as f32, normal.y as f32, normal.z as f32]),
                vertices: [
                    StlVertex::new(to_f32(v0)),
                    StlVertex::new(to_f32(v1)),
                    StlVertex::new(to_f32(v2)),
                ],
            }
        })
        .collect();

    let mut file = File::create(path).with_context(|| format!("Failed to create STL file: {:?}", path))?;
    stl_io::write_stl(&mut file, triangles.iter()).context("Failed to write STL file")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Face;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_import_ascii_stl() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "solid square")?;
        for tri in [
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]],
            [[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        ] {
            writeln!(file, "  facet normal 0 0 1")?;
            writeln!(file, "    outer loop")?;
            for [x, y, z] in tri {
                writeln!(file, "      vertex {} {} {}", x, y, z)?;
            }
            writeln!(file, "    endloop")?;
            writeln!(file, "  endfacet")?;
        }
        writeln!(file, "endsolid square")?;
        file.flush()?;

        let mesh = import_stl(file.path())?;
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.vertices[4], Point3::new(1.0, 1.0, 0.0));

        Ok(())
    }

    #[test]
    fn test_export_fans_quads() -> Result<()> {
        let mut mesh = Mesh::new();
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            mesh.add_vertex(Point3::new(x, y, 0.0));
        }
        mesh.add_face(Face::new(vec![0, 1, 2, 3]));

        let file = NamedTempFile::new()?;
        export_stl(&mesh, file.path())?;

        let back = import_stl(file.path())?;
        assert_eq!(back.face_count(), 2);
        assert_eq!(back.vertex_count(), 6);

        Ok(())
    }
}
