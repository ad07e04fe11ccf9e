// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! End-to-end welding scenarios

use approx::assert_relative_eq;
use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vertexweld::geometry::{mesh_utils, remove_duplicates_with_rng, Bvh, Face, Mesh};

/// Unit cube as 12 unshared triangles (36 vertices)
fn cube_soup(size: f64) -> Mesh {
    let c = |x: f64, y: f64, z: f64| Point3::new(x * size, y * size, z * size);
    let corners = [
        c(0.0, 0.0, 0.0),
        c(1.0, 0.0, 0.0),
        c(1.0, 1.0, 0.0),
        c(0.0, 1.0, 0.0),
        c(0.0, 0.0, 1.0),
        c(1.0, 0.0, 1.0),
        c(1.0, 1.0, 1.0),
        c(0.0, 1.0, 1.0),
    ];
    let quads = [
        [0, 3, 2, 1],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [1, 2, 6, 5],
        [2, 3, 7, 6],
        [3, 0, 4, 7],
    ];
    let triangles: Vec<[Point3<f64>; 3]> = quads
        .iter()
        .flat_map(|q| {
            [
                [corners[q[0]], corners[q[1]], corners[q[2]]],
                [corners[q[0]], corners[q[2]], corners[q[3]]],
            ]
        })
        .collect();
    Mesh::from_triangle_soup(&triangles)
}

#[test]
fn test_near_coincident_pair_merges() {
    let vertices = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(0.0, 0.0, 0.5e-15),
        Point3::new(10.0, 10.0, 10.0),
    ];
    let epsilon = 2.2204e-15;

    let bvh = Bvh::build(&vertices, epsilon).unwrap();
    assert!(bvh.broad_phase_detect().contains(&(0, 1)));

    let result = remove_duplicates_with_rng(&vertices, &[], epsilon, &mut StdRng::seed_from_u64(1)).unwrap();
    assert_eq!(result.vertices.len(), 2);
    assert_eq!(result.old_to_new, vec![0, 0, 1]);
}

#[test]
fn test_triangle_losing_a_corner_is_dropped() {
    let vertices = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1e-12, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
    ];
    let faces = [Face::new(vec![0, 1, 2]), Face::new(vec![1, 3, 2])];
    let result = remove_duplicates_with_rng(&vertices, &faces, 1e-9, &mut StdRng::seed_from_u64(2)).unwrap();

    assert_eq!(result.faces, vec![Face::new(vec![0, 2, 1])]);
    assert_eq!(result.stats.dropped_faces, 1);
}

#[test]
fn test_separated_points_are_unchanged() {
    let mut rng = StdRng::seed_from_u64(77);
    let epsilon = 1e-3;
    // Jittered lattice: neighbours are at least 0.5 apart, far beyond 10 * epsilon.
    let vertices: Vec<Point3<f64>> = (0..500)
        .map(|i| {
            let base = Point3::new((i % 10) as f64, (i / 10 % 10) as f64, (i / 100) as f64);
            base + nalgebra::Vector3::new(
                rng.gen_range(-0.25..0.25),
                rng.gen_range(-0.25..0.25),
                rng.gen_range(-0.25..0.25),
            )
        })
        .collect();
    let faces: Vec<Face> = (0..498).map(|i| Face::new(vec![i, i + 1, i + 2])).collect();

    let bvh = Bvh::build(&vertices, epsilon).unwrap();
    assert!(bvh.broad_phase_detect().is_empty());

    let result = remove_duplicates_with_rng(&vertices, &faces, epsilon, &mut rng).unwrap();
    assert_eq!(result.vertices, vertices);
    assert_eq!(result.faces, faces);
    assert_eq!(result.old_to_new, (0..500usize).collect::<Vec<_>>());
}

#[test]
fn test_weld_is_a_fixed_point() {
    let mut rng = StdRng::seed_from_u64(9);
    let epsilon = 0.05;
    // Dense cloud so chains of merges are common.
    let vertices: Vec<Point3<f64>> = (0..600)
        .map(|_| Point3::new(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0)))
        .collect();
    let faces: Vec<Face> = (0..200).map(|i| Face::new(vec![3 * i, 3 * i + 1, 3 * i + 2])).collect();

    let first = remove_duplicates_with_rng(&vertices, &faces, epsilon, &mut rng).unwrap();
    assert!(first.vertices.len() < vertices.len());

    let second = remove_duplicates_with_rng(&first.vertices, &first.faces, epsilon, &mut rng).unwrap();
    assert_eq!(second.stats.confirmed_pairs, 0);
    assert_eq!(second.vertices, first.vertices);
    assert_eq!(second.faces, first.faces);
}

#[test]
fn test_old_to_new_points_at_representative() {
    let mut rng = StdRng::seed_from_u64(12);
    let epsilon = 0.02;
    let vertices: Vec<Point3<f64>> = (0..300)
        .map(|_| Point3::new(rng.gen_range(0.0..0.5), rng.gen_range(0.0..0.5), 0.0))
        .collect();

    let result = remove_duplicates_with_rng(&vertices, &[], epsilon, &mut rng).unwrap();
    for (old, &new) in result.old_to_new.iter().enumerate() {
        assert!(new < result.vertices.len());
        // Representatives never have a larger index than their members.
        let representative = result.vertices[new];
        let rep_index = vertices.iter().position(|v| *v == representative).unwrap();
        assert!(rep_index <= old);
    }
    // First-seen order keeps representatives sorted by original index.
    let rep_indices: Vec<usize> = result
        .vertices
        .iter()
        .map(|v| vertices.iter().position(|w| w == v).unwrap())
        .collect();
    assert!(rep_indices.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_cube_soup_welds_closed() {
    let mut mesh = cube_soup(2.0);
    assert_eq!(mesh.vertex_count(), 36);
    assert!(!mesh_utils::is_closed(&mesh));

    let stats = mesh.weld_vertices(1e-6).unwrap();
    assert_eq!(stats.output_vertices, 8);
    assert_eq!(stats.dropped_faces, 0);
    assert_eq!(mesh.face_count(), 12);

    let validation = mesh_utils::validate_mesh(&mesh);
    assert!(validation.is_manifold);
    assert!(validation.is_closed);
    assert_eq!(validation.edge_count, 18);

    let bbox = mesh.bounding_box();
    assert_relative_eq!(bbox.volume(), 8.0);
}
