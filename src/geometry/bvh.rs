// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounding Volume Hierarchy (BVH) over point boxes
//!
//! The tree is grown one leaf at a time with a greedy minimum volume increase
//! heuristic and is never rebalanced. Nodes live in an arena and refer to each
//! other by [`NodeId`], so the parent link never owns anything and the whole
//! tree is released in one deallocation.

use super::Aabb;
use crate::error::{Result, WeldError};
use nalgebra::Point3;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Canonical `(min, max)` index pairs whose boxes overlap, in ascending order
pub type CandidatePairs = BTreeSet<(usize, usize)>;

/// Handle of a node inside a [`Bvh`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// BVH node
#[derive(Debug, Clone)]
pub struct BvhNode {
    /// Leaf box, or the union of both children's boxes
    pub bbox: Aabb,
    parent: Option<NodeId>,
    /// `[left, right]` (None for leaf)
    children: Option<[NodeId; 2]>,
}

impl BvhNode {
    fn leaf(bbox: Aabb) -> Self {
        Self {
            bbox,
            parent: None,
            children: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn left(&self) -> Option<NodeId> {
        self.children.map(|[left, _]| left)
    }

    pub fn right(&self) -> Option<NodeId> {
        self.children.map(|[_, right]| right)
    }
}

/// Shape summary of a hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BvhStats {
    pub leaf_count: usize,
    pub node_count: usize,
    pub depth: usize,
}

/// Incrementally built bounding volume hierarchy
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    root: Option<NodeId>,
    leaf_count: usize,
}

impl Bvh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a hierarchy over `points`, inserting one box of half-width
    /// `epsilon` per point in a random order.
    pub fn build(points: &[Point3<f64>], epsilon: f64) -> Result<Self> {
        Self::build_with_rng(points, epsilon, &mut rand::thread_rng())
    }

    /// Like [`Bvh::build`], drawing the insertion order from `rng`.
    ///
    /// Inserting spatially sorted points in sequence degrades the tree to a
    /// chain, so the order is always shuffled.
    pub fn build_with_rng<R: Rng + ?Sized>(
        points: &[Point3<f64>],
        epsilon: f64,
        rng: &mut R,
    ) -> Result<Self> {
        if points.is_empty() {
            return Err(WeldError::InvalidArgument(
                "cannot build a hierarchy over zero points".to_string(),
            ));
        }
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(WeldError::InvalidArgument(format!(
                "epsilon must be positive and finite, got {}",
                epsilon
            )));
        }
        if let Some(index) = points.iter().position(|p| !p.coords.iter().all(|c| c.is_finite())) {
            return Err(WeldError::InvalidArgument(format!(
                "point {} has a non-finite coordinate",
                index
            )));
        }

        let mut order: Vec<usize> = (0..points.len()).collect();
        order.shuffle(rng);

        let mut bvh = Self {
            nodes: Vec::with_capacity(2 * points.len() - 1),
            root: None,
            leaf_count: 0,
        };
        for index in order {
            bvh.insert(Aabb::around_point(&points[index], epsilon, index))?;
        }

        tracing::debug!(
            leaves = bvh.leaf_count,
            nodes = bvh.nodes.len(),
            depth = bvh.depth(),
            "built hierarchy"
        );
        Ok(bvh)
    }

    /// Insert one leaf box. Payload indices must be unique per hierarchy.
    pub fn insert(&mut self, bbox: Aabb) -> Result<NodeId> {
        if !bbox.is_leaf() {
            return Err(WeldError::InvalidArgument(
                "only leaf boxes carrying a point index can be inserted".to_string(),
            ));
        }

        let leaf = self.push(BvhNode::leaf(bbox));
        self.leaf_count += 1;

        match self.root {
            None => self.root = Some(leaf),
            Some(root) => self.insert_node(leaf, root),
        }
        Ok(leaf)
    }

    /// Descend from `start` towards the child whose box grows least, then
    /// pair the new leaf with the leaf found there.
    fn insert_node(&mut self, leaf: NodeId, start: NodeId) {
        let new_bbox = self.node(leaf).bbox;

        let mut current = start;
        while let Some([left, right]) = self.node(current).children {
            let left_bbox = &self.node(left).bbox;
            let right_bbox = &self.node(right).bbox;

            let left_growth = left_bbox.union(&new_bbox).volume() - left_bbox.volume();
            let right_growth = right_bbox.union(&new_bbox).volume() - right_bbox.volume();

            // Exact ties go right.
            current = if left_growth < right_growth { left } else { right };
        }

        let old_parent = self.node(current).parent;
        let internal = self.push(BvhNode::leaf(Aabb::empty()));
        self.node_mut(internal).parent = old_parent;
        self.set_children(internal, leaf, current);

        match old_parent {
            None => self.root = Some(internal),
            Some(parent) => {
                if let Some(children) = self.node_mut(parent).children.as_mut() {
                    let slot = if children[0] == current { 0 } else { 1 };
                    children[slot] = internal;
                }
            }
        }

        let mut ancestor = old_parent;
        while let Some(id) = ancestor {
            self.refit(id);
            ancestor = self.node(id).parent;
        }
    }

    /// Attach `left` and `right` under `node` and recompute its box.
    fn set_children(&mut self, node: NodeId, left: NodeId, right: NodeId) {
        self.node_mut(left).parent = Some(node);
        self.node_mut(right).parent = Some(node);
        let bbox = self.node(left).bbox.union(&self.node(right).bbox);

        let target = self.node_mut(node);
        target.children = Some([left, right]);
        target.bbox = bbox;
    }

    /// Re-tighten an internal node's box; leaves never change.
    fn refit(&mut self, node: NodeId) {
        if let Some([left, right]) = self.node(node).children {
            self.node_mut(node).bbox = self.node(left).bbox.union(&self.node(right).bbox);
        }
    }

    /// The other child of `node`'s parent, or `None` for the root
    pub fn sibling(&self, node: NodeId) -> Option<NodeId> {
        let [left, right] = self.node(self.node(node).parent?).children?;
        Some(if left == node { right } else { left })
    }

    /// Every pair of leaves whose boxes overlap, each reported once.
    ///
    /// Each internal node's own pairs are resolved exactly once no matter how
    /// many ancestor comparisons reach it. The resolved flags are scratch
    /// state of this call, so repeated queries return identical sets.
    pub fn broad_phase_detect(&self) -> CandidatePairs {
        let mut pairs = CandidatePairs::new();

        let Some(root) = self.root else {
            return pairs;
        };
        let Some([left, right]) = self.node(root).children else {
            return pairs;
        };

        let mut resolved = vec![false; self.nodes.len()];
        resolved[root.index()] = true;
        let mut pending = vec![(left, right)];

        while let Some((a, b)) = pending.pop() {
            let node_a = self.node(a);
            let node_b = self.node(b);
            let overlap = node_a.bbox.overlaps(&node_b.bbox);

            match (node_a.children, node_b.children) {
                (None, None) => {
                    if overlap {
                        if let (Some(i), Some(j)) = (node_a.bbox.index, node_b.bbox.index) {
                            if i != j {
                                pairs.insert((i.min(j), i.max(j)));
                            }
                        }
                    }
                }
                (None, Some([b_left, b_right])) => {
                    self.resolve_self_overlap(b, &mut resolved, &mut pending);
                    if overlap {
                        pending.push((a, b_left));
                        pending.push((a, b_right));
                    }
                }
                (Some([a_left, a_right]), None) => {
                    self.resolve_self_overlap(a, &mut resolved, &mut pending);
                    if overlap {
                        pending.push((a_left, b));
                        pending.push((a_right, b));
                    }
                }
                (Some([a_left, a_right]), Some([b_left, b_right])) => {
                    self.resolve_self_overlap(a, &mut resolved, &mut pending);
                    self.resolve_self_overlap(b, &mut resolved, &mut pending);
                    if overlap {
                        pending.push((a_left, b_left));
                        pending.push((a_left, b_right));
                        pending.push((a_right, b_left));
                        pending.push((a_right, b_right));
                    }
                }
            }
        }

        tracing::debug!(pairs = pairs.len(), "broad phase complete");
        pairs
    }

    /// Queue the comparison of `node`'s two children unless already done.
    fn resolve_self_overlap(
        &self,
        node: NodeId,
        resolved: &mut [bool],
        pending: &mut Vec<(NodeId, NodeId)>,
    ) {
        if resolved[node.index()] {
            return;
        }
        resolved[node.index()] = true;
        if let Some([left, right]) = self.node(node).children {
            pending.push((left, right));
        }
    }

    /// Exhaustive all-pairs comparison of the leaf boxes
    pub fn brute_force_detect(&self) -> CandidatePairs {
        let leaves: Vec<&Aabb> = self.leaves().collect();
        let mut pairs = CandidatePairs::new();

        for (n, a) in leaves.iter().enumerate() {
            for b in &leaves[n + 1..] {
                if !a.overlaps(b) {
                    continue;
                }
                if let (Some(i), Some(j)) = (a.index, b.index) {
                    if i != j {
                        pairs.insert((i.min(j), i.max(j)));
                    }
                }
            }
        }
        pairs
    }

    /// Leaf boxes in arena order
    pub fn leaves(&self) -> impl Iterator<Item = &Aabb> {
        self.nodes
            .iter()
            .filter(|node| node.is_leaf())
            .map(|node| &node.bbox)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &BvhNode {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut BvhNode {
        &mut self.nodes[id.index()]
    }

    fn push(&mut self, node: BvhNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Box of the whole tree
    pub fn bounds(&self) -> Option<Aabb> {
        self.root.map(|root| self.node(root).bbox)
    }

    /// Number of nodes on the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };

        let mut deepest = 0;
        let mut stack = vec![(root, 1)];
        while let Some((id, level)) = stack.pop() {
            deepest = deepest.max(level);
            if let Some([left, right]) = self.node(id).children {
                stack.push((left, level + 1));
                stack.push((right, level + 1));
            }
        }
        deepest
    }

    pub fn stats(&self) -> BvhStats {
        BvhStats {
            leaf_count: self.leaf_count,
            node_count: self.nodes.len(),
            depth: self.depth(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn point_box(x: f64, y: f64, z: f64, epsilon: f64, index: usize) -> Aabb {
        Aabb::around_point(&Point3::new(x, y, z), epsilon, index)
    }

    /// Every internal box must equal the union of its children.
    fn assert_tight(bvh: &Bvh, id: NodeId) {
        let node = bvh.node(id);
        if let Some([left, right]) = node.children {
            assert_eq!(bvh.node(left).parent(), Some(id));
            assert_eq!(bvh.node(right).parent(), Some(id));
            let expected = bvh.node(left).bbox.union(&bvh.node(right).bbox);
            assert_eq!(node.bbox, expected);
            assert_tight(bvh, left);
            assert_tight(bvh, right);
        } else {
            assert!(node.bbox.is_leaf());
        }
    }

    #[test]
    fn test_empty_and_single_leaf() {
        let mut bvh = Bvh::new();
        assert!(bvh.is_empty());
        assert!(bvh.broad_phase_detect().is_empty());
        assert_eq!(bvh.depth(), 0);

        let leaf = bvh.insert(point_box(0.0, 0.0, 0.0, 1.0, 0)).unwrap();
        assert_eq!(bvh.root(), Some(leaf));
        assert!(bvh.node(leaf).is_leaf());
        assert_eq!(bvh.sibling(leaf), None);
        assert!(bvh.broad_phase_detect().is_empty());
    }

    #[test]
    fn test_insert_rejects_union_box() {
        let mut bvh = Bvh::new();
        let union = point_box(0.0, 0.0, 0.0, 1.0, 0).union(&point_box(5.0, 0.0, 0.0, 1.0, 1));
        assert!(matches!(
            bvh.insert(union),
            Err(WeldError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_second_insert_creates_internal_root() {
        let mut bvh = Bvh::new();
        let first = bvh.insert(point_box(0.0, 0.0, 0.0, 1.0, 0)).unwrap();
        let second = bvh.insert(point_box(4.0, 0.0, 0.0, 1.0, 1)).unwrap();

        let root = bvh.root().unwrap();
        let root_node = bvh.node(root);
        assert!(!root_node.is_leaf());
        assert_eq!(root_node.left(), Some(second));
        assert_eq!(root_node.right(), Some(first));
        assert_eq!(bvh.sibling(first), Some(second));
        assert_eq!(bvh.sibling(second), Some(first));
        assert_eq!(root_node.bbox.min, Point3::new(-1.0, -1.0, -1.0));
        assert_eq!(root_node.bbox.max, Point3::new(5.0, 1.0, 1.0));
        assert_eq!(bvh.node_count(), 3);
    }

    #[test]
    fn test_insert_descends_towards_smaller_growth() {
        let mut bvh = Bvh::new();
        let a = bvh.insert(point_box(0.0, 0.0, 0.0, 1.0, 0)).unwrap();
        let b = bvh.insert(point_box(100.0, 0.0, 0.0, 1.0, 1)).unwrap();
        // Close to `a`: must pair with it rather than with `b`.
        let c = bvh.insert(point_box(2.0, 0.0, 0.0, 1.0, 2)).unwrap();

        assert_eq!(bvh.sibling(c), Some(a));
        assert_eq!(bvh.sibling(bvh.node(c).parent().unwrap()), Some(b));
        assert_tight(&bvh, bvh.root().unwrap());
    }

    #[test]
    fn test_insert_ties_go_right() {
        let mut bvh = Bvh::new();
        let a = bvh.insert(point_box(-4.0, 0.0, 0.0, 1.0, 0)).unwrap();
        let b = bvh.insert(point_box(4.0, 0.0, 0.0, 1.0, 1)).unwrap();
        // Equidistant from both leaves: equal growth on either side.
        let c = bvh.insert(point_box(0.0, 0.0, 0.0, 1.0, 2)).unwrap();

        let root = bvh.node(bvh.root().unwrap());
        assert_eq!(root.left(), Some(b));
        assert_eq!(bvh.sibling(c), Some(a));
    }

    #[test]
    fn test_build_keeps_boxes_tight() {
        let points: Vec<Point3<f64>> = (0..200)
            .map(|i| {
                let t = i as f64;
                Point3::new(t.sin() * 10.0, t.cos() * 10.0, t * 0.1)
            })
            .collect();

        let bvh = Bvh::build_with_rng(&points, 0.01, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(bvh.leaf_count(), 200);
        assert_eq!(bvh.node_count(), 399);
        assert_tight(&bvh, bvh.root().unwrap());

        let bounds = bvh.bounds().unwrap();
        for leaf in bvh.leaves() {
            assert!(bounds.contains(leaf));
        }
    }

    #[test]
    fn test_build_rejects_bad_input() {
        let points = [Point3::new(0.0, 0.0, 0.0)];
        assert!(Bvh::build(&[], 0.1).is_err());
        assert!(Bvh::build(&points, 0.0).is_err());
        assert!(Bvh::build(&points, -1.0).is_err());
        assert!(Bvh::build(&points, f64::NAN).is_err());
        assert!(Bvh::build(&[Point3::new(f64::NAN, 0.0, 0.0)], 0.1).is_err());
    }

    #[test]
    fn test_broad_phase_small_cluster() {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.05, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 0.05, 0.0),
            Point3::new(0.0, 0.0, 0.08),
        ];
        let bvh = Bvh::build_with_rng(&points, 0.1, &mut StdRng::seed_from_u64(1)).unwrap();
        let pairs = bvh.broad_phase_detect();

        let expected: CandidatePairs = [(0, 1), (0, 4), (1, 4), (2, 3)].into_iter().collect();
        assert_eq!(pairs, expected);
        assert_eq!(pairs, bvh.brute_force_detect());
    }

    #[test]
    fn test_broad_phase_finds_pairs_in_disjoint_subtrees() {
        // Two far-apart clusters: the root children do not overlap, yet each
        // side's own duplicates must still be found.
        let mut bvh = Bvh::new();
        let boxes = [
            point_box(0.0, 0.0, 0.0, 0.5, 0),
            point_box(100.0, 0.0, 0.0, 0.5, 1),
            point_box(0.2, 0.0, 0.0, 0.5, 2),
            point_box(100.2, 0.0, 0.0, 0.5, 3),
            point_box(0.4, 0.0, 0.0, 0.5, 4),
        ];
        for bbox in boxes {
            bvh.insert(bbox).unwrap();
        }

        let pairs = bvh.broad_phase_detect();
        let expected: CandidatePairs = [(0, 2), (0, 4), (1, 3), (2, 4)].into_iter().collect();
        assert_eq!(pairs, expected);
    }

    #[test]
    fn test_broad_phase_is_repeatable() {
        let points: Vec<Point3<f64>> = (0..64)
            .map(|i| Point3::new((i % 4) as f64 * 0.3, (i / 4 % 4) as f64 * 0.3, (i / 16) as f64 * 0.3))
            .collect();
        let bvh = Bvh::build_with_rng(&points, 0.2, &mut StdRng::seed_from_u64(3)).unwrap();

        let first = bvh.broad_phase_detect();
        let second = bvh.broad_phase_detect();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_depth_of_chain() {
        // Inserting in order along a line with growing spacing builds a chain.
        let mut bvh = Bvh::new();
        for i in 0..5 {
            let x = (1u32 << (2 * i)) as f64;
            bvh.insert(point_box(x, 0.0, 0.0, 0.1, i as usize)).unwrap();
        }
        let stats = bvh.stats();
        assert_eq!(stats.leaf_count, 5);
        assert_eq!(stats.node_count, 9);
        assert!(stats.depth >= 3);
    }
}
