//! nearest neighbour lookup for scattered points
//!
//! The tree is built only over the axes along which the points actually
//! spread. Planar and linear point sets are common (a single-layer film is
//! flat in z), and a k-d tree split on a constant axis degenerates.

use crate::prelude::*;

use kiddo::{KdTree, SquaredEuclidean};

use std::fmt;

pub(crate) enum PointIndex {
    /// every point shares one location
    Single,
    Line([usize; 1], KdTree<f64, 1>),
    Plane([usize; 2], KdTree<f64, 2>),
    Volume(KdTree<f64, 3>),
}

impl fmt::Debug for PointIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "PointIndex::Single"),
            Self::Line(axes, _) => write!(f, "PointIndex::Line({:?})", axes),
            Self::Plane(axes, _) => write!(f, "PointIndex::Plane({:?})", axes),
            Self::Volume(_) => write!(f, "PointIndex::Volume"),
        }
    }
}

impl PointIndex {
    pub(crate) fn build(points: &[LocatedVector], data_range: &BoundingBox) -> Self {
        let extent = data_range.extent();
        let active: Vec<usize> = (0..3).filter(|&axis| extent.component(axis) > 0.).collect();

        let index = match active[..] {
            [] => Self::Single,
            [a] => Self::Line([a], build_tree(points, [a])),
            [a, b] => Self::Plane([a, b], build_tree(points, [a, b])),
            _ => Self::Volume(build_tree(points, [0, 1, 2])),
        };

        debug!(points = points.len(), index = ?index, "built point index");
        index
    }

    /// Position in the point list of the stored point nearest to `pos`.
    ///
    /// Returns `None` only when the index holds no points.
    pub(crate) fn nearest(&self, pos: Vec3, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }

        let item = match self {
            Self::Single => 0,
            Self::Line(axes, tree) => tree.nearest_one::<SquaredEuclidean>(&project(pos, *axes)).item,
            Self::Plane(axes, tree) => tree.nearest_one::<SquaredEuclidean>(&project(pos, *axes)).item,
            Self::Volume(tree) => tree.nearest_one::<SquaredEuclidean>(&pos.to_array()).item,
        };

        usize::try_from(item).ok().filter(|&idx| idx < len)
    }
}

fn project<const K: usize>(pos: Vec3, axes: [usize; K]) -> [f64; K] {
    let mut out = [0.; K];
    for (slot, axis) in out.iter_mut().zip(axes) {
        *slot = pos.component(axis);
    }
    out
}

fn build_tree<const K: usize>(points: &[LocatedVector], axes: [usize; K]) -> KdTree<f64, K> {
    let mut tree: KdTree<f64, K> = KdTree::with_capacity(points.len());
    for (idx, pt) in points.iter().enumerate() {
        tree.add(&project(pt.location, axes), idx as u64);
    }
    tree
}
