//! # Resampling
//!
//! Regular grids can be resampled onto a new grid that covers an arbitrary
//! box with a chosen number of cells per axis. Destination nodes sit at the
//! cell centers of the box. Each destination index `i` along an axis maps to
//! the fractional source index `t = off + i*s`, where `off` is the offset of
//! the destination base in source cells and `s` the ratio of the steps.
//!
//! Interpolating methods evaluate the source field at `t`:
//!
//! * nearest: `t` rounded and clamped to the source grid
//! * trilinear: the eight surrounding nodes, extrapolating at most half a
//!   cell past the edge
//! * tricubic: Catmull-Rom splines in the interior and an interpolating
//!   quadratic in the first and last cell, applied along z, then y, then x
//!
//! [`RegularGridMesh::resample_average`] instead averages the source cells
//! under the footprint of each destination cell.

use crate::mesh::{GeometryError, InvalidParameter};
use crate::prelude::*;

use ndarray::Array3;

/// Interpolation used by [`RegularGridMesh::resample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResampleMethod {
    #[default]
    Nearest,
    Trilinear,
    Tricubic,
}

impl ResampleMethod {
    /// polynomial order of the fit: 0, 1 or 3
    pub fn order(&self) -> u8 {
        match self {
            Self::Nearest => 0,
            Self::Trilinear => 1,
            Self::Tricubic => 3,
        }
    }

    pub fn from_order(order: u8) -> Option<Self> {
        match order {
            0 => Some(Self::Nearest),
            1 => Some(Self::Trilinear),
            3 => Some(Self::Tricubic),
            _ => None,
        }
    }
}

/// Geometry of a destination grid and its mapping into source index space.
struct Plan {
    counts: [usize; 3],
    base: Vec3,
    step: Vec3,
    data_range: BoundingBox,
    range: BoundingBox,
    /// `off` per axis, in source cells
    offset: [f64; 3],
    /// `s` per axis
    scale: [f64; 3],
    /// largest source index per axis
    max: [usize; 3],
}

impl Plan {
    fn new(source: &RegularGridMesh, range: &BoundingBox, counts: (usize, usize, usize)) -> Result<Self, Error> {
        let (nx, ny, nz) = counts;
        if nx < 1 || ny < 1 || nz < 1 {
            let err = InvalidParameter::new("counts", format!("({}, {}, {}) must all be at least 1", nx, ny, nz));
            return Err(GeometryError::from(err).into());
        }
        if source.is_empty() {
            return Err(GeometryError::from(crate::mesh::EmptyMesh::new("resample")).into());
        }

        let (min, max) = match range.extremes() {
            Some((min, max)) if range.width() > 0. && range.height() > 0. && range.depth() > 0. => (min, max),
            _ => {
                let err = InvalidParameter::new("range", "target range must have positive extent on every axis");
                return Err(GeometryError::from(err).into());
            }
        };

        let counts = [nx, ny, nz];
        let extent = range.extent();
        let step = Vec3::new(extent.x / nx as f64, extent.y / ny as f64, extent.z / nz as f64);
        let base = min + step * 0.5;
        let data_range = BoundingBox::new(base, max - step * 0.5);

        let src_base = source.base();
        let src_step = source.step();
        let (sx, sy, sz) = source.dims();

        let mut offset = [0.; 3];
        let mut scale = [0.; 3];
        for axis in 0..3 {
            offset[axis] = (base.component(axis) - src_base.component(axis)) / src_step.component(axis);
            scale[axis] = step.component(axis) / src_step.component(axis);
        }

        Ok(Self {
            counts,
            base,
            step,
            data_range,
            range: *range,
            offset,
            scale,
            max: [sx - 1, sy - 1, sz - 1],
        })
    }

    fn coordinate(&self, axis: usize, index: usize) -> f64 {
        self.offset[axis] + index as f64 * self.scale[axis]
    }

    fn output(&self, source: &RegularGridMesh, grid: Array3<Vec3>) -> RegularGridMesh {
        RegularGridMesh::from_parts(source.info().clone(), grid, self.base, self.step, self.data_range, self.range)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.counts[2], self.counts[1], self.counts[0])
    }
}

/// Up to four source indices and their weights along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Stencil {
    index: [usize; 4],
    weight: [f64; 4],
}

impl Stencil {
    fn nearest(t: f64, max: usize) -> Self {
        let idx = clamp_index(t.round(), max);
        Self {
            index: [idx; 4],
            weight: [1., 0., 0., 0.],
        }
    }

    fn linear(t: f64, max: usize) -> Self {
        let (a, b) = linear_pair(t, max);
        let w = (t - a as f64).clamp(-0.5, 1.5);
        Self {
            index: [a, a, b, b],
            weight: [0., 1. - w, w, 0.],
        }
    }

    fn cubic(t: f64, max: usize) -> Self {
        if max < 3 {
            return if max >= 1 {
                Self::linear(t, max)
            } else {
                Self {
                    index: [0; 4],
                    weight: [0., 1., 0., 0.],
                }
            };
        }

        let first = t.floor() - 1.;
        let first = if first < 0. {
            0
        } else if first + 3. > max as f64 {
            max - 3
        } else {
            first as usize
        };

        let tt = (t - (first + 1) as f64).clamp(-1.5, 2.5);
        let weight = if tt < 0. {
            // quadratic through the first three nodes
            [0.5 * tt * (tt - 1.), (1. + tt) * (1. - tt), 0.5 * tt * (1. + tt), 0.]
        } else if tt > 1. {
            [0., 0.5 * (tt - 1.) * (tt - 2.), tt * (2. - tt), 0.5 * tt * (tt - 1.)]
        } else {
            [
                0.5 * (tt * ((2. - tt) * tt - 1.)),
                0.5 * (tt * tt * (3. * tt - 5.) + 2.),
                0.5 * (tt * ((4. - 3. * tt) * tt + 1.)),
                0.5 * tt * tt * (tt - 1.),
            ]
        };

        Self {
            index: [first, first + 1, first + 2, first + 3],
            weight,
        }
    }

    fn for_method(method: ResampleMethod, t: f64, max: usize) -> Self {
        match method {
            ResampleMethod::Nearest => Self::nearest(t, max),
            ResampleMethod::Trilinear => Self::linear(t, max),
            ResampleMethod::Tricubic => Self::cubic(t, max),
        }
    }
}

fn clamp_index(t: f64, max: usize) -> usize {
    if t.is_nan() || t <= 0. {
        0
    } else if t >= max as f64 {
        max
    } else {
        t as usize
    }
}

/// the two source nodes bracketing `t`, shifted inward at the edges
fn linear_pair(t: f64, max: usize) -> (usize, usize) {
    let a = t.floor();
    if a < 0. || a.is_nan() {
        (0, 1.min(max))
    } else if a + 1. > max as f64 {
        (max.saturating_sub(1), max)
    } else {
        let a = a as usize;
        (a, a + 1)
    }
}

/// Source index span and edge weights of one destination cell along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Footprint {
    start: usize,
    stop: usize,
    start_weight: f64,
    stop_weight: f64,
    /// footprint length after clipping to the source grid
    length: f64,
}

impl Footprint {
    fn new(center: f64, half_width: f64, max: usize) -> Self {
        let a = (center - half_width).max(-0.5);
        let b = (center + half_width).min(max as f64 + 0.5);

        if !(b > a) {
            // no overlap with the source; fall back to the nearest cell
            let idx = clamp_index(center.round(), max);
            return Self {
                start: idx,
                stop: idx,
                start_weight: 1.,
                stop_weight: 1.,
                length: 1.,
            };
        }

        let start = clamp_index(a.round(), max);
        let stop = clamp_index(b.round(), max);
        let (start_weight, stop_weight) = if start == stop {
            (b - a, b - a)
        } else {
            (start as f64 + 0.5 - a, b - (stop as f64 - 0.5))
        };

        Self {
            start,
            stop,
            start_weight,
            stop_weight,
            length: b - a,
        }
    }

    fn weight(&self, idx: usize) -> f64 {
        if idx == self.start {
            self.start_weight
        } else if idx == self.stop {
            self.stop_weight
        } else {
            1.
        }
    }
}

impl RegularGridMesh {
    /// Resample `source` onto `counts` cells spanning `range`.
    ///
    /// Metadata is copied from the source. The result's range is `range`,
    /// its nodes sit at the cell centers and its boundary follows the range.
    pub fn resample(
        source: &RegularGridMesh,
        range: &BoundingBox,
        counts: (usize, usize, usize),
        method: ResampleMethod,
    ) -> Result<RegularGridMesh, Error> {
        let plan = Plan::new(source, range, counts)?;
        let grid = interpolate(source.grid(), &plan, method);
        debug!(
            method = ?method,
            counts = ?plan.counts,
            offset = ?plan.offset,
            scale = ?plan.scale,
            "resampled regular grid"
        );
        Ok(plan.output(source, grid))
    }

    /// [`resample`](Self::resample) with `self` as both source and destination
    pub fn resample_in_place(
        &mut self,
        range: &BoundingBox,
        counts: (usize, usize, usize),
        method: ResampleMethod,
    ) -> Result<(), Error> {
        let plan = Plan::new(self, range, counts)?;
        let source = self.take_grid();
        let grid = interpolate(&source, &plan, method);
        self.replace_layout(grid, plan.base, plan.step, plan.data_range, plan.range);
        Ok(())
    }

    /// Resample by averaging the source cells under each destination cell.
    ///
    /// Source cells partly covered contribute in proportion to the overlap.
    /// Each average is normalized by the footprint length clipped to the
    /// source grid, so destination cells hanging off the edge average only
    /// what they cover.
    pub fn resample_average(
        source: &RegularGridMesh,
        range: &BoundingBox,
        counts: (usize, usize, usize),
    ) -> Result<RegularGridMesh, Error> {
        let plan = Plan::new(source, range, counts)?;
        let grid = average(source.grid(), &plan);
        debug!(counts = ?plan.counts, scale = ?plan.scale, "averaged regular grid");
        Ok(plan.output(source, grid))
    }

    pub fn resample_average_in_place(&mut self, range: &BoundingBox, counts: (usize, usize, usize)) -> Result<(), Error> {
        let plan = Plan::new(self, range, counts)?;
        let source = self.take_grid();
        let grid = average(&source, &plan);
        self.replace_layout(grid, plan.base, plan.step, plan.data_range, plan.range);
        Ok(())
    }
}

fn interpolate(source: &Array3<Vec3>, plan: &Plan, method: ResampleMethod) -> Array3<Vec3> {
    let stencils: Vec<Vec<Stencil>> = (0..3)
        .map(|axis| {
            (0..plan.counts[axis])
                .map(|i| Stencil::for_method(method, plan.coordinate(axis, i), plan.max[axis]))
                .collect()
        })
        .collect();

    let mut out = Array3::from_elem(plan.shape(), Vec3::ZERO);
    for ((k, j, i), slot) in out.indexed_iter_mut() {
        let (sx, sy, sz) = (&stencils[0][i], &stencils[1][j], &stencils[2][k]);

        // along z for each (x, y) in the window, then along y, then along x
        let mut along_y = [Vec3::ZERO; 4];
        for (c, ix) in sx.index.iter().enumerate() {
            if sx.weight[c] == 0. {
                continue;
            }
            let mut along_z = [Vec3::ZERO; 4];
            for (b, iy) in sy.index.iter().enumerate() {
                if sy.weight[b] == 0. {
                    continue;
                }
                along_z[b] = sz
                    .index
                    .iter()
                    .zip(sz.weight)
                    .filter(|(_, w)| *w != 0.)
                    .fold(Vec3::ZERO, |acc, (iz, w)| acc + source[(*iz, *iy, *ix)] * w);
            }
            along_y[c] = along_z.iter().zip(sy.weight).fold(Vec3::ZERO, |acc, (v, w)| acc + *v * w);
        }
        *slot = along_y.iter().zip(sx.weight).fold(Vec3::ZERO, |acc, (v, w)| acc + *v * w);
    }
    out
}

fn average(source: &Array3<Vec3>, plan: &Plan) -> Array3<Vec3> {
    let footprints: Vec<Vec<Footprint>> = (0..3)
        .map(|axis| {
            let half_width = plan.scale[axis].abs() * 0.5;
            (0..plan.counts[axis])
                .map(|i| Footprint::new(plan.coordinate(axis, i), half_width, plan.max[axis]))
                .collect()
        })
        .collect();

    let mut out = Array3::from_elem(plan.shape(), Vec3::ZERO);
    for ((k, j, i), slot) in out.indexed_iter_mut() {
        let (fx, fy, fz) = (&footprints[0][i], &footprints[1][j], &footprints[2][k]);

        let mut sum = Vec3::ZERO;
        for k2 in fz.start..=fz.stop {
            let zw = fz.weight(k2);
            for j2 in fy.start..=fy.stop {
                let yzw = fy.weight(j2) * zw;
                for i2 in fx.start..=fx.stop {
                    sum += source[(k2, j2, i2)] * (fx.weight(i2) * yzw);
                }
            }
        }
        *slot = sum * (1. / (fx.length * fy.length * fz.length));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn linear_field(dims: (usize, usize, usize)) -> RegularGridMesh {
        let mut mesh = RegularGridMesh::new(MeshInfo::new("field"), dims, Vec3::ZERO, Vec3::splat(1.)).unwrap();
        let (nx, ny, nz) = dims;
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let v = Vec3::new(i as f64, 2. * j as f64, -(k as f64));
                    mesh.set(i, j, k, v).unwrap();
                }
            }
        }
        mesh
    }

    #[test]
    fn method_orders() {
        for method in [ResampleMethod::Nearest, ResampleMethod::Trilinear, ResampleMethod::Tricubic] {
            assert_eq!(ResampleMethod::from_order(method.order()), Some(method));
        }
        assert_eq!(ResampleMethod::from_order(2), None);
    }

    #[test]
    fn cubic_weights_partition_unity() {
        for max in [0usize, 1, 2, 3, 7] {
            for t in [-2., -0.3, 0., 0.4, 1., 2.5, 5.2, 9.] {
                let stencil = Stencil::cubic(t, max);
                assert_relative_eq!(stencil.weight.iter().sum::<f64>(), 1., epsilon = 1e-12);
                assert!(stencil.index.iter().all(|&idx| idx <= max));
            }
        }
    }

    #[test]
    fn cubic_interpolates_nodes() {
        let stencil = Stencil::cubic(4., 7);
        assert_eq!(stencil.index, [3, 4, 5, 6]);
        assert_relative_eq!(stencil.weight[1], 1.);

        // first cell uses the left quadratic
        let stencil = Stencil::cubic(0.5, 7);
        assert_eq!(stencil.index, [0, 1, 2, 3]);
        assert_eq!(stencil.weight[3], 0.);
    }

    #[test]
    fn identity_resample() {
        let mesh = linear_field((4, 3, 5));
        for method in [ResampleMethod::Nearest, ResampleMethod::Trilinear, ResampleMethod::Tricubic] {
            let out = RegularGridMesh::resample(&mesh, &mesh.precise_range(), mesh.dims(), method).unwrap();
            assert_eq!(out.dims(), mesh.dims());
            assert_eq!(out.base(), mesh.base());
            for (a, b) in out.grid().iter().zip(mesh.grid().iter()) {
                assert_relative_eq!(a.x, b.x, epsilon = 1e-12);
                assert_relative_eq!(a.y, b.y, epsilon = 1e-12);
                assert_relative_eq!(a.z, b.z, epsilon = 1e-12);
            }
        }

        let avg = RegularGridMesh::resample_average(&mesh, &mesh.precise_range(), mesh.dims()).unwrap();
        assert_eq!(avg.grid(), mesh.grid());
    }

    #[test]
    fn linear_field_reproduced_at_midpoints() {
        let mesh = linear_field((4, 1, 1));
        let range = BoundingBox::new(Vec3::new(0., -0.5, -0.5), Vec3::new(3., 0.5, 0.5));
        for method in [ResampleMethod::Trilinear, ResampleMethod::Tricubic] {
            let out = RegularGridMesh::resample(&mesh, &range, (3, 1, 1), method).unwrap();
            let xs: Vec<f64> = out.grid().iter().map(|v| v.x).collect();
            assert_relative_eq!(xs[0], 0.5, epsilon = 1e-12);
            assert_relative_eq!(xs[1], 1.5, epsilon = 1e-12);
            assert_relative_eq!(xs[2], 2.5, epsilon = 1e-12);
        }

        let nearest = RegularGridMesh::resample(&mesh, &range, (3, 1, 1), ResampleMethod::Nearest).unwrap();
        // 0.5 and 1.5 round away from zero
        let xs: Vec<f64> = nearest.grid().iter().map(|v| v.x).collect();
        assert_eq!(xs, vec![1., 2., 3.]);
    }

    #[test]
    fn extrapolation_is_bounded() {
        let mesh = linear_field((2, 1, 1));
        // destination nodes at x = -1 and x = 2
        let range = BoundingBox::new(Vec3::new(-2.5, -0.5, -0.5), Vec3::new(3.5, 0.5, 0.5));
        let out = RegularGridMesh::resample(&mesh, &range, (2, 1, 1), ResampleMethod::Trilinear).unwrap();
        assert_relative_eq!(out.get(0, 0, 0).unwrap().x, -0.5);
        assert_relative_eq!(out.get(1, 0, 0).unwrap().x, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn average_downsample() {
        let mesh = linear_field((4, 2, 1));
        let out = RegularGridMesh::resample_average(&mesh, &mesh.precise_range(), (2, 1, 1)).unwrap();
        assert_eq!(out.dims(), (2, 1, 1));
        assert_relative_eq!(out.get(0, 0, 0).unwrap().x, 0.5);
        assert_relative_eq!(out.get(1, 0, 0).unwrap().x, 2.5);
        assert_relative_eq!(out.get(0, 0, 0).unwrap().y, 1.);

        // three destination cells over four source cells split the middle ones
        let out = RegularGridMesh::resample_average(&mesh, &mesh.precise_range(), (3, 2, 1)).unwrap();
        assert_relative_eq!(out.get(0, 0, 0).unwrap().x, (1. / 3.) / (4. / 3.), epsilon = 1e-12);
        assert_relative_eq!(out.get(1, 0, 0).unwrap().x, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn in_place_matches_copy() {
        let mesh = linear_field((5, 4, 3));
        let range = BoundingBox::new(Vec3::splat(-0.5), Vec3::new(4.5, 3.5, 2.5));

        let copy = RegularGridMesh::resample(&mesh, &range, (3, 3, 3), ResampleMethod::Tricubic).unwrap();
        let mut inplace = mesh.clone();
        let (cursor, _) = inplace.first_point().unwrap();
        inplace.resample_in_place(&range, (3, 3, 3), ResampleMethod::Tricubic).unwrap();
        assert_eq!(inplace.grid(), copy.grid());
        assert!(inplace.set_node_value(&cursor, Vec3::ZERO).is_err());

        let avg = RegularGridMesh::resample_average(&mesh, &range, (2, 2, 2)).unwrap();
        let mut inplace = mesh;
        inplace.resample_average_in_place(&range, (2, 2, 2)).unwrap();
        assert_eq!(inplace.grid(), avg.grid());
        assert_eq!(inplace.precise_range(), range);
    }

    #[test]
    fn rejects_bad_targets() {
        let mesh = linear_field((2, 2, 2));
        let flat = BoundingBox::new(Vec3::ZERO, Vec3::new(1., 1., 0.));
        assert!(RegularGridMesh::resample(&mesh, &flat, (2, 2, 1), ResampleMethod::Nearest).is_err());
        assert!(RegularGridMesh::resample(&mesh, &mesh.precise_range(), (0, 2, 2), ResampleMethod::Nearest).is_err());
        assert!(RegularGridMesh::resample_average(&mesh, &BoundingBox::empty(), (1, 1, 1)).is_err());
    }
}
