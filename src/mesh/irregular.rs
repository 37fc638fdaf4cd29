use crate::prelude::*;

use super::error::{EmptyMesh, GeometryError, InvalidParameter, InvalidSubsample};
use super::index::PointIndex;
use super::{data_boundary, Closest};

use std::cell::OnceCell;

/// Scattered samples kept in insertion order.
///
/// Nearest point queries go through a spatial index that is built the first
/// time it is needed, or eagerly by [`IrregularMesh::sort_points`]. Adding
/// points drops the index.
///
/// The step hints are a rough node spacing. When no explicit boundary is set
/// they pad the range by half a cell around the data.
#[derive(Debug)]
pub struct IrregularMesh {
    info: MeshInfo,
    points: Vec<LocatedVector>,
    data_range: BoundingBox,
    range: BoundingBox,
    boundary: Vec<Vec3>,
    boundary_range: BoundingBox,
    boundary_from_data: bool,
    step_hints: Vec3,
    index: OnceCell<PointIndex>,
    generation: u64,
}

impl Clone for IrregularMesh {
    fn clone(&self) -> Self {
        Self {
            info: self.info.clone(),
            points: self.points.clone(),
            data_range: self.data_range,
            range: self.range,
            boundary: self.boundary.clone(),
            boundary_range: self.boundary_range,
            boundary_from_data: self.boundary_from_data,
            step_hints: self.step_hints,
            index: OnceCell::new(),
            generation: self.generation,
        }
    }
}

impl IrregularMesh {
    pub fn new(info: MeshInfo) -> Self {
        Self {
            info,
            points: Vec::new(),
            data_range: BoundingBox::empty(),
            range: BoundingBox::empty(),
            boundary: Vec::new(),
            boundary_range: BoundingBox::empty(),
            boundary_from_data: true,
            step_hints: Vec3::ZERO,
            index: OnceCell::new(),
            generation: 0,
        }
    }

    /// drop every point, the boundary and the step hints
    pub fn reset(&mut self) {
        self.points.clear();
        self.data_range = BoundingBox::empty();
        self.range = BoundingBox::empty();
        self.boundary.clear();
        self.boundary_range = BoundingBox::empty();
        self.boundary_from_data = true;
        self.step_hints = Vec3::ZERO;
        self.index = OnceCell::new();
        self.generation += 1;
    }

    pub fn add_point(&mut self, point: LocatedVector) {
        self.data_range.expand_with_point(point.location);
        self.range.expand_with_point(point.location);
        self.points.push(point);
        self.index.take();
    }

    /// stored samples in insertion order
    pub fn samples(&self) -> &[LocatedVector] {
        &self.points
    }

    /// Finish loading: estimate step hints if none are set, settle the range
    /// and build the spatial index.
    pub fn sort_points(&mut self) {
        self.ensure_cell_dimensions();
        self.update_range();
        self.index.take();
        let _ = self.index();
    }

    pub fn step_hints(&self) -> Vec3 {
        self.step_hints
    }

    /// Set the node spacing hint.
    ///
    /// Non-positive components are replaced by the middle component, or by
    /// the largest one if the middle one is also non-positive. A hint with
    /// no positive component is rejected.
    pub fn set_step_hints(&mut self, step: Vec3) -> Result<(), Error> {
        let mut sorted = step.to_array();
        sorted.sort_by(|a, b| b.total_cmp(a));
        let [a, b, c] = sorted;

        if !(a > 0.) || !step.is_finite() {
            let err = InvalidParameter::new(
                "step_hints",
                format!("({}, {}, {}) has no positive component", step.x, step.y, step.z),
            );
            return Err(GeometryError::from(err).into());
        }

        let mut hints = step;
        if c <= 0. {
            let fill = if b > 0. { b } else { a };
            hints = step.map(|v| if v <= 0. { fill } else { v });
        }

        self.step_hints = hints;
        self.update_range();
        Ok(())
    }

    /// Overwrite the step hints with a spacing estimated from the data range
    /// and the point count, treating each point as the center of a cube.
    pub fn set_approximate_step_hints(&mut self) {
        let edge = estimate_cell_edge(&self.data_range, self.points.len());
        self.step_hints = Vec3::splat(edge.unwrap_or(1.));
        debug!(points = self.points.len(), hints = ?self.step_hints, "approximate step hints");
        self.update_range();
    }

    /// Compute step hints if none are set. After this call
    /// [`Mesh::approximate_cell_dimensions`] returns the stored hints.
    pub fn ensure_cell_dimensions(&mut self) {
        if self.step_hints.x == 0. {
            self.set_approximate_step_hints();
        }
    }

    pub fn set_boundary_list(&mut self, boundary: Vec<Vec3>) {
        self.boundary_range = BoundingBox::from_points(boundary.iter().copied());
        self.boundary = boundary;
        self.boundary_from_data = false;
        self.update_range();
    }

    /// go back to a boundary derived from the data
    pub fn clear_boundary_list(&mut self) {
        self.boundary.clear();
        self.boundary_range = BoundingBox::empty();
        self.boundary_from_data = true;
        self.update_range();
    }

    /// Box the range must cover, independent of the boundary polyline.
    ///
    /// Readers use this for the extent declared in a file header.
    pub(crate) fn set_boundary_range(&mut self, bbox: BoundingBox) {
        self.boundary_range = bbox;
        self.update_range();
    }

    fn update_range(&mut self) {
        if self.boundary_from_data && !self.boundary_range.contains(&self.data_range) {
            self.range = match self.data_range.extremes() {
                Some((min, max)) => {
                    let margin = self.step_hints * 0.5;
                    BoundingBox::new(min - margin, max + margin)
                }
                None => BoundingBox::empty(),
            };
        } else {
            self.range = self.data_range;
            self.range.expand_with(&self.boundary_range);
        }
    }

    fn index(&self) -> &PointIndex {
        self.index.get_or_init(|| PointIndex::build(&self.points, &self.data_range))
    }

    /// Copy of any mesh as a point list, with an axis transform and clipping.
    ///
    /// Only points inside the clip box are kept. Subsampling is not defined
    /// for scattered points, so `spec.subsample` must be 0 or 1.
    pub fn transformed_from(source: &dyn Mesh, spec: &TransformSpec) -> Result<IrregularMesh, Error> {
        if !(spec.subsample == 0. || spec.subsample == 1.) {
            let err = InvalidSubsample::new(spec.subsample, "irregular meshes only accept 0 or 1");
            return Err(GeometryError::from(err).into());
        }
        let transform = &spec.transform;

        let mut out = IrregularMesh::new(source.info().clone());
        out.data_range = transform.apply_box(&spec.clipped(&source.precise_data_range()));

        if source.is_boundary_from_data() {
            out.boundary_range = transform.apply_box(&spec.source_range(&source.precise_range()));
        } else {
            let boundary = source
                .boundary_list()
                .into_iter()
                .map(|pt| transform.apply(spec.move_into_clip(pt)))
                .collect();
            out.set_boundary_list(boundary);
        }

        for lv in (0..source.len()).filter_map(|node| source.node(node)) {
            if spec.is_kept(lv.location) {
                out.add_point(LocatedVector::new(transform.apply(lv.location), transform.apply(lv.value)));
            }
        }

        let step = transform.apply_unsigned(source.nominal_step().map(f64::abs));
        if step.x > 0. {
            out.step_hints = step;
        }
        out.sort_points();

        debug!(flip = ?transform, points = out.len(), "transformed point list");
        Ok(out)
    }
}

impl Mesh for IrregularMesh {
    fn info(&self) -> &MeshInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut MeshInfo {
        &mut self.info
    }

    fn mesh_type(&self) -> MeshType {
        MeshType::Irregular
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn layout_generation(&self) -> u64 {
        self.generation
    }

    fn node(&self, node: usize) -> Option<LocatedVector> {
        self.points.get(node).copied()
    }

    fn set_node_value(&mut self, cursor: &MeshCursor, value: Vec3) -> Result<(), Error> {
        let node = cursor.checked_node(self.generation, self.points.len())?;
        self.points[node].value = value;
        Ok(())
    }

    fn precise_range(&self) -> BoundingBox {
        self.range
    }

    fn precise_data_range(&self) -> BoundingBox {
        self.data_range
    }

    fn boundary_list(&self) -> Vec<Vec3> {
        if self.boundary_from_data {
            data_boundary(&self.range)
        } else {
            self.boundary.clone()
        }
    }

    fn is_boundary_from_data(&self) -> bool {
        self.boundary_from_data
    }

    fn approximate_cell_dimensions(&self) -> Vec3 {
        let hints = if self.step_hints.x == 0. {
            Vec3::splat(estimate_cell_edge(&self.data_range, self.points.len()).unwrap_or(1.))
        } else {
            self.step_hints
        };

        if !(hints.is_finite() && hints.x > 0.) {
            warn!(hints = ?hints, "nonsensical cell dimensions, using unit cell");
            return Vec3::splat(1.);
        }
        hints
    }

    fn nominal_step(&self) -> Vec3 {
        self.step_hints
    }

    fn find_closest(&self, pos: Vec3) -> Result<Closest, Error> {
        let len = self.points.len();
        let idx = self
            .index()
            .nearest(self.data_range.move_into(pos), len)
            .ok_or_else(|| Error::from(GeometryError::from(EmptyMesh::new("find_closest"))))?;

        Ok(Closest {
            point: self.points[idx],
            in_range: self.range.is_in(pos),
        })
    }
}

/// Edge length `e` of the cubic cells centered on `count` points that fill
/// `data_range`, i.e. the positive root of
/// `dx*dy*dz + (dx*dy + dx*dz + dy*dz)*e + (dx + dy + dz)*e^2 - (count - 1)*e^3`.
///
/// Collapsed axes drop out, so one and two active axes are solved exactly.
/// With three, a couple of guarded Newton steps from the lower bound
/// `(dx*dy*dz/(count-1))^(1/3)` are taken, never moving past twice that bound.
fn estimate_cell_edge(data_range: &BoundingBox, count: usize) -> Option<f64> {
    if count < 2 {
        return None;
    }

    let Vec3 { x: dx, y: dy, z: dz } = data_range.extent();
    let dims = [dx, dy, dz].iter().filter(|&&d| d > 0.).count();

    let b = dx + dy + dz;
    let c = dx * dy + dx * dz + dy * dz;
    let n = (count - 1) as f64;

    let e = match dims {
        0 => return None,
        1 => b / n,
        2 => (b + (b * b + 4. * n * c).sqrt()) / (2. * n),
        _ => {
            let d = dx * dy * dz;
            let a = -n;
            let cubic = |e: f64| ((a * e + b) * e + c) * e + d;
            let slope = |e: f64| (3. * a * e + 2. * b) * e + c;

            let emin = (d / a).abs().cbrt();
            let emax = 2. * emin;

            let mut e = emin;
            let (y, s) = (cubic(e), slope(e));
            if e * s - y <= emax * s {
                e = emax;
            } else {
                e -= y / s;
            }

            let (y, s) = (cubic(e), slope(e));
            if y < 0. && s < 0. {
                // overstepped
                if e * s - y >= emin * s {
                    e = emin;
                } else {
                    e -= y / s;
                }
            } else if y > 0. && s < 0. {
                if e * s - y <= emax * s {
                    e = emax;
                } else {
                    e -= y / s;
                }
            }
            e
        }
    };

    Some(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn lattice(nx: usize, ny: usize, nz: usize) -> IrregularMesh {
        let mut mesh = IrregularMesh::new(MeshInfo::new("lattice"));
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let loc = Vec3::new(i as f64, j as f64, k as f64);
                    mesh.add_point(LocatedVector::new(loc, loc * 10.));
                }
            }
        }
        mesh
    }

    #[test]
    fn estimates_spacing_per_dimension() {
        let mut line = lattice(4, 1, 1);
        line.sort_points();
        assert_eq!(line.step_hints(), Vec3::splat(1.));

        let mut plane = lattice(3, 3, 1);
        plane.sort_points();
        assert_relative_eq!(plane.step_hints().x, 1.0, epsilon = 1e-12);

        let mut cube = lattice(2, 2, 2);
        cube.sort_points();
        assert_relative_eq!(cube.step_hints().x, 1.0, epsilon = 1e-2);

        let mut single = lattice(1, 1, 1);
        single.sort_points();
        assert_eq!(single.step_hints(), Vec3::splat(1.));
    }

    #[test]
    fn range_padded_by_half_cell() {
        let mut mesh = lattice(4, 1, 1);
        mesh.sort_points();
        let (min, max) = mesh.precise_range().extremes().unwrap();
        assert_eq!(min, Vec3::new(-0.5, -0.5, -0.5));
        assert_eq!(max, Vec3::new(3.5, 0.5, 0.5));
        assert!(mesh.precise_range().contains(&mesh.precise_data_range()));
    }

    #[test]
    fn step_hint_normalization() {
        let mut mesh = lattice(2, 1, 1);
        mesh.set_step_hints(Vec3::new(3., 1., -1.)).unwrap();
        assert_eq!(mesh.step_hints(), Vec3::new(3., 1., 1.));
        mesh.set_step_hints(Vec3::new(2., -1., 0.)).unwrap();
        assert_eq!(mesh.step_hints(), Vec3::splat(2.));
        assert!(mesh.set_step_hints(Vec3::new(0., -1., 0.)).is_err());
        assert_eq!(mesh.step_hints(), Vec3::splat(2.));
    }

    #[test]
    fn two_phase_cell_dimensions() {
        let mut mesh = lattice(5, 1, 1);
        assert_eq!(mesh.step_hints(), Vec3::ZERO);
        assert_eq!(mesh.approximate_cell_dimensions(), Vec3::splat(1.));
        assert_eq!(mesh.step_hints(), Vec3::ZERO);

        mesh.ensure_cell_dimensions();
        assert_eq!(mesh.step_hints(), Vec3::splat(1.));
    }

    #[test]
    fn closest_point_lookup() {
        let mut mesh = lattice(3, 3, 1);
        mesh.sort_points();

        let hit = mesh.find_closest(Vec3::new(1.9, 0.2, 0.)).unwrap();
        assert!(hit.in_range);
        assert_eq!(hit.point.location, Vec3::new(2., 0., 0.));
        assert_eq!(hit.point.value, Vec3::new(20., 0., 0.));

        let far = mesh.find_closest(Vec3::new(-5., 1., 0.)).unwrap();
        assert!(!far.in_range);
        assert_eq!(far.point.location, Vec3::new(0., 1., 0.));

        // adding points rebuilds the index on the next query
        mesh.add_point(LocatedVector::new(Vec3::new(-5., 1., 0.), Vec3::ZERO));
        let hit = mesh.find_closest(Vec3::new(-4.9, 1., 0.)).unwrap();
        assert_eq!(hit.point.location, Vec3::new(-5., 1., 0.));

        assert!(IrregularMesh::new(MeshInfo::default()).find_closest(Vec3::ZERO).is_err());
    }

    #[test]
    fn explicit_boundary() {
        let mut mesh = lattice(2, 2, 1);
        mesh.sort_points();
        let bdry = vec![Vec3::new(-2., -2., 0.), Vec3::new(4., -2., 0.), Vec3::new(4., 4., 0.)];
        mesh.set_boundary_list(bdry.clone());

        assert!(!mesh.is_boundary_from_data());
        assert_eq!(mesh.boundary_list(), bdry);
        assert_eq!(mesh.precise_range().min_pt(), Some(Vec3::new(-2., -2., 0.)));

        mesh.clear_boundary_list();
        assert!(mesh.is_boundary_from_data());
        assert_eq!(mesh.boundary_list().len(), 5);
        assert_eq!(mesh.precise_range().min_pt(), Some(Vec3::splat(-0.5)));
    }

    #[test]
    fn transformed_copy_clips_points() {
        let mut mesh = lattice(3, 2, 1);
        mesh.sort_points();
        let clip = BoundingBox::new(Vec3::new(0.5, -1., -1.), Vec3::new(5., 5., 1.));
        let spec = TransformSpec::new("y:-x:z").unwrap().clip(clip);

        let out = IrregularMesh::transformed_from(&mesh, &spec).unwrap();
        assert_eq!(out.len(), 4);
        let first = out.node(0).unwrap();
        // source y goes to -x, source x goes to y
        assert_eq!(first.location, Vec3::new(0., 1., 0.));
        assert_eq!(first.value, Vec3::new(0., 10., 0.));
        assert_eq!(out.node(3).unwrap().location, Vec3::new(-1., 2., 0.));
        assert!(out.precise_range().contains(&out.precise_data_range()));

        assert!(IrregularMesh::transformed_from(&mesh, &spec.subsample(2.)).is_err());
    }

    #[test]
    fn reset_invalidates_cursors() {
        let mut mesh = lattice(2, 1, 1);
        let (cursor, _) = mesh.first_point().unwrap();
        mesh.set_node_value(&cursor, Vec3::splat(1.)).unwrap();
        mesh.reset();
        mesh.add_point(LocatedVector::default());
        assert!(mesh.set_node_value(&cursor, Vec3::ZERO).is_err());
        assert_eq!(mesh.step_hints(), Vec3::ZERO);
    }
}
