use crate::prelude::*;

use super::error::{EmptyMesh, GeometryError, InvalidParameter};
use super::{data_boundary, Closest};

use ndarray::Array3;

/// Dense rectilinear grid of 3-vectors.
///
/// Node `(i, j, k)` sits at `base + (i*step.x, j*step.y, k*step.z)`. The sign of
/// each step component gives the orientation of that axis. Values are held in
/// an `Array3` indexed `[k, j, i]` so the innermost loop runs over `i`.
#[derive(Debug, Clone)]
pub struct RegularGridMesh {
    info: MeshInfo,
    grid: Array3<Vec3>,
    base: Vec3,
    step: Vec3,
    data_range: BoundingBox,
    range: BoundingBox,
    boundary: Vec<Vec3>,
    boundary_from_data: bool,
    generation: u64,
}

impl RegularGridMesh {
    /// Zero filled grid of `(nx, ny, nz)` nodes.
    ///
    /// Node counts must be at least one and steps finite and non-zero. The
    /// range is the data range padded by half a cell on every side, so each
    /// node sits at the center of its cell; the boundary is derived from it.
    pub fn new(info: MeshInfo, dims: (usize, usize, usize), base: Vec3, step: Vec3) -> Result<Self, Error> {
        let (nx, ny, nz) = dims;
        if nx < 1 || ny < 1 || nz < 1 {
            let err = InvalidParameter::new("dims", format!("node counts ({}, {}, {}) must be at least 1", nx, ny, nz));
            return Err(GeometryError::from(err).into());
        }
        check_step(step)?;

        let last = base + step.scale_by(&Vec3::new((nx - 1) as f64, (ny - 1) as f64, (nz - 1) as f64));
        let data_range = BoundingBox::new(base, last);
        let half = step.map(f64::abs) * 0.5;
        let range = BoundingBox::new(base.min_with(&last) - half, base.max_with(&last) + half);

        Ok(Self::with_geometry(info, dims, base, step, data_range, range))
    }

    /// Zero filled grid with explicit data range and range.
    ///
    /// `range` is widened to contain `data_range` if it does not already.
    pub fn with_geometry(
        info: MeshInfo,
        dims: (usize, usize, usize),
        base: Vec3,
        step: Vec3,
        data_range: BoundingBox,
        range: BoundingBox,
    ) -> Self {
        let (nx, ny, nz) = dims;
        let mut range = range;
        range.expand_with(&data_range);

        Self {
            info,
            grid: Array3::from_elem((nz, ny, nx), Vec3::ZERO),
            base,
            step,
            data_range,
            range,
            boundary: Vec::new(),
            boundary_from_data: true,
            generation: 0,
        }
    }

    pub(crate) fn from_parts(
        info: MeshInfo,
        grid: Array3<Vec3>,
        base: Vec3,
        step: Vec3,
        data_range: BoundingBox,
        range: BoundingBox,
    ) -> Self {
        let mut range = range;
        range.expand_with(&data_range);
        Self {
            info,
            grid,
            base,
            step,
            data_range,
            range,
            boundary: Vec::new(),
            boundary_from_data: true,
            generation: 0,
        }
    }

    /// node counts `(nx, ny, nz)`
    pub fn dims(&self) -> (usize, usize, usize) {
        let (nz, ny, nx) = self.grid.dim();
        (nx, ny, nz)
    }

    pub fn base(&self) -> Vec3 {
        self.base
    }

    pub fn step(&self) -> Vec3 {
        self.step
    }

    /// values indexed `[k, j, i]`
    pub fn grid(&self) -> &Array3<Vec3> {
        &self.grid
    }

    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<Vec3> {
        self.grid.get((k, j, i)).copied()
    }

    pub fn set(&mut self, i: usize, j: usize, k: usize, value: Vec3) -> Result<(), Error> {
        let len = self.len();
        match self.grid.get_mut((k, j, i)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => {
                let (nx, ny, _) = self.dims();
                let node = i + nx * (j + ny * k);
                Err(GeometryError::from(super::InvalidIndex::new(node, len)).into())
            }
        }
    }

    /// location of node `(i, j, k)`
    pub fn nodal_to_problem(&self, i: f64, j: f64, k: f64) -> Vec3 {
        self.base + self.step.scale_by(&Vec3::new(i, j, k))
    }

    /// fractional node coordinates of a location
    pub fn problem_to_nodal(&self, pos: Vec3) -> Vec3 {
        let offset = pos - self.base;
        Vec3::new(offset.x / self.step.x, offset.y / self.step.y, offset.z / self.step.z)
    }

    /// Replace the boundary with an explicit polyline.
    ///
    /// The range grows to include the new boundary.
    pub fn set_boundary_list(&mut self, boundary: Vec<Vec3>) {
        self.range.expand_with(&BoundingBox::from_points(boundary.iter().copied()));
        self.boundary = boundary;
        self.boundary_from_data = false;
    }

    pub fn clear_boundary_list(&mut self) {
        self.boundary.clear();
        self.boundary_from_data = true;
    }

    /// Copy with the nodes rolled by whole cells, wrapping around each axis.
    ///
    /// Node `(i, j, k)` of `self` lands at `(i + ioff, j + joff, k + koff)`
    /// modulo the node counts. Geometry and metadata are unchanged.
    pub fn periodic_translate(&self, offset: (isize, isize, isize)) -> RegularGridMesh {
        let (nx, ny, nz) = self.dims();
        let mut out = self.clone();
        out.generation = 0;

        if self.is_empty() {
            return out;
        }

        let ioff = wrap_offset(offset.0, nx);
        let joff = wrap_offset(offset.1, ny);
        let koff = wrap_offset(offset.2, nz);

        for ((k, j, i), value) in self.grid.indexed_iter() {
            let k2 = (k + koff) % nz;
            let j2 = (j + joff) % ny;
            let i2 = (i + ioff) % nx;
            out.grid[(k2, j2, i2)] = *value;
        }

        out
    }

    /// Copy with permuted or flipped axes, cropped to the clip box and keeping
    /// every `subsample`-th node.
    ///
    /// Values are pushed through the same signed permutation as the
    /// locations. When a subsampled axis divides evenly, the kept nodes are
    /// centered in the clipped span. Clipping away every node along some axis
    /// yields an empty mesh.
    pub fn transformed(&self, spec: &TransformSpec) -> Result<RegularGridMesh, Error> {
        let sub = spec.stride()?;
        let transform = &spec.transform;
        let (nx, ny, nz) = self.dims();
        let counts = [nx, ny, nz];

        // an empty clip box keeps nothing
        let clip = spec.clip.map(|c| c.extremes());

        let mut start = [0usize; 3];
        let mut kept = [0usize; 3];
        for axis in 0..3 {
            let n = counts[axis];
            let (first, end) = match clip {
                Some(None) => (0, 0),
                Some(Some((cmin, cmax))) => {
                    let b = self.base.component(axis);
                    let s = self.step.component(axis);
                    let t0 = (cmin.component(axis) - b) / s;
                    let t1 = (cmax.component(axis) - b) / s;
                    let lo = t0.min(t1).ceil().max(0.);
                    let hi = (t0.max(t1).floor() + 1.).min(n as f64);
                    if hi > lo {
                        (lo as usize, hi as usize)
                    } else {
                        (0, 0)
                    }
                }
                None => (0, n),
            };

            let mut first = first;
            let dim = end - first;
            if dim > 0 && dim % sub == 0 {
                first += (sub - 1) / 2;
            }
            start[axis] = first;
            kept[axis] = (dim + sub - 1) / sub;
        }

        let source_axes = transform.source_axes();
        let new_dims = [kept[source_axes[0]], kept[source_axes[1]], kept[source_axes[2]]];

        let mut grid = Array3::from_elem((new_dims[2], new_dims[1], new_dims[0]), Vec3::ZERO);
        for ((kn, jn, in_), slot) in grid.indexed_iter_mut() {
            let new_index = [in_, jn, kn];
            let mut src = [0usize; 3];
            for (a, &k) in source_axes.iter().enumerate() {
                src[k] = start[k] + new_index[a] * sub;
            }
            *slot = transform.apply(self.grid[(src[2], src[1], src[0])]);
        }

        let clipped_base = self.nodal_to_problem(start[0] as f64, start[1] as f64, start[2] as f64);
        let base = transform.apply(clipped_base);
        let step = transform.apply(self.step * sub as f64);

        let data_range = if new_dims.contains(&0) {
            BoundingBox::empty()
        } else {
            let last = Vec3::new((new_dims[0] - 1) as f64, (new_dims[1] - 1) as f64, (new_dims[2] - 1) as f64);
            BoundingBox::new(base, base + step.scale_by(&last))
        };
        let mut range = transform.apply_box(&spec.source_range(&self.range));
        range.expand_with(&data_range);

        let mut out = RegularGridMesh::from_parts(self.info.clone(), grid, base, step, data_range, range);
        if !self.boundary_from_data {
            let boundary = self
                .boundary
                .iter()
                .map(|&pt| transform.apply(spec.move_into_clip(pt)))
                .collect();
            out.set_boundary_list(boundary);
        }

        debug!(
            flip = ?transform,
            subsample = sub,
            dims = ?new_dims,
            "transformed regular grid"
        );

        Ok(out)
    }

    pub(crate) fn grid_mut(&mut self) -> &mut Array3<Vec3> {
        &mut self.grid
    }

    /// swap in a new grid and geometry, bumping the layout generation
    pub(crate) fn replace_layout(
        &mut self,
        grid: Array3<Vec3>,
        base: Vec3,
        step: Vec3,
        data_range: BoundingBox,
        range: BoundingBox,
    ) {
        self.grid = grid;
        self.base = base;
        self.step = step;
        self.data_range = data_range;
        self.range = range;
        self.range.expand_with(&self.data_range);
        self.boundary.clear();
        self.boundary_from_data = true;
        self.generation += 1;
    }

    pub(crate) fn take_grid(&mut self) -> Array3<Vec3> {
        self.generation += 1;
        std::mem::replace(&mut self.grid, Array3::from_elem((0, 0, 0), Vec3::ZERO))
    }

    fn node_indices(&self, node: usize) -> (usize, usize, usize) {
        let (nx, ny, _) = self.dims();
        let i = node % nx;
        let j = (node / nx) % ny;
        let k = node / (nx * ny);
        (i, j, k)
    }
}

impl Mesh for RegularGridMesh {
    fn info(&self) -> &MeshInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut MeshInfo {
        &mut self.info
    }

    fn mesh_type(&self) -> MeshType {
        MeshType::Rectangular
    }

    fn as_regular_grid(&self) -> Option<&RegularGridMesh> {
        Some(self)
    }

    fn len(&self) -> usize {
        self.grid.len()
    }

    fn layout_generation(&self) -> u64 {
        self.generation
    }

    fn node(&self, node: usize) -> Option<LocatedVector> {
        if node >= self.len() {
            return None;
        }
        let (i, j, k) = self.node_indices(node);
        let value = self.grid[(k, j, i)];
        let location = self.nodal_to_problem(i as f64, j as f64, k as f64);
        Some(LocatedVector::new(location, value))
    }

    fn set_node_value(&mut self, cursor: &MeshCursor, value: Vec3) -> Result<(), Error> {
        let node = cursor.checked_node(self.generation, self.len())?;
        let (i, j, k) = self.node_indices(node);
        self.grid[(k, j, i)] = value;
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
        self.step.map(f64::abs)
    }

    fn nominal_step(&self) -> Vec3 {
        self.step
    }

    fn find_closest(&self, pos: Vec3) -> Result<Closest, Error> {
        if self.is_empty() {
            return Err(GeometryError::from(EmptyMesh::new("find_closest")).into());
        }

        let (nx, ny, nz) = self.dims();
        let nodal = self.problem_to_nodal(pos);

        let mut in_range = true;
        let mut clamp = |t: f64, n: usize| -> usize {
            let idx = t.round();
            if idx < 0.0 || idx.is_nan() {
                in_range = false;
                0
            } else if idx >= n as f64 {
                in_range = false;
                n - 1
            } else {
                idx as usize
            }
        };

        let i = clamp(nodal.x, nx);
        let j = clamp(nodal.y, ny);
        let k = clamp(nodal.z, nz);

        let point = LocatedVector::new(
            self.nodal_to_problem(i as f64, j as f64, k as f64),
            self.grid[(k, j, i)],
        );

        Ok(Closest { point, in_range })
    }
}

fn wrap_offset(offset: isize, n: usize) -> usize {
    // n > 0 here; rem_euclid keeps the result in [0, n)
    offset.rem_euclid(n as isize) as usize
}

pub(crate) fn check_step(step: Vec3) -> Result<(), Error> {
    if !step.is_finite() || step.x == 0.0 || step.y == 0.0 || step.z == 0.0 {
        let err = InvalidParameter::new(
            "step",
            format!("grid step ({}, {}, {}) must be finite and non-zero", step.x, step.y, step.z),
        );
        return Err(GeometryError::from(err).into());
    }
    Ok(())
}
