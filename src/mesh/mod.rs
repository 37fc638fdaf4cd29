//! # Meshes
//!
//! A mesh is a sampled 3-vector field together with the metadata needed to
//! display and store it. Two shapes exist:
//!
//! * [`RegularGridMesh`]: a dense rectilinear grid described by a base point, a
//!   per-axis step and node counts. Values are stored with z slowest and x
//!   fastest, matching the on-disk record order.
//! * [`IrregularMesh`]: a list of located samples in insertion order, with a
//!   nearest-neighbour index that is built on demand.
//!
//! Both implement [`Mesh`](crate::Mesh). Codecs return them wrapped in
//! [`AnyMesh`] so callers that do not care about the shape can work through
//! the trait directly.
//!
//! Every mesh keeps two boxes: the data range (tight around the stored
//! locations) and the range (data range joined with the boundary). The range
//! always contains the data range.

mod error;
mod index;
mod irregular;
mod regular;
mod stats;
mod transform;

pub use error::GeometryError;
pub use error::{EmptyMesh, InvalidIndex, InvalidParameter, InvalidSubsample, InvalidTransform, SizeMismatch};
pub use irregular::IrregularMesh;
pub use regular::RegularGridMesh;
pub(crate) use regular::check_step;
pub use stats::{MagnitudeSpan, MeshArithmetic, MeshStatistics};
pub use transform::{AxisTransform, TransformSpec};

use crate::prelude::*;

/// Display and unit metadata common to every mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshInfo {
    pub filename: String,
    pub title: String,
    pub description: String,
    pub mesh_unit: String,
    pub value_unit: String,
    value_multiplier: f64,
    display_value_scale: f64,
    min_mag_hint: f64,
    max_mag_hint: f64,
}

impl Default for MeshInfo {
    fn default() -> Self {
        Self {
            filename: String::new(),
            title: String::new(),
            description: String::new(),
            mesh_unit: String::new(),
            value_unit: String::new(),
            value_multiplier: 1.0,
            display_value_scale: 1.0,
            min_mag_hint: 0.0,
            max_mag_hint: 0.0,
        }
    }
}

impl MeshInfo {
    /// metadata for a mesh read from `filename`; the title defaults to the
    /// file name
    pub fn new<T: Into<String>>(filename: T) -> Self {
        let filename = filename.into();
        Self {
            title: filename.clone(),
            filename,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn title<T: Into<String>>(mut self, title: T) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn description<T: Into<String>>(mut self, description: T) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn mesh_unit<T: Into<String>>(mut self, unit: T) -> Self {
        self.mesh_unit = unit.into();
        self
    }

    #[must_use]
    pub fn value_unit<T: Into<String>>(mut self, unit: T) -> Self {
        self.value_unit = unit.into();
        self
    }

    /// stored value times the multiplier is the value in `value_unit`
    pub fn value_multiplier(&self) -> f64 {
        self.value_multiplier
    }

    pub fn set_value_multiplier(&mut self, multiplier: f64) -> Result<(), Error> {
        if !multiplier.is_finite() || multiplier == 0.0 {
            let err = InvalidParameter::new("value_multiplier", format!("{} is not a usable multiplier", multiplier));
            return Err(GeometryError::from(err).into());
        }
        self.value_multiplier = multiplier;
        Ok(())
    }

    pub fn display_value_scale(&self) -> f64 {
        self.display_value_scale
    }

    pub fn set_display_value_scale(&mut self, scale: f64) -> Result<(), Error> {
        if !(scale.is_finite() && scale > 0.0) {
            let err = InvalidParameter::new("display_value_scale", format!("{} must be positive", scale));
            return Err(GeometryError::from(err).into());
        }
        self.display_value_scale = scale;
        Ok(())
    }

    /// `(min, max)` magnitudes used by consumers to clip and rescale values
    pub fn mag_hints(&self) -> (f64, f64) {
        (self.min_mag_hint, self.max_mag_hint)
    }

    pub fn set_mag_hints(&mut self, min: f64, max: f64) -> Result<(), Error> {
        if !(min.is_finite() && max.is_finite()) || min < 0.0 || max < min {
            let err = InvalidParameter::new("mag_hints", format!("({}, {}) is not an ordered pair of magnitudes", min, max));
            return Err(GeometryError::from(err).into());
        }
        self.min_mag_hint = min;
        self.max_mag_hint = max;
        Ok(())
    }
}

/// Position of an enumeration over a mesh.
///
/// Cursors are small values; copy them freely. A cursor is tied to the
/// layout generation of the mesh that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshCursor {
    pub(crate) node: usize,
    pub(crate) generation: u64,
}

impl MeshCursor {
    pub(crate) fn new(node: usize, generation: u64) -> Self {
        Self { node, generation }
    }

    /// index of the node in enumeration order
    pub fn node(&self) -> usize {
        self.node
    }

    /// resolve the cursor against a mesh, checking that it is still valid
    pub(crate) fn checked_node(&self, generation: u64, len: usize) -> Result<usize, Error> {
        if self.generation != generation || self.node >= len {
            return Err(GeometryError::from(InvalidIndex::new(self.node, len)).into());
        }
        Ok(self.node)
    }
}

/// Result of a nearest point query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Closest {
    pub point: LocatedVector,
    /// false when the query position lies outside the mesh range
    pub in_range: bool,
}

/// Either mesh shape, as produced by the readers.
#[derive(Debug, Clone, From)]
pub enum AnyMesh {
    Regular(RegularGridMesh),
    Irregular(IrregularMesh),
}

impl AnyMesh {
    pub fn as_regular(&self) -> Option<&RegularGridMesh> {
        match self {
            Self::Regular(mesh) => Some(mesh),
            Self::Irregular(_) => None,
        }
    }

    pub fn as_irregular(&self) -> Option<&IrregularMesh> {
        match self {
            Self::Irregular(mesh) => Some(mesh),
            Self::Regular(_) => None,
        }
    }

    pub fn as_dyn(&self) -> &dyn Mesh {
        match self {
            Self::Regular(mesh) => mesh,
            Self::Irregular(mesh) => mesh,
        }
    }

    pub fn as_dyn_mut(&mut self) -> &mut dyn Mesh {
        match self {
            Self::Regular(mesh) => mesh,
            Self::Irregular(mesh) => mesh,
        }
    }

    /// copy with an axis transform, subsampling and clipping
    ///
    /// Regular meshes stay regular; irregular meshes only accept a subsample
    /// of 0 or 1.
    pub fn transformed(&self, spec: &TransformSpec) -> Result<AnyMesh, Error> {
        match self {
            Self::Regular(mesh) => RegularGridMesh::transformed(mesh, spec).map(AnyMesh::from),
            Self::Irregular(mesh) => IrregularMesh::transformed_from(mesh, spec).map(AnyMesh::from),
        }
    }
}

impl Mesh for AnyMesh {
    fn info(&self) -> &MeshInfo {
        self.as_dyn().info()
    }

    fn info_mut(&mut self) -> &mut MeshInfo {
        self.as_dyn_mut().info_mut()
    }

    fn mesh_type(&self) -> MeshType {
        self.as_dyn().mesh_type()
    }

    fn as_regular_grid(&self) -> Option<&RegularGridMesh> {
        self.as_regular()
    }

    fn len(&self) -> usize {
        self.as_dyn().len()
    }

    fn layout_generation(&self) -> u64 {
        self.as_dyn().layout_generation()
    }

    fn node(&self, node: usize) -> Option<LocatedVector> {
        self.as_dyn().node(node)
    }

    fn set_node_value(&mut self, cursor: &MeshCursor, value: Vec3) -> Result<(), Error> {
        self.as_dyn_mut().set_node_value(cursor, value)
    }

    fn precise_range(&self) -> BoundingBox {
        self.as_dyn().precise_range()
    }

    fn precise_data_range(&self) -> BoundingBox {
        self.as_dyn().precise_data_range()
    }

    fn boundary_list(&self) -> Vec<Vec3> {
        self.as_dyn().boundary_list()
    }

    fn is_boundary_from_data(&self) -> bool {
        self.as_dyn().is_boundary_from_data()
    }

    fn approximate_cell_dimensions(&self) -> Vec3 {
        self.as_dyn().approximate_cell_dimensions()
    }

    fn nominal_step(&self) -> Vec3 {
        self.as_dyn().nominal_step()
    }

    fn find_closest(&self, pos: Vec3) -> Result<Closest, Error> {
        self.as_dyn().find_closest(pos)
    }
}

/// rectangle around `range` at its mid z, closed by repeating the first corner
pub(crate) fn data_boundary(range: &BoundingBox) -> Vec<Vec3> {
    let (min, max) = match range.extremes() {
        Some(extremes) => extremes,
        None => return Vec::new(),
    };

    let zave = (min.z + max.z) / 2.0;
    vec![
        Vec3::new(min.x, min.y, zave),
        Vec3::new(min.x, max.y, zave),
        Vec3::new(max.x, max.y, zave),
        Vec3::new(max.x, min.y, zave),
        Vec3::new(min.x, min.y, zave),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_setters_validate() {
        let mut info = MeshInfo::new("a.ovf");
        assert_eq!(info.title, "a.ovf");

        assert!(info.set_display_value_scale(0.0).is_err());
        assert!(info.set_display_value_scale(2.0).is_ok());
        assert!(info.set_mag_hints(2.0, 1.0).is_err());
        assert!(info.set_mag_hints(-1.0, 1.0).is_err());
        assert!(info.set_mag_hints(0.5, 1.0).is_ok());
        assert_eq!(info.mag_hints(), (0.5, 1.0));
        assert!(info.set_value_multiplier(0.0).is_err());
    }

    #[test]
    fn stale_cursor_rejected() {
        let cursor = MeshCursor::new(3, 1);
        assert!(cursor.checked_node(1, 4).is_ok());
        assert!(cursor.checked_node(2, 4).is_err());
        assert!(cursor.checked_node(1, 3).is_err());
    }

    #[test]
    fn boundary_rectangle() {
        let range = BoundingBox::new(Vec3::ZERO, Vec3::new(2., 1., 4.));
        let bdry = data_boundary(&range);
        assert_eq!(bdry.len(), 5);
        assert_eq!(bdry[0], bdry[4]);
        assert!(bdry.iter().all(|p| p.z == 2.));
        assert_eq!(bdry[2], Vec3::new(2., 1., 2.));
    }
}
