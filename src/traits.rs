//! # Traits
//!
//! These are the seams of the crate. [`Mesh`] is the query and mutation surface
//! shared by the regular grid and the irregular point cloud: every codec, the
//! statistics, the transforms and the writer are written against it.
//! [`HeaderFields`] and [`FieldSlot`] describe the named records of a file
//! header; `HeaderFields` is normally derived with `#[derive(ovf::HeaderFields)]`.

use crate::geometry::{BoundingBox, LocatedVector, Vec3};
use crate::header::MeshType;
use crate::iter::Points;
use crate::mesh::{Closest, MeshCursor, MeshInfo, RegularGridMesh};
use crate::Error;

/// A sampled 3-vector field.
///
/// Points are enumerated with a value cursor:
///
/// ```
/// use ovf::prelude::*;
///
/// let mesh = RegularGridMesh::new(
///     MeshInfo::new("in-memory"),
///     (2, 1, 1),
///     Vec3::ZERO,
///     Vec3::splat(1.),
/// ).unwrap();
///
/// let mut count = 0;
/// if let Some((mut cursor, _first)) = mesh.first_point() {
///     count += 1;
///     while mesh.next_point(&mut cursor).is_some() {
///         count += 1;
///     }
/// }
/// assert_eq!(count, mesh.len());
/// ```
///
/// A cursor is a plain value; any number of them may walk the same mesh. A
/// cursor handed to [`Mesh::set_node_value`] must come from the same mesh and
/// from before its last structural change, otherwise the call fails with an
/// invalid index error.
pub trait Mesh {
    fn info(&self) -> &MeshInfo;

    fn info_mut(&mut self) -> &mut MeshInfo;

    fn mesh_type(&self) -> MeshType;

    /// the grid geometry, for meshes that are regular grids
    fn as_regular_grid(&self) -> Option<&RegularGridMesh> {
        None
    }

    /// number of stored nodes
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// counter bumped on every structural change; cursors remember it
    fn layout_generation(&self) -> u64;

    /// the node at `node` in enumeration order
    fn node(&self, node: usize) -> Option<LocatedVector>;

    fn first_point(&self) -> Option<(MeshCursor, LocatedVector)> {
        let point = self.node(0)?;
        Some((MeshCursor::new(0, self.layout_generation()), point))
    }

    /// advance `cursor` and return the point it now refers to, or `None` once
    /// the enumeration is exhausted (the cursor is left on the last point)
    fn next_point(&self, cursor: &mut MeshCursor) -> Option<LocatedVector> {
        let point = self.node(cursor.node + 1)?;
        cursor.node += 1;
        Some(point)
    }

    /// overwrite the value stored at `cursor`
    fn set_node_value(&mut self, cursor: &MeshCursor, value: Vec3) -> Result<(), Error>;

    /// `data_range` padded out to include the boundary
    fn precise_range(&self) -> BoundingBox;

    /// tight box around the stored locations
    fn precise_data_range(&self) -> BoundingBox;

    /// closed polyline outlining the mesh
    fn boundary_list(&self) -> Vec<Vec3>;

    fn is_boundary_from_data(&self) -> bool;

    /// typical spacing between nodes along each axis
    fn approximate_cell_dimensions(&self) -> Vec3;

    /// grid step for regular meshes, step hints for irregular ones
    fn nominal_step(&self) -> Vec3;

    /// nearest stored point to `pos`
    fn find_closest(&self, pos: Vec3) -> Result<Closest, Error>;

    /// iterator over `(cursor, point)` pairs in enumeration order
    fn points(&self) -> Points<'_, Self>
    where
        Self: Sized,
    {
        Points::new(self)
    }
}

/// One named header record holding an optional value.
///
/// Records distinguish "absent" from "present" so a header can tell an
/// omitted field from one set to its default.
pub trait FieldSlot {
    fn is_set(&self) -> bool;

    /// parse `raw` and store it, replacing any previous value
    ///
    /// Returns a description of the problem when `raw` cannot be parsed.
    fn assign(&mut self, raw: &str) -> Result<(), String>;

    /// parse `raw` and join it onto the present value with a newline
    fn append(&mut self, raw: &str) -> Result<(), String>;

    fn clear(&mut self);

    /// the value as it is written into a file
    fn render(&self) -> Option<String>;
}

/// A struct whose members are header records.
///
/// See the `HeaderFields` derive for the attributes that drive the generated
/// implementation.
pub trait HeaderFields {
    /// record keys in the order they are written
    const FIELD_NAMES: &'static [&'static str];

    /// spelling of a key when it is written
    fn label(name: &str) -> Option<&'static str>;

    /// true for records that accumulate instead of rejecting a repeat
    fn is_repeatable(name: &str) -> bool;

    fn slot(&self, name: &str) -> Option<&dyn FieldSlot>;

    fn slot_mut(&mut self, name: &str) -> Option<&mut dyn FieldSlot>;

    fn is_known(name: &str) -> bool {
        Self::FIELD_NAMES.contains(&name)
    }
}
