//! # File headers
//!
//! A [`FileHeader`] is the set of named records between `Begin: Header` and
//! `End: Header`. Every record is a [`Field`], which remembers whether it was
//! present at all, so an omitted record and one set to its default value stay
//! distinguishable.
//!
//! Which records must be present, and which must not, depends on the file
//! version and on the mesh type:
//!
//! | records | rule |
//! |---|---|
//! | `title`, `meshunit`, `xmin` .. `zmax` | always required |
//! | `valuedim`, `valueunits`, `valuelabels`, `meshtype` | required in 2.0, forbidden in 1.0 (`meshtype` is optional there) |
//! | `valueunit`, `valuemultiplier`, `valuerangeminmag`, `valuerangemaxmag` | required in 1.0, forbidden in 2.0 |
//! | `boundary` | optional in 1.0, forbidden in 2.0 |
//! | `xbase` .. `zbase`, `xstepsize` .. `zstepsize`, `xnodes` .. `znodes` | required for rectangular meshes |
//! | `pointcount` | required for irregular meshes, which forbid base points and node counts |
//!
//! [`FileHeader::validate`] checks these rules together with the sanity of
//! the values (node counts, list lengths).

use crate::prelude::*;

use ovf_derive::HeaderFields;

pub use crate::traits::{FieldSlot, HeaderFields};

use std::fmt;

/// Version of the file format, fixed when a header is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileVersion {
    V1,
    V2,
}

impl FileVersion {
    /// Recognize the first line of a file.
    ///
    /// Whitespace is ignored and case folded. `# OOMMF OVF 2.0` is version
    /// 2.0; any other `# OOMMF` line ending in `v` followed by a version
    /// number above 0.98 (or the prerelease tag `0.0a0`) is version 1.0.
    pub fn detect(line: &str) -> Option<FileVersion> {
        let line = utils::collapse_whitespace(line);
        if line == "#oommfovf2.0" {
            return Some(FileVersion::V2);
        }
        if !line.starts_with("#oommf") {
            return None;
        }

        let tail = &line[line.rfind('v')? + 1..];
        if tail == "0.0a0" {
            return Some(FileVersion::V1);
        }
        match tail.parse::<f64>() {
            Ok(number) if number > 0.98 => Some(FileVersion::V1),
            _ => None,
        }
    }

    /// first line of a file of this version
    pub fn id_line(&self, mesh_type: MeshType) -> String {
        match self {
            FileVersion::V1 => format!("# OOMMF: {} mesh v1.0", mesh_type),
            FileVersion::V2 => "# OOMMF OVF 2.0".to_string(),
        }
    }

    /// byte order of binary payloads
    pub fn byte_order(&self) -> data::ByteOrder {
        match self {
            FileVersion::V1 => data::ByteOrder::Big,
            FileVersion::V2 => data::ByteOrder::Little,
        }
    }
}

impl fmt::Display for FileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileVersion::V1 => write!(f, "1.0"),
            FileVersion::V2 => write!(f, "2.0"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshType {
    Rectangular,
    Irregular,
}

impl fmt::Display for MeshType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshType::Rectangular => write!(f, "rectangular"),
            MeshType::Irregular => write!(f, "irregular"),
        }
    }
}

#[derive(Debug, thiserror::Error, From)]
pub enum ValidationError {
    #[error("{0}")]
    MissingField(MissingField),
    #[error("{0}")]
    ForbiddenField(ForbiddenField),
    #[error("{0}")]
    UnknownField(UnknownField),
    #[error("{0}")]
    DuplicateField(DuplicateField),
    #[error("{0}")]
    InvalidFieldValue(InvalidFieldValue),
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::InvalidFieldValue(_) => ErrorKind::Encoding,
            _ => ErrorKind::Structural,
        }
    }
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "required field `{field}` missing for {context}")]
pub struct MissingField {
    field: &'static str,
    context: &'static str,
}

impl MissingField {
    pub fn field(&self) -> &str {
        self.field
    }
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "field `{field}` is not allowed in {context}")]
pub struct ForbiddenField {
    field: &'static str,
    context: &'static str,
}

impl ForbiddenField {
    pub fn field(&self) -> &str {
        self.field
    }
}

#[derive(Display, Debug)]
#[display(fmt = "unknown header field `{field}`")]
pub struct UnknownField {
    field: String,
}

impl UnknownField {
    pub(crate) fn new<T: Into<String>>(field: T) -> Self {
        Self { field: field.into() }
    }
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "header field `{field}` appears more than once")]
pub struct DuplicateField {
    field: &'static str,
}

#[derive(Display, Debug)]
#[display(fmt = "invalid value for field `{field}`: {reason}")]
pub struct InvalidFieldValue {
    field: String,
    reason: String,
}

impl InvalidFieldValue {
    pub(crate) fn new<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

/// A value that can live in a header record.
pub trait FieldValue: Sized + Clone {
    fn parse_value(raw: &str) -> Result<Self, String>;

    fn render_value(&self) -> String;

    /// fold a repeated record into this value
    fn join(&mut self, _other: Self) -> Result<(), String> {
        Err("record may appear only once".to_string())
    }
}

impl FieldValue for String {
    fn parse_value(raw: &str) -> Result<Self, String> {
        Ok(raw.to_string())
    }

    fn render_value(&self) -> String {
        self.clone()
    }

    fn join(&mut self, other: Self) -> Result<(), String> {
        self.push('\n');
        self.push_str(&other);
        Ok(())
    }
}

impl FieldValue for f64 {
    fn parse_value(raw: &str) -> Result<Self, String> {
        match utils::parse_float(raw.trim()) {
            Some(value) if value.is_finite() => Ok(value),
            Some(_) => Err(format!("`{}` is not finite", raw)),
            None => Err(format!("`{}` is not a number", raw)),
        }
    }

    fn render_value(&self) -> String {
        let mut buffer = ryu::Buffer::new();
        buffer.format(*self).to_string()
    }
}

impl FieldValue for i64 {
    fn parse_value(raw: &str) -> Result<Self, String> {
        raw.trim()
            .parse()
            .map_err(|_| format!("`{}` is not an integer", raw))
    }

    fn render_value(&self) -> String {
        self.to_string()
    }
}

impl FieldValue for MeshType {
    fn parse_value(raw: &str) -> Result<Self, String> {
        match utils::collapse_alnum(raw).as_str() {
            "rectangular" => Ok(MeshType::Rectangular),
            "irregular" => Ok(MeshType::Irregular),
            _ => Err(format!("unsupported mesh type `{}`", raw)),
        }
    }

    fn render_value(&self) -> String {
        self.to_string()
    }
}

/// list values such as `valueunits`, braces group elements with spaces
impl FieldValue for Vec<String> {
    fn parse_value(raw: &str) -> Result<Self, String> {
        Ok(utils::split_list(raw))
    }

    fn render_value(&self) -> String {
        utils::merge_list(self)
    }
}

/// boundary polyline, a flat list of coordinate triples
impl FieldValue for Vec<Vec3> {
    fn parse_value(raw: &str) -> Result<Self, String> {
        let mut coords = Vec::new();
        for token in raw.split_whitespace() {
            match utils::parse_float(token) {
                Some(value) if value.is_finite() => coords.push(value),
                _ => return Err(format!("`{}` is not a coordinate", token)),
            }
        }

        if coords.len() % 3 != 0 {
            warn!(dropped = coords.len() % 3, "incomplete boundary point dropped");
        }
        Ok(coords.chunks_exact(3).map(Vec3::from_slice).collect())
    }

    fn render_value(&self) -> String {
        let mut buffer = ryu::Buffer::new();
        let mut out = Vec::with_capacity(self.len() * 3);
        for pt in self {
            for c in pt.to_array() {
                out.push(buffer.format(c).to_string());
            }
        }
        out[..].join(" ")
    }
}

/// A header record that may be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Field<T> {
    value: Option<T>,
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T> Field<T> {
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }

    pub fn take(&mut self) -> Option<T> {
        self.value.take()
    }
}

impl<T: Copy> Field<T> {
    /// the value, if present
    pub fn value(&self) -> Option<T> {
        self.value
    }
}

impl<T: FieldValue> FieldSlot for Field<T> {
    fn is_set(&self) -> bool {
        self.value.is_some()
    }

    fn assign(&mut self, raw: &str) -> Result<(), String> {
        self.value = Some(T::parse_value(raw)?);
        Ok(())
    }

    fn append(&mut self, raw: &str) -> Result<(), String> {
        let parsed = T::parse_value(raw)?;
        match &mut self.value {
            Some(value) => value.join(parsed),
            None => {
                self.value = Some(parsed);
                Ok(())
            }
        }
    }

    fn clear(&mut self) {
        self.value = None;
    }

    fn render(&self) -> Option<String> {
        self.value.as_ref().map(FieldValue::render_value)
    }
}

/// The records of one segment header.
#[derive(Debug, Clone, PartialEq, HeaderFields)]
pub struct FileHeader {
    #[ovf(skip)]
    version: FileVersion,

    #[ovf(label = "Title")]
    pub title: Field<String>,
    #[ovf(label = "Desc", repeatable)]
    pub desc: Field<String>,
    pub mesh_unit: Field<String>,
    pub mesh_type: Field<MeshType>,

    pub x_base: Field<f64>,
    pub y_base: Field<f64>,
    pub z_base: Field<f64>,
    pub x_nodes: Field<i64>,
    pub y_nodes: Field<i64>,
    pub z_nodes: Field<i64>,
    pub point_count: Field<i64>,
    pub x_step_size: Field<f64>,
    pub y_step_size: Field<f64>,
    pub z_step_size: Field<f64>,

    pub x_min: Field<f64>,
    pub y_min: Field<f64>,
    pub z_min: Field<f64>,
    pub x_max: Field<f64>,
    pub y_max: Field<f64>,
    pub z_max: Field<f64>,

    pub value_dim: Field<i64>,
    pub value_labels: Field<Vec<String>>,
    pub value_units: Field<Vec<String>>,

    pub boundary: Field<Vec<Vec3>>,
    pub value_unit: Field<String>,
    pub value_multiplier: Field<f64>,
    #[ovf(label = "ValueRangeMinMag")]
    pub value_range_min_mag: Field<f64>,
    #[ovf(label = "ValueRangeMaxMag")]
    pub value_range_max_mag: Field<f64>,
}

/// Layout of the records in a data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordShape {
    /// number of records
    pub count: usize,
    /// value components per record
    pub value_dim: usize,
    /// records start with three location components
    pub with_locations: bool,
    /// node counts of a rectangular mesh
    pub dims: Option<(usize, usize, usize)>,
}

impl RecordShape {
    pub fn width(&self) -> usize {
        self.value_dim + if self.with_locations { 3 } else { 0 }
    }
}

const ALWAYS: &[&str] = &["title", "meshunit", "xmin", "ymin", "zmin", "xmax", "ymax", "zmax"];
const V2_ONLY: &[&str] = &["valuedim", "valueunits", "valuelabels"];
const V1_ONLY: &[&str] = &["valueunit", "valuemultiplier", "valuerangeminmag", "valuerangemaxmag"];
const GRID_GEOMETRY: &[&str] = &[
    "xbase", "ybase", "zbase", "xstepsize", "ystepsize", "zstepsize", "xnodes", "ynodes", "znodes",
];
const POINT_FORBIDDEN: &[&str] = &["xbase", "ybase", "zbase", "xnodes", "ynodes", "znodes"];

impl Default for FileHeader {
    fn default() -> Self {
        Self::new(FileVersion::V2)
    }
}

impl FileHeader {
    /// header with every record absent
    pub fn new(version: FileVersion) -> Self {
        Self {
            version,
            title: Field::default(),
            desc: Field::default(),
            mesh_unit: Field::default(),
            mesh_type: Field::default(),
            x_base: Field::default(),
            y_base: Field::default(),
            z_base: Field::default(),
            x_nodes: Field::default(),
            y_nodes: Field::default(),
            z_nodes: Field::default(),
            point_count: Field::default(),
            x_step_size: Field::default(),
            y_step_size: Field::default(),
            z_step_size: Field::default(),
            x_min: Field::default(),
            y_min: Field::default(),
            z_min: Field::default(),
            x_max: Field::default(),
            y_max: Field::default(),
            z_max: Field::default(),
            value_dim: Field::default(),
            value_labels: Field::default(),
            value_units: Field::default(),
            boundary: Field::default(),
            value_unit: Field::default(),
            value_multiplier: Field::default(),
            value_range_min_mag: Field::default(),
            value_range_max_mag: Field::default(),
        }
    }

    pub fn version(&self) -> FileVersion {
        self.version
    }

    /// declared mesh type; 1.0 headers without one are rectangular
    pub fn mesh_type(&self) -> MeshType {
        self.mesh_type.value().unwrap_or(MeshType::Rectangular)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.slot(name).map(|slot| slot.is_set()).unwrap_or(false)
    }

    /// the record `name` as it would be written
    pub fn field(&self, name: &str) -> Option<String> {
        self.slot(name)?.render()
    }

    /// Parse `raw` into record `name`, replacing any previous value.
    pub fn set_field(&mut self, name: &str, raw: &str) -> Result<(), ValidationError> {
        let key = utils::collapse_alnum(name);
        let slot = self.slot_mut(&key).ok_or_else(|| UnknownField::new(name))?;
        if raw.contains('\n') && !Self::is_repeatable(&key) {
            return Err(InvalidFieldValue::new(key, "value spans several lines").into());
        }
        slot.assign(raw).map_err(|reason| InvalidFieldValue::new(key, reason))?;
        Ok(())
    }

    /// Record as read from a file: repeatable records accumulate and any
    /// other repeat is rejected.
    pub(crate) fn record_field(&mut self, key: &str, raw: &str) -> Result<(), ValidationError> {
        let name = Self::FIELD_NAMES
            .iter()
            .copied()
            .find(|name| *name == key)
            .ok_or_else(|| UnknownField::new(key))?;
        let repeatable = Self::is_repeatable(name);

        let slot = self.slot_mut(name).ok_or_else(|| UnknownField::new(key))?;
        let outcome = if !slot.is_set() {
            slot.assign(raw)
        } else if repeatable {
            slot.append(raw)
        } else {
            return Err(DuplicateField::new(name).into());
        };

        outcome.map_err(|reason| InvalidFieldValue::new(name, reason).into())
    }

    pub fn clear_field(&mut self, name: &str) {
        if let Some(slot) = self.slot_mut(name) {
            slot.clear();
        }
    }

    /// `(label, value)` of every present record in emit order
    pub fn records(&self) -> Vec<(&'static str, String)> {
        Self::FIELD_NAMES
            .iter()
            .filter_map(|name| {
                let label = Self::label(name)?;
                let value = self.slot(name)?.render()?;
                Some((label, value))
            })
            .collect()
    }

    /// Check the presence rules for the version and mesh type, and the
    /// sanity of the values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.require(ALWAYS, "every file")?;

        match self.version {
            FileVersion::V2 => {
                self.require(V2_ONLY, "OVF 2.0 files")?;
                self.require(&["meshtype"], "OVF 2.0 files")?;
                self.forbid(V1_ONLY, "OVF 2.0 files")?;
                self.forbid(&["boundary"], "OVF 2.0 files")?;
            }
            FileVersion::V1 => {
                self.require(V1_ONLY, "OVF 1.0 files")?;
                self.forbid(V2_ONLY, "OVF 1.0 files")?;
            }
        }

        match self.mesh_type() {
            MeshType::Rectangular => {
                self.require(GRID_GEOMETRY, "rectangular meshes")?;
                self.forbid(&["pointcount"], "rectangular meshes")?;
                for (name, nodes) in [("xnodes", &self.x_nodes), ("ynodes", &self.y_nodes), ("znodes", &self.z_nodes)] {
                    if nodes.value().unwrap_or(0) < 1 {
                        return Err(InvalidFieldValue::new(name, "node count must be at least 1").into());
                    }
                }
            }
            MeshType::Irregular => {
                self.require(&["pointcount"], "irregular meshes")?;
                self.forbid(POINT_FORBIDDEN, "irregular meshes")?;
                if self.point_count.value().unwrap_or(0) < 0 {
                    return Err(InvalidFieldValue::new("pointcount", "point count must not be negative").into());
                }
            }
        }

        if self.version == FileVersion::V2 {
            let dim = self.value_dim.value().unwrap_or(0);
            if dim < 1 {
                return Err(InvalidFieldValue::new("valuedim", "value dimension must be at least 1").into());
            }
            let dim = dim as usize;

            let units = self.value_units.get().map(Vec::len).unwrap_or(0);
            if units != dim && units != 1 {
                let reason = format!("{} units listed for {} components", units, dim);
                return Err(InvalidFieldValue::new("valueunits", reason).into());
            }
            let labels = self.value_labels.get().map(Vec::len).unwrap_or(0);
            if labels != dim {
                let reason = format!("{} labels listed for {} components", labels, dim);
                return Err(InvalidFieldValue::new("valuelabels", reason).into());
            }
        } else if self.value_multiplier.value() == Some(0.) {
            return Err(InvalidFieldValue::new("valuemultiplier", "multiplier must not be zero").into());
        }

        // one line per record unless the record may repeat
        for name in Self::FIELD_NAMES.iter().copied().filter(|name| !Self::is_repeatable(name)) {
            if self.field(name).map_or(false, |value| value.contains('\n')) {
                return Err(InvalidFieldValue::new(name, "value spans several lines").into());
            }
        }

        Ok(())
    }

    /// first of `names` that is absent
    fn require(&self, names: &[&'static str], context: &'static str) -> Result<(), ValidationError> {
        match names.iter().find(|name| !self.is_set(name)) {
            Some(&name) => Err(MissingField::new(name, context).into()),
            None => Ok(()),
        }
    }

    /// first of `names` that is present
    fn forbid(&self, names: &[&'static str], context: &'static str) -> Result<(), ValidationError> {
        match names.iter().find(|name| self.is_set(name)) {
            Some(&name) => Err(ForbiddenField::new(name, context).into()),
            None => Ok(()),
        }
    }

    /// Validate and describe the records of the data block.
    pub fn record_shape(&self) -> Result<RecordShape, ValidationError> {
        self.validate()?;

        let value_dim = match self.version {
            FileVersion::V1 => 3,
            FileVersion::V2 => self.value_dim.value().unwrap_or(3) as usize,
        };

        let shape = match self.mesh_type() {
            MeshType::Rectangular => {
                let nx = self.x_nodes.value().unwrap_or(1) as usize;
                let ny = self.y_nodes.value().unwrap_or(1) as usize;
                let nz = self.z_nodes.value().unwrap_or(1) as usize;
                let count = nx
                    .checked_mul(ny)
                    .and_then(|n| n.checked_mul(nz))
                    .ok_or_else(|| InvalidFieldValue::new("xnodes", "node count overflows"))?;
                RecordShape {
                    count,
                    value_dim,
                    with_locations: false,
                    dims: Some((nx, ny, nz)),
                }
            }
            MeshType::Irregular => RecordShape {
                count: self.point_count.value().unwrap_or(0) as usize,
                value_dim,
                with_locations: true,
                dims: None,
            },
        };

        Ok(shape)
    }

    /// Copy of this header in another version.
    ///
    /// Going to 1.0 requires three value components: `valuedim` and
    /// `valuelabels` are dropped, the first unit becomes `valueunit`, the
    /// multiplier is 1 and both magnitude records hold the placeholder 0.
    /// Going to 2.0 drops the multiplier, the magnitudes and the boundary;
    /// values stored against a multiplier must be rescaled by the caller
    /// (see [`OvfFile::converted_to`](crate::parse::OvfFile::converted_to)).
    pub fn converted_to(&self, version: FileVersion) -> Result<FileHeader, ValidationError> {
        let mut out = self.clone();
        out.version = version;
        if version == self.version {
            return Ok(out);
        }

        match version {
            FileVersion::V1 => {
                let dim = self.value_dim.value().unwrap_or(3);
                if dim != 3 {
                    let reason = format!("OVF 1.0 stores three value components, not {}", dim);
                    return Err(InvalidFieldValue::new("valuedim", reason).into());
                }
                let unit = self
                    .value_units
                    .get()
                    .and_then(|units| units.first().cloned())
                    .unwrap_or_default();

                out.value_dim.clear();
                out.value_labels.clear();
                out.value_units.clear();
                out.value_unit.set(unit);
                out.value_multiplier.set(1.);
                out.value_range_min_mag.set(0.);
                out.value_range_max_mag.set(0.);
            }
            FileVersion::V2 => {
                let unit = out.value_unit.take().unwrap_or_default();
                out.value_dim.set(3);
                out.value_units.set(vec![unit; 3]);
                out.value_labels.set(vec!["x".to_string(), "y".to_string(), "z".to_string()]);
                out.value_multiplier.clear();
                out.value_range_min_mag.clear();
                out.value_range_max_mag.clear();
                out.boundary.clear();
                out.mesh_type.set(self.mesh_type());
            }
        }

        Ok(out)
    }

    /// `(xmin, ymin, zmin)` to `(xmax, ymax, zmax)`, corners in any order
    pub(crate) fn extent(&self) -> BoundingBox {
        let get = |f: &Field<f64>| f.value().unwrap_or(0.);
        BoundingBox::new(
            Vec3::new(get(&self.x_min), get(&self.y_min), get(&self.z_min)),
            Vec3::new(get(&self.x_max), get(&self.y_max), get(&self.z_max)),
        )
    }

    pub(crate) fn set_extent(&mut self, bbox: &BoundingBox) {
        let (min, max) = bbox.extremes().unwrap_or((Vec3::ZERO, Vec3::ZERO));
        self.x_min.set(min.x);
        self.y_min.set(min.y);
        self.z_min.set(min.z);
        self.x_max.set(max.x);
        self.y_max.set(max.y);
        self.z_max.set(max.z);
    }

    /// declared step; missing y and z steps fall back to the x step
    pub(crate) fn step_size(&self) -> Option<Vec3> {
        let x = self.x_step_size.value()?;
        Some(Vec3::new(
            x,
            self.y_step_size.value().unwrap_or(x),
            self.z_step_size.value().unwrap_or(x),
        ))
    }

    pub(crate) fn set_step_size(&mut self, step: Vec3) {
        self.x_step_size.set(step.x);
        self.y_step_size.set(step.y);
        self.z_step_size.set(step.z);
    }
}
