//! reading OVF 1.0 and 2.0 files
//!
//! The header is read by a small state machine over classified lines:
//!
//! ```text
//! ExpectIdLine -> ExpectSegmentCount -> ExpectBeginSegment -> ExpectBeginHeader
//!     -> ReadingFields (until End: Header) -> Done
//! ```
//!
//! after which the data block named by the next `Begin: Data ...` line is
//! decoded (see [`data`]). Most callers go through [`read_ovf`] or the format
//! [`Registry`](crate::Registry) instead of this module directly.

mod data;
mod error;
mod line_summary;

pub use error::{Encoding, Location, ParseError, ParseErrorKind, Structural};
pub use error::{BadCheckValue, BinaryInTrailer, IncompleteRecord, NonFinite, NonNumeric, ShortRead};
pub use error::{BadFileHeader, DataBlockTooLong, FieldInDataBlock, PrematureEof, UnexpectedLine};
pub use error::UnsupportedSegmentCount;
pub(crate) use line_summary::LineSummary;

use crate::prelude::*;

use crate::header::RecordShape;

use ndarray::Array3;

/// A decoded file: the header, how the data was stored, and the records.
#[derive(Debug, Clone, PartialEq)]
pub struct OvfFile {
    pub header: FileHeader,
    pub data_style: DataStyle,
    pub field: FieldArray,
}

/// Read one OVF file from `reader`. `source` names the input in errors.
pub fn read_ovf<R: BufRead>(reader: R, source: &str) -> Result<OvfFile, Error> {
    let mut lines = LineReader::new(reader, source);
    let header = read_header(&mut lines)?;
    let shape = header
        .record_shape()
        .map_err(|err| lines.error(err))?;
    let data_style = read_data_begin(&mut lines)?;
    let field = data::read_block(&mut lines, data_style, header.version(), &shape)?;
    data::read_trailer(&mut lines, data_style)?;

    info!(
        source,
        version = %header.version(),
        mesh_type = %header.mesh_type(),
        nodes = field.len(),
        data_style = data_style.label(),
        "read ovf file"
    );

    Ok(OvfFile {
        header,
        data_style,
        field,
    })
}

impl OvfFile {
    /// Build a mesh from the records. `filename` is stored in the mesh
    /// metadata.
    ///
    /// Values are stored as read; the 1.0 multiplier travels in
    /// [`MeshInfo::value_multiplier`]. Values with fewer than three
    /// components are zero filled, extra components are dropped.
    pub fn to_mesh(&self, filename: &str) -> Result<AnyMesh, Error> {
        let header = &self.header;
        let shape = header.record_shape()?;
        if self.field.len() != shape.count {
            return Err(mesh::GeometryError::from(mesh::SizeMismatch::new(shape.count, self.field.len())).into());
        }

        let mut info = MeshInfo::new(filename);
        info.title = header.title.get().cloned().unwrap_or_default();
        info.description = header.desc.get().cloned().unwrap_or_default();
        info.mesh_unit = header.mesh_unit.get().cloned().unwrap_or_default();
        info.value_unit = match header.version() {
            FileVersion::V1 => header.value_unit.get().cloned().unwrap_or_default(),
            FileVersion::V2 => header
                .value_units
                .get()
                .and_then(|units| units.first().cloned())
                .unwrap_or_default(),
        };
        info.set_value_multiplier(header.value_multiplier.value().unwrap_or(1.))?;

        let boundary = header.boundary.get().cloned();
        let mut total_range = header.extent();
        if let Some(points) = &boundary {
            for pt in points {
                total_range.expand_with_point(*pt);
            }
        }

        let mut mesh = match shape.dims {
            Some(dims) => AnyMesh::from(self.regular_mesh(info, dims, total_range, boundary)?),
            None => AnyMesh::from(self.irregular_mesh(info, &shape, total_range, boundary)?),
        };

        set_mag_hints(header, &mut mesh)?;
        Ok(mesh)
    }

    fn regular_mesh(
        &self,
        info: MeshInfo,
        dims: (usize, usize, usize),
        mut total_range: BoundingBox,
        boundary: Option<Vec<Vec3>>,
    ) -> Result<RegularGridMesh, Error> {
        let header = &self.header;
        let get = |f: &header::Field<f64>| f.value().unwrap_or(0.);
        let base = Vec3::new(get(&header.x_base), get(&header.y_base), get(&header.z_base));
        let step = header
            .step_size()
            .unwrap_or_else(|| Vec3::splat(1.))
            .map(|s| if s == 0. { 1. } else { s });
        mesh::check_step(step)?;

        let (nx, ny, nz) = dims;
        let last = base + step.scale_by(&Vec3::new((nx - 1) as f64, (ny - 1) as f64, (nz - 1) as f64));
        let data_range = BoundingBox::new(base, last);
        total_range.expand_with(&data_range);

        let grid = Array3::from_shape_fn((nz, ny, nx), |(k, j, i)| self.field.value_vec3((k * ny + j) * nx + i));
        let mut mesh = RegularGridMesh::from_parts(info, grid, base, step, data_range, total_range);
        if let Some(points) = boundary {
            mesh.set_boundary_list(points);
        }
        Ok(mesh)
    }

    fn irregular_mesh(
        &self,
        info: MeshInfo,
        shape: &RecordShape,
        total_range: BoundingBox,
        boundary: Option<Vec<Vec3>>,
    ) -> Result<IrregularMesh, Error> {
        let mut mesh = IrregularMesh::new(info);
        if let Some(points) = boundary {
            mesh.set_boundary_list(points);
        }
        mesh.set_boundary_range(total_range);

        if let Some(step) = self.header.step_size() {
            if step.x > 0. || step.y > 0. || step.z > 0. {
                mesh.set_step_hints(step)?;
            }
        }

        for node in 0..shape.count {
            let location = self.field.location(node).unwrap_or(Vec3::ZERO);
            mesh.add_point(LocatedVector::new(location, self.field.value_vec3(node)));
        }
        mesh.sort_points();
        Ok(mesh)
    }

    /// Copy in another file version. Going from 1.0 to 2.0 folds the value
    /// multiplier into the stored values.
    pub fn converted_to(&self, version: FileVersion) -> Result<OvfFile, Error> {
        let header = self.header.converted_to(version)?;
        let mut field = self.field.clone();
        if self.header.version() == FileVersion::V1 && version == FileVersion::V2 {
            field.scale_values(self.header.value_multiplier.value().unwrap_or(1.));
        }
        Ok(OvfFile {
            header,
            data_style: self.data_style,
            field,
        })
    }
}

/// hints declared by a 1.0 header, else the span of the non-zero data
fn set_mag_hints(header: &FileHeader, mesh: &mut AnyMesh) -> Result<(), Error> {
    let mult = mesh.info().value_multiplier().abs();
    if let (Some(min), Some(max)) = (header.value_range_min_mag.value(), header.value_range_max_mag.value()) {
        if (min != 0. || max != 0.) && mesh.info_mut().set_mag_hints(min * mult, max * mult).is_ok() {
            return Ok(());
        }
    }

    let (min, max) = mesh
        .nonzero_value_mag_span()
        .map(|span| (span.min_mag, span.max_mag))
        .unwrap_or((0., 0.));
    mesh.info_mut().set_mag_hints(min, max)
}

/// Source of classified text lines with raw byte access for binary blocks.
pub(crate) struct LineReader<R> {
    inner: R,
    source: String,
    line: Option<usize>,
    buffer: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub(crate) fn new(inner: R, source: &str) -> Self {
        Self {
            inner,
            source: source.to_string(),
            line: Some(0),
            buffer: Vec::new(),
        }
    }

    pub(crate) fn location(&self) -> Location {
        Location {
            source: self.source.clone(),
            line: self.line,
        }
    }

    pub(crate) fn error<K: Into<ParseErrorKind>>(&self, kind: K) -> Error {
        ParseError::new(self.location(), kind).into()
    }

    pub(crate) fn structural<K: Into<Structural>>(&self, kind: K) -> Error {
        self.error(ParseErrorKind::Structural(kind.into()))
    }

    pub(crate) fn encoding<K: Into<Encoding>>(&self, kind: K) -> Error {
        self.error(ParseErrorKind::Encoding(kind.into()))
    }

    /// next line without its terminator, `None` at end of input
    pub(crate) fn next_line(&mut self) -> Result<Option<String>, Error> {
        self.buffer.clear();
        let read = self.inner.read_until(b'\n', &mut self.buffer)?;
        if read == 0 {
            return Ok(None);
        }
        if let Some(line) = self.line.as_mut() {
            *line += 1;
        }

        while matches!(self.buffer.last(), Some(b'\n') | Some(b'\r')) {
            self.buffer.pop();
        }
        Ok(Some(String::from_utf8_lossy(&self.buffer).into_owned()))
    }

    /// next line that carries a record or other content
    pub(crate) fn next_content(&mut self) -> Result<Option<(Content, String)>, Error> {
        while let Some(line) = self.next_line()? {
            match classify(&line) {
                Content::Blank | Content::Comment => continue,
                content => return Ok(Some((content, line))),
            }
        }
        Ok(None)
    }

    /// the next line as a record, skipping anything that is not one
    pub(crate) fn next_record(&mut self) -> Result<Option<(Record, String)>, Error> {
        while let Some((content, line)) = self.next_content()? {
            if let Content::Record(record) = content {
                return Ok(Some((record, line)));
            }
        }
        Ok(None)
    }

    /// raw access for binary payloads; line numbers are unknown afterwards
    pub(crate) fn raw(&mut self) -> &mut R {
        self.line = None;
        &mut self.inner
    }

    /// skip ascii whitespace and peek at the following byte
    pub(crate) fn peek_past_whitespace(&mut self) -> Result<Option<u8>, Error> {
        loop {
            let available = self.inner.fill_buf()?;
            if available.is_empty() {
                return Ok(None);
            }
            match available.iter().position(|b| !b.is_ascii_whitespace()) {
                Some(pos) => {
                    let byte = available[pos];
                    self.inner.consume(pos);
                    return Ok(Some(byte));
                }
                None => {
                    let len = available.len();
                    self.inner.consume(len);
                }
            }
        }
    }
}

/// A `# field: value` line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Record {
    /// alphanumerics of the name, lowercased
    pub field: String,
    pub value: String,
}

impl Record {
    pub(crate) fn is(&self, field: &str, value: &str) -> bool {
        self.field == field && self.value == value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Content {
    Blank,
    /// a line whose `#` is doubled
    Comment,
    Record(Record),
    /// a line without `#`, or a `#` line without a colon
    Other,
}

/// Classify one header line.
///
/// The value of a record loses its leading whitespace and, except for
/// `desc`, a trailing `##` comment and the whitespace before it. The values
/// of `begin` and `end` are collapsed to lowercase alphanumerics.
pub(crate) fn classify(line: &str) -> Content {
    let line = line.trim();
    if line.is_empty() {
        return Content::Blank;
    }

    let rest = match line.strip_prefix('#') {
        Some(rest) => rest,
        None => return Content::Other,
    };
    if rest.starts_with('#') {
        return Content::Comment;
    }

    let (name, value) = match rest.split_once(':') {
        Some(split) => split,
        None => return Content::Other,
    };
    let field = utils::collapse_alnum(name);
    let value = value.trim_start();

    let value = if field == "desc" {
        value.to_string()
    } else {
        let value = match value.find("##") {
            Some(pos) => &value[..pos],
            None => value,
        };
        let value = value.trim_end();
        if field == "begin" || field == "end" {
            utils::collapse_alnum(value)
        } else {
            value.to_string()
        }
    };

    Content::Record(Record { field, value })
}

fn read_header<R: BufRead>(lines: &mut LineReader<R>) -> Result<FileHeader, Error> {
    #[derive(Debug, Clone, Copy, PartialEq)]
    enum State {
        ExpectIdLine,
        ExpectSegmentCount,
        ExpectBeginSegment,
        ExpectBeginHeader,
        ReadingFields,
        Done,
    }

    let mut state = State::ExpectIdLine;
    let mut header = FileHeader::default();

    while state != State::Done {
        if state == State::ExpectIdLine {
            let line = match lines.next_line()? {
                Some(line) => line,
                None => return Err(lines.structural(UnexpectedLine::new("an OVF identification line", LineSummary::eof()))),
            };
            let version = FileVersion::detect(&line).ok_or_else(|| {
                lines.structural(UnexpectedLine::new("an OVF identification line", LineSummary::new(&line)))
            })?;
            header = FileHeader::new(version);
            state = State::ExpectSegmentCount;
            continue;
        }

        let expected = match state {
            State::ExpectSegmentCount => "`Segment count: 1`",
            State::ExpectBeginSegment => "`Begin: Segment`",
            State::ExpectBeginHeader => "`Begin: Header`",
            _ => "a header field or `End: Header`",
        };

        let (record, line) = match lines.next_record()? {
            Some(next) => next,
            None => return Err(lines.structural(UnexpectedLine::new(expected, LineSummary::eof()))),
        };
        let unexpected = || lines.structural(UnexpectedLine::new(expected, LineSummary::new(&line)));

        state = match state {
            State::ExpectSegmentCount if record.field == "segmentcount" => {
                if record.value.trim() != "1" {
                    return Err(lines.structural(UnsupportedSegmentCount::new(record.value)));
                }
                State::ExpectBeginSegment
            }
            State::ExpectBeginSegment if record.is("begin", "segment") => State::ExpectBeginHeader,
            State::ExpectBeginHeader if record.is("begin", "header") => State::ReadingFields,
            State::ReadingFields if record.is("end", "header") => State::Done,
            State::ReadingFields if record.field != "begin" && record.field != "end" => {
                header
                    .record_field(&record.field, &record.value)
                    .map_err(|err| lines.error(err))?;
                State::ReadingFields
            }
            _ => return Err(unexpected()),
        };
    }

    Ok(header)
}

fn read_data_begin<R: BufRead>(lines: &mut LineReader<R>) -> Result<DataStyle, Error> {
    let expected = "`Begin: Data Text`, `Begin: Data Binary 4` or `Begin: Data Binary 8`";
    match lines.next_record()? {
        Some((record, line)) => {
            if record.field == "begin" {
                if let Some(style) = DataStyle::from_marker(&record.value) {
                    return Ok(style);
                }
            }
            Err(lines.structural(UnexpectedLine::new(expected, LineSummary::new(&line))))
        }
        None => Err(lines.structural(UnexpectedLine::new(expected, LineSummary::eof()))),
    }
}
