use crate::prelude::*;

use crate::data::BinaryWord;
use crate::header::RecordShape;

use std::io;

/// nodes encoded per write
const STRIDE: usize = 1024;

#[derive(Debug, thiserror::Error, From)]
pub enum WriteError {
    #[error("{0}")]
    Device(Device),
    #[error("{0}")]
    RecordMismatch(RecordMismatch),
}

impl WriteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WriteError::Device(_) => ErrorKind::Encoding,
            WriteError::RecordMismatch(_) => ErrorKind::Structural,
        }
    }
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "write error (device full?): {io}")]
pub struct Device {
    io: io::Error,
}

#[derive(Display, Debug, Constructor)]
#[display(
    fmt = "records do not match the header: {found_count} records of width {found_width}, header declares {count} of width {width}"
)]
pub struct RecordMismatch {
    found_count: usize,
    found_width: usize,
    count: usize,
    width: usize,
}

pub(crate) fn device(err: io::Error) -> Error {
    WriteError::from(Device::new(err)).into()
}

/// Choices for [`write_mesh`].
///
/// ```
/// use ovf::prelude::*;
///
/// let options = WriteOptions::default()
///     .version(FileVersion::V1)
///     .data_style(DataStyle::Text)
///     .text_format(TextFormat::Precision(17));
/// assert_eq!(options.data_style, DataStyle::Text);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    pub version: FileVersion,
    pub data_style: DataStyle,
    pub text_format: TextFormat,
    /// write rectangular meshes as located points
    pub force_irregular: bool,
    /// replaces the title of the mesh
    pub title: Option<String>,
    /// replaces the description of the mesh
    pub description: Option<String>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            version: FileVersion::V2,
            data_style: DataStyle::Binary8,
            text_format: TextFormat::Shortest,
            force_irregular: false,
            title: None,
            description: None,
        }
    }
}

impl WriteOptions {
    #[must_use]
    pub fn version(mut self, version: FileVersion) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn data_style(mut self, data_style: DataStyle) -> Self {
        self.data_style = data_style;
        self
    }

    #[must_use]
    pub fn text_format(mut self, text_format: TextFormat) -> Self {
        self.text_format = text_format;
        self
    }

    #[must_use]
    pub fn force_irregular(mut self, force_irregular: bool) -> Self {
        self.force_irregular = force_irregular;
        self
    }

    #[must_use]
    pub fn title<T: Into<String>>(mut self, title: T) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description<T: Into<String>>(mut self, description: T) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Write a header and its records.
///
/// The header is validated first and the records must have the count and
/// width it declares. Nothing is written when either check fails.
pub fn write_ovf<W: Write>(
    mut writer: W,
    header: &FileHeader,
    style: DataStyle,
    field: &FieldArray,
    text_format: TextFormat,
) -> Result<(), Error> {
    let shape = header.record_shape()?;
    if field.len() != shape.count || field.record_width() != shape.width() || field.has_locations() != shape.with_locations {
        let err = RecordMismatch::new(field.len(), field.record_width(), shape.count, shape.width());
        return Err(WriteError::from(err).into());
    }

    write_header(&mut writer, header).map_err(device)?;

    writeln!(writer, "# Begin: Data {}", style.label()).map_err(device)?;
    let payload = match style {
        DataStyle::Text => write_text(&mut writer, field, text_format),
        DataStyle::Binary4 => write_binary::<f32, _>(&mut writer, field, header.version(), &shape),
        DataStyle::Binary8 => write_binary::<f64, _>(&mut writer, field, header.version(), &shape),
    };
    payload.map_err(device)?;
    writeln!(writer, "# End: Data {}", style.label()).map_err(device)?;
    writeln!(writer, "# End: Segment").map_err(device)?;
    writer.flush().map_err(device)?;

    debug!(
        version = %header.version(),
        nodes = field.len(),
        data_style = style.label(),
        "wrote ovf file"
    );
    Ok(())
}

fn write_header<W: Write>(writer: &mut W, header: &FileHeader) -> io::Result<()> {
    writeln!(writer, "{}", header.version().id_line(header.mesh_type()))?;
    writeln!(writer, "# Segment count: 1")?;
    writeln!(writer, "# Begin: Segment")?;
    writeln!(writer, "# Begin: Header")?;

    for (label, value) in header.records() {
        if FileHeader::is_repeatable(&utils::collapse_alnum(label)) {
            for line in value.split('\n') {
                writeln!(writer, "# {}: {}", label, line)?;
            }
        } else {
            writeln!(writer, "# {}: {}", label, value)?;
        }
    }

    writeln!(writer, "# End: Header")
}

fn write_text<W: Write>(writer: &mut W, field: &FieldArray, format: TextFormat) -> io::Result<()> {
    let mut text = String::new();
    let mut record = Vec::with_capacity(field.record_width());

    for first in (0..field.len()).step_by(STRIDE) {
        text.clear();
        for node in first..(first + STRIDE).min(field.len()) {
            record.clear();
            field.extend_record(node, &mut record);
            for (c, value) in record.iter().enumerate() {
                if c > 0 {
                    text.push(' ');
                }
                format.push(*value, &mut text);
            }
            text.push('\n');
        }
        writer.write_all(text.as_bytes())?;
    }

    Ok(())
}

fn write_binary<F: BinaryWord, W: Write>(
    writer: &mut W,
    field: &FieldArray,
    version: FileVersion,
    shape: &RecordShape,
) -> io::Result<()> {
    let order = version.byte_order();
    let mut bytes = Vec::with_capacity(STRIDE.min(shape.count).max(1) * shape.width() * F::SIZE);
    F::CHECK_VALUE.encode(order, &mut bytes);

    let mut record = Vec::with_capacity(shape.width());
    for first in (0..field.len()).step_by(STRIDE) {
        for node in first..(first + STRIDE).min(field.len()) {
            record.clear();
            field.extend_record(node, &mut record);
            for value in &record {
                F::narrow(*value).encode(order, &mut bytes);
            }
        }
        writer.write_all(&bytes)?;
        bytes.clear();
    }

    // check value alone when there are no records
    writer.write_all(&bytes)?;
    writer.write_all(b"\n")
}

/// Write a mesh.
///
/// The header is built from the mesh geometry: range, base point, step and
/// node counts of a regular grid, or point count and step hints of a point
/// cloud. Values are written multiplied by the value multiplier, so 1.0
/// output always declares a multiplier of 1 and placeholder magnitudes of 0.
/// An explicit boundary is kept in 1.0 output.
pub fn write_mesh<W: Write, M: Mesh + ?Sized>(writer: W, mesh: &M, options: &WriteOptions) -> Result<(), Error> {
    let (header, field) = mesh_records(mesh, options)?;
    write_ovf(writer, &header, options.data_style, &field, options.text_format)
}

/// header and records [`write_mesh`] would write
pub fn mesh_records<M: Mesh + ?Sized>(mesh: &M, options: &WriteOptions) -> Result<(FileHeader, FieldArray), Error> {
    let info = mesh.info();
    let grid = mesh.as_regular_grid().filter(|_| !options.force_irregular);

    let mut header = FileHeader::new(FileVersion::V2);
    header.title.set(options.title.clone().unwrap_or_else(|| info.title.clone()));

    let description = options.description.clone().unwrap_or_else(|| info.description.clone());
    if description.is_empty() {
        header
            .desc
            .set(format!("OVF file created by {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")));
    } else {
        header.desc.set(description);
    }

    let mesh_unit = if info.mesh_unit.is_empty() { "unknown" } else { info.mesh_unit.as_str() };
    header.mesh_unit.set(mesh_unit.to_string());

    match grid {
        Some(grid) => {
            let (nx, ny, nz) = grid.dims();
            header.mesh_type.set(MeshType::Rectangular);
            header.x_base.set(grid.base().x);
            header.y_base.set(grid.base().y);
            header.z_base.set(grid.base().z);
            header.set_step_size(grid.step());
            header.x_nodes.set(nx as i64);
            header.y_nodes.set(ny as i64);
            header.z_nodes.set(nz as i64);
        }
        None => {
            let mut step = mesh.nominal_step();
            if step.x == 0. {
                step = mesh.approximate_cell_dimensions();
            }
            header.mesh_type.set(MeshType::Irregular);
            header.point_count.set(mesh.len() as i64);
            header.set_step_size(step);
        }
    }

    header.set_extent(&mesh.precise_range());
    header.value_dim.set(3);
    header.value_labels.set(vec!["x".to_string(), "y".to_string(), "z".to_string()]);
    header.value_units.set(vec![info.value_unit.clone(); 3]);

    if options.version == FileVersion::V1 {
        header = header.converted_to(FileVersion::V1)?;
        if !mesh.is_boundary_from_data() {
            header.boundary.set(mesh.boundary_list());
        }
    }

    let mult = info.value_multiplier();
    let mut field = FieldArray::zeros(mesh.len(), 3, grid.is_none());
    let mut record = Vec::with_capacity(6);
    for (cursor, point) in crate::iter::Points::new(mesh) {
        record.clear();
        if grid.is_none() {
            record.extend(point.location.to_array());
        }
        record.extend((point.value * mult).to_array());
        field.set_record(cursor.node(), &record);
    }

    Ok((header, field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn two_node_grid() -> RegularGridMesh {
        let mut mesh = RegularGridMesh::new(MeshInfo::new("grid"), (2, 1, 1), Vec3::ZERO, Vec3::splat(1.)).unwrap();
        mesh.set(0, 0, 0, Vec3::new(1., 0., 0.)).unwrap();
        mesh.set(1, 0, 0, Vec3::new(0., 1., 0.)).unwrap();
        mesh
    }

    #[test]
    fn header_layout() {
        let mut out = Vec::new();
        write_mesh(&mut out, &two_node_grid(), &WriteOptions::default().data_style(DataStyle::Text)).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "# OOMMF OVF 2.0");
        assert_eq!(lines[1], "# Segment count: 1");
        assert_eq!(lines[4], "# Title: grid");
        assert!(lines.contains(&"# meshunit: unknown"));
        assert!(lines.contains(&"# xnodes: 2"));
        assert!(lines.contains(&"# Begin: Data Text"));
        assert_eq!(lines[lines.len() - 3], "0.0 1.0 0.0");
        assert_eq!(lines[lines.len() - 1], "# End: Segment");
    }

    #[test]
    fn multiline_description() {
        let options = WriteOptions::default()
            .version(FileVersion::V1)
            .data_style(DataStyle::Text)
            .description("one\ntwo");
        let mut out = Vec::new();
        write_mesh(&mut out, &two_node_grid(), &options).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("# OOMMF: rectangular mesh v1.0\n"));
        assert!(text.contains("# Desc: one\n# Desc: two\n"));
        assert!(text.contains("# ValueRangeMaxMag: 0.0\n"));
    }

    #[test]
    fn binary_block_layout() {
        let mut out = Vec::new();
        write_mesh(&mut out, &two_node_grid(), &WriteOptions::default()).unwrap();

        let begin = b"# Begin: Data Binary 8\n";
        let start = out.windows(begin.len()).position(|w| w == begin).unwrap() + begin.len();
        assert_eq!(&out[start..start + 8], &123_456_789_012_345f64.to_le_bytes());
        assert_eq!(&out[start + 8..start + 16], &1f64.to_le_bytes());
        assert_eq!(&out[start + 56..start + 58], b"\n#");
    }

    #[test]
    fn records_must_match_header() {
        let (header, _) = mesh_records(&two_node_grid(), &WriteOptions::default()).unwrap();
        let wrong = FieldArray::zeros(3, 3, false);
        let err = write_ovf(Cursor::new(Vec::new()), &header, DataStyle::Text, &wrong, TextFormat::Shortest).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
    }

    #[test]
    fn device_errors() {
        struct Full;
        impl Write for Full {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "no space left"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let err = write_mesh(Full, &two_node_grid(), &WriteOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert!(err.to_string().contains("device full"));
    }

    #[test]
    fn forced_irregular_output() {
        let options = WriteOptions::default().force_irregular(true);
        let (header, field) = mesh_records(&two_node_grid(), &options).unwrap();
        assert_eq!(header.mesh_type(), MeshType::Irregular);
        assert_eq!(header.point_count.value(), Some(2));
        assert_eq!(header.x_step_size.value(), Some(1.));
        assert_eq!(field.location(1), Some(Vec3::new(1., 0., 0.)));
    }
}
