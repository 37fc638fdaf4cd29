use approx::assert_relative_eq;
use ovf::prelude::*;
use std::io::Cursor;

fn two_node_grid() -> RegularGridMesh {
    let mut mesh = RegularGridMesh::new(MeshInfo::new("pair"), (2, 1, 1), Vec3::ZERO, Vec3::splat(1.)).unwrap();
    mesh.set(0, 0, 0, Vec3::new(1., 0., 0.)).unwrap();
    mesh.set(1, 0, 0, Vec3::new(0., 1., 0.)).unwrap();
    mesh
}

fn random_grid(dims: (usize, usize, usize)) -> RegularGridMesh {
    let info = MeshInfo::new("random").title("random field").mesh_unit("m").value_unit("A/m");
    let step = Vec3::new(2.5e-9, 2.5e-9, 1e-8);
    let mut mesh = RegularGridMesh::new(info, dims, Vec3::new(-1e-8, 0., 5e-9), step).unwrap();

    // a fixed irrational walk; the values only need to be awkward to print
    let mut x = 0.1f64;
    let (nx, ny, nz) = dims;
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                x = (x * 3.987_654_321 + 0.123_456_789).fract();
                mesh.set(i, j, k, Vec3::new(x * 8e5, -x / 3., 1e-300 * x)).unwrap();
            }
        }
    }
    mesh
}

fn three_points() -> IrregularMesh {
    let mut mesh = IrregularMesh::new(MeshInfo::new("points").mesh_unit("nm"));
    mesh.add_point(LocatedVector::new(Vec3::new(0., 0., 0.), Vec3::new(1., 2., 3.)));
    mesh.add_point(LocatedVector::new(Vec3::new(5., 1., 0.), Vec3::new(-1., 0., 0.5)));
    mesh.add_point(LocatedVector::new(Vec3::new(2., 7., 1.), Vec3::new(0., 0., -4.)));
    mesh
}

fn write_then_read(mesh: &dyn Mesh, options: &WriteOptions) -> (Vec<u8>, ovf::OvfFile) {
    let mut bytes = Vec::new();
    ovf::write_mesh(&mut bytes, mesh, options).unwrap();
    let file = ovf::read_ovf(Cursor::new(&bytes), "memory").unwrap();
    (bytes, file)
}

#[test]
fn two_node_grid_binary8() {
    let (_, file) = write_then_read(&two_node_grid(), &WriteOptions::default());
    assert_eq!(file.header.x_nodes.value(), Some(2));
    assert_eq!(file.header.y_nodes.value(), Some(1));
    assert_eq!(file.header.z_nodes.value(), Some(1));
    assert_eq!(file.data_style, DataStyle::Binary8);

    let mesh = file.to_mesh("memory").unwrap();
    let values: Vec<Vec3> = mesh.as_regular().unwrap().grid().iter().copied().collect();
    assert_eq!(values, vec![Vec3::new(1., 0., 0.), Vec3::new(0., 1., 0.)]);
}

#[test]
fn three_points_version_one_text() {
    let options = WriteOptions::default()
        .version(FileVersion::V1)
        .data_style(DataStyle::Text);
    let (bytes, file) = write_then_read(&three_points(), &options);

    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with("# OOMMF: irregular mesh v1.0\n"));
    assert!(!text.contains("valuedim"));

    assert_eq!(file.header.point_count.value(), Some(3));
    let mesh = file.to_mesh("memory").unwrap();
    let read: Vec<LocatedVector> = mesh.points().map(|(_, point)| point).collect();
    assert_eq!(read, three_points().samples().to_vec());
}

#[test]
fn every_version_and_style() {
    let grid = random_grid((4, 3, 2));
    let styles = [DataStyle::Text, DataStyle::Binary4, DataStyle::Binary8];

    for version in [FileVersion::V1, FileVersion::V2] {
        for style in styles {
            let options = WriteOptions::default().version(version).data_style(style);
            let (_, file) = write_then_read(&grid, &options);
            assert_eq!(file.header.version(), version);

            let mesh = file.to_mesh("memory").unwrap();
            let read = mesh.as_regular().unwrap();
            assert_eq!(read.dims(), grid.dims());
            assert_eq!(read.base(), grid.base());
            assert_eq!(read.step(), grid.step());
            assert_eq!(mesh.info().title, "random field");
            assert_eq!(mesh.info().mesh_unit, "m");
            assert_eq!(mesh.info().value_unit, "A/m");

            for (a, b) in read.grid().iter().zip(grid.grid().iter()) {
                if style == DataStyle::Binary4 {
                    assert_relative_eq!(a.x, b.x, max_relative = 1e-6);
                    assert_relative_eq!(a.y, b.y, max_relative = 1e-6);
                } else {
                    assert_eq!(a, b);
                }
            }
        }
    }
}

#[test]
fn header_fields_survive() {
    let grid = random_grid((2, 2, 2));
    let options = WriteOptions::default().description("line one\nline two");
    let (header, field) = ovf::mesh_records(&grid, &options).unwrap();

    for style in [DataStyle::Text, DataStyle::Binary4, DataStyle::Binary8] {
        let mut bytes = Vec::new();
        ovf::write_ovf(&mut bytes, &header, style, &field, TextFormat::Shortest).unwrap();
        let file = ovf::read_ovf(Cursor::new(bytes), "memory").unwrap();
        assert_eq!(file.header, header);
        assert_eq!(file.header.desc.get().map(String::as_str), Some("line one\nline two"));
    }
}

#[test]
fn vector_fields_of_other_dimensions() {
    let mut header = FileHeader::new(FileVersion::V2);
    header.title.set("scalars".to_string());
    header.mesh_unit.set("m".to_string());
    header.mesh_type.set(MeshType::Rectangular);
    for name in ["xbase", "ybase", "zbase", "xmin", "ymin", "zmin"] {
        header.set_field(name, "0").unwrap();
    }
    for name in ["xstepsize", "ystepsize", "zstepsize"] {
        header.set_field(name, "1").unwrap();
    }
    for (name, value) in [("xnodes", "3"), ("ynodes", "1"), ("znodes", "1")] {
        header.set_field(name, value).unwrap();
    }
    for (name, value) in [("xmax", "3"), ("ymax", "1"), ("zmax", "1")] {
        header.set_field(name, value).unwrap();
    }
    header.set_field("valuedim", "1").unwrap();
    header.set_field("valueunits", "J/m^3").unwrap();
    header.set_field("valuelabels", "{Energy density}").unwrap();

    let values = ndarray::arr2(&[[0.25], [-1.5], [1e-12]]);
    let field = FieldArray::regular(values);

    let mut bytes = Vec::new();
    ovf::write_ovf(&mut bytes, &header, DataStyle::Binary4, &field, TextFormat::Shortest).unwrap();
    let file = ovf::read_ovf(Cursor::new(bytes), "memory").unwrap();
    assert_eq!(file.header.value_labels.get(), Some(&vec!["Energy density".to_string()]));
    assert_eq!(file.field.value_dim(), 1);
    assert_relative_eq!(file.field.value(2)[0], 1e-12, max_relative = 1e-6);

    let mesh = file.to_mesh("memory").unwrap();
    assert_eq!(mesh.node(1).unwrap().value, Vec3::new(-1.5, 0., 0.));
}

#[test]
fn corrupted_check_value() {
    let mut bytes = Vec::new();
    ovf::write_mesh(&mut bytes, &two_node_grid(), &WriteOptions::default()).unwrap();

    let begin = b"# Begin: Data Binary 8\n";
    let start = bytes.windows(begin.len()).position(|w| w == begin).unwrap() + begin.len();
    bytes[start..start + 8].reverse();

    let err = ovf::read_ovf(Cursor::new(bytes), "swapped.ovf").unwrap_err();
    assert_eq!(err.kind(), ovf::ErrorKind::Encoding);
    assert!(err.to_string().contains("byte order"));
}

#[test]
fn multiplier_is_applied_on_write() {
    let mut grid = two_node_grid();
    grid.info_mut().set_value_multiplier(1000.).unwrap();

    let options = WriteOptions::default().version(FileVersion::V1).data_style(DataStyle::Text);
    let (_, file) = write_then_read(&grid, &options);
    assert_eq!(file.header.value_multiplier.value(), Some(1.));

    let mesh = file.to_mesh("memory").unwrap();
    assert_eq!(mesh.node(0).unwrap().value, Vec3::new(1000., 0., 0.));
    assert_eq!(mesh.info().mag_hints(), (1000., 1000.));
}

#[test]
fn version_conversion_of_files() {
    let options = WriteOptions::default().version(FileVersion::V1).data_style(DataStyle::Text);
    let (_, file) = write_then_read(&three_points(), &options);

    let upgraded = file.converted_to(FileVersion::V2).unwrap();
    assert_eq!(upgraded.header.version(), FileVersion::V2);
    assert_eq!(upgraded.header.value_dim.value(), Some(3));
    assert!(upgraded.header.validate().is_ok());

    let mut bytes = Vec::new();
    ovf::write_ovf(&mut bytes, &upgraded.header, DataStyle::Binary8, &upgraded.field, TextFormat::Shortest).unwrap();
    let reread = ovf::read_ovf(Cursor::new(bytes), "memory").unwrap();
    assert_eq!(reread.field, file.field);
}
