use ovf::header::ValidationError;
use ovf::prelude::*;
use std::io::Cursor;

const ALWAYS: &[&str] = &["title", "meshunit", "xmin", "ymin", "zmin", "xmax", "ymax", "zmax"];
const GRID: &[&str] = &[
    "xbase", "ybase", "zbase", "xstepsize", "ystepsize", "zstepsize", "xnodes", "ynodes", "znodes",
];
const V1: &[&str] = &["valueunit", "valuemultiplier", "valuerangeminmag", "valuerangemaxmag"];
const V2: &[&str] = &["meshtype", "valuedim", "valueunits", "valuelabels"];

fn valid_header(version: FileVersion, mesh_type: MeshType) -> FileHeader {
    let grid = RegularGridMesh::new(MeshInfo::new("valid").mesh_unit("m"), (2, 2, 1), Vec3::ZERO, Vec3::splat(1.))
        .unwrap();
    let options = WriteOptions::default()
        .version(version)
        .force_irregular(mesh_type == MeshType::Irregular);
    let (header, _) = ovf::mesh_records(&grid, &options).unwrap();
    assert!(header.validate().is_ok());
    header
}

fn required(version: FileVersion, mesh_type: MeshType) -> Vec<&'static str> {
    let mut names = ALWAYS.to_vec();
    names.extend_from_slice(if version == FileVersion::V1 { V1 } else { V2 });
    match mesh_type {
        MeshType::Rectangular => names.extend_from_slice(GRID),
        MeshType::Irregular => names.push("pointcount"),
    }
    names
}

#[test]
fn removing_any_required_field_fails() {
    for version in [FileVersion::V1, FileVersion::V2] {
        for mesh_type in [MeshType::Rectangular, MeshType::Irregular] {
            let header = valid_header(version, mesh_type);
            for name in required(version, mesh_type) {
                let mut broken = header.clone();
                broken.clear_field(name);

                match broken.validate() {
                    Err(ValidationError::MissingField(missing)) => assert_eq!(missing.field(), name),
                    other => panic!("{} {} without `{}`: {:?}", version, mesh_type, name, other),
                }
            }
        }
    }
}

#[test]
fn forbidden_fields() {
    let mut header = valid_header(FileVersion::V2, MeshType::Rectangular);
    header.set_field("valuemultiplier", "2").unwrap();
    assert!(matches!(header.validate(), Err(ValidationError::ForbiddenField(_))));

    let mut header = valid_header(FileVersion::V2, MeshType::Rectangular);
    header.set_field("boundary", "0 0 0 1 1 1").unwrap();
    assert!(matches!(header.validate(), Err(ValidationError::ForbiddenField(_))));

    let mut header = valid_header(FileVersion::V1, MeshType::Rectangular);
    header.set_field("pointcount", "4").unwrap();
    let err = header.validate().unwrap_err();
    assert_eq!(err.kind(), ovf::ErrorKind::Structural);

    let mut header = valid_header(FileVersion::V1, MeshType::Irregular);
    header.set_field("xnodes", "4").unwrap();
    assert!(matches!(header.validate(), Err(ValidationError::ForbiddenField(f)) if f.field() == "xnodes"));
}

#[test]
fn value_sanity() {
    let mut header = valid_header(FileVersion::V2, MeshType::Rectangular);
    header.set_field("valuelabels", "a b").unwrap();
    assert_eq!(header.validate().unwrap_err().kind(), ovf::ErrorKind::Encoding);

    let mut header = valid_header(FileVersion::V2, MeshType::Rectangular);
    header.set_field("valueunits", "T").unwrap();
    assert!(header.validate().is_ok());

    let mut header = valid_header(FileVersion::V2, MeshType::Rectangular);
    header.set_field("ynodes", "0").unwrap();
    assert!(header.validate().is_err());

    let mut header = valid_header(FileVersion::V1, MeshType::Rectangular);
    header.set_field("valuemultiplier", "0").unwrap();
    assert!(header.validate().is_err());

    let mut header = valid_header(FileVersion::V2, MeshType::Irregular);
    header.set_field("pointcount", "0").unwrap();
    assert!(header.validate().is_ok());

    let mut header = valid_header(FileVersion::V2, MeshType::Rectangular);
    assert!(header.set_field("xbase", "left").is_err());
    assert!(header.set_field("not a field", "1").is_err());
}

fn file_with_header_lines(extra: &str) -> String {
    format!(
        "# OOMMF OVF 2.0\n# Segment count: 1\n# Begin: Segment\n# Begin: Header\n# Title: t\n{}\
         # meshtype: irregular\n# pointcount: 0\n# meshunit: m\n# valuedim: 3\n\
         # valueunits: A/m\n# valuelabels: x y z\n# xmin: 0\n# ymin: 0\n# zmin: 0\n\
         # xmax: 1\n# ymax: 1\n# zmax: 1\n# End: Header\n# Begin: Data Text\n\
         # End: Data Text\n# End: Segment\n",
        extra
    )
}

#[test]
fn header_records_when_reading() {
    let file = ovf::read_ovf(Cursor::new(file_with_header_lines("")), "ok.ovf").unwrap();
    assert_eq!(file.field.len(), 0);

    let file = ovf::read_ovf(Cursor::new(file_with_header_lines("# Desc: a\n## note\n# desc: b\n")), "desc.ovf").unwrap();
    assert_eq!(file.header.desc.get().map(String::as_str), Some("a\nb"));

    let err = ovf::read_ovf(Cursor::new(file_with_header_lines("# Title: again\n")), "dup.ovf").unwrap_err();
    assert_eq!(err.kind(), ovf::ErrorKind::Structural);
    assert!(err.to_string().contains("dup.ovf:6"));

    let err = ovf::read_ovf(Cursor::new(file_with_header_lines("# colour: blue\n")), "unknown.ovf").unwrap_err();
    assert_eq!(err.kind(), ovf::ErrorKind::Structural);
    assert!(err.to_string().contains("colour"));

    let err = ovf::read_ovf(Cursor::new(file_with_header_lines("# xstepsize: wide\n")), "value.ovf").unwrap_err();
    assert_eq!(err.kind(), ovf::ErrorKind::Encoding);
}

#[test]
fn node_counts_larger_than_the_data() {
    let file = "# OOMMF OVF 2.0\n# Segment count: 1\n# Begin: Segment\n# Begin: Header\n# Title: huge\n\
                # meshtype: rectangular\n# meshunit: m\n# valuedim: 3\n# valueunits: A/m\n\
                # valuelabels: x y z\n# xmin: 0\n# ymin: 0\n# zmin: 0\n# xmax: 1\n# ymax: 1\n# zmax: 1\n\
                # xbase: 0\n# ybase: 0\n# zbase: 0\n# xstepsize: 1\n# ystepsize: 1\n# zstepsize: 1\n\
                # xnodes: 1000000\n# ynodes: 1000000\n# znodes: 1000000\n# End: Header\n\
                # Begin: Data Text\n1 2 3\n";
    let err = ovf::read_ovf(Cursor::new(file), "huge.ovf").unwrap_err();
    assert_eq!(err.kind(), ovf::ErrorKind::Encoding);

    let binary = file.replace("Data Text\n1 2 3\n", "Data Binary 8\n");
    let mut bytes = binary.into_bytes();
    bytes.extend(1234567.0f64.to_le_bytes());
    bytes.extend(1f64.to_le_bytes());
    let err = ovf::read_ovf(Cursor::new(bytes), "huge.ovf").unwrap_err();
    assert_eq!(err.kind(), ovf::ErrorKind::Encoding);
}

#[test]
fn multi_line_title_is_not_written() {
    let mut header = valid_header(FileVersion::V2, MeshType::Rectangular);
    header.title.set("one\n# xnodes: 7".to_string());
    assert!(header.validate().is_err());

    let grid = RegularGridMesh::new(MeshInfo::new("x").title("one\ntwo"), (1, 1, 1), Vec3::ZERO, Vec3::splat(1.)).unwrap();
    let mut out = Vec::new();
    let err = ovf::write_mesh(&mut out, &grid, &WriteOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ovf::ErrorKind::Encoding);
}
