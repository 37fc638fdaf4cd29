use ovf::legacy::write_vio;
use ovf::prelude::*;
use ovf::registry::{FormatEntry, MeshReader, Source};
use std::io::{Read, Write};

fn grid_slice() -> RegularGridMesh {
    let info = MeshInfo::new("slice").description("test slice");
    let mut mesh = RegularGridMesh::new(info, (3, 2, 1), Vec3::ZERO, Vec3::splat(1.)).unwrap();
    mesh.set(0, 0, 0, Vec3::new(1., 0., 0.)).unwrap();
    mesh.set(2, 1, 0, Vec3::new(0., 0., -2.)).unwrap();
    mesh
}

#[test]
fn files_on_disk_are_identified() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::with_defaults();

    let ovf_path = dir.path().join("field.ovf");
    let options = WriteOptions::default().data_style(DataStyle::Binary4);
    ovf::write_mesh(std::fs::File::create(&ovf_path).unwrap(), &grid_slice(), &options).unwrap();
    assert_eq!(registry.identify(&ovf_path).unwrap(), "ovf");

    let vio_path = dir.path().join("field.vio");
    write_vio(std::fs::File::create(&vio_path).unwrap(), &grid_slice()).unwrap();
    assert_eq!(registry.identify(&vio_path).unwrap(), "vio");

    let svf_path = dir.path().join("points.svf");
    let mut svf = std::fs::File::create(&svf_path).unwrap();
    writeln!(svf, "# svf-02\n0 0 0 1 0 0\n1 0 0 0 1 0").unwrap();
    drop(svf);
    assert_eq!(registry.identify(&svf_path).unwrap(), "svf");

    let other = dir.path().join("notes.txt");
    std::fs::write(&other, "nothing to see\n").unwrap();
    let err = registry.identify(&other).unwrap_err();
    assert_eq!(err.kind(), ovf::ErrorKind::UnsupportedFormat);

    let missing = registry.identify(dir.path().join("missing.ovf")).unwrap_err();
    assert_eq!(missing.kind(), ovf::ErrorKind::Io);
}

#[test]
fn every_format_reads_the_same_slice() {
    let dir = tempfile::tempdir().unwrap();
    let expected = grid_slice();

    let ovf_path = dir.path().join("slice.ovf");
    ovf::write_mesh(std::fs::File::create(&ovf_path).unwrap(), &expected, &WriteOptions::default()).unwrap();
    let vio_path = dir.path().join("slice.vio");
    write_vio(std::fs::File::create(&vio_path).unwrap(), &expected).unwrap();

    for path in [&ovf_path, &vio_path] {
        let mesh = ovf::read_mesh(path).unwrap();
        let grid = mesh.as_regular().unwrap();
        assert_eq!(grid.dims(), (3, 2, 1));
        assert_eq!(grid.grid(), expected.grid());
        assert_eq!(mesh.info().filename, path.display().to_string());
        assert_eq!(mesh.info().mag_hints().1, 2.);
    }
}

#[test]
fn scattered_points_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.svf");
    std::fs::write(&path, "# svf\n0 0 0 1 0 0\n1 2 0 1 1\n3 3 3 0 0 0\n").unwrap();

    let mesh = ovf::read_mesh(&path).unwrap();
    let points = mesh.as_irregular().unwrap();
    assert_eq!(points.len(), 3);
    assert_eq!(points.samples()[1], LocatedVector::new(Vec3::new(1., 2., 0.), Vec3::new(0., 1., 1.)));
    assert_eq!(mesh.info().mag_hints(), (0., 2f64.sqrt()));
}

struct Constant;

impl MeshReader for Constant {
    fn read_mesh(&mut self, _: &mut dyn Source, source: &str) -> Result<AnyMesh, ovf::Error> {
        let mesh = RegularGridMesh::new(MeshInfo::new(source), (1, 1, 1), Vec3::ZERO, Vec3::splat(1.))?;
        Ok(mesh.into())
    }
}

fn starts_with_const(input: &mut dyn Source) -> Result<bool, ovf::Error> {
    let mut word = [0u8; 5];
    input.read_exact(&mut word)?;
    Ok(&word == b"CONST")
}

#[test]
fn custom_formats_extend_the_registry() {
    let mut registry = Registry::with_defaults();
    registry.register(FormatEntry {
        name: "const",
        sniff: starts_with_const,
        make: || Box::new(Constant),
    });

    let names: Vec<&str> = registry.formats().map(|entry| entry.name).collect();
    assert_eq!(names, vec!["ovf", "vio", "svf", "const"]);

    let mut input = std::io::Cursor::new(b"CONST\n".to_vec());
    let mesh = registry.read(&mut input, "custom").unwrap();
    assert_eq!(mesh.len(), 1);

    // too short for the predicate: an io error there is just no match
    let mut input = std::io::Cursor::new(b"CON".to_vec());
    let err = registry.read(&mut input, "short").unwrap_err();
    assert_eq!(err.kind(), ovf::ErrorKind::UnsupportedFormat);
}
