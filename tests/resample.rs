use approx::assert_relative_eq;
use ndarray::Array4;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use ovf::prelude::*;
use std::io::Cursor;

const METHODS: [ResampleMethod; 3] = [ResampleMethod::Nearest, ResampleMethod::Trilinear, ResampleMethod::Tricubic];

fn random_grid(dims: (usize, usize, usize)) -> RegularGridMesh {
    let (nx, ny, nz) = dims;
    let components: Array4<f64> = Array4::random((nz, ny, nx, 3), Uniform::new(-1., 1.));
    let info = MeshInfo::new("random").mesh_unit("m");
    let mut mesh = RegularGridMesh::new(info, dims, Vec3::new(-3., 0.5, 1e-9), Vec3::new(0.25, 0.5, 1e-9)).unwrap();
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let v = Vec3::new(components[[k, j, i, 0]], components[[k, j, i, 1]], components[[k, j, i, 2]]);
                mesh.set(i, j, k, v).unwrap();
            }
        }
    }
    mesh
}

#[test]
fn identity_resample_of_random_fields() {
    let mesh = random_grid((6, 5, 4));
    for method in METHODS {
        let out = RegularGridMesh::resample(&mesh, &mesh.precise_range(), mesh.dims(), method).unwrap();
        for (a, b) in out.grid().iter().zip(mesh.grid().iter()) {
            if method == ResampleMethod::Nearest {
                assert_eq!(a, b);
            } else {
                assert_relative_eq!(a.x, b.x, epsilon = 1e-12);
                assert_relative_eq!(a.y, b.y, epsilon = 1e-12);
                assert_relative_eq!(a.z, b.z, epsilon = 1e-12);
            }
        }
    }
}

#[test]
fn block_average_keeps_the_mean() {
    let mesh = random_grid((8, 4, 2));
    let coarse = RegularGridMesh::resample_average(&mesh, &mesh.precise_range(), (4, 2, 1)).unwrap();
    assert_eq!(coarse.dims(), (4, 2, 1));

    let (fine, coarse) = (mesh.mean().unwrap(), coarse.mean().unwrap());
    assert_relative_eq!(fine.x, coarse.x, epsilon = 1e-12);
    assert_relative_eq!(fine.y, coarse.y, epsilon = 1e-12);
    assert_relative_eq!(fine.z, coarse.z, epsilon = 1e-12);
}

#[test]
fn resampled_grid_is_written_and_read() {
    let mesh = random_grid((5, 5, 1));
    let range = mesh.precise_range();
    let fine = RegularGridMesh::resample(&mesh, &range, (10, 10, 1), ResampleMethod::Tricubic).unwrap();
    assert_eq!(fine.precise_range(), range);
    assert_eq!(fine.info().mesh_unit, "m");

    let mut bytes = Vec::new();
    ovf::write_mesh(&mut bytes, &fine, &WriteOptions::default()).unwrap();
    let read = ovf::read_ovf(Cursor::new(bytes), "fine.ovf").unwrap().to_mesh("fine.ovf").unwrap();

    let read = read.as_regular().unwrap();
    assert_eq!(read.dims(), (10, 10, 1));
    assert_eq!(read.grid(), fine.grid());
    assert_relative_eq!(read.step().x, 0.125);
}

#[test]
fn coarse_grid_samples_the_source() {
    let mesh = random_grid((9, 9, 1));
    let range = mesh.precise_range();
    // every third source node sits on a destination node
    let coarse = RegularGridMesh::resample(&mesh, &range, (3, 3, 1), ResampleMethod::Trilinear).unwrap();
    for j in 0..3 {
        for i in 0..3 {
            let expected = mesh.get(3 * i + 1, 3 * j + 1, 0).unwrap();
            let got = coarse.get(i, j, 0).unwrap();
            assert_relative_eq!(got.x, expected.x, epsilon = 1e-12);
            assert_relative_eq!(got.y, expected.y, epsilon = 1e-12);
        }
    }
}
