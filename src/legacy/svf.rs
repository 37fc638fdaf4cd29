//! SVF files: scattered vectors as text, one point per line.
//!
//! ```text
//! # svf-02
//! # Boundary-XY: 0 0 4 0 4 2 0 2 0 0
//! 0.5 0.5 0   1 0 0     # x y z mx my mz
//! 1.5 0.5     0 1 0     # older files: x y mx my mz, z = 0
//! ```
//!
//! Lines starting with `#` are comments, except a `Boundary-XY` comment,
//! which lists the boundary as x y pairs; its z is put at the middle of the
//! data. Anything after a `#` on a data line is ignored.

use crate::prelude::*;

use crate::parse::{IncompleteRecord, LineReader, NonFinite, NonNumeric};
use crate::registry::{MeshReader, Source};

/// [`MeshReader`] for SVF files.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvfReader;

impl SvfReader {
    /// the first line starts with `# svf`
    pub fn sniff(input: &mut dyn Source) -> Result<bool, Error> {
        let mut line = Vec::new();
        (&mut *input).take(256).read_until(b'\n', &mut line)?;
        let line = utils::collapse_whitespace(&String::from_utf8_lossy(&line));
        Ok(line.starts_with("#svf"))
    }
}

impl MeshReader for SvfReader {
    fn read_mesh(&mut self, input: &mut dyn Source, source: &str) -> Result<AnyMesh, Error> {
        let mut lines = LineReader::new(input, source);
        let mut mesh = IrregularMesh::new(MeshInfo::new(source));
        let mut boundary_xy: Option<Vec<(f64, f64)>> = None;

        while let Some(line) = lines.next_line()? {
            let text = line.trim_start();
            if text.is_empty() {
                continue;
            }
            if let Some(comment) = text.strip_prefix('#') {
                if let Some(points) = boundary_comment(comment) {
                    boundary_xy = Some(points);
                }
                continue;
            }

            let mut numbers = [0f64; 6];
            let mut count = 0;
            for token in text.split_whitespace().take_while(|t| !t.starts_with('#')).take(6) {
                let value = utils::parse_float(token).ok_or_else(|| lines.encoding(NonNumeric::new(token)))?;
                if !value.is_finite() {
                    return Err(lines.encoding(NonFinite::new(token)));
                }
                numbers[count] = value;
                count += 1;
            }

            let point = match count {
                5 => LocatedVector::new(
                    Vec3::new(numbers[0], numbers[1], 0.),
                    Vec3::new(numbers[2], numbers[3], numbers[4]),
                ),
                6 => LocatedVector::new(Vec3::from_slice(&numbers[..3]), Vec3::from_slice(&numbers[3..])),
                _ => return Err(lines.encoding(IncompleteRecord::new(count, 5))),
            };
            mesh.add_point(point);
        }

        if mesh.is_empty() {
            let err = mesh::InvalidParameter::new("points", format!("no valid data in `{}`", source));
            return Err(mesh::GeometryError::from(err).into());
        }

        if let Some(points) = boundary_xy {
            let zmid = match mesh.precise_data_range().extremes() {
                Some((min, max)) => (min.z + max.z) / 2.,
                None => 0.,
            };
            mesh.set_boundary_list(points.into_iter().map(|(x, y)| Vec3::new(x, y, zmid)).collect());
        }

        mesh.sort_points();
        super::set_span_hints(&mut mesh)?;
        info!(source, nodes = mesh.len(), "read svf file");
        Ok(AnyMesh::Irregular(mesh))
    }
}

/// x y pairs of a `Boundary-XY: ...` comment
fn boundary_comment(comment: &str) -> Option<Vec<(f64, f64)>> {
    let (name, value) = comment.split_once(':')?;
    if utils::collapse_alnum(name) != "boundaryxy" {
        return None;
    }

    let numbers: Vec<f64> = value
        .split_whitespace()
        .map_while(utils::parse_float)
        .filter(|v| v.is_finite())
        .collect();
    if numbers.len() % 2 == 1 {
        warn!(values = numbers.len(), "dropping incomplete point at the end of Boundary-XY");
    }

    Some(numbers.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect())
}
