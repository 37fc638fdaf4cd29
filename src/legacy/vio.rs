//! VIO files: one binary grid of 3-vectors.
//!
//! ```text
//! offset  size  content
//!      0     8  magic "VecFil\x02\0"
//!      8     8  1.234 as a double, in the byte order of the file
//!     16    20  i32 Nx, Ny, Nz, dimension (3), data offset (520)
//!     36    36  reserved
//!     72   448  NUL terminated note
//!    520        Nx*Ny*Nz double triples
//! ```
//!
//! The file keeps x and z in the plane with y pointing into it, so its `Nz`
//! is the grid's y count and its `Ny` the grid's z count, and a stored triple
//! `(a, b, c)` is the vector `(a, c, -b)`. Triples run over file z fastest,
//! then x, then file y.

use crate::prelude::*;

use crate::data::{BinaryWord, ByteOrder};
use crate::parse::{BadFileHeader, Encoding, Location, NonFinite, ParseError, ParseErrorKind, ShortRead, Structural};
use crate::registry::{MeshReader, Source};

use std::io::{ErrorKind as IoErrorKind, SeekFrom};

const MAGIC: &[u8; 8] = b"VecFil\x02\0";
const ENDIAN_TEST: f64 = 1.234;
const HEADER_LEN: usize = 520;
const RESERVED_LEN: usize = 36;
const NOTE_START: usize = 72;
const TRIPLE_LEN: usize = 24;

/// [`MeshReader`] for VIO files.
#[derive(Debug, Clone, Copy, Default)]
pub struct VioReader;

impl VioReader {
    /// the first eight bytes are the magic
    pub fn sniff(input: &mut dyn Source) -> Result<bool, Error> {
        let mut magic = [0u8; 8];
        match input.read_exact(&mut magic) {
            Ok(()) => Ok(&magic == MAGIC),
            Err(err) if err.kind() == IoErrorKind::UnexpectedEof => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

impl MeshReader for VioReader {
    fn read_mesh(&mut self, input: &mut dyn Source, source: &str) -> Result<AnyMesh, Error> {
        let mut bytes = [0u8; HEADER_LEN];
        input
            .read_exact(&mut bytes)
            .map_err(|err| truncated(source, err, "the file header is incomplete"))?;
        let header = VioHeader::parse(&bytes).map_err(|reason| bad_header(source, reason))?;

        let (nx, ny, nz) = header.dims;
        let expected = nx.checked_mul(ny).and_then(|n| n.checked_mul(nz));
        let payload = expected.and_then(|n| n.checked_mul(TRIPLE_LEN));
        let (expected, payload) = match (expected, payload) {
            (Some(expected), Some(payload)) => (expected, payload),
            _ => return Err(bad_header(source, "node count overflows")),
        };

        // the grid is only allocated once the stream is known to hold it
        let remaining = remaining_len(input)?;
        if remaining < payload as u64 {
            let complete = (remaining / TRIPLE_LEN as u64) as usize;
            return Err(located(source, Encoding::from(ShortRead::new(complete, expected))));
        }

        let description = if header.note.is_empty() { "vio file".to_string() } else { header.note };
        let info = MeshInfo::new(source).description(description);
        let mut mesh = RegularGridMesh::new(info, header.dims, Vec3::ZERO, Vec3::splat(1.))?;

        let mut column = vec![0u8; ny * TRIPLE_LEN];
        let grid = mesh.grid_mut();
        for k in 0..nz {
            for i in 0..nx {
                let read = (k * nx + i) * ny;
                input
                    .read_exact(&mut column)
                    .map_err(|err| short_read(source, err, read, expected))?;

                for (j, triple) in column.chunks_exact(TRIPLE_LEN).enumerate() {
                    let a = f64::decode(&triple[0..8], header.order);
                    let b = f64::decode(&triple[8..16], header.order);
                    let c = f64::decode(&triple[16..24], header.order);
                    let value = Vec3::new(a, c, -b);
                    if !value.is_finite() {
                        let token = format!("({}, {}, {})", a, b, c);
                        return Err(located(source, Encoding::from(NonFinite::new(token))));
                    }
                    grid[[k, j, i]] = value;
                }
            }
        }

        super::set_span_hints(&mut mesh)?;
        info!(source, nodes = mesh.len(), order = ?header.order, "read vio file");
        Ok(AnyMesh::Regular(mesh))
    }
}

struct VioHeader {
    order: ByteOrder,
    /// grid node counts, after the axis swap
    dims: (usize, usize, usize),
    note: String,
}

impl VioHeader {
    fn parse(bytes: &[u8; HEADER_LEN]) -> Result<Self, &'static str> {
        if &bytes[..8] != MAGIC {
            return Err("magic is not `VecFil\\x02`");
        }

        let order = [ByteOrder::Little, ByteOrder::Big]
            .into_iter()
            .find(|&order| f64::decode(&bytes[8..16], order) == ENDIAN_TEST)
            .ok_or("unknown binary byte order")?;

        let int = |n: usize| {
            let mut word = [0u8; 4];
            word.copy_from_slice(&bytes[16 + 4 * n..20 + 4 * n]);
            match order {
                ByteOrder::Big => i32::from_be_bytes(word),
                ByteOrder::Little => i32::from_le_bytes(word),
            }
        };
        let (file_nx, file_ny, file_nz, dimension, offset) = (int(0), int(1), int(2), int(3), int(4));

        if offset != HEADER_LEN as i32 {
            return Err("data offset is not 520");
        }
        if file_nx < 1 || file_ny < 1 || file_nz < 1 || dimension < 1 {
            return Err("counts must be at least 1");
        }
        if dimension != 3 {
            return Err("only 3 component vectors are supported");
        }

        let note = &bytes[NOTE_START..];
        let end = note.iter().position(|&b| b == 0).ok_or("note is not terminated")?;
        let note = String::from_utf8_lossy(&note[..end]).trim().to_string();

        Ok(Self {
            order,
            dims: (file_nx as usize, file_nz as usize, file_ny as usize),
            note,
        })
    }
}

/// Write a single slice grid (`nz == 1`) as a VIO file in native byte order.
///
/// Values are written multiplied by the value multiplier. The mesh
/// description becomes the note, cut to 447 bytes.
pub fn write_vio<W: Write, M: Mesh + ?Sized>(mut writer: W, mesh: &M) -> Result<(), Error> {
    let grid = mesh
        .as_regular_grid()
        .ok_or_else(|| unsupported("only regular grids can be written as vio"))?;
    let (nx, ny, nz) = grid.dims();
    if nz != 1 {
        return Err(unsupported(format!("vio files hold a single z slice, the grid has {}", nz)));
    }
    let count = |n: usize| i32::try_from(n).map_err(|_| unsupported(format!("{} nodes do not fit a vio header", n)));
    let order = ByteOrder::native();

    let mut bytes = Vec::with_capacity(HEADER_LEN + nx * ny * TRIPLE_LEN);
    bytes.extend_from_slice(MAGIC);
    ENDIAN_TEST.encode(order, &mut bytes);
    for n in [count(nx)?, count(nz)?, count(ny)?, 3, HEADER_LEN as i32] {
        match order {
            ByteOrder::Big => bytes.extend(n.to_be_bytes()),
            ByteOrder::Little => bytes.extend(n.to_le_bytes()),
        }
    }
    bytes.extend([0u8; RESERVED_LEN]);

    let note = mesh.info().description.as_bytes();
    let note = &note[..note.len().min(HEADER_LEN - NOTE_START - 1)];
    bytes.extend_from_slice(note);
    bytes.resize(HEADER_LEN, 0);

    let mult = mesh.info().value_multiplier();
    for i in 0..nx {
        for j in 0..ny {
            let v = grid.grid()[[0, j, i]] * mult;
            for word in [v.x, -v.z, v.y] {
                word.encode(order, &mut bytes);
            }
        }
    }

    writer.write_all(&bytes).map_err(crate::write_ovf::device)?;
    writer.flush().map_err(crate::write_ovf::device)?;
    debug!(nodes = nx * ny, ?order, "wrote vio file");
    Ok(())
}

/// bytes between the current position and the end of `input`
fn remaining_len(input: &mut dyn Source) -> Result<u64, Error> {
    let here = input.stream_position()?;
    let end = input.seek(SeekFrom::End(0))?;
    input.seek(SeekFrom::Start(here))?;
    Ok(end.saturating_sub(here))
}

fn located<K: Into<ParseErrorKind>>(source: &str, kind: K) -> Error {
    let location = Location {
        source: source.to_string(),
        line: None,
    };
    ParseError::new(location, kind).into()
}

fn bad_header(source: &str, reason: &'static str) -> Error {
    located(source, Structural::from(BadFileHeader::new(reason)))
}

fn truncated(source: &str, err: std::io::Error, reason: &'static str) -> Error {
    if err.kind() == IoErrorKind::UnexpectedEof {
        bad_header(source, reason)
    } else {
        err.into()
    }
}

fn short_read(source: &str, err: std::io::Error, read: usize, expected: usize) -> Error {
    if err.kind() == IoErrorKind::UnexpectedEof {
        located(source, Encoding::from(ShortRead::new(read, expected)))
    } else {
        err.into()
    }
}

fn unsupported<T: Into<String>>(reason: T) -> Error {
    mesh::GeometryError::from(mesh::InvalidParameter::new("mesh", reason)).into()
}
