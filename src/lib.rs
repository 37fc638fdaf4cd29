#![doc = include_str!("../README.md")]

extern crate self as ovf;

pub mod array;
mod data;
mod geometry;
pub mod header;
mod iter;
pub mod legacy;
pub mod mesh;
pub mod parse;
pub mod prelude;
pub mod registry;
mod resample;
mod traits;
mod utils;
mod write_ovf;

pub use traits::{FieldSlot, HeaderFields, Mesh};

pub use array::FieldArray;
pub use data::{ByteOrder, DataStyle, TextFormat};
pub use geometry::{BoundingBox, LocatedVector, Vec3};
pub use header::{FileHeader, FileVersion, MeshType};
pub use iter::Points;
pub use mesh::{AnyMesh, IrregularMesh, MeshInfo, RegularGridMesh};
pub use mesh::{MeshArithmetic, MeshStatistics};

pub use parse::{read_ovf, OvfFile};
pub use registry::{MeshReader, Registry};
pub use resample::ResampleMethod;
pub use write_ovf::{mesh_records, write_mesh, write_ovf, WriteError, WriteOptions};

pub use ovf_derive::HeaderFields;

pub use ndarray;

use std::path::Path;

/// general purpose error enumeration for possible causes of failure.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("An io error occured: `{0}`")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Parse(#[from] parse::ParseError),
    #[error("invalid header: {0}")]
    Header(#[from] header::ValidationError),
    #[error("geometry error: {0}")]
    Geometry(#[from] mesh::GeometryError),
    #[error("{0}")]
    Write(#[from] write_ovf::WriteError),
    #[error("{0}")]
    UnsupportedFormat(#[from] registry::UnsupportedFormat),
}

/// Broad class of a failure, shared by every error of the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// malformed framing, or a field that is unknown, repeated, missing or forbidden
    Structural,
    /// a value that cannot be decoded, a bad check value, a short read or write
    Encoding,
    /// a node count, step, index or mesh size that does not fit
    Geometry,
    /// no registered format recognizes the input
    UnsupportedFormat,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::Parse(err) => err.error_kind(),
            Error::Header(err) => err.kind(),
            Error::Geometry(_) => ErrorKind::Geometry,
            Error::Write(err) => err.kind(),
            Error::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
        }
    }
}

/// Read a mesh from `path` in any of the formats of
/// [`Registry::with_defaults`].
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<AnyMesh, Error> {
    Registry::with_defaults().read_mesh(path)
}
