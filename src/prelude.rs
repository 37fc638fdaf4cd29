//! Common traits and types that are useful for working with `ovf`
#![allow(unused_imports)]

pub use crate::array::FieldArray;
pub use crate::data::{ByteOrder, DataStyle, TextFormat};
pub use crate::geometry::{BoundingBox, LocatedVector, Vec3};
pub use crate::header::{FileHeader, FileVersion, MeshType};
pub use crate::mesh::{AnyMesh, IrregularMesh, MeshCursor, MeshInfo, RegularGridMesh};
pub use crate::mesh::{AxisTransform, MeshArithmetic, MeshStatistics, TransformSpec};
pub use crate::registry::{MeshReader, Registry};
pub use crate::resample::ResampleMethod;
pub use crate::traits::{FieldSlot, HeaderFields, Mesh};
pub use crate::write_ovf::WriteOptions;

pub(crate) use crate::{Error, ErrorKind};
pub(crate) use std::io::{BufRead, Read, Seek, Write};

pub(crate) use crate::{data, header, mesh, parse, traits, utils};

pub(crate) use derive_more::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};
pub(crate) use derive_more::{Constructor, Deref, DerefMut, Display, From, Into};

pub(crate) use tracing::{debug, info, warn};
