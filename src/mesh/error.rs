use crate::prelude::*;

#[derive(Debug, thiserror::Error, From)]
pub enum GeometryError {
    #[error("{0}")]
    SizeMismatch(SizeMismatch),
    #[error("{0}")]
    InvalidIndex(InvalidIndex),
    #[error("{0}")]
    EmptyMesh(EmptyMesh),
    #[error("{0}")]
    InvalidTransform(InvalidTransform),
    #[error("{0}")]
    InvalidSubsample(InvalidSubsample),
    #[error("{0}")]
    InvalidParameter(InvalidParameter),
}

#[derive(From, Display, Debug, Constructor)]
#[display(fmt = "meshes differ in size: {this_len} nodes against {other_len} nodes")]
pub struct SizeMismatch {
    this_len: usize,
    other_len: usize,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "invalid index: node {node} is stale or out of bounds for a mesh of {len} nodes")]
pub struct InvalidIndex {
    node: usize,
    len: usize,
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "operation `{operation}` requires a non-empty mesh")]
pub struct EmptyMesh {
    operation: &'static str,
}

#[derive(Display, Debug)]
#[display(fmt = "invalid transform flip string: `{flip}`")]
pub struct InvalidTransform {
    flip: String,
}

impl InvalidTransform {
    pub(crate) fn new<T: Into<String>>(flip: T) -> Self {
        Self { flip: flip.into() }
    }
}

#[derive(Display, Debug, Constructor)]
#[display(fmt = "requested subsample value ({value}) not supported; {reason}")]
pub struct InvalidSubsample {
    value: f64,
    reason: &'static str,
}

#[derive(Display, Debug)]
#[display(fmt = "invalid parameter `{name}`: {reason}")]
pub struct InvalidParameter {
    name: &'static str,
    reason: String,
}

impl InvalidParameter {
    pub(crate) fn new<T: Into<String>>(name: &'static str, reason: T) -> Self {
        Self {
            name,
            reason: reason.into(),
        }
    }
}
