//! # Legacy formats
//!
//! Two older vector field formats that the [`Registry`](crate::Registry)
//! recognizes next to OVF:
//!
//! * VIO: a binary grid with a fixed 520 byte header, see [`VioReader`] and
//!   [`write_vio`].
//! * SVF: scattered points as whitespace separated text, see [`SvfReader`].

mod svf;
mod vio;

pub use svf::SvfReader;
pub use vio::{write_vio, VioReader};

use crate::prelude::*;

/// magnitude hints from the full value span of the data
fn set_span_hints(mesh: &mut dyn Mesh) -> Result<(), Error> {
    let (min, max) = mesh.value_mag_range();
    mesh.info_mut().set_mag_hints(min, max)
}
