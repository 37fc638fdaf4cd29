//! Whole-mesh statistics and point-for-point combination of meshes.
//!
//! Magnitudes are compared without forming the squared magnitude directly:
//! each vector is held as `(scale, factor)` with `scale` the largest absolute
//! component and `factor = |v|^2 / scale^2`, which lies in `[1, 3]`. Two such
//! pairs are ordered by their scales alone unless the scales are within a
//! factor `sqrt(3)` of each other, so values near `f64::MAX` compare
//! correctly.

use crate::prelude::*;

use super::error::{EmptyMesh, GeometryError, SizeMismatch};

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// The points with the smallest and the largest value magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnitudeSpan {
    pub min: LocatedVector,
    pub max: LocatedVector,
    /// magnitude of `min.value` in value units (multiplier applied)
    pub min_mag: f64,
    /// magnitude of `max.value` in value units (multiplier applied)
    pub max_mag: f64,
}

#[derive(Debug, Clone, Copy)]
struct ScaledMag {
    scale: f64,
    factor: f64,
}

impl ScaledMag {
    fn new(v: Vec3) -> Self {
        let mut c = [v.x.abs(), v.y.abs(), v.z.abs()];
        c.sort_by(|a, b| b.total_cmp(a));
        let scale = c[0];
        if scale > 0. {
            let (ty, tz) = (c[1] / scale, c[2] / scale);
            Self {
                scale,
                factor: 1. + ty * ty + tz * tz,
            }
        } else {
            Self { scale: 0., factor: 1. }
        }
    }

    fn is_zero(&self) -> bool {
        self.scale == 0.
    }

    /// `|self| > |other|`
    fn exceeds(&self, other: &ScaledMag) -> bool {
        if self.scale == 0. {
            return false;
        }
        if other.scale == 0. {
            return true;
        }
        let ratio = other.scale / self.scale;
        if ratio >= SQRT_3 {
            false
        } else {
            self.factor > ratio * ratio * other.factor
        }
    }

    fn magnitude(&self) -> f64 {
        self.scale * self.factor.sqrt()
    }
}

/// Statistics over the stored values, weighting every node equally.
///
/// Results are in value units: the value multiplier of the mesh is applied.
pub trait MeshStatistics: Mesh {
    /// smallest and largest magnitude, or `None` for an empty mesh
    fn value_mag_span(&self) -> Option<MagnitudeSpan> {
        mag_span(self, false)
    }

    /// as [`value_mag_span`](Self::value_mag_span) but ignoring zero vectors
    fn nonzero_value_mag_span(&self) -> Option<MagnitudeSpan> {
        mag_span(self, true)
    }

    /// `(min, max)` magnitudes; `(0, 0)` for an empty mesh
    fn value_mag_range(&self) -> (f64, f64) {
        self.value_mag_span()
            .map(|span| (span.min_mag, span.max_mag))
            .unwrap_or((0., 0.))
    }

    fn mean(&self) -> Result<Vec3, Error> {
        let len = non_empty(self, "mean")?;
        let n = len as f64;

        // divided before summing so values near f64::MAX do not overflow
        let mut sum = Vec3::ZERO;
        for node in 0..len {
            if let Some(lv) = self.node(node) {
                sum += lv.value / n;
            }
        }
        Ok(sum * self.info().value_multiplier())
    }

    /// root mean square of the magnitudes
    fn rms(&self) -> Result<f64, Error> {
        let len = non_empty(self, "rms")?;

        // scaled sum of squares, rescaled whenever a larger component shows up
        let mut scale = 0f64;
        let mut ssq = 0f64;
        for node in 0..len {
            let v = match self.node(node) {
                Some(lv) => lv.value,
                None => continue,
            };
            for c in v.to_array() {
                let c = c.abs();
                if c == 0. {
                    continue;
                }
                if c > scale {
                    ssq = 1. + ssq * (scale / c) * (scale / c);
                    scale = c;
                } else {
                    ssq += (c / scale) * (c / scale);
                }
            }
        }

        let mult = self.info().value_multiplier().abs();
        Ok(mult * scale * (ssq / len as f64).sqrt())
    }

    /// mean of the L1 norms of the values
    fn l1(&self) -> Result<f64, Error> {
        let len = non_empty(self, "l1")?;
        let mut sum = 0f64;
        for node in 0..len {
            if let Some(lv) = self.node(node) {
                sum += lv.value.x.abs() + lv.value.y.abs() + lv.value.z.abs();
            }
        }
        Ok(self.info().value_multiplier().abs() * sum / len as f64)
    }
}

impl<M: Mesh + ?Sized> MeshStatistics for M {}

/// Point-for-point combination of two meshes of the same size.
///
/// `other` is rescaled into the value units of `self` by the ratio of their
/// value multipliers before it is applied.
pub trait MeshArithmetic: Mesh {
    /// `self[n] -= other[n]`
    fn subtract_mesh(&mut self, other: &dyn Mesh) -> Result<(), Error> {
        combine(self, other, |v, w| v - w)
    }

    /// `self[n] = self[n] x other[n]`
    fn cross_product_mesh(&mut self, other: &dyn Mesh) -> Result<(), Error> {
        combine(self, other, |v, w| v.cross(&w))
    }
}

impl<M: Mesh + ?Sized> MeshArithmetic for M {}

fn non_empty<M: Mesh + ?Sized>(mesh: &M, operation: &'static str) -> Result<usize, Error> {
    match mesh.len() {
        0 => Err(GeometryError::from(EmptyMesh::new(operation)).into()),
        len => Ok(len),
    }
}

fn mag_span<M: Mesh + ?Sized>(mesh: &M, skip_zero: bool) -> Option<MagnitudeSpan> {
    let mut min: Option<(LocatedVector, ScaledMag)> = None;
    let mut max: Option<(LocatedVector, ScaledMag)> = None;

    for node in 0..mesh.len() {
        let lv = match mesh.node(node) {
            Some(lv) => lv,
            None => continue,
        };
        let mag = ScaledMag::new(lv.value);
        if skip_zero && mag.is_zero() {
            continue;
        }

        match &max {
            Some((_, best)) if !mag.exceeds(best) => {}
            _ => max = Some((lv, mag)),
        }
        match &min {
            Some((_, best)) if !best.exceeds(&mag) => {}
            _ => min = Some((lv, mag)),
        }
    }

    let ((min, min_scaled), (max, max_scaled)) = (min?, max?);
    let mult = mesh.info().value_multiplier().abs();

    Some(MagnitudeSpan {
        min,
        max,
        min_mag: mult * min_scaled.magnitude(),
        max_mag: mult * max_scaled.magnitude(),
    })
}

fn combine<M, F>(mesh: &mut M, other: &dyn Mesh, op: F) -> Result<(), Error>
where
    M: Mesh + ?Sized,
    F: Fn(Vec3, Vec3) -> Vec3,
{
    let len = mesh.len();
    if len != other.len() {
        return Err(GeometryError::from(SizeMismatch::new(len, other.len())).into());
    }

    let scale = other.info().value_multiplier() / mesh.info().value_multiplier();
    let generation = mesh.layout_generation();

    for node in 0..len {
        let (v, w) = match (mesh.node(node), other.node(node)) {
            (Some(v), Some(w)) => (v.value, w.value),
            _ => continue,
        };
        mesh.set_node_value(&MeshCursor::new(node, generation), op(v, w * scale))?;
    }

    Ok(())
}
