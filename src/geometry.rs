//! small geometric value types shared by the meshes and the codecs

use crate::prelude::*;

use std::ops::Mul;

/// A point or vector in 3-space.
#[derive(
    Debug, Clone, Copy, PartialEq, Default, Constructor, Add, Sub, Neg, AddAssign, SubAssign, Mul, MulAssign, Div,
)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.,
        y: 0.,
        z: 0.,
    };

    pub fn splat(v: f64) -> Self {
        Self::new(v, v, v)
    }

    pub fn from_slice(values: &[f64]) -> Self {
        let get = |idx: usize| values.get(idx).copied().unwrap_or(0.);
        Self::new(get(0), get(1), get(2))
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn component(&self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn set_component(&mut self, axis: usize, value: f64) {
        match axis {
            0 => self.x = value,
            1 => self.y = value,
            _ => self.z = value,
        }
    }

    pub fn dot(&self, other: &Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn mag_sq(&self) -> f64 {
        self.dot(self)
    }

    pub fn mag(&self) -> f64 {
        self.mag_sq().sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// componentwise product
    pub fn scale_by(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    pub fn map<F: Fn(f64) -> f64>(self, f: F) -> Vec3 {
        Vec3::new(f(self.x), f(self.y), f(self.z))
    }

    pub fn min_with(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max_with(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }
}

impl Mul<Vec3> for f64 {
    type Output = Vec3;

    fn mul(self, rhs: Vec3) -> Vec3 {
        rhs * self
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(x: [f64; 3]) -> Self {
        Vec3::new(x[0], x[1], x[2])
    }
}

/// A stored sample: where it is and what was measured there.
#[derive(Debug, Clone, Copy, PartialEq, Default, Constructor)]
pub struct LocatedVector {
    pub location: Vec3,
    pub value: Vec3,
}

/// Axis aligned box, possibly empty.
///
/// An empty box is the identity for [`BoundingBox::expand_with`] and absorbs
/// everything under [`BoundingBox::intersect_with`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    extremes: Option<(Vec3, Vec3)>,
}

impl BoundingBox {
    pub fn empty() -> Self {
        Self { extremes: None }
    }

    /// box spanned by two opposite corners, in any order
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            extremes: Some((a.min_with(&b), a.max_with(&b))),
        }
    }

    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut out = Self::empty();
        for pt in points {
            out.expand_with_point(pt);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.extremes.is_none()
    }

    pub fn extremes(&self) -> Option<(Vec3, Vec3)> {
        self.extremes
    }

    pub fn min_pt(&self) -> Option<Vec3> {
        self.extremes.map(|(min, _)| min)
    }

    pub fn max_pt(&self) -> Option<Vec3> {
        self.extremes.map(|(_, max)| max)
    }

    pub fn width(&self) -> f64 {
        self.extent().x
    }

    pub fn height(&self) -> f64 {
        self.extent().y
    }

    pub fn depth(&self) -> f64 {
        self.extent().z
    }

    /// edge lengths along each axis (zero when empty)
    pub fn extent(&self) -> Vec3 {
        match self.extremes {
            Some((min, max)) => max - min,
            None => Vec3::ZERO,
        }
    }

    pub fn expand_with_point(&mut self, pt: Vec3) {
        self.extremes = match self.extremes {
            Some((min, max)) => Some((min.min_with(&pt), max.max_with(&pt))),
            None => Some((pt, pt)),
        };
    }

    pub fn expand_with(&mut self, other: &BoundingBox) {
        if let Some((min, max)) = other.extremes {
            self.expand_with_point(min);
            self.expand_with_point(max);
        }
    }

    pub fn intersect_with(&mut self, other: &BoundingBox) {
        self.extremes = match (self.extremes, other.extremes) {
            (Some((amin, amax)), Some((bmin, bmax))) => {
                let min = amin.max_with(&bmin);
                let max = amax.min_with(&bmax);
                if min.x <= max.x && min.y <= max.y && min.z <= max.z {
                    Some((min, max))
                } else {
                    None
                }
            }
            _ => None,
        };
    }

    /// true if `other` lies entirely inside this box; the empty box is
    /// contained in everything
    pub fn contains(&self, other: &BoundingBox) -> bool {
        match (self.extremes, other.extremes) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some((amin, amax)), Some((bmin, bmax))) => {
                amin.x <= bmin.x
                    && amin.y <= bmin.y
                    && amin.z <= bmin.z
                    && bmax.x <= amax.x
                    && bmax.y <= amax.y
                    && bmax.z <= amax.z
            }
        }
    }

    /// closed containment test for a single point
    pub fn is_in(&self, pt: Vec3) -> bool {
        match self.extremes {
            Some((min, max)) => {
                min.x <= pt.x
                    && pt.x <= max.x
                    && min.y <= pt.y
                    && pt.y <= max.y
                    && min.z <= pt.z
                    && pt.z <= max.z
            }
            None => false,
        }
    }

    /// clamp a point into the box; points are returned unchanged by an empty box
    pub fn move_into(&self, pt: Vec3) -> Vec3 {
        match self.extremes {
            Some((min, max)) => pt.max_with(&min).min_with(&max),
            None => pt,
        }
    }

    /// the eight corners, used when a box is pushed through an axis transform
    pub fn corners(&self) -> Vec<Vec3> {
        match self.extremes {
            Some((min, max)) => {
                let mut out = Vec::with_capacity(8);
                for z in [min.z, max.z] {
                    for y in [min.y, max.y] {
                        for x in [min.x, max.x] {
                            out.push(Vec3::new(x, y, z));
                        }
                    }
                }
                out
            }
            None => Vec::new(),
        }
    }
}
