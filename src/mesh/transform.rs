use crate::prelude::*;

use super::error::{GeometryError, InvalidSubsample, InvalidTransform};

/// Signed permutation of the coordinate axes.
///
/// Parsed from a flip string of three tokens, one per source axis in x, y, z
/// order. Token `k` names the destination axis of source component `k`, with
/// an optional leading sign: `"x:-z:y"` keeps x, sends y to -z and z to y.
/// Tokens may be separated by colons or whitespace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisTransform {
    target: [usize; 3],
    sign: [f64; 3],
}

impl Default for AxisTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AxisTransform {
    pub fn identity() -> Self {
        Self {
            target: [0, 1, 2],
            sign: [1., 1., 1.],
        }
    }

    pub fn parse(flip: &str) -> Result<Self, Error> {
        let invalid = || Error::from(GeometryError::from(InvalidTransform::new(flip)));

        let tokens: Vec<&str> = flip
            .split(|c: char| c == ':' || c.is_whitespace())
            .filter(|tok| !tok.is_empty())
            .collect();

        if tokens.len() != 3 {
            return Err(invalid());
        }

        let mut target = [0usize; 3];
        let mut sign = [1.0f64; 3];
        let mut used = [false; 3];

        for (k, token) in tokens.iter().enumerate() {
            let (s, axis) = match token.as_bytes() {
                [b'-', axis] => (-1., *axis),
                [b'+', axis] | [axis] => (1., *axis),
                _ => return Err(invalid()),
            };

            let axis = match axis.to_ascii_lowercase() {
                b'x' => 0,
                b'y' => 1,
                b'z' => 2,
                _ => return Err(invalid()),
            };

            if used[axis] {
                return Err(invalid());
            }
            used[axis] = true;
            target[k] = axis;
            sign[k] = s;
        }

        Ok(Self { target, sign })
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// destination axis of source axis `k`
    pub fn target(&self, k: usize) -> usize {
        self.target[k]
    }

    pub fn sign(&self, k: usize) -> f64 {
        self.sign[k]
    }

    /// source axis feeding each destination axis
    pub(crate) fn source_axes(&self) -> [usize; 3] {
        let mut out = [0usize; 3];
        for (k, &a) in self.target.iter().enumerate() {
            out[a] = k;
        }
        out
    }

    pub fn apply(&self, v: Vec3) -> Vec3 {
        let mut out = Vec3::ZERO;
        for k in 0..3 {
            out.set_component(self.target[k], self.sign[k] * v.component(k));
        }
        out
    }

    /// permutation only; used for magnitudes such as step hints
    pub fn apply_unsigned(&self, v: Vec3) -> Vec3 {
        let mut out = Vec3::ZERO;
        for k in 0..3 {
            out.set_component(self.target[k], v.component(k));
        }
        out
    }

    pub fn apply_box(&self, bbox: &BoundingBox) -> BoundingBox {
        match bbox.extremes() {
            Some((min, max)) => BoundingBox::new(self.apply(min), self.apply(max)),
            None => BoundingBox::empty(),
        }
    }
}

impl std::str::FromStr for AxisTransform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parameters of a copy-with-transform.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSpec {
    pub transform: AxisTransform,
    /// Keep every `subsample`-th node along each axis. `0` and `1` keep all
    /// nodes; irregular meshes accept nothing else.
    pub subsample: f64,
    /// region to keep; `None` keeps everything
    pub clip: Option<BoundingBox>,
    /// also crop the range and boundary to `clip`
    pub clip_range: bool,
}

impl Default for TransformSpec {
    fn default() -> Self {
        Self {
            transform: AxisTransform::identity(),
            subsample: 1.,
            clip: None,
            clip_range: false,
        }
    }
}

impl TransformSpec {
    pub fn new(flip: &str) -> Result<Self, Error> {
        Ok(Self {
            transform: AxisTransform::parse(flip)?,
            ..Default::default()
        })
    }

    #[must_use]
    pub fn subsample(mut self, subsample: f64) -> Self {
        self.subsample = subsample;
        self
    }

    #[must_use]
    pub fn clip(mut self, clip: BoundingBox) -> Self {
        self.clip = Some(clip);
        self
    }

    #[must_use]
    pub fn clip_range(mut self, clip_range: bool) -> Self {
        self.clip_range = clip_range;
        self
    }

    pub(crate) fn clipped(&self, bbox: &BoundingBox) -> BoundingBox {
        let mut out = *bbox;
        if let Some(clip) = &self.clip {
            out.intersect_with(clip);
        }
        out
    }

    pub(crate) fn is_kept(&self, pt: Vec3) -> bool {
        match &self.clip {
            Some(clip) => clip.is_in(pt),
            None => true,
        }
    }

    pub(crate) fn move_into_clip(&self, pt: Vec3) -> Vec3 {
        match &self.clip {
            Some(clip) if self.clip_range => clip.move_into(pt),
            _ => pt,
        }
    }

    /// range of the source, cropped when `clip_range` is set
    pub(crate) fn source_range(&self, range: &BoundingBox) -> BoundingBox {
        if self.clip_range {
            self.clipped(range)
        } else {
            *range
        }
    }

    /// subsample as a node stride; non-integers and negatives are rejected
    pub(crate) fn stride(&self) -> Result<usize, Error> {
        let sub = self.subsample;
        if !sub.is_finite() || sub < 0. || sub.fract() != 0. {
            let err = InvalidSubsample::new(sub, "must be a non-negative integer");
            return Err(GeometryError::from(err).into());
        }
        Ok((sub as usize).max(1))
    }
}
