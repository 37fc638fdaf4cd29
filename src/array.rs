//! The record payload of a file, independent of any mesh.

use crate::prelude::*;

use crate::mesh::{GeometryError, InvalidParameter, SizeMismatch};

use ndarray::{Array2, ArrayView1};

/// Values of every node, plus locations for irregular meshes.
///
/// `values` has one row per node and `value_dim` columns; `locations`, when
/// present, has the same number of rows and three columns. Rows are in file
/// order (z slowest, x fastest for rectangular meshes).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldArray {
    values: Array2<f64>,
    locations: Option<Array2<f64>>,
}

impl FieldArray {
    /// payload of a rectangular mesh
    pub fn regular(values: Array2<f64>) -> Self {
        Self {
            values,
            locations: None,
        }
    }

    /// payload of an irregular mesh
    pub fn irregular(locations: Array2<f64>, values: Array2<f64>) -> Result<Self, Error> {
        if locations.ncols() != 3 {
            let err = InvalidParameter::new("locations", format!("expected 3 columns, found {}", locations.ncols()));
            return Err(GeometryError::from(err).into());
        }
        if locations.nrows() != values.nrows() {
            return Err(GeometryError::from(SizeMismatch::new(values.nrows(), locations.nrows())).into());
        }
        Ok(Self {
            values,
            locations: Some(locations),
        })
    }

    pub fn zeros(count: usize, value_dim: usize, with_locations: bool) -> Self {
        Self {
            values: Array2::zeros((count, value_dim)),
            locations: with_locations.then(|| Array2::zeros((count, 3))),
        }
    }

    /// number of nodes
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value_dim(&self) -> usize {
        self.values.ncols()
    }

    pub fn has_locations(&self) -> bool {
        self.locations.is_some()
    }

    /// numbers per record in the data block
    pub fn record_width(&self) -> usize {
        self.value_dim() + if self.has_locations() { 3 } else { 0 }
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn locations(&self) -> Option<&Array2<f64>> {
        self.locations.as_ref()
    }

    pub fn value(&self, node: usize) -> ArrayView1<'_, f64> {
        self.values.row(node)
    }

    /// first three value components, zero filled when there are fewer
    pub fn value_vec3(&self, node: usize) -> Vec3 {
        let row = self.values.row(node);
        let get = |c: usize| row.get(c).copied().unwrap_or(0.);
        Vec3::new(get(0), get(1), get(2))
    }

    pub fn location(&self, node: usize) -> Option<Vec3> {
        let locations = self.locations.as_ref()?;
        let row = locations.row(node);
        Some(Vec3::new(row[0], row[1], row[2]))
    }

    /// multiply every value component by `factor`
    pub fn scale_values(&mut self, factor: f64) {
        if factor != 1. {
            self.values.mapv_inplace(|v| v * factor);
        }
    }

    /// write record `node` from a flat slice laid out as in the file
    pub(crate) fn set_record(&mut self, node: usize, record: &[f64]) {
        let offset = match &mut self.locations {
            Some(locations) => {
                for (c, v) in record.iter().take(3).enumerate() {
                    locations[[node, c]] = *v;
                }
                3
            }
            None => 0,
        };
        for (c, v) in record.iter().skip(offset).enumerate() {
            self.values[[node, c]] = *v;
        }
    }

    /// append record `node` to `out` in file layout
    pub(crate) fn extend_record(&self, node: usize, out: &mut Vec<f64>) {
        if let Some(locations) = &self.locations {
            out.extend(locations.row(node).iter());
        }
        out.extend(self.values.row(node).iter());
    }
}

/// numbers reserved up front when the record count comes from a file
const RESERVED_NUMBERS: usize = 1 << 16;

/// Collects records as they are decoded; storage grows with the data that
/// actually arrives rather than with the count a header claims.
#[derive(Debug)]
pub(crate) struct FieldBuilder {
    value_dim: usize,
    count: usize,
    values: Vec<f64>,
    locations: Option<Vec<f64>>,
}

impl FieldBuilder {
    pub(crate) fn new(expected: usize, value_dim: usize, with_locations: bool) -> Self {
        let reserve = |width: usize| expected.saturating_mul(width).min(RESERVED_NUMBERS);
        Self {
            value_dim,
            count: 0,
            values: Vec::with_capacity(reserve(value_dim)),
            locations: with_locations.then(|| Vec::with_capacity(reserve(3))),
        }
    }

    /// append a record laid out as in the file
    pub(crate) fn push(&mut self, record: &[f64]) {
        let offset = match &mut self.locations {
            Some(locations) => {
                locations.extend(record.iter().take(3));
                3
            }
            None => 0,
        };
        self.values.extend(record.iter().skip(offset));
        self.count += 1;
    }

    pub(crate) fn finish(self) -> Result<FieldArray, Error> {
        let count = self.count;
        let shaped = |data: Vec<f64>, width: usize| {
            let found = data.len();
            Array2::from_shape_vec((count, width), data)
                .map_err(|_| Error::from(GeometryError::from(SizeMismatch::new(count * width, found))))
        };

        let values = shaped(self.values, self.value_dim)?;
        let locations = match self.locations {
            Some(locations) => Some(shaped(locations, 3)?),
            None => None,
        };
        Ok(FieldArray { values, locations })
    }
}
