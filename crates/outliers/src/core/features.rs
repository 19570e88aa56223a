//! A `FeatureMatrix` is the tabular input to every `Detector`.

use distances::Number;
use serde::{Deserialize, Serialize};

use crate::OutlierError;

/// The smallest number of samples for which detection is defined.
pub const MIN_SAMPLES: usize = 2;

/// An `N x D` matrix of features with one row per sample.
///
/// The row order is the index space used by every `Detector` built over the
/// matrix. Construction validates the shape, so every `FeatureMatrix` has at
/// least two rows, at least one column, no ragged rows and only finite values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    /// The rows of the matrix.
    rows: Vec<Vec<f64>>,
    /// The number of columns.
    dimensionality: usize,
}

impl FeatureMatrix {
    /// Creates a new `FeatureMatrix` from rows of `f64`.
    ///
    /// # Errors
    ///
    /// * If there are fewer than two rows.
    /// * If the rows are empty or do not all have the same length.
    /// * If any value is `NaN` or infinite.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, OutlierError> {
        if rows.is_empty() {
            return Err(OutlierError::invalid_input("The feature matrix is empty.".to_string()));
        }
        if rows.len() < MIN_SAMPLES {
            return Err(OutlierError::invalid_input(format!(
                "At least {MIN_SAMPLES} samples are needed, but got {}.",
                rows.len()
            )));
        }

        let dimensionality = rows[0].len();
        if dimensionality == 0 {
            return Err(OutlierError::invalid_input("The feature vectors are empty.".to_string()));
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != dimensionality) {
            return Err(OutlierError::invalid_input(format!(
                "Ragged feature matrix: row {i} has {} features but row 0 has {dimensionality}.",
                row.len()
            )));
        }
        if let Some(i) = rows.iter().position(|r| r.iter().any(|v| !v.is_finite())) {
            return Err(OutlierError::invalid_input(format!(
                "Row {i} contains a non-finite value."
            )));
        }

        Ok(Self { rows, dimensionality })
    }

    /// Creates a new `FeatureMatrix` from rows of any numeric type.
    ///
    /// # Errors
    ///
    /// See [`FeatureMatrix::new`].
    pub fn from_numbers<T: Number>(rows: &[Vec<T>]) -> Result<Self, OutlierError> {
        Self::new(
            rows.iter()
                .map(|row| row.iter().map(|v| v.as_f64()).collect())
                .collect(),
        )
    }

    /// The number of samples, `N`.
    #[must_use]
    pub fn cardinality(&self) -> usize {
        self.rows.len()
    }

    /// The number of features per sample, `D`.
    #[must_use]
    pub const fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    /// The rows of the matrix.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// The row at `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    /// Returns a copy of the matrix with every row scaled to unit Euclidean
    /// norm.
    ///
    /// After normalization, the dot product of two rows is their cosine
    /// similarity. Rows with zero norm are left as zeros.
    #[must_use]
    pub fn l2_normalized(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|row| l2_normalize(row)).collect()
    }
}

/// Scales a vector to unit Euclidean norm. Zero vectors are returned as is.
///
/// The vector is first divided by its largest absolute value, so that
/// squaring neither overflows nor underflows for any finite input.
fn l2_normalize(row: &[f64]) -> Vec<f64> {
    let scale = row.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if scale > 0.0 {
        let scaled = row.iter().map(|v| v / scale).collect::<Vec<_>>();
        let norm = scaled.iter().map(|v| v * v).sum::<f64>().sqrt();
        scaled.into_iter().map(|v| v / norm).collect()
    } else {
        row.to_vec()
    }
}

#[cfg(feature = "ndarray-bindings")]
impl FeatureMatrix {
    /// Creates a new `FeatureMatrix` from a 2d array with one sample per row.
    ///
    /// # Errors
    ///
    /// See [`FeatureMatrix::new`].
    pub fn from_array2<T: Number>(arr: &ndarray::Array2<T>) -> Result<Self, OutlierError> {
        Self::new(
            arr.axis_iter(ndarray::Axis(0))
                .map(|row| row.iter().map(|v| v.as_f64()).collect())
                .collect(),
        )
    }

    /// Reads a `FeatureMatrix` from a `.npy` file holding a 2d array.
    ///
    /// # Errors
    ///
    /// * If the file cannot be read as a 2d array of `T`.
    /// * See [`FeatureMatrix::new`].
    pub fn read_npy<T, P>(path: P) -> Result<Self, OutlierError>
    where
        T: Number + ndarray_npy::ReadableElement,
        P: AsRef<std::path::Path>,
    {
        let arr: ndarray::Array2<T> = ndarray_npy::read_npy(&path).map_err(|e| {
            OutlierError::invalid_input(format!("Failed to read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_array2(&arr)
    }
}
