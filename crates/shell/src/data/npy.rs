//! Element types we can read from npy files.

use std::path::Path;

use feature_outliers::FeatureMatrix;
use ndarray::Array2;

/// The element types of the arrays we accept.
#[derive(Debug, Clone, Copy)]
pub enum NpyType {
    /// 32-bit floats.
    F32,
    /// 64-bit floats.
    F64,
}

impl NpyType {
    /// Reads a 2d array from a NPY file, trying each element type in turn.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<FeatureMatrix, String> {
        for ty in Self::variants() {
            match ty.read_with_type(&path) {
                Ok(features) => return features.map_err(|e| e.to_string()),
                Err(e) => ftlog::debug!("Not an array of {ty:?}: {e}"),
            }
        }
        Err(format!(
            "Failed to read NPY file at path: {}. Expected a 2d array of f32 or f64.",
            path.as_ref().display()
        ))
    }

    /// The element types, in the order they are tried.
    const fn variants() -> &'static [Self] {
        &[Self::F32, Self::F64]
    }

    /// Reads a 2d array from a NPY file with a specific element type.
    ///
    /// The outer error means the file does not hold an array of this type.
    /// The inner one means the array is not a valid feature matrix.
    fn read_with_type<P: AsRef<Path>>(
        self,
        path: P,
    ) -> Result<Result<FeatureMatrix, feature_outliers::OutlierError>, ndarray_npy::ReadNpyError> {
        match self {
            Self::F32 => ndarray_npy::read_npy::<_, Array2<f32>>(&path).map(|arr| FeatureMatrix::from_array2(&arr)),
            Self::F64 => ndarray_npy::read_npy::<_, Array2<f64>>(&path).map(|arr| FeatureMatrix::from_array2(&arr)),
        }
    }
}
