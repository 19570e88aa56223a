//! The `Detector` trait shared by all outlier-detection algorithms.

use serde::{Deserialize, Serialize};

use crate::OutlierError;

use super::FeatureMatrix;

/// The result of the most recent call to `Detector::detect`.
///
/// `scores[i]` is the outlier score of sample `i`. Higher scores are more
/// anomalous, but scores from different algorithms are on different scales
/// and must not be compared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// The outlier score of each sample.
    scores: Vec<f64>,
    /// The indices of the outliers, in the order chosen by the decision rule.
    outliers: Vec<usize>,
}

impl Detection {
    /// Creates a new `Detection`.
    ///
    /// Every index in `outliers` must be a valid index into `scores`.
    pub(crate) fn new(scores: Vec<f64>, outliers: Vec<usize>) -> Self {
        debug_assert!(outliers.iter().all(|&i| i < scores.len()));
        Self { scores, outliers }
    }

    /// The outlier score of each sample. Empty before the first detection.
    #[must_use]
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// The indices of the outliers.
    #[must_use]
    pub fn outliers(&self) -> &[usize] {
        &self.outliers
    }

    /// Whether no detection has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// An outlier-detection algorithm over a `FeatureMatrix`.
///
/// Implementors own a snapshot of the features they were built from and any
/// parameters fitted at construction. Fitted parameters are never refreshed;
/// re-fitting requires a new instance.
///
/// `detect` records its result, which is then available through the
/// accessor methods until the next successful call.
pub trait Detector {
    /// The parameters accepted by `detect`. The `Default` holds the
    /// recommended values.
    type Params: Default;

    /// A short name for the algorithm.
    fn name(&self) -> &'static str;

    /// The features this detector was built over.
    fn features(&self) -> &FeatureMatrix;

    /// The result of the most recent successful detection.
    fn detection(&self) -> &Detection;

    /// Detects outliers and records the scores and indices.
    ///
    /// # Returns
    ///
    /// The indices of the outliers.
    ///
    /// # Errors
    ///
    /// * If any parameter is out of range. The previous detection is kept.
    fn detect(&mut self, params: &Self::Params) -> Result<Vec<usize>, OutlierError>;

    /// The number of samples, `N`.
    fn num_samples(&self) -> usize {
        self.features().cardinality()
    }

    /// The outlier score of each sample from the most recent detection.
    fn outlier_scores(&self) -> &[f64] {
        self.detection().scores()
    }

    /// The outlier indices from the most recent detection.
    fn outlier_indices(&self) -> &[usize] {
        self.detection().outliers()
    }

    /// Whether the sample at `index` was flagged by the most recent detection.
    ///
    /// This scans the outlier indices. Use `outlier_mask` to query every
    /// sample.
    fn is_outlier(&self, index: usize) -> bool {
        self.outlier_indices().contains(&index)
    }

    /// One flag per sample, set for the outliers of the most recent detection.
    fn outlier_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.num_samples()];
        for &i in self.outlier_indices() {
            mask[i] = true;
        }
        mask
    }

    /// The indices in `[0, N)` that are not outliers, in ascending order.
    ///
    /// Before the first detection, every index is an inlier.
    fn inlier_indices(&self) -> Vec<usize> {
        self.outlier_mask()
            .into_iter()
            .enumerate()
            .filter(|&(_, o)| !o)
            .map(|(i, _)| i)
            .collect()
    }

    /// Maps the outlier indices back to the caller's item identifiers, such
    /// as file paths, in the order of `outlier_indices`.
    ///
    /// # Errors
    ///
    /// * If `items` does not have exactly one entry per sample.
    fn outlier_items<'a, T>(&self, items: &'a [T]) -> Result<Vec<&'a T>, OutlierError> {
        check_items(items.len(), self.num_samples())?;
        Ok(self.outlier_indices().iter().map(|&i| &items[i]).collect())
    }

    /// Maps the inlier indices back to the caller's item identifiers.
    ///
    /// # Errors
    ///
    /// * If `items` does not have exactly one entry per sample.
    fn inlier_items<'a, T>(&self, items: &'a [T]) -> Result<Vec<&'a T>, OutlierError> {
        check_items(items.len(), self.num_samples())?;
        Ok(self.inlier_indices().into_iter().map(|i| &items[i]).collect())
    }
}

/// Parallelized versions of the `Detector` methods.
///
/// `par_detect` must record exactly what `detect` would record for the same
/// parameters.
pub trait ParDetector: Detector + Send + Sync {
    /// Parallelized version of `detect`.
    ///
    /// # Errors
    ///
    /// See [`Detector::detect`].
    fn par_detect(&mut self, params: &Self::Params) -> Result<Vec<usize>, OutlierError>;
}

/// Checks that a collection of item identifiers lines up with the samples.
fn check_items(num_items: usize, num_samples: usize) -> Result<(), OutlierError> {
    if num_items == num_samples {
        Ok(())
    } else {
        Err(OutlierError::invalid_input(format!(
            "Expected one item per sample. {num_items} vs {num_samples}"
        )))
    }
}
