//! Outlier detection with the Mahalanobis distance under a Gaussian model.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{Detection, Detector, FeatureMatrix, OutlierError, ParDetector};

/// The parameters for `MahalanobisDetector::detect`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MahalanobisParams {
    /// Samples whose distance from the mean is strictly greater than this
    /// are outliers. A non-positive threshold flags every sample.
    pub threshold: f64,
}

impl Default for MahalanobisParams {
    fn default() -> Self {
        Self { threshold: 3.0 }
    }
}

impl MahalanobisParams {
    /// Sets the distance threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Models the features as a single multivariate Gaussian and flags the
/// samples that are far from its mean.
///
/// The mean, the covariance and its inverse are fitted once, at
/// construction. The distance of a sample `x` is
/// `sqrt((x - mean)' * inv_cov * (x - mean))`, which is invariant to
/// invertible linear transformations of the feature space.
#[derive(Debug, Clone)]
pub struct MahalanobisDetector {
    /// The features the model was fitted on.
    features: FeatureMatrix,
    /// The mean of each feature.
    mean: DVector<f64>,
    /// The unbiased sample covariance, plus the ridge if one was given.
    covariance: DMatrix<f64>,
    /// The inverse of `covariance`.
    inv_covariance: DMatrix<f64>,
    /// The result of the most recent detection.
    detection: Detection,
}

impl MahalanobisDetector {
    /// Fits a Gaussian model to the features.
    ///
    /// # Errors
    ///
    /// * `SingularCovariance` if a feature is constant or the features are
    ///   numerically collinear. This always happens when there are at least
    ///   as many features as samples.
    pub fn new(features: FeatureMatrix) -> Result<Self, OutlierError> {
        let (mean, covariance) = fit_gaussian(&features);
        Self::with_covariance(features, mean, covariance)
    }

    /// Fits a Gaussian model to the features, adding `ridge` to the diagonal
    /// of the covariance matrix before inverting it.
    ///
    /// This makes a rank-deficient covariance invertible at the cost of
    /// distances that no longer follow the exact model. `new` never
    /// regularizes.
    ///
    /// # Errors
    ///
    /// * `ParameterError` if `ridge` is negative or not finite.
    /// * `SingularCovariance` if the regularized covariance is still singular.
    pub fn with_ridge(features: FeatureMatrix, ridge: f64) -> Result<Self, OutlierError> {
        if !ridge.is_finite() || ridge < 0.0 {
            return Err(OutlierError::parameter(
                "ridge",
                format!("must be finite and non-negative, but got {ridge}."),
            ));
        }

        let (mean, mut covariance) = fit_gaussian(&features);
        for i in 0..covariance.nrows() {
            covariance[(i, i)] += ridge;
        }
        ftlog::debug!("Added a ridge of {ridge} to the covariance diagonal.");

        Self::with_covariance(features, mean, covariance)
    }

    /// Inverts the covariance and assembles the detector.
    fn with_covariance(
        features: FeatureMatrix,
        mean: DVector<f64>,
        covariance: DMatrix<f64>,
    ) -> Result<Self, OutlierError> {
        let inv_covariance = invert(&covariance)?;
        ftlog::info!(
            "Fitted a Gaussian model on {} samples with {} features.",
            features.cardinality(),
            features.dimensionality()
        );

        Ok(Self {
            features,
            mean,
            covariance,
            inv_covariance,
            detection: Detection::default(),
        })
    }

    /// The mean of each feature.
    #[must_use]
    pub fn mean(&self) -> &[f64] {
        self.mean.as_slice()
    }

    /// The covariance matrix used by the model.
    #[must_use]
    pub const fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// The inverse of the covariance matrix.
    #[must_use]
    pub const fn inverse_covariance(&self) -> &DMatrix<f64> {
        &self.inv_covariance
    }

    /// The Mahalanobis distance of a feature vector from the mean.
    ///
    /// # Errors
    ///
    /// * If `x` does not have one value per feature.
    pub fn distance(&self, x: &[f64]) -> Result<f64, OutlierError> {
        if x.len() == self.mean.len() {
            Ok(self.distance_unchecked(x))
        } else {
            Err(OutlierError::invalid_input(format!(
                "Expected {} features but got {}.",
                self.mean.len(),
                x.len()
            )))
        }
    }

    /// The Mahalanobis distance of a feature vector of the right length.
    fn distance_unchecked(&self, x: &[f64]) -> f64 {
        let diff = DVector::from_column_slice(x) - &self.mean;
        // Round-off can make the quadratic form slightly negative.
        diff.dot(&(&self.inv_covariance * &diff)).max(0.0).sqrt()
    }

    /// Records the distances and flags the samples beyond the threshold.
    fn record(&mut self, distances: Vec<f64>, threshold: f64) -> Vec<usize> {
        let outliers = distances
            .iter()
            .enumerate()
            .filter(|&(_, &d)| threshold <= 0.0 || d > threshold)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        ftlog::debug!(
            "Found {} outliers among {} samples at threshold {threshold}.",
            outliers.len(),
            distances.len()
        );

        self.detection = Detection::new(distances, outliers.clone());
        outliers
    }
}

impl Detector for MahalanobisDetector {
    type Params = MahalanobisParams;

    fn name(&self) -> &'static str {
        "mahalanobis"
    }

    fn features(&self) -> &FeatureMatrix {
        &self.features
    }

    fn detection(&self) -> &Detection {
        &self.detection
    }

    fn detect(&mut self, params: &MahalanobisParams) -> Result<Vec<usize>, OutlierError> {
        check_threshold(params.threshold)?;
        let distances = self
            .features
            .rows()
            .iter()
            .map(|x| self.distance_unchecked(x))
            .collect();
        Ok(self.record(distances, params.threshold))
    }
}

impl ParDetector for MahalanobisDetector {
    fn par_detect(&mut self, params: &MahalanobisParams) -> Result<Vec<usize>, OutlierError> {
        check_threshold(params.threshold)?;
        let distances = self
            .features
            .rows()
            .par_iter()
            .map(|x| self.distance_unchecked(x))
            .collect();
        Ok(self.record(distances, params.threshold))
    }
}

/// Checks that the distance threshold is a usable number.
fn check_threshold(threshold: f64) -> Result<(), OutlierError> {
    if threshold.is_finite() {
        Ok(())
    } else {
        Err(OutlierError::parameter(
            "threshold",
            format!("must be finite, but got {threshold}."),
        ))
    }
}

/// Computes the mean and the unbiased sample covariance of the features.
#[allow(clippy::cast_precision_loss)]
fn fit_gaussian(features: &FeatureMatrix) -> (DVector<f64>, DMatrix<f64>) {
    let (n, d) = (features.cardinality(), features.dimensionality());
    let x = DMatrix::from_row_iterator(n, d, features.rows().iter().flatten().copied());

    let mean = DVector::from_iterator(d, x.column_iter().map(|c| c.sum() / n as f64));
    let centered = DMatrix::from_fn(n, d, |i, j| x[(i, j)] - mean[j]);
    let covariance = centered.transpose() * &centered / (n - 1) as f64;

    (mean, covariance)
}

/// Correlation matrices with a larger condition number are treated as singular.
pub const MAX_CONDITION: f64 = 1e12;

/// Inverts a covariance matrix, rejecting singular and ill-conditioned ones.
///
/// Conditioning is measured on the correlation matrix `S^-1 * cov * S^-1`,
/// where `S` holds the standard deviation of each feature, so that it does
/// not depend on the units of the features. A matrix is rejected when any
/// feature has zero variance or when the condition number of the
/// correlation matrix exceeds `MAX_CONDITION`.
fn invert(covariance: &DMatrix<f64>) -> Result<DMatrix<f64>, OutlierError> {
    let d = covariance.nrows();

    let singular = |condition: f64| {
        let err = OutlierError::SingularCovariance {
            dimensionality: d,
            condition,
        };
        ftlog::error!("{err}");
        err
    };

    let scales = covariance.diagonal().map(f64::sqrt);
    if scales.iter().any(|&s| s <= 0.0 || !s.is_finite()) {
        return Err(singular(f64::INFINITY));
    }

    let correlation = DMatrix::from_fn(d, d, |i, j| covariance[(i, j)] / (scales[i] * scales[j]));
    let singular_values = correlation.singular_values();
    let (s_max, s_min) = (singular_values.max(), singular_values.min());
    let condition = if s_min > 0.0 { s_max / s_min } else { f64::INFINITY };
    if condition > MAX_CONDITION {
        return Err(singular(condition));
    }
    ftlog::debug!("The correlation matrix has condition number {condition:e}.");

    correlation
        .try_inverse()
        .map(|inv| DMatrix::from_fn(d, d, |i, j| inv[(i, j)] / (scales[i] * scales[j])))
        .filter(|inv| inv.iter().all(|v| v.is_finite()))
        .ok_or_else(|| singular(condition))
}
