//! RANSAC-NN: outlier detection by randomized nearest-neighbor consensus.
//!
//! The features are L2-normalized so that dot products are cosine
//! similarities. Detection then runs in two stages:
//!
//! 1. **Inlier Score Prediction** draws `s = ceil(N / m)` random subsamples
//!    of size `m = max(1, round(N * sample_ratio))`. The inlier score `eta`
//!    of a sample is its worst best-match similarity over those subsamples.
//! 2. **Threshold Sampling** sweeps a trust threshold `tau` over `[0, 1)`.
//!    At each step it draws from the samples with `eta > tau` and tracks, for
//!    every sample, how often its best match in the draw falls below `tau`.
//!    That running rate is the outlier score `sigma`.
//!
//! The `m` samples with the highest `sigma` are the outliers.
//!
//! The algorithm is randomized. Pass a seed in `RansacNNParams`, or a
//! random-number generator to `detect_with_rng`, for repeatable results.
//! Without a seed, the generator is seeded from system entropy and results
//! vary from run to run.

mod stages;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{Detection, Detector, FeatureMatrix, OutlierError, ParDetector};

use stages::MaxSimilarity;

/// The parameters for `RansacNNDetector::detect`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RansacNNParams {
    /// The fraction of samples drawn in each subsample. This is also the
    /// fraction of samples flagged as outliers. Must be in `(0, 1]`.
    pub sample_ratio: f64,
    /// The number of threshold-sweep iterations in the second stage. Must be
    /// positive.
    pub threshold_iter: usize,
    /// The seed for the random-number generator. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for RansacNNParams {
    fn default() -> Self {
        Self {
            sample_ratio: 0.05,
            threshold_iter: 500,
            seed: None,
        }
    }
}

impl RansacNNParams {
    /// Sets the sample ratio.
    #[must_use]
    pub const fn with_sample_ratio(mut self, sample_ratio: f64) -> Self {
        self.sample_ratio = sample_ratio;
        self
    }

    /// Sets the number of threshold-sweep iterations.
    #[must_use]
    pub const fn with_threshold_iter(mut self, threshold_iter: usize) -> Self {
        self.threshold_iter = threshold_iter;
        self
    }

    /// Sets the seed for the random-number generator.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks that the parameters are in range.
    ///
    /// # Errors
    ///
    /// * If `sample_ratio` is not in `(0, 1]`.
    /// * If `threshold_iter` is zero.
    pub fn validate(&self) -> Result<(), OutlierError> {
        if self.sample_ratio.is_nan() || self.sample_ratio <= 0.0 || self.sample_ratio > 1.0 {
            return Err(OutlierError::parameter(
                "sample_ratio",
                format!("must be in (0, 1], but got {}.", self.sample_ratio),
            ));
        }
        if self.threshold_iter == 0 {
            return Err(OutlierError::parameter(
                "threshold_iter",
                "must be positive.".to_string(),
            ));
        }
        Ok(())
    }

    /// The subsample size `m = max(1, round(N * sample_ratio))` for `N`
    /// samples. This is also the number of outliers reported.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sample_size(&self, cardinality: usize) -> usize {
        let m = (cardinality as f64 * self.sample_ratio).round() as usize;
        m.clamp(1, cardinality.max(1))
    }

    /// The number of subsampling rounds `s = ceil(N / m)` in the first stage.
    #[must_use]
    pub fn num_rounds(&self, cardinality: usize) -> usize {
        cardinality.div_ceil(self.sample_size(cardinality))
    }
}

/// Ranks samples by how rarely they are well matched by random subsamples of
/// trusted samples, without fitting a parametric model.
#[derive(Debug, Clone)]
pub struct RansacNNDetector {
    /// The raw features.
    features: FeatureMatrix,
    /// The L2-normalized working copy of the features. Rewritten by every
    /// detection.
    normalized: Vec<Vec<f64>>,
    /// The inlier scores from the first stage of the last detection.
    inlier_scores: Vec<f64>,
    /// The number of threshold-sweep iterations in the last detection.
    iterations: usize,
    /// How many of those iterations had no trusted sample to draw from.
    skipped_iterations: usize,
    /// The result of the most recent detection.
    detection: Detection,
}

impl RansacNNDetector {
    /// Creates a new `RansacNNDetector`. No work is done until `detect`.
    #[must_use]
    pub fn new(features: FeatureMatrix) -> Self {
        Self {
            features,
            normalized: Vec::new(),
            inlier_scores: Vec::new(),
            iterations: 0,
            skipped_iterations: 0,
            detection: Detection::default(),
        }
    }

    /// Runs detection with the given random-number generator. The seed in
    /// `params` is ignored.
    ///
    /// # Errors
    ///
    /// See [`Detector::detect`].
    pub fn detect_with_rng<R: Rng>(
        &mut self,
        params: &RansacNNParams,
        rng: &mut R,
    ) -> Result<Vec<usize>, OutlierError> {
        self.run(params, rng, stages::max_similarities)
    }

    /// Parallelized version of `detect_with_rng`. The random draws are made in
    /// the same order, so the results are identical.
    ///
    /// # Errors
    ///
    /// See [`Detector::detect`].
    pub fn par_detect_with_rng<R: Rng>(
        &mut self,
        params: &RansacNNParams,
        rng: &mut R,
    ) -> Result<Vec<usize>, OutlierError> {
        self.run(params, rng, stages::par_max_similarities)
    }

    /// The inlier scores (`eta`) from the last detection.
    #[must_use]
    pub fn inlier_scores(&self) -> &[f64] {
        &self.inlier_scores
    }

    /// The number of threshold-sweep iterations skipped in the last detection
    /// because no sample was trusted at that threshold.
    #[must_use]
    pub const fn skipped_iterations(&self) -> usize {
        self.skipped_iterations
    }

    /// Whether the scores of the last detection carry no information.
    ///
    /// This is the case when every threshold-sweep iteration was skipped or
    /// when every sample got the same outlier score, which happens on tiny or
    /// degenerate datasets. The outliers are then only ordered by index.
    #[must_use]
    pub fn is_low_confidence(&self) -> bool {
        let scores = self.detection.scores();
        !scores.is_empty()
            && (self.skipped_iterations == self.iterations || scores.iter().all(|&s| s.total_cmp(&scores[0]).is_eq()))
    }

    /// Runs both stages and records the results.
    fn run<R: Rng>(
        &mut self,
        params: &RansacNNParams,
        rng: &mut R,
        max_similarity: MaxSimilarity,
    ) -> Result<Vec<usize>, OutlierError> {
        params.validate()?;

        let n = self.features.cardinality();
        let m = params.sample_size(n);
        let s = params.num_rounds(n);
        ftlog::info!(
            "Running RANSAC-NN on {n} samples with subsample size {m}, {s} rounds and {} iterations.",
            params.threshold_iter
        );

        self.normalized = self.features.l2_normalized();

        let eta = stages::inlier_score_prediction(&self.normalized, m, s, rng, max_similarity);
        let ts = stages::threshold_sampling(&self.normalized, &eta, m, params.threshold_iter, rng, max_similarity);
        if ts.skipped > 0 {
            ftlog::debug!(
                "Skipped {} of {} threshold-sweep iterations.",
                ts.skipped,
                params.threshold_iter
            );
        }

        let outliers = rank_outliers(&ts.sigma, m);

        self.inlier_scores = eta;
        self.iterations = params.threshold_iter;
        self.skipped_iterations = ts.skipped;
        self.detection = Detection::new(ts.sigma, outliers.clone());

        if self.is_low_confidence() {
            ftlog::warn!(
                "RANSAC-NN scores are not discriminative: {} of {} iterations were skipped.",
                self.skipped_iterations,
                self.iterations
            );
        }

        Ok(outliers)
    }
}

/// The indices of the `k` highest scores, in descending order of score.
/// Ties go to the lower index.
fn rank_outliers(sigma: &[f64], k: usize) -> Vec<usize> {
    let mut order = (0..sigma.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| sigma[b].total_cmp(&sigma[a]).then(a.cmp(&b)));
    order.truncate(k);
    order
}

impl Detector for RansacNNDetector {
    type Params = RansacNNParams;

    fn name(&self) -> &'static str {
        "ransac-nn"
    }

    fn features(&self) -> &FeatureMatrix {
        &self.features
    }

    fn detection(&self) -> &Detection {
        &self.detection
    }

    fn detect(&mut self, params: &RansacNNParams) -> Result<Vec<usize>, OutlierError> {
        let mut rng = params.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        self.detect_with_rng(params, &mut rng)
    }
}

impl ParDetector for RansacNNDetector {
    fn par_detect(&mut self, params: &RansacNNParams) -> Result<Vec<usize>, OutlierError> {
        let mut rng = params.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        self.par_detect_with_rng(params, &mut rng)
    }
}
