//! The two stages of RANSAC-NN and the similarity kernels they share.

use rand::{seq::index, Rng};
use rayon::prelude::*;

/// Computes, for every sample, its largest cosine similarity to any member
/// of a draw.
///
/// The samples must already be L2-normalized, so that the dot product is the
/// cosine similarity.
pub type MaxSimilarity = fn(&[Vec<f64>], &[usize]) -> Vec<f64>;

/// The dot product of two vectors of the same length.
fn dot(x: &[f64], y: &[f64]) -> f64 {
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}

/// The largest similarity of `x` to any member of `draw`.
fn best_match(data: &[Vec<f64>], draw: &[usize], x: &[f64]) -> f64 {
    draw.iter()
        .map(|&j| dot(x, &data[j]))
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Sequential `MaxSimilarity`.
pub fn max_similarities(data: &[Vec<f64>], draw: &[usize]) -> Vec<f64> {
    data.iter().map(|x| best_match(data, draw, x)).collect()
}

/// Parallel `MaxSimilarity`. Each sample is still reduced sequentially, so
/// the results are identical to `max_similarities`.
pub fn par_max_similarities(data: &[Vec<f64>], draw: &[usize]) -> Vec<f64> {
    data.par_iter().map(|x| best_match(data, draw, x)).collect()
}

/// Stage 1, Inlier Score Prediction.
///
/// Starting from `eta = 1` for every sample, runs `num_rounds` rounds. Each
/// round draws `sample_size` indices uniformly without replacement and lowers
/// every `eta` to the sample's best similarity to the draw, if that is lower.
///
/// # Returns
///
/// The inlier score of each sample. Samples that are often far from every
/// member of a random draw end with low scores.
pub fn inlier_score_prediction<R: Rng>(
    data: &[Vec<f64>],
    sample_size: usize,
    num_rounds: usize,
    rng: &mut R,
    max_similarity: MaxSimilarity,
) -> Vec<f64> {
    let mut eta = vec![1.0_f64; data.len()];

    for _ in 0..num_rounds {
        let draw = index::sample(rng, data.len(), sample_size).into_vec();
        for (e, s) in eta.iter_mut().zip(max_similarity(data, &draw)) {
            *e = e.min(s);
        }
    }

    eta
}

/// The outcome of stage 2.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSampling {
    /// The outlier score of each sample.
    pub sigma: Vec<f64>,
    /// The number of iterations in which no sample had an inlier score above
    /// the threshold.
    pub skipped: usize,
}

/// Stage 2, Threshold Sampling.
///
/// For `k` in `1..=num_iters`, the threshold `tau = (k - 1) / num_iters`
/// sweeps over `[0, 1)`. The samples whose inlier score is above `tau` are
/// trusted. Up to `sample_size` trusted samples are drawn, and each sample's
/// running failure rate `sigma` is updated with whether its best similarity
/// to the draw is below `tau`. Iterations with no trusted sample are skipped
/// and leave `sigma` unchanged.
#[allow(clippy::cast_precision_loss)]
pub fn threshold_sampling<R: Rng>(
    data: &[Vec<f64>],
    eta: &[f64],
    sample_size: usize,
    num_iters: usize,
    rng: &mut R,
    max_similarity: MaxSimilarity,
) -> ThresholdSampling {
    let mut sigma = vec![0.0_f64; data.len()];
    let mut skipped = 0;

    for k in 1..=num_iters {
        let tau = (k - 1) as f64 / num_iters as f64;

        let eligible = eta
            .iter()
            .enumerate()
            .filter(|&(_, &e)| e > tau)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        if eligible.is_empty() {
            skipped += 1;
            continue;
        }

        let amount = sample_size.min(eligible.len());
        let draw = index::sample(rng, eligible.len(), amount)
            .into_iter()
            .map(|p| eligible[p])
            .collect::<Vec<_>>();

        let k_f = k as f64;
        for (s, sim) in sigma.iter_mut().zip(max_similarity(data, &draw)) {
            let failed = if sim < tau { 1.0 } else { 0.0 };
            *s = (k_f - 1.0).mul_add(*s, failed) / k_f;
        }
    }

    ThresholdSampling { sigma, skipped }
}
