//! Data generation utilities for testing.

use rand::prelude::*;
use rand_distr::Normal;

/// Ten points on a circle of radius 0.1 around the origin, followed by the
/// point `(100, 100)` at index 10.
pub fn ring_with_far_point() -> Vec<Vec<f64>> {
    let mut rows = (0..10)
        .map(|i| {
            let angle = f64::from(i) * core::f64::consts::PI / 5.0;
            vec![0.1 * angle.cos(), 0.1 * angle.sin()]
        })
        .collect::<Vec<_>>();
    rows.push(vec![100.0, 100.0]);
    rows
}

/// `car` rows of `dim` values drawn uniformly from `[min, max)`.
pub fn tabular(car: usize, dim: usize, min: f64, max: f64, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..car)
        .map(|_| (0..dim).map(|_| rng.gen_range(min..max)).collect())
        .collect()
}

/// The direction shared by the inliers from `noisy_cluster`.
pub fn base_direction(dim: usize) -> Vec<f64> {
    vec![1.0; dim]
}

/// `num_inliers` copies of `base_direction` with Gaussian noise of standard
/// deviation `0.01`, followed by `num_outliers` standard basis vectors.
///
/// Each outlier points along a different axis, so the outliers are far from
/// the inliers and from each other in cosine similarity.
pub fn noisy_cluster(num_inliers: usize, num_outliers: usize, dim: usize, seed: u64) -> Vec<Vec<f64>> {
    assert!(num_outliers <= dim, "Not enough axes for the outliers.");

    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.01).unwrap_or_else(|e| unreachable!("{e}"));

    let inliers = (0..num_inliers).map(|_| {
        base_direction(dim)
            .into_iter()
            .map(|v| v + noise.sample(&mut rng))
            .collect::<Vec<_>>()
    });
    let outliers = (0..num_outliers).map(|k| {
        let mut row = vec![0.0; dim];
        row[k] = 1.0;
        row
    });

    inliers.chain(outliers).collect()
}

/// Applies the linear map `a` (in row-major order) and then the translation
/// `shift` to every row.
pub fn affine(rows: &[Vec<f64>], a: &[Vec<f64>], shift: &[f64]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|x| {
            a.iter()
                .zip(shift)
                .map(|(a_row, s)| a_row.iter().zip(x).map(|(a, v)| a * v).sum::<f64>() + s)
                .collect()
        })
        .collect()
}
