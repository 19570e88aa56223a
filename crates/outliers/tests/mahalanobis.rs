//! Tests for the `MahalanobisDetector`.

use feature_outliers::{Detector, FeatureMatrix, MahalanobisDetector, MahalanobisParams, OutlierError, ParDetector};
use test_case::test_case;

mod common;

#[test]
fn far_point_is_the_only_outlier() -> Result<(), OutlierError> {
    let features = FeatureMatrix::new(common::data_gen::ring_with_far_point())?;
    let mut detector = MahalanobisDetector::new(features)?;

    let outliers = detector.detect(&MahalanobisParams::default())?;
    assert_eq!(outliers, vec![10]);
    assert_eq!(detector.outlier_indices(), &[10]);
    assert_eq!(detector.inlier_indices(), (0..10).collect::<Vec<_>>());

    let scores = detector.outlier_scores();
    assert_eq!(scores.len(), 11);
    assert!(scores[10] > 3.0);
    assert!(scores[..10].iter().all(|&d| d < 3.0));

    Ok(())
}

#[test_case(10, 2; "10_2")]
#[test_case(50, 3; "50_3")]
#[test_case(200, 8; "200_8")]
fn zero_threshold_flags_everything(car: usize, dim: usize) -> Result<(), OutlierError> {
    let features = FeatureMatrix::new(common::data_gen::tabular(car, dim, -1.0, 1.0, 42))?;
    let mut detector = MahalanobisDetector::new(features)?;

    let outliers = detector.detect(&MahalanobisParams::default().with_threshold(0.0))?;
    assert_eq!(outliers, (0..car).collect::<Vec<_>>());
    assert!(detector.inlier_indices().is_empty());

    let outliers = detector.detect(&MahalanobisParams::default().with_threshold(-1.0))?;
    assert_eq!(outliers.len(), car);

    Ok(())
}

#[test]
fn identical_rows_are_singular() -> Result<(), OutlierError> {
    let features = FeatureMatrix::new(vec![vec![1.0, 2.0, 3.0]; 5])?;
    let err = MahalanobisDetector::new(features.clone());
    assert!(matches!(err, Err(OutlierError::SingularCovariance { dimensionality: 3, .. })));

    // A ridge makes the covariance invertible. Every sample sits on the mean.
    let mut detector = MahalanobisDetector::with_ridge(features, 1.0)?;
    detector.detect(&MahalanobisParams::default())?;
    assert!(detector.outlier_indices().is_empty());
    assert!(detector.outlier_scores().iter().all(|&d| d.abs() < f64::EPSILON));

    Ok(())
}

#[test]
fn more_features_than_samples_is_singular() -> Result<(), OutlierError> {
    let features = FeatureMatrix::new(common::data_gen::tabular(4, 6, 0.0, 1.0, 42))?;
    assert!(matches!(
        MahalanobisDetector::new(features),
        Err(OutlierError::SingularCovariance { .. })
    ));
    Ok(())
}

#[test]
fn collinear_features_are_singular() -> Result<(), OutlierError> {
    // The second feature is twice the first.
    let rows = (0..10).map(|i| vec![f64::from(i), 2.0 * f64::from(i)]).collect();
    let features = FeatureMatrix::new(rows)?;
    assert!(matches!(
        MahalanobisDetector::new(features),
        Err(OutlierError::SingularCovariance { .. })
    ));
    Ok(())
}

#[test]
fn invariant_to_affine_maps() -> Result<(), OutlierError> {
    let rows = common::data_gen::tabular(50, 3, -5.0, 5.0, 42);
    let mut detector = MahalanobisDetector::new(FeatureMatrix::new(rows.clone())?)?;
    detector.detect(&MahalanobisParams::default())?;
    let expected = detector.outlier_scores().to_vec();

    let identity = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]];
    let skew = vec![vec![2.0, 1.0, 0.0], vec![0.0, 1.0, 3.0], vec![1.0, 0.0, 1.0]];
    let shift = [100.0, -20.0, 3.5];

    for (a, b) in [(&identity, &shift), (&skew, &[0.0; 3]), (&skew, &shift)] {
        let moved = common::data_gen::affine(&rows, a, b);
        let mut moved_detector = MahalanobisDetector::new(FeatureMatrix::new(moved)?)?;
        moved_detector.detect(&MahalanobisParams::default())?;

        for (&e, &d) in expected.iter().zip(moved_detector.outlier_scores()) {
            assert!(float_cmp::approx_eq!(f64, e, d, epsilon = 1e-8), "{e} vs {d}");
        }
    }

    Ok(())
}

#[test_case(&[1.0, 1e7]; "one_large_column")]
#[test_case(&[1e-7, 1.0]; "one_small_column")]
#[test_case(&[1e-6, 1e8]; "both_columns")]
fn invariant_to_rescaling(scales: &[f64]) -> Result<(), OutlierError> {
    let rows = common::data_gen::tabular(50, 2, 0.0, 1.0, 42);
    let mut detector = MahalanobisDetector::new(FeatureMatrix::new(rows.clone())?)?;
    detector.detect(&MahalanobisParams::default())?;

    let scaled = rows
        .iter()
        .map(|x| x.iter().zip(scales).map(|(v, s)| v * s).collect())
        .collect();
    let mut scaled_detector = MahalanobisDetector::new(FeatureMatrix::new(scaled)?)?;
    scaled_detector.detect(&MahalanobisParams::default())?;

    for (&e, &d) in detector.outlier_scores().iter().zip(scaled_detector.outlier_scores()) {
        assert!(float_cmp::approx_eq!(f64, e, d, epsilon = 1e-8), "{e} vs {d}");
    }

    Ok(())
}

#[test]
fn constant_feature_is_singular() -> Result<(), OutlierError> {
    let rows = (0..10).map(|i| vec![f64::from(i), 5.0]).collect();
    let features = FeatureMatrix::new(rows)?;
    assert!(matches!(
        MahalanobisDetector::new(features),
        Err(OutlierError::SingularCovariance { condition, .. }) if condition.is_infinite()
    ));
    Ok(())
}

#[test]
fn repeatable() -> Result<(), OutlierError> {
    let features = FeatureMatrix::new(common::data_gen::tabular(100, 4, 0.0, 10.0, 7))?;
    let mut detector = MahalanobisDetector::new(features)?;
    let params = MahalanobisParams::default().with_threshold(2.0);

    let first = detector.detect(&params)?;
    let scores = detector.outlier_scores().to_vec();

    assert_eq!(detector.detect(&params)?, first);
    assert_eq!(detector.outlier_scores(), scores.as_slice());

    assert_eq!(detector.par_detect(&params)?, first);
    assert_eq!(detector.outlier_scores(), scores.as_slice());

    Ok(())
}

#[test]
fn parameter_errors_keep_the_last_detection() -> Result<(), OutlierError> {
    let features = FeatureMatrix::new(common::data_gen::ring_with_far_point())?;
    let mut detector = MahalanobisDetector::new(features)?;
    detector.detect(&MahalanobisParams::default())?;

    let err = detector.detect(&MahalanobisParams::default().with_threshold(f64::INFINITY));
    assert!(matches!(err, Err(OutlierError::ParameterError { .. })));
    assert_eq!(detector.outlier_indices(), &[10]);
    assert_eq!(detector.outlier_scores().len(), 11);

    Ok(())
}
