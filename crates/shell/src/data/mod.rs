//! Reading inputs and writing results.

use std::path::Path;

use feature_outliers::{Detector, FeatureMatrix};

mod npy;

/// Reads the feature matrix from the file at the given path.
pub fn read_features<P: AsRef<Path>>(path: P) -> Result<FeatureMatrix, String> {
    match Format::from_path(&path)? {
        Format::Npy => npy::NpyType::read(path),
    }
}

/// Reads one item identifier per line, kept verbatim, so that line `i`
/// names row `i`. Without a path, the items are the row indices.
pub fn read_items<P: AsRef<Path>>(path: Option<P>, cardinality: usize) -> Result<Vec<String>, String> {
    let Some(path) = path else {
        return Ok((0..cardinality).map(|i| i.to_string()).collect());
    };

    let contents = std::fs::read_to_string(&path).map_err(|e| e.to_string())?;
    let items = contents.lines().map(ToString::to_string).collect::<Vec<_>>();

    if items.len() == cardinality {
        Ok(items)
    } else {
        Err(format!(
            "Expected {cardinality} items in {} but found {}.",
            path.as_ref().display(),
            items.len()
        ))
    }
}

/// Writes one CSV record per sample with its item, score and verdict.
pub fn write_scores<D: Detector, W: std::io::Write>(detector: &D, items: &[String], writer: W) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(writer);
    writer
        .write_record(["index", "item", "score", "outlier"])
        .map_err(|e| e.to_string())?;

    let records = items
        .iter()
        .zip(detector.outlier_scores())
        .zip(detector.outlier_mask());
    for (i, ((item, score), outlier)) in records.enumerate() {
        writer
            .write_record([&i.to_string(), item, &score.to_string(), &outlier.to_string()])
            .map_err(|e| e.to_string())?;
    }

    writer.flush().map_err(|e| e.to_string())
}

/// Input formats supported in the CLI.
enum Format {
    /// Npy array format.
    Npy,
}

impl Format {
    /// Determines the format from the file extension.
    fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("npy") => Ok(Self::Npy),
            Some(ext) => Err(format!(
                "Unknown data format {ext} for path: {}",
                path.as_ref().display()
            )),
            None => Err(format!(
                "Could not determine data format without extension for path: {}",
                path.as_ref().display()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use feature_outliers::{Detector, FeatureMatrix, MahalanobisDetector, MahalanobisParams};

    #[test]
    fn items_are_kept_verbatim() -> Result<(), String> {
        let dir = tempdir::TempDir::new("outliers-shell").map_err(|e| e.to_string())?;
        let path = dir.path().join("items.txt");
        std::fs::write(&path, "a.png\n\n  c.png \r\nd.png\n").map_err(|e| e.to_string())?;

        let items = super::read_items(Some(&path), 4)?;
        assert_eq!(items, vec!["a.png", "", "  c.png ", "d.png"]);

        assert!(super::read_items(Some(&path), 3).is_err());
        assert_eq!(super::read_items(None::<&str>, 3)?, vec!["0", "1", "2"]);

        Ok(())
    }

    #[test]
    fn reads_f32_and_f64() -> Result<(), String> {
        let dir = tempdir::TempDir::new("outliers-shell").map_err(|e| e.to_string())?;

        let f32_path = dir.path().join("f32.npy");
        let arr = ndarray::arr2(&[[1.0_f32, 2.0], [3.0, 4.5]]);
        ndarray_npy::write_npy(&f32_path, &arr).map_err(|e| e.to_string())?;

        let f64_path = dir.path().join("f64.npy");
        let arr = ndarray::arr2(&[[1.0_f64, 2.0], [3.0, 4.5]]);
        ndarray_npy::write_npy(&f64_path, &arr).map_err(|e| e.to_string())?;

        let a = super::read_features(&f32_path)?;
        let b = super::read_features(&f64_path)?;
        assert_eq!(a, b);
        assert_eq!(a.row(1), &[3.0, 4.5]);

        assert!(super::read_features(dir.path().join("f64.csv")).is_err());

        Ok(())
    }

    #[test]
    fn scores_csv() -> Result<(), String> {
        let features = FeatureMatrix::new(vec![vec![0.0], vec![1.0], vec![2.0]]).map_err(|e| e.to_string())?;
        let mut detector = MahalanobisDetector::new(features).map_err(|e| e.to_string())?;
        detector
            .detect(&MahalanobisParams::default().with_threshold(0.5))
            .map_err(|e| e.to_string())?;

        let items = vec!["x".to_string(), "y".to_string(), "z".to_string()];
        let mut out = Vec::new();
        super::write_scores(&detector, &items, &mut out)?;

        let text = String::from_utf8(out).map_err(|e| e.to_string())?;
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines, vec!["index,item,score,outlier", "0,x,1,true", "1,y,0,false", "2,z,1,true"]);

        Ok(())
    }
}
