//! Producing a `FeatureMatrix` from a collection of items.

use rayon::prelude::*;

use crate::OutlierError;

use super::FeatureMatrix;

/// Produces one fixed-length feature vector per item.
///
/// Implementors only need to describe a single item. The rows of the
/// extracted `FeatureMatrix` are in the same order as the items.
pub trait FeatureProvider {
    /// The type of the items, e.g. decoded images.
    type Item;

    /// Extracts the features of a single item.
    ///
    /// # Errors
    ///
    /// * If the features of the item cannot be computed.
    fn features_of(&self, item: &Self::Item) -> Result<Vec<f64>, OutlierError>;

    /// Extracts the features of every item.
    ///
    /// # Errors
    ///
    /// * If the features of any item cannot be computed.
    /// * If the resulting matrix is invalid, e.g. the feature vectors have
    ///   different lengths or there are fewer than two items.
    fn extract(&self, items: &[Self::Item]) -> Result<FeatureMatrix, OutlierError> {
        let rows = items
            .iter()
            .map(|item| self.features_of(item))
            .collect::<Result<Vec<_>, _>>()?;
        FeatureMatrix::new(rows)
    }

    /// Parallelized version of `extract`.
    ///
    /// # Errors
    ///
    /// See [`FeatureProvider::extract`].
    fn par_extract(&self, items: &[Self::Item]) -> Result<FeatureMatrix, OutlierError>
    where
        Self: Sync,
        Self::Item: Sync,
    {
        let rows = items
            .par_iter()
            .map(|item| self.features_of(item))
            .collect::<Result<Vec<_>, _>>()?;
        FeatureMatrix::new(rows)
    }
}

/// A decoded image as interleaved 8-bit samples in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// The number of rows of pixels.
    height: usize,
    /// The number of columns of pixels.
    width: usize,
    /// The number of samples per pixel, e.g. 3 for RGB.
    channels: usize,
    /// The samples, `height * width * channels` of them.
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Creates a new `PixelBuffer`.
    ///
    /// # Errors
    ///
    /// * If any of the dimensions is zero.
    /// * If `data` does not hold exactly `height * width * channels` samples.
    pub fn new(height: usize, width: usize, channels: usize, data: Vec<u8>) -> Result<Self, OutlierError> {
        if height == 0 || width == 0 || channels == 0 {
            return Err(OutlierError::invalid_input(format!(
                "Image dimensions must be positive, but got {height}x{width}x{channels}."
            )));
        }
        let expected = height * width * channels;
        if data.len() != expected {
            return Err(OutlierError::invalid_input(format!(
                "A {height}x{width}x{channels} image needs {expected} samples, but got {}.",
                data.len()
            )));
        }
        Ok(Self {
            height,
            width,
            channels,
            data,
        })
    }

    /// The number of rows of pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// The number of columns of pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// The number of samples per pixel.
    #[must_use]
    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Iterates over the samples of one channel.
    fn channel(&self, c: usize) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().skip(c).step_by(self.channels).map(|&v| f64::from(v))
    }
}

/// Raw image statistics as features.
///
/// For an image with `C` channels, the features are, in order:
///
/// * the mean of each channel (`C` values),
/// * the population standard deviation of each channel (`C` values),
/// * the height, the width and the area in pixels.
///
/// Images with different channel counts produce feature vectors of different
/// lengths, so they cannot share a `FeatureMatrix`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorStatistics;

impl ColorStatistics {
    /// The number of features produced for an image with `channels` channels.
    #[must_use]
    pub const fn num_features(channels: usize) -> usize {
        2 * channels + 3
    }
}

impl FeatureProvider for ColorStatistics {
    type Item = PixelBuffer;

    #[allow(clippy::cast_precision_loss)]
    fn features_of(&self, image: &PixelBuffer) -> Result<Vec<f64>, OutlierError> {
        let area = image.height * image.width;
        let n = area as f64;

        let means = (0..image.channels)
            .map(|c| image.channel(c).sum::<f64>() / n)
            .collect::<Vec<_>>();
        let stds = means
            .iter()
            .enumerate()
            .map(|(c, &mean)| (image.channel(c).map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt())
            .collect::<Vec<_>>();

        let mut features = Vec::with_capacity(Self::num_features(image.channels));
        features.extend(means);
        features.extend(stds);
        features.extend([image.height as f64, image.width as f64, n]);
        Ok(features)
    }
}
