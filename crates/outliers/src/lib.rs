#![deny(clippy::correctness)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::pedantic,
    clippy::nursery,
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::cast_lossless
)]
#![doc = include_str!("../README.md")]

mod core;
mod error;
pub mod mahalanobis;
pub mod ransac_nn;

pub use self::core::{
    ColorStatistics, Detection, Detector, FeatureMatrix, FeatureProvider, ParDetector, PixelBuffer, MIN_SAMPLES,
};
pub use error::OutlierError;
pub use mahalanobis::{MahalanobisDetector, MahalanobisParams};
pub use ransac_nn::{RansacNNDetector, RansacNNParams};

/// The current version of the crate.
pub const VERSION: &str = "0.1.0";
