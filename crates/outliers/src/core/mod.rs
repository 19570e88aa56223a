//! The core traits and structs shared by all detectors.

mod detector;
mod features;
mod provider;

pub use detector::{Detection, Detector, ParDetector};
pub use features::{FeatureMatrix, MIN_SAMPLES};
pub use provider::{ColorStatistics, FeatureProvider, PixelBuffer};
