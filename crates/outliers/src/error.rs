//! Errors raised while building detectors or detecting outliers.

/// The errors raised by this crate.
///
/// All errors are raised synchronously. A detector that returns an error
/// from `detect` keeps the result of its previous successful call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OutlierError {
    /// The feature matrix (or a collection paired with it) is unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The covariance matrix of the features cannot be inverted.
    #[error(
        "Singular covariance: the {dimensionality}x{dimensionality} correlation matrix has condition number {condition:e}"
    )]
    SingularCovariance {
        /// The number of features.
        dimensionality: usize,
        /// The ratio of the largest to the smallest singular value of the
        /// correlation matrix. This is infinite when a feature is constant.
        condition: f64,
    },

    /// A parameter is out of its valid range.
    #[error("Invalid parameter: {name} - {reason}")]
    ParameterError {
        /// The name of the parameter.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl OutlierError {
    /// Creates an `InvalidInput` error and logs it.
    pub(crate) fn invalid_input(msg: String) -> Self {
        ftlog::error!("{msg}");
        Self::InvalidInput(msg)
    }

    /// Creates a `ParameterError` and logs it.
    pub(crate) fn parameter(name: &str, reason: String) -> Self {
        ftlog::error!("Invalid parameter {name}: {reason}");
        Self::ParameterError {
            name: name.to_string(),
            reason,
        }
    }
}
