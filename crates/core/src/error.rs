//! Error types for gridstat

use thiserror::Error;

/// Main error type for gridstat operations.
///
/// Everything here is a configuration problem detected before data is
/// reduced. Missing data (empty zones, all-null windows) is never an error and
/// shows up as NaN or zero counts in the outputs instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("CRS mismatch: zones use {0}, data raster uses {1}")]
    CrsMismatch(String, String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Unknown statistic: {0:?}")]
    UnknownStatistic(String),

    #[error("No statistics requested")]
    EmptyStatistics,

    #[error("Invalid feature raster: {0}")]
    InvalidFeatureRaster(String),

    #[error("Duplicate row index {index} while assembling result table")]
    DuplicateRowIndex { index: usize },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`].
    pub fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for gridstat operations
pub type Result<T> = std::result::Result<T, Error>;
