//! Error types for the cellmap library.

use thiserror::Error;

/// Errors that can occur while configuring, ingesting or scanning a coverage map.
///
/// Absence of a prediction is *not* an error: the interpolation engine
/// returns `None` for empty stores, far-away query points and degenerate
/// weights (see [`crate::interpolate::NoPrediction`]).
#[derive(Error, Debug)]
pub enum CellmapError {
    /// IO error when reading survey files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV input.
    #[cfg(feature = "csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A configuration option is out of its valid range.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        field: &'static str,
        message: String,
    },

    /// A metric name other than `auto`, `RSRP` or `RSSI`.
    #[error("Unknown metric: {value} (expected auto, RSRP or RSSI)")]
    UnknownMetric { value: String },

    /// A required column is absent from a survey file.
    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    /// A coordinate could not be interpreted.
    #[error("Invalid coordinate: {message}")]
    InvalidCoordinate { message: String },

    /// The requested grid would exceed the configured cell limit.
    #[error("Grid too large: {cells} cells exceeds the limit of {limit}; increase the grid step or shrink the area")]
    GridTooLarge { cells: u64, limit: u64 },
}

/// Result type alias using [`CellmapError`].
pub type Result<T> = std::result::Result<T, CellmapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CellmapError::InvalidConfig {
            field: "grid_step_deg",
            message: "must be a positive finite number (got -1)".to_string(),
        };
        assert!(err.to_string().contains("grid_step_deg"));
        assert!(err.to_string().contains("-1"));

        let err = CellmapError::UnknownMetric {
            value: "RSCP".to_string(),
        };
        assert!(err.to_string().contains("RSCP"));

        let err = CellmapError::MissingColumn {
            column: "LAT".to_string(),
        };
        assert!(err.to_string().contains("LAT"));

        let err = CellmapError::GridTooLarge {
            cells: 5_000_000,
            limit: 4_000_000,
        };
        assert!(err.to_string().contains("5000000"));
    }
}
