use thiserror::Error;

/// Whole-file failures. Row-level problems never surface here.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("unsupported file format {0:?}: use CSV, JSON, GeoJSON or KML")]
    UnsupportedFormat(String),
    #[error("latitude and longitude columns not found")]
    MissingCoordinateColumns,
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("JSON format not recognized")]
    UnrecognizedJson,
    #[error("no georeferenced data found in file")]
    NoFeatures,
}
