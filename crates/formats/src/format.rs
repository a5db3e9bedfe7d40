use serde::{Deserialize, Serialize};

use crate::error::FormatError;

/// The file formats accepted on import and produced on export.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Json,
    GeoJson,
    Kml,
}

impl FileFormat {
    /// Picks the format from the lowercase extension of `file_name`.
    pub fn from_file_name(file_name: &str) -> Result<Self, FormatError> {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        Self::from_extension(&ext).ok_or_else(|| FormatError::UnsupportedFormat(file_name.to_string()))
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" => Some(FileFormat::Csv),
            "json" => Some(FileFormat::Json),
            "geojson" => Some(FileFormat::GeoJson),
            "kml" => Some(FileFormat::Kml),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
            FileFormat::GeoJson => "geojson",
            FileFormat::Kml => "kml",
        }
    }

    /// Fixed download name for exports.
    pub fn export_file_name(self) -> String {
        format!("geo_data.{}", self.extension())
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            FileFormat::Csv => "text/csv",
            FileFormat::Json => "application/json",
            FileFormat::GeoJson => "application/geo+json",
            FileFormat::Kml => "application/vnd.google-earth.kml+xml",
        }
    }
}

impl std::str::FromStr for FileFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| FormatError::UnsupportedFormat(s.to_string()))
    }
}
