pub mod csv;
pub mod error;
pub mod export;
pub mod feature;
pub mod format;
pub mod geojson;
pub mod kml;

pub use error::*;
pub use export::*;
pub use feature::*;
pub use format::*;

/// Parses `raw` as `format` into normalized features.
///
/// Per-row problems are logged and skipped. Only whole-file problems are
/// errors. An empty result is `Ok(vec![])`; callers decide whether that is
/// fatal.
pub fn parse(raw: &str, format: FileFormat) -> Result<Vec<Feature>, FormatError> {
    match format {
        FileFormat::Csv => csv::parse_csv(raw),
        FileFormat::Json | FileFormat::GeoJson => geojson::parse_json(raw),
        FileFormat::Kml => Ok(kml::parse_kml(raw)),
    }
}

/// Parses a file by name, rejecting unknown extensions and empty results.
pub fn parse_file(file_name: &str, raw: &str) -> Result<Vec<Feature>, FormatError> {
    let format = FileFormat::from_file_name(file_name)?;
    let features = parse(raw, format)?;
    if features.is_empty() {
        return Err(FormatError::NoFeatures);
    }
    Ok(features)
}
