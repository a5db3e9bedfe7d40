//! Header-driven CSV point import.
//!
//! The header row decides which columns carry latitude, longitude and the
//! display label by case-insensitive substring match. Cells are split on bare
//! commas; quoting is not interpreted.

use serde_json::Value;
use tracing::warn;

use crate::error::FormatError;
use crate::feature::{Feature, Geometry, Properties};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CsvColumns {
    pub lat: usize,
    pub lon: usize,
    pub name: Option<usize>,
}

impl CsvColumns {
    /// Resolves columns from lowercase header names.
    pub fn detect(headers: &[String]) -> Result<Self, FormatError> {
        let lat = headers
            .iter()
            .position(|h| h.contains("lat"))
            .ok_or(FormatError::MissingCoordinateColumns)?;
        let lon = headers
            .iter()
            .enumerate()
            .position(|(i, h)| i != lat && (h.contains("lng") || h.contains("lon")))
            .ok_or(FormatError::MissingCoordinateColumns)?;
        let name = headers
            .iter()
            .position(|h| h.contains("name") || h.contains("nome"));
        Ok(Self { lat, lon, name })
    }
}

pub fn parse_csv(text: &str) -> Result<Vec<Feature>, FormatError> {
    let mut lines = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
    let Some(header_line) = lines.next() else {
        return Err(FormatError::MissingCoordinateColumns);
    };
    let headers: Vec<String> = header_line
        .split(',')
        .map(|h| h.trim().to_lowercase())
        .collect();
    let columns = CsvColumns::detect(&headers)?;

    let mut out = Vec::new();
    for (row, line) in lines.filter(|l| !l.trim().is_empty()).enumerate() {
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        let lat = cells.get(columns.lat).and_then(|c| parse_ordinate(c));
        let lon = cells.get(columns.lon).and_then(|c| parse_ordinate(c));
        let (Some(lat), Some(lon)) = (lat, lon) else {
            warn!(row, "csv: dropping row with non-numeric coordinates");
            continue;
        };

        let name = columns
            .name
            .and_then(|i| cells.get(i))
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string())
            .unwrap_or_else(|| format!("Point {}", row + 1));

        let mut properties = Properties::new();
        for (header, cell) in headers.iter().zip(cells.iter()) {
            properties.insert(header.clone(), Value::String(cell.to_string()));
        }

        out.push(Feature::new(
            format!("csv-{row}"),
            name,
            Geometry::Point([lon, lat]),
            properties,
        ));
    }
    Ok(out)
}

fn parse_ordinate(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}
