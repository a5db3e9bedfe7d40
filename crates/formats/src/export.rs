//! Encoders for the visible feature set.
//!
//! Every encoder works from one flattened [`ExportRow`] per feature. Polygon
//! geometry is reduced to a representative point on export.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::FormatError;
use crate::feature::{Feature, value_text};
use crate::format::FileFormat;
use crate::kml::escape_xml;

/// Which semantic fields an export includes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSelection {
    pub coordinates: bool,
    pub name: bool,
    #[serde(rename = "type")]
    pub kind: bool,
    pub status: bool,
    pub details: bool,
}

impl Default for FieldSelection {
    fn default() -> Self {
        Self {
            coordinates: true,
            name: true,
            kind: true,
            status: true,
            details: false,
        }
    }
}

impl FieldSelection {
    pub fn none() -> Self {
        Self {
            coordinates: false,
            name: false,
            kind: false,
            status: false,
            details: false,
        }
    }

    /// Parses a comma-separated list such as `name,coordinates,type`.
    pub fn from_list(list: &str) -> Result<Self, String> {
        let mut out = Self::none();
        for field in list.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            match field.to_ascii_lowercase().as_str() {
                "coordinates" | "coords" => out.coordinates = true,
                "name" => out.name = true,
                "type" | "kind" => out.kind = true,
                "status" => out.status = true,
                "details" => out.details = true,
                other => return Err(format!("unknown export field: {other}")),
            }
        }
        Ok(out)
    }
}

/// A generated download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub contents: String,
}

/// Flattened view of one feature for export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow<'a> {
    pub name: &'a str,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub kind: String,
    pub status: Option<String>,
    pub details: &'a Map<String, Value>,
}

impl<'a> ExportRow<'a> {
    pub fn from_feature(feature: &'a Feature) -> Self {
        let position = feature.geometry.representative_position();
        let kind = feature
            .property_text("type")
            .unwrap_or_else(|| feature.kind().as_str().to_string());
        Self {
            name: &feature.name,
            latitude: position.map(|p| p[1]),
            longitude: position.map(|p| p[0]),
            kind,
            status: feature.properties.get("status").and_then(value_text),
            details: &feature.properties,
        }
    }
}

pub fn encode<'a, I>(
    features: I,
    format: FileFormat,
    fields: &FieldSelection,
) -> Result<String, FormatError>
where
    I: IntoIterator<Item = &'a Feature>,
{
    let rows: Vec<ExportRow<'a>> = features.into_iter().map(ExportRow::from_feature).collect();
    match format {
        FileFormat::Csv => Ok(encode_csv(&rows, fields)),
        FileFormat::Json => Ok(serde_json::to_string_pretty(&json_rows(&rows, fields))?),
        FileFormat::GeoJson => Ok(serde_json::to_string_pretty(&geojson_collection(
            &rows, fields,
        ))?),
        FileFormat::Kml => Ok(encode_kml(&rows, fields)),
    }
}

/// Encodes and wraps the result with the fixed download name for `format`.
pub fn export_file<'a, I>(
    features: I,
    format: FileFormat,
    fields: &FieldSelection,
) -> Result<ExportFile, FormatError>
where
    I: IntoIterator<Item = &'a Feature>,
{
    Ok(ExportFile {
        file_name: format.export_file_name(),
        mime_type: format.mime_type(),
        contents: encode(features, format, fields)?,
    })
}

fn encode_csv(rows: &[ExportRow<'_>], fields: &FieldSelection) -> String {
    let mut headers: Vec<&str> = Vec::new();
    if fields.name {
        headers.push("name");
    }
    if fields.coordinates {
        headers.push("latitude");
        headers.push("longitude");
    }
    if fields.kind {
        headers.push("type");
    }
    if fields.status {
        headers.push("status");
    }
    if fields.details {
        headers.push("details");
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(headers.join(","));
    for row in rows {
        let mut cells: Vec<String> = Vec::with_capacity(headers.len());
        if fields.name {
            cells.push(row.name.to_string());
        }
        if fields.coordinates {
            cells.push(row.latitude.map(|v| v.to_string()).unwrap_or_default());
            cells.push(row.longitude.map(|v| v.to_string()).unwrap_or_default());
        }
        if fields.kind {
            cells.push(row.kind.clone());
        }
        if fields.status {
            cells.push(row.status.clone().unwrap_or_default());
        }
        if fields.details {
            let details = Value::Object(row.details.clone()).to_string();
            cells.push(quote_csv_cell(&details));
        }
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

fn quote_csv_cell(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

fn json_rows(rows: &[ExportRow<'_>], fields: &FieldSelection) -> Value {
    let items = rows
        .iter()
        .map(|row| {
            let mut obj = Map::new();
            if fields.name {
                obj.insert("name".to_string(), Value::String(row.name.to_string()));
            }
            if fields.coordinates {
                obj.insert("latitude".to_string(), json!(row.latitude));
                obj.insert("longitude".to_string(), json!(row.longitude));
            }
            insert_descriptive(&mut obj, row, fields);
            Value::Object(obj)
        })
        .collect();
    Value::Array(items)
}

fn geojson_collection(rows: &[ExportRow<'_>], fields: &FieldSelection) -> Value {
    let features: Vec<Value> = rows
        .iter()
        .map(|row| {
            let mut props = Map::new();
            if fields.name {
                props.insert("name".to_string(), Value::String(row.name.to_string()));
            }
            insert_descriptive(&mut props, row, fields);
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [row.longitude, row.latitude],
                },
                "properties": props,
            })
        })
        .collect();
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

fn insert_descriptive(obj: &mut Map<String, Value>, row: &ExportRow<'_>, fields: &FieldSelection) {
    if fields.kind {
        obj.insert("type".to_string(), Value::String(row.kind.clone()));
    }
    if let (true, Some(status)) = (fields.status, &row.status) {
        obj.insert("status".to_string(), Value::String(status.clone()));
    }
    if fields.details {
        obj.insert("details".to_string(), Value::Object(row.details.clone()));
    }
}

fn encode_kml(rows: &[ExportRow<'_>], fields: &FieldSelection) -> String {
    let mut placemarks = String::new();
    for row in rows {
        let (Some(lon), Some(lat)) = (row.longitude, row.latitude) else {
            continue;
        };
        placemarks.push_str("\n    <Placemark>\n");
        placemarks.push_str(&format!("      <name>{}</name>\n", escape_xml(row.name)));
        if let (true, Some(status)) = (fields.status, &row.status) {
            placemarks.push_str(&format!(
                "      <description>{}</description>\n",
                escape_xml(status)
            ));
        }
        placemarks.push_str(&format!(
            "      <Point>\n        <coordinates>{lon},{lat},0</coordinates>\n      </Point>\n"
        ));
        placemarks.push_str("    </Placemark>");
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <kml xmlns=\"http://www.opengis.net/kml/2.2\">\n  \
         <Document>\n    \
         <name>Georeferenced Data</name>{placemarks}\n  \
         </Document>\n\
         </kml>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::{ExportRow, FieldSelection, encode, export_file};
    use crate::csv::parse_csv;
    use crate::feature::{Feature, Geometry, Properties};
    use crate::format::FileFormat;
    use crate::geojson::parse_json;
    use crate::kml::parse_kml;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn sample() -> Vec<Feature> {
        parse_csv(include_str!("../assets/sample_points.csv")).unwrap()
    }

    #[test]
    fn json_honors_field_selection() {
        let fields = FieldSelection {
            name: true,
            ..FieldSelection::none()
        };
        let out = encode(&sample(), FileFormat::Json, &fields).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            value,
            json!([{"name": "Empresa A"}, {"name": "Processo B"}])
        );
    }

    #[test]
    fn csv_omits_unselected_columns_and_quotes_details() {
        let fields = FieldSelection {
            name: true,
            status: true,
            details: true,
            ..FieldSelection::none()
        };
        let out = encode(&sample()[..1], FileFormat::Csv, &fields).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("name,status,details"));
        assert_eq!(
            lines.next(),
            Some(
                "Empresa A,ativo,\"{\"\"name\"\":\"\"Empresa A\"\",\"\"latitude\"\":\"\"-23.5505\"\",\
                 \"\"longitude\"\":\"\"-46.6333\"\",\"\"status\"\":\"\"ativo\"\"}\""
            )
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn csv_default_selection_has_coordinates() {
        let out = encode(&sample(), FileFormat::Csv, &FieldSelection::default()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "name,latitude,longitude,type,status");
        assert_eq!(lines[1], "Empresa A,-23.5505,-46.6333,Point,ativo");
    }

    #[test]
    fn geojson_export_downgrades_polygons_to_points() {
        let polys = parse_json(include_str!("../assets/areas.geojson")).unwrap();
        let out = encode(&polys, FileFormat::GeoJson, &FieldSelection::default()).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        let features = value["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        for f in features {
            assert_eq!(f["geometry"]["type"], "Point");
        }
        let first = &features[0];
        assert_eq!(first["properties"]["type"], "Polygon");
        assert_eq!(first["properties"]["status"], "aprovado");
        let coords = first["geometry"]["coordinates"].as_array().unwrap();
        assert!((coords[0].as_f64().unwrap() + 46.65).abs() < 1e-9);
        assert!((coords[1].as_f64().unwrap() + 23.55).abs() < 1e-9);
    }

    #[test]
    fn kml_always_has_name_and_coordinates() {
        let out = encode(&sample(), FileFormat::Kml, &FieldSelection::none()).unwrap();
        assert!(out.contains("<name>Empresa A</name>"));
        assert!(out.contains("<coordinates>-46.6333,-23.5505,0</coordinates>"));
        assert!(!out.contains("<description>"));

        let back = parse_kml(&out);
        assert_eq!(back.len(), 2);
        assert_eq!(back[1].geometry, Geometry::Point([-43.1729, -22.9068]));
    }

    #[test]
    fn empty_export_is_allowed() {
        let none: Vec<Feature> = Vec::new();
        let file = export_file(&none, FileFormat::Json, &FieldSelection::default()).unwrap();
        assert_eq!(file.file_name, "geo_data.json");
        assert_eq!(file.contents, "[]");
        let csv = encode(&none, FileFormat::Csv, &FieldSelection::default()).unwrap();
        assert_eq!(csv, "name,latitude,longitude,type,status");
    }

    #[test]
    fn type_prefers_source_property() {
        let mut props = Properties::new();
        props.insert("type".to_string(), json!("process"));
        let f = Feature::new("p1", "P", Geometry::Point([1.0, 2.0]), props);
        let row = ExportRow::from_feature(&f);
        assert_eq!(row.kind, "process");
        assert_eq!(row.status, None);
    }

    #[test]
    fn field_list_parsing() {
        let f = FieldSelection::from_list("name, type,details").unwrap();
        assert!(f.name && f.kind && f.details);
        assert!(!f.coordinates && !f.status);
        assert!(FieldSelection::from_list("name,colour").is_err());
    }
}
