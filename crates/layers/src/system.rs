//! System layers derived from host-application records.
//!
//! Records are JSON rows from the persistence API. Each carries its location
//! as a `"lat, lng"` string in `coordinates`.

use foundation::color::Color;
use foundation::math::Position;
use formats::{Feature, Geometry, Properties};
use serde_json::Value;
use tracing::warn;

use crate::layer::LayerId;

pub const PROCESSES_LAYER_ID: &str = "processes";
pub const COMPANIES_LAYER_ID: &str = "companies";

const PROCESSES_COLOR: Color = Color::rgb(0x3B, 0x82, 0xF6);
const COMPANIES_COLOR: Color = Color::rgb(0x8B, 0x5C, 0xF6);

/// A fully recomputed system layer, ready for `LayerStore::replace_system_layers`.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemLayerDef {
    pub id: LayerId,
    pub name: String,
    pub color: Color,
    pub features: Vec<Feature>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RecordKind {
    Process,
    Company,
}

impl RecordKind {
    fn tag(self) -> &'static str {
        match self {
            RecordKind::Process => "process",
            RecordKind::Company => "company",
        }
    }

    fn display_name(self, record: &Value) -> String {
        let name = match self {
            RecordKind::Process => record.pointer("/companies/name"),
            RecordKind::Company => record.get("name"),
        };
        match name.and_then(Value::as_str).filter(|s| !s.trim().is_empty()) {
            Some(s) => s.to_string(),
            None => match self {
                RecordKind::Process => "Process".to_string(),
                RecordKind::Company => "Company".to_string(),
            },
        }
    }
}

/// Both system layers, skipping any that would be empty.
pub fn system_layers(processes: &[Value], companies: &[Value]) -> Vec<SystemLayerDef> {
    [process_layer(processes), company_layer(companies)]
        .into_iter()
        .flatten()
        .collect()
}

pub fn process_layer(records: &[Value]) -> Option<SystemLayerDef> {
    build_layer(
        records,
        RecordKind::Process,
        PROCESSES_LAYER_ID,
        "Licensing Processes",
        PROCESSES_COLOR,
    )
}

pub fn company_layer(records: &[Value]) -> Option<SystemLayerDef> {
    build_layer(
        records,
        RecordKind::Company,
        COMPANIES_LAYER_ID,
        "Registered Companies",
        COMPANIES_COLOR,
    )
}

fn build_layer(
    records: &[Value],
    kind: RecordKind,
    id: &str,
    name: &str,
    color: Color,
) -> Option<SystemLayerDef> {
    let features: Vec<Feature> = records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| record_feature(record, index, kind))
        .collect();
    if features.is_empty() {
        return None;
    }
    Some(SystemLayerDef {
        id: LayerId::from(id),
        name: name.to_string(),
        color,
        features,
    })
}

fn record_feature(record: &Value, index: usize, kind: RecordKind) -> Option<Feature> {
    let raw = record.get("coordinates").and_then(Value::as_str)?;
    let Some(position) = parse_lat_lng(raw) else {
        warn!(index, kind = kind.tag(), raw, "skipping record with unparsable coordinates");
        return None;
    };

    let id = match record.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("{}-{index}", kind.tag()),
    };

    let mut properties = Properties::new();
    if let Some(obj) = record.as_object() {
        for (key, value) in obj {
            if !value.is_object() && !value.is_array() {
                properties.insert(key.clone(), value.clone());
            }
        }
    }
    properties.insert("type".to_string(), Value::String(kind.tag().to_string()));

    Some(Feature::new(
        id,
        kind.display_name(record),
        Geometry::Point(position),
        properties,
    ))
}

/// Parses `"lat, lng"` into a `[lon, lat]` position.
pub fn parse_lat_lng(raw: &str) -> Option<Position> {
    let (lat, lng) = raw.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lng = lng.trim().parse::<f64>().ok()?;
    (lat.is_finite() && lng.is_finite()).then_some([lng, lat])
}

#[cfg(test)]
mod tests {
    use super::{company_layer, parse_lat_lng, process_layer, system_layers};
    use formats::Geometry;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn lat_lng_strings_are_swapped_into_lon_lat() {
        assert_eq!(parse_lat_lng("-23.55, -46.63"), Some([-46.63, -23.55]));
        assert_eq!(parse_lat_lng("abc, -46.63"), None);
        assert_eq!(parse_lat_lng("-23.55"), None);
    }

    #[test]
    fn processes_take_company_name_and_type_tag() {
        let records = vec![
            json!({
                "id": "p-1",
                "protocol_number": "LP-2024-001",
                "status": "em_analise",
                "coordinates": "-23.5505, -46.6333",
                "companies": { "name": "Mineradora Sul" }
            }),
            json!({ "id": "p-2", "coordinates": "x, y" }),
            json!({ "id": "p-3" }),
            json!({ "id": 4, "coordinates": "-22.9, -43.1" }),
        ];
        let layer = process_layer(&records).unwrap();
        assert_eq!(layer.id.as_str(), "processes");
        assert_eq!(layer.name, "Licensing Processes");
        assert_eq!(layer.color.to_hex(), "#3B82F6");
        assert_eq!(layer.features.len(), 2);

        let first = &layer.features[0];
        assert_eq!(first.id, "p-1");
        assert_eq!(first.name, "Mineradora Sul");
        assert_eq!(first.geometry, Geometry::Point([-46.6333, -23.5505]));
        assert_eq!(first.property_text("type").as_deref(), Some("process"));
        assert_eq!(first.property_text("status").as_deref(), Some("em_analise"));
        assert!(!first.properties.contains_key("companies"));

        assert_eq!(layer.features[1].id, "4");
        assert_eq!(layer.features[1].name, "Process");
    }

    #[test]
    fn empty_layers_are_not_produced() {
        assert!(company_layer(&[json!({ "name": "Sem local" })]).is_none());
        let defs = system_layers(
            &[],
            &[json!({ "id": "c-1", "name": "Acme", "coordinates": "1, 2" })],
        );
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "Registered Companies");
        assert_eq!(defs[0].features[0].name, "Acme");
        assert_eq!(defs[0].features[0].property_text("type").as_deref(), Some("company"));
    }
}
