//! JSON and GeoJSON import.
//!
//! Three shapes are recognized: a GeoJSON `FeatureCollection`, a plain array
//! of flat objects carrying latitude/longitude keys, and a single such object.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::FormatError;
use crate::feature::{Feature, Geometry, Properties, Ring};

/// Property keys tried, in order, for a feature's display name.
pub const NAME_KEYS: [&str; 3] = ["municipio", "name", "Nome"];

pub fn parse_json(payload: &str) -> Result<Vec<Feature>, FormatError> {
    let value: Value = serde_json::from_str(payload)?;
    parse_json_value(&value)
}

pub fn parse_json_value(value: &Value) -> Result<Vec<Feature>, FormatError> {
    match value {
        Value::Object(obj) if obj.get("type").and_then(Value::as_str) == Some("FeatureCollection") => {
            Ok(parse_feature_collection(obj))
        }
        Value::Array(items) => Ok(parse_flat_array(items)),
        Value::Object(obj) if obj.contains_key("latitude") || obj.contains_key("lat") => {
            Ok(parse_flat_object(obj, None).into_iter().collect())
        }
        _ => Err(FormatError::UnrecognizedJson),
    }
}

fn parse_feature_collection(obj: &Map<String, Value>) -> Vec<Feature> {
    let Some(features_val) = obj.get("features").and_then(Value::as_array) else {
        warn!("geojson: FeatureCollection without a features array");
        return Vec::new();
    };

    let mut out = Vec::with_capacity(features_val.len());
    for (index, feat_val) in features_val.iter().enumerate() {
        match parse_feature(index, feat_val) {
            Ok(feature) => out.push(feature),
            Err(reason) => warn!(index, %reason, "geojson: dropping feature"),
        }
    }
    debug!(
        total = out.len(),
        dropped = features_val.len() - out.len(),
        "geojson: parsed FeatureCollection"
    );
    out
}

fn parse_feature(index: usize, value: &Value) -> Result<Feature, String> {
    let feat_obj = value
        .as_object()
        .ok_or("feature must be an object".to_string())?;

    let geometry_val = feat_obj
        .get("geometry")
        .filter(|g| !g.is_null())
        .ok_or("feature missing geometry".to_string())?;
    let geometry = parse_geometry(geometry_val)?;
    let kind = geometry.kind();

    let id = match feat_obj.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("{}-{index}", kind.as_str().to_lowercase()),
    };

    let properties = feat_obj
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let name = name_from(&properties, &NAME_KEYS)
        .unwrap_or_else(|| format!("{} {}", kind.as_str(), index + 1));

    Ok(Feature::new(id, name, geometry, properties))
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;

    let coords = obj
        .get("coordinates")
        .filter(|c| c.is_array())
        .ok_or("geometry missing coordinates array".to_string())?;

    match ty {
        "Point" => Ok(Geometry::Point(parse_position(coords)?)),
        "Polygon" => Ok(Geometry::Polygon(parse_polygon(coords)?)),
        "MultiPolygon" => Ok(Geometry::MultiPolygon(parse_multi_polygon(coords)?)),
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

fn parse_position(coords: &Value) -> Result<[f64; 2], String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat]".to_string());
    }
    let lon = finite(&arr[0]).ok_or("lon must be a finite number".to_string())?;
    let lat = finite(&arr[1]).ok_or("lat must be a finite number".to_string())?;
    Ok([lon, lat])
}

fn parse_ring(coords: &Value) -> Result<Ring, String> {
    let arr = coords
        .as_array()
        .ok_or("ring must be an array of positions".to_string())?;
    let mut out = Vec::with_capacity(arr.len());
    for item in arr {
        out.push(parse_position(item)?);
    }
    Ok(out)
}

fn parse_polygon(coords: &Value) -> Result<Vec<Ring>, String> {
    let rings = coords
        .as_array()
        .ok_or("Polygon coordinates must be an array of rings".to_string())?;
    if rings.is_empty() {
        return Err("Polygon has no rings".to_string());
    }
    let mut out = Vec::with_capacity(rings.len());
    for ring in rings {
        out.push(parse_ring(ring)?);
    }
    if out[0].is_empty() {
        return Err("Polygon outer ring is empty".to_string());
    }
    Ok(out)
}

fn parse_multi_polygon(coords: &Value) -> Result<Vec<Vec<Ring>>, String> {
    let polys = coords
        .as_array()
        .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
    if polys.is_empty() {
        return Err("MultiPolygon has no polygons".to_string());
    }
    let mut out = Vec::with_capacity(polys.len());
    for poly in polys {
        out.push(parse_polygon(poly)?);
    }
    Ok(out)
}

fn parse_flat_array(items: &[Value]) -> Vec<Feature> {
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Some(obj) = item.as_object() else {
            warn!(index, "json: dropping non-object array item");
            continue;
        };
        match parse_flat_object(obj, Some(index)) {
            Some(feature) => out.push(feature),
            None => warn!(index, "json: dropping item with non-numeric coordinates"),
        }
    }
    out
}

/// Point feature from `latitude|lat` and `longitude|lng` keys.
///
/// `index` is `None` for the single-object shape.
fn parse_flat_object(obj: &Map<String, Value>, index: Option<usize>) -> Option<Feature> {
    let lat = first_numeric(obj, &["latitude", "lat"])?;
    let lon = first_numeric(obj, &["longitude", "lng"])?;

    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => match index {
            Some(i) => format!("json-{i}"),
            None => "json-single".to_string(),
        },
    };
    let name = name_from(obj, &["name", "Nome"]).unwrap_or_else(|| match index {
        Some(i) => format!("Item {}", i + 1),
        None => "Imported Point".to_string(),
    });

    Some(Feature::new(
        id,
        name,
        Geometry::Point([lon, lat]),
        obj.clone(),
    ))
}

fn first_numeric(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| obj.get(*k)).and_then(finite)
}

/// Accepts JSON numbers and numeric strings; rejects non-finite values.
fn finite(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

fn name_from(props: &Properties, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match props.get(*k) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
