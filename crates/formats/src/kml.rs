//! Placemark extraction from KML text.
//!
//! Only `<name>` and the first `lon,lat[,alt]` tuple of `<coordinates>` are
//! read; every placemark becomes a point.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::feature::{Feature, Geometry, Properties};

static PLACEMARK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<Placemark(?:\s[^>]*)?>(.*?)</Placemark>").expect("valid placemark regex")
});
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<name>(.*?)</name>").expect("valid name regex"));
static COORDINATES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<coordinates>(.*?)</coordinates>").expect("valid coordinates regex")
});

pub fn parse_kml(text: &str) -> Vec<Feature> {
    let mut out = Vec::new();
    for (index, cap) in PLACEMARK_RE.captures_iter(text).enumerate() {
        let body = cap.get(1).map_or("", |m| m.as_str());

        let Some(position) = COORDINATES_RE
            .captures(body)
            .and_then(|c| c.get(1))
            .and_then(|m| first_tuple(m.as_str()))
        else {
            warn!(index, "kml: dropping placemark without parsable coordinates");
            continue;
        };

        let name = NAME_RE
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| unescape_xml(m.as_str().trim()))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Point {}", index + 1));

        let mut properties = Properties::new();
        properties.insert("source".to_string(), Value::String("kml".to_string()));

        out.push(Feature::new(
            format!("kml-{index}"),
            name,
            Geometry::Point(position),
            properties,
        ));
    }
    out
}

/// `lon,lat[,alt]` of the first whitespace-separated tuple.
fn first_tuple(raw: &str) -> Option<[f64; 2]> {
    let tuple = raw.split_whitespace().next()?;
    let mut parts = tuple.split(',');
    let lon = parts.next()?.trim().parse::<f64>().ok()?;
    let lat = parts.next()?.trim().parse::<f64>().ok()?;
    (lon.is_finite() && lat.is_finite()).then_some([lon, lat])
}

pub fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{escape_xml, parse_kml, unescape_xml};
    use crate::feature::Geometry;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_placemarks_in_lon_lat_order() {
        let features = parse_kml(include_str!("../assets/placemarks.kml"));
        assert_eq!(features.len(), 3);

        assert_eq!(features[0].name, "Coleta & Analise");
        assert_eq!(features[0].geometry, Geometry::Point([-46.6333, -23.5505]));
        assert_eq!(features[0].property_text("source").as_deref(), Some("kml"));

        assert_eq!(features[1].name, "Point 2");
        assert_eq!(features[1].geometry, Geometry::Point([-43.1729, -22.9068]));

        // The third placemark has no coordinates; ids keep the source position.
        assert_eq!(features[2].id, "kml-3");
        assert_eq!(features[2].geometry, Geometry::Point([-47.0, -23.0]));
    }

    #[test]
    fn no_placemarks_is_empty() {
        assert!(parse_kml("<kml><Document/></kml>").is_empty());
    }

    #[test]
    fn xml_escaping_round_trips() {
        let raw = r#"A & B <"c"> 'd'"#;
        assert_eq!(unescape_xml(&escape_xml(raw)), raw);
    }
}
