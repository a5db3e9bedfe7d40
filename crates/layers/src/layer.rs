use std::fmt;

use foundation::bounds::Aabb2;
use foundation::color::Color;
use foundation::time::Timestamp;
use formats::Feature;
use serde::{Deserialize, Serialize};

use crate::symbology::LayerStyle;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerSource {
    /// Derived from host-application records; refreshed, never deleted.
    System,
    /// Created from a user file upload.
    Imported,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub source: LayerSource,
    pub style: LayerStyle,
    pub features: Vec<Feature>,
    pub uploaded_at: Option<Timestamp>,
}

impl Layer {
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn is_visible(&self) -> bool {
        self.style.visible
    }

    pub fn feature(&self, feature_id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == feature_id)
    }

    /// Box over every vertex of every feature; `None` when nothing is finite.
    pub fn bounds(&self) -> Option<Aabb2> {
        Aabb2::from_positions(self.features.iter().flat_map(|f| f.geometry.positions()))
    }
}

/// Row of the layers panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSummary {
    pub id: LayerId,
    pub name: String,
    pub color: Color,
    pub opacity: f32,
    pub visible: bool,
    pub feature_count: usize,
    pub source: LayerSource,
    pub position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
}

impl LayerSummary {
    pub fn from_layer(layer: &Layer, position: usize) -> Self {
        Self {
            id: layer.id.clone(),
            name: layer.name.clone(),
            color: layer.style.color,
            opacity: layer.style.opacity,
            visible: layer.style.visible,
            feature_count: layer.feature_count(),
            source: layer.source,
            position,
            uploaded_at: layer.uploaded_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Layer name for an uploaded file: the name minus its last extension.
pub fn layer_name_from_file(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::layer_name_from_file;

    #[test]
    fn strips_only_last_extension() {
        assert_eq!(layer_name_from_file("areas.geojson"), "areas");
        assert_eq!(layer_name_from_file("pontos.2024.csv"), "pontos.2024");
        assert_eq!(layer_name_from_file("uploads/areas.kml"), "areas");
        assert_eq!(layer_name_from_file(".hidden"), ".hidden");
        assert_eq!(layer_name_from_file("noext"), "noext");
    }
}
