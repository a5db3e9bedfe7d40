//! Visible-feature derivation shared by rendering and export.

use formats::Feature;

use crate::layer::Layer;
use crate::store::LayerStore;

/// Case-insensitive name search from the map search box.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFilter {
    needle: Option<String>,
}

impl FeatureFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Blank input matches everything.
    pub fn name_contains(text: &str) -> Self {
        let trimmed = text.trim();
        Self {
            needle: (!trimmed.is_empty()).then(|| trimmed.to_lowercase()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_none()
    }

    pub fn matches(&self, feature: &Feature) -> bool {
        match &self.needle {
            None => true,
            Some(needle) => feature.name.to_lowercase().contains(needle),
        }
    }
}

/// A feature paired with the layer that owns it.
#[derive(Debug, Copy, Clone)]
pub struct VisibleFeature<'a> {
    pub layer: &'a Layer,
    pub feature: &'a Feature,
}

/// Visible layers in paint order: the bottom of the list first, so the top
/// layer is painted last.
pub fn visible_layers(store: &LayerStore) -> impl Iterator<Item = &Layer> {
    store.layers().iter().rev().filter(|l| l.is_visible())
}

pub fn visible_features<'a>(
    store: &'a LayerStore,
    filter: &'a FeatureFilter,
) -> impl Iterator<Item = VisibleFeature<'a>> + 'a {
    visible_layers(store).flat_map(move |layer| {
        layer
            .features
            .iter()
            .filter(move |f| filter.matches(f))
            .map(move |feature| VisibleFeature { layer, feature })
    })
}
