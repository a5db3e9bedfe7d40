//! Ordered, in-memory collection of layers.
//!
//! Position 0 is the top of the z-order. The store is the only writer; other
//! components read `layers()` per pass. Operations on an unknown id are no-ops.

use std::collections::HashMap;

use foundation::color::Color;
use foundation::ids::IdAllocator;
use foundation::time::Timestamp;
use formats::Feature;
use thiserror::Error;
use tracing::{debug, info};

use crate::layer::{Layer, LayerId, LayerSource, LayerSummary, layer_name_from_file};
use crate::symbology::{LayerStyle, next_palette_color};
use crate::system::SystemLayerDef;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("layer {0} has no features")]
    EmptyLayer(String),
    #[error("system layer {0} cannot be removed")]
    SystemLayerProtected(LayerId),
}

#[derive(Debug, Default)]
pub struct LayerStore {
    layers: Vec<Layer>,
    ids: IdAllocator,
    revision: u64,
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Bumped by every mutation that changed something.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| &l.id == id)
    }

    pub fn position(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|l| &l.id == id)
    }

    pub fn summaries(&self) -> Vec<LayerSummary> {
        self.layers
            .iter()
            .enumerate()
            .map(|(i, l)| LayerSummary::from_layer(l, i))
            .collect()
    }

    /// Creates a layer from a parsed upload and puts it on top.
    pub fn add_imported_layer(
        &mut self,
        features: Vec<Feature>,
        source_file_name: &str,
        uploaded_at: Timestamp,
    ) -> Result<LayerId, StoreError> {
        if features.is_empty() {
            return Err(StoreError::EmptyLayer(source_file_name.to_string()));
        }
        let id = LayerId(format!("layer-{}", self.ids.next_id()));
        let color = self.next_color();
        let layer = Layer {
            id: id.clone(),
            name: layer_name_from_file(source_file_name),
            source: LayerSource::Imported,
            style: LayerStyle::with_color(color),
            features: dedup_feature_ids(features),
            uploaded_at: Some(uploaded_at),
        };
        info!(
            layer = %id,
            name = %layer.name,
            features = layer.feature_count(),
            color = %color,
            "imported layer created"
        );
        self.layers.insert(0, layer);
        self.bump();
        Ok(id)
    }

    /// Swaps in a freshly derived set of system layers.
    ///
    /// Every previous system layer is dropped and the new ones are rebuilt
    /// with their fixed color and default style, stacked above the imported
    /// layers in `defs` order. A repeated id keeps its first definition.
    pub fn replace_system_layers(&mut self, defs: Vec<SystemLayerDef>) {
        let before = self.layers.len();
        self.layers.retain(|l| l.source != LayerSource::System);
        let removed = before - self.layers.len();

        let mut fresh: Vec<Layer> = Vec::with_capacity(defs.len());
        for def in defs {
            if fresh.iter().any(|l| l.id == def.id) {
                continue;
            }
            fresh.push(Layer {
                id: def.id,
                name: def.name,
                source: LayerSource::System,
                style: LayerStyle::with_color(def.color),
                features: dedup_feature_ids(def.features),
                uploaded_at: None,
            });
        }
        debug!(added = fresh.len(), removed, "system layers rebuilt");
        self.layers.splice(0..0, fresh);
        self.bump();
    }

    pub fn toggle_visibility(&mut self, id: &LayerId) -> bool {
        let Some(layer) = self.get_mut(id) else {
            return false;
        };
        layer.style.visible = !layer.style.visible;
        let visible = layer.style.visible;
        debug!(layer = %id, visible, "visibility toggled");
        self.bump();
        true
    }

    pub fn set_visibility(&mut self, id: &LayerId, visible: bool) -> bool {
        let Some(layer) = self.get_mut(id) else {
            return false;
        };
        if layer.style.visible == visible {
            return false;
        }
        layer.style.visible = visible;
        self.bump();
        true
    }

    pub fn set_color(&mut self, id: &LayerId, color: Color) -> bool {
        let Some(layer) = self.get_mut(id) else {
            return false;
        };
        if layer.style.color == color {
            return false;
        }
        layer.style.color = color;
        debug!(layer = %id, color = %color, "color changed");
        self.bump();
        true
    }

    /// Sets layer opacity clamped to `[0, 1]`. Non-finite input is ignored.
    pub fn set_opacity(&mut self, id: &LayerId, opacity: f32) -> bool {
        if !opacity.is_finite() {
            return false;
        }
        let Some(layer) = self.get_mut(id) else {
            return false;
        };
        let opacity = opacity.clamp(0.0, 1.0);
        if layer.style.opacity == opacity {
            return false;
        }
        layer.style.opacity = opacity;
        self.bump();
        true
    }

    /// Removes an imported layer. `Ok(false)` when the id is unknown.
    pub fn delete_layer(&mut self, id: &LayerId) -> Result<bool, StoreError> {
        let Some(pos) = self.position(id) else {
            return Ok(false);
        };
        if self.layers[pos].source == LayerSource::System {
            return Err(StoreError::SystemLayerProtected(id.clone()));
        }
        let layer = self.layers.remove(pos);
        info!(layer = %id, name = %layer.name, "layer deleted");
        self.bump();
        Ok(true)
    }

    /// Moves `dragged` into `target`'s slot, shifting the layers in between.
    pub fn reorder(&mut self, dragged: &LayerId, target: &LayerId) -> bool {
        if dragged == target {
            return false;
        }
        let (Some(from), Some(to)) = (self.position(dragged), self.position(target)) else {
            return false;
        };
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        debug!(layer = %dragged, from, to, "layer reordered");
        self.bump();
        true
    }

    fn get_mut(&mut self, id: &LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| &l.id == id)
    }

    fn next_color(&self) -> Color {
        let used: Vec<Color> = self.layers.iter().map(|l| l.style.color).collect();
        next_palette_color(&used, self.layers.len())
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}

/// Makes feature ids unique within one layer by suffixing repeats.
fn dedup_feature_ids(mut features: Vec<Feature>) -> Vec<Feature> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for feature in features.iter_mut() {
        let count = seen.entry(feature.id.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            let mut n = *count;
            let mut candidate = format!("{}-{n}", feature.id);
            while seen.contains_key(&candidate) {
                n += 1;
                candidate = format!("{}-{n}", feature.id);
            }
            seen.insert(candidate.clone(), 1);
            feature.id = candidate;
        }
    }
    features
}

#[cfg(test)]
mod tests {
    use super::{LayerStore, StoreError, dedup_feature_ids};
    use crate::layer::{LayerId, LayerSource};
    use crate::symbology::LAYER_PALETTE;
    use crate::system::SystemLayerDef;
    use foundation::color::Color;
    use foundation::time::Timestamp;
    use formats::{Feature, Geometry, Properties};
    use pretty_assertions::assert_eq;

    fn point(id: &str) -> Feature {
        Feature::new(id, id, Geometry::Point([-46.0, -23.0]), Properties::new())
    }

    fn ts() -> Timestamp {
        Timestamp::from_unix_seconds(1_700_000_000).unwrap()
    }

    fn import(store: &mut LayerStore, name: &str) -> LayerId {
        store
            .add_imported_layer(vec![point("a")], name, ts())
            .unwrap()
    }

    fn names(store: &LayerStore) -> Vec<String> {
        store.layers().iter().map(|l| l.name.clone()).collect()
    }

    fn system_def(id: &str, name: &str, n: usize) -> SystemLayerDef {
        SystemLayerDef {
            id: LayerId::from(id),
            name: name.to_string(),
            color: Color::rgb(0x3B, 0x82, 0xF6),
            features: (0..n).map(|i| point(&format!("{id}-{i}"))).collect(),
        }
    }

    #[test]
    fn imported_layer_defaults() {
        let mut store = LayerStore::new();
        let id = store
            .add_imported_layer(vec![point("a"), point("b")], "areas.geojson", ts())
            .unwrap();
        let layer = store.get(&id).unwrap();
        assert_eq!(layer.name, "areas");
        assert_eq!(layer.feature_count(), 2);
        assert_eq!(layer.source, LayerSource::Imported);
        assert_eq!(layer.style.color, LAYER_PALETTE[0]);
        assert_eq!(layer.style.opacity, 1.0);
        assert!(layer.style.visible);
        assert_eq!(layer.uploaded_at, Some(ts()));
    }

    #[test]
    fn new_layers_go_on_top_and_never_merge() {
        let mut store = LayerStore::new();
        import(&mut store, "a.csv");
        import(&mut store, "b.csv");
        import(&mut store, "a.csv");
        assert_eq!(names(&store), vec!["a", "b", "a"]);
        assert_eq!(store.layers()[0].id, LayerId::from("layer-3"));
    }

    #[test]
    fn empty_import_is_refused() {
        let mut store = LayerStore::new();
        let err = store.add_imported_layer(Vec::new(), "x.csv", ts()).unwrap_err();
        assert_eq!(err, StoreError::EmptyLayer("x.csv".to_string()));
        assert!(store.is_empty());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn palette_never_runs_out() {
        let mut store = LayerStore::new();
        for i in 0..(LAYER_PALETTE.len() + 5) {
            import(&mut store, &format!("l{i}.csv"));
        }
        let colors: Vec<Color> = store.layers().iter().rev().map(|l| l.style.color).collect();
        assert_eq!(colors.len(), 25);
        assert_eq!(&colors[..20], &LAYER_PALETTE[..]);
        let distinct: std::collections::HashSet<_> = colors[..20].iter().collect();
        assert_eq!(distinct.len(), 20);
    }

    #[test]
    fn freed_color_is_reused() {
        let mut store = LayerStore::new();
        let first = import(&mut store, "a.csv");
        import(&mut store, "b.csv");
        store.delete_layer(&first).unwrap();
        let third = import(&mut store, "c.csv");
        assert_eq!(store.get(&third).unwrap().style.color, LAYER_PALETTE[0]);
    }

    #[test]
    fn system_layers_cannot_be_deleted() {
        let mut store = LayerStore::new();
        store.replace_system_layers(vec![system_def("processes", "Licensing Processes", 2)]);
        import(&mut store, "a.csv");
        let before = store.summaries();
        let rev = store.revision();

        let err = store.delete_layer(&LayerId::from("processes")).unwrap_err();
        assert_eq!(err, StoreError::SystemLayerProtected(LayerId::from("processes")));
        assert_eq!(store.summaries(), before);
        assert_eq!(store.revision(), rev);
    }

    #[test]
    fn unknown_ids_are_no_ops() {
        let mut store = LayerStore::new();
        import(&mut store, "a.csv");
        let ghost = LayerId::from("layer-99");
        let rev = store.revision();
        assert!(!store.toggle_visibility(&ghost));
        assert!(!store.set_color(&ghost, LAYER_PALETTE[4]));
        assert!(!store.set_opacity(&ghost, 0.3));
        assert_eq!(store.delete_layer(&ghost), Ok(false));
        assert!(!store.reorder(&ghost, &LayerId::from("layer-1")));
        assert_eq!(store.revision(), rev);
    }

    #[test]
    fn reorder_moves_into_target_slot() {
        let mut store = LayerStore::new();
        let c = import(&mut store, "c.csv");
        let b = import(&mut store, "b.csv");
        let a = import(&mut store, "a.csv");
        assert_eq!(names(&store), vec!["a", "b", "c"]);

        assert!(store.reorder(&c, &a));
        assert_eq!(names(&store), vec!["c", "a", "b"]);

        assert!(store.reorder(&c, &b));
        assert_eq!(names(&store), vec!["a", "b", "c"]);

        assert!(!store.reorder(&b, &b));
        assert_eq!(names(&store), vec!["a", "b", "c"]);
    }

    #[test]
    fn opacity_is_clamped_and_nan_ignored() {
        let mut store = LayerStore::new();
        let id = import(&mut store, "a.csv");
        assert!(!store.set_opacity(&id, 1.7));
        assert!(store.set_opacity(&id, 0.5));
        assert_eq!(store.get(&id).unwrap().style.opacity, 0.5);
        assert!(store.set_opacity(&id, 1.7));
        assert_eq!(store.get(&id).unwrap().style.opacity, 1.0);
        assert!(store.set_opacity(&id, -0.2));
        assert_eq!(store.get(&id).unwrap().style.opacity, 0.0);
        assert!(!store.set_opacity(&id, f32::NAN));
        assert_eq!(store.get(&id).unwrap().style.opacity, 0.0);
    }

    #[test]
    fn toggle_and_color() {
        let mut store = LayerStore::new();
        let id = import(&mut store, "a.csv");
        assert!(store.toggle_visibility(&id));
        assert!(!store.get(&id).unwrap().is_visible());
        assert!(!store.set_visibility(&id, false));
        assert!(store.set_visibility(&id, true));
        assert!(store.set_color(&id, LAYER_PALETTE[7]));
        assert_eq!(store.get(&id).unwrap().style.color, LAYER_PALETTE[7]);
    }

    #[test]
    fn system_refresh_rebuilds_with_default_style() {
        let mut store = LayerStore::new();
        store.replace_system_layers(vec![
            system_def("processes", "Licensing Processes", 2),
            system_def("companies", "Registered Companies", 1),
        ]);
        let imported = import(&mut store, "a.csv");
        let companies = LayerId::from("companies");
        store.toggle_visibility(&companies);
        store.set_opacity(&companies, 0.1);
        store.set_color(&companies, LAYER_PALETTE[9]);
        assert_eq!(names(&store), vec!["a", "Licensing Processes", "Registered Companies"]);

        store.replace_system_layers(vec![
            system_def("processes", "Licensing Processes", 5),
            system_def("companies", "Registered Companies", 1),
        ]);
        assert_eq!(names(&store), vec!["Licensing Processes", "Registered Companies", "a"]);
        let layer = store.get(&companies).unwrap();
        assert!(layer.is_visible());
        assert_eq!(layer.style.opacity, 1.0);
        assert_eq!(layer.style.color, Color::rgb(0x3B, 0x82, 0xF6));
        assert_eq!(store.get(&LayerId::from("processes")).unwrap().feature_count(), 5);

        store.replace_system_layers(vec![system_def("processes", "Licensing Processes", 1)]);
        assert_eq!(names(&store), vec!["Licensing Processes", "a"]);
        assert!(store.get(&imported).is_some());
    }

    #[test]
    fn summaries_report_positions() {
        let mut store = LayerStore::new();
        import(&mut store, "b.csv");
        import(&mut store, "a.csv");
        let rows = store.summaries();
        assert_eq!(rows[0].name, "a");
        assert_eq!(rows[0].position, 0);
        assert_eq!(rows[1].position, 1);
        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["featureCount"], 1);
        assert_eq!(json["source"], "imported");
        assert_eq!(json["color"], "#10B981");
        assert_eq!(json["uploadedAt"], "2023-11-14T22:13:20Z");
    }

    #[test]
    fn repeated_feature_ids_get_suffixes() {
        let out = dedup_feature_ids(vec![point("x"), point("x"), point("x-2"), point("x")]);
        let ids: Vec<&str> = out.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "x-2", "x-2-2", "x-3"]);
    }
}
