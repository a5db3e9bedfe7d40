//! Projects layer-store state into drawable primitives.
//!
//! Each pass walks the visible features in paint order, so the first layer of
//! the list is drawn last and ends up on top.

use foundation::math::Position;
use formats::{Feature, Geometry, Ring, value_text};
use layers::query::{FeatureFilter, visible_features, visible_layers};
use layers::vector::{fill_triangles, outline_rings};
use layers::{LayerId, LayerStore, LayerStyle};
use runtime::{EventBus, EventKind, Frame};
use serde::Serialize;
use tracing::{debug, warn};

/// Popups list at most this many properties.
pub const POPUP_PROPERTY_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub title: String,
    pub rows: Vec<(String, String)>,
}

impl Popup {
    pub fn for_feature(feature: &Feature) -> Self {
        let rows = feature
            .properties
            .iter()
            .take(POPUP_PROPERTY_LIMIT)
            .map(|(k, v)| (k.clone(), value_text(v).unwrap_or_default()))
            .collect();
        Self {
            title: feature.name.clone(),
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Primitive {
    Marker {
        position: Position,
        /// Layer color, alpha = layer opacity.
        color: [f32; 4],
    },
    Shape {
        /// Every ring of every part; all are stroked.
        rings: Vec<Ring>,
        fill: [f32; 4],
        stroke: [f32; 4],
        /// Flat triangle list covering each part's outer ring.
        fill_triangles: Vec<Position>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawItem {
    pub layer_id: LayerId,
    pub feature_id: String,
    pub primitive: Primitive,
    pub popup: Popup,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DrawList {
    pub frame_index: u64,
    /// Paint order: later items are drawn over earlier ones.
    pub items: Vec<DrawItem>,
    /// Features dropped because of malformed coordinates.
    pub skipped: usize,
}

impl DrawList {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Layer ids in the order they were painted, without repeats.
    pub fn layer_order(&self) -> Vec<&LayerId> {
        let mut out: Vec<&LayerId> = Vec::new();
        for item in &self.items {
            if out.last() != Some(&&item.layer_id) {
                out.push(&item.layer_id);
            }
        }
        out
    }

    pub fn find(&self, layer_id: &LayerId, feature_id: &str) -> Option<&DrawItem> {
        self.items
            .iter()
            .find(|i| &i.layer_id == layer_id && i.feature_id == feature_id)
    }
}

pub fn primitive_for(geometry: &Geometry, style: &LayerStyle) -> Primitive {
    match geometry {
        Geometry::Point(p) => Primitive::Marker {
            position: *p,
            color: style.marker_rgba(),
        },
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => Primitive::Shape {
            rings: outline_rings(geometry).into_iter().cloned().collect(),
            fill: style.fill_rgba(),
            stroke: style.stroke_rgba(),
            fill_triangles: fill_triangles(geometry),
        },
    }
}

/// Runs one full render pass and signals `LayerRendered` for every visible
/// layer on `bus`.
pub fn render(
    store: &LayerStore,
    filter: &FeatureFilter,
    frame: Frame,
    bus: &mut EventBus,
) -> DrawList {
    let mut list = DrawList {
        frame_index: frame.index,
        ..DrawList::default()
    };

    for visible in visible_features(store, filter) {
        let feature = visible.feature;
        if !feature.geometry.is_well_formed() {
            warn!(
                layer = %visible.layer.id,
                feature = %feature.id,
                "skipping feature with malformed coordinates"
            );
            list.skipped += 1;
            continue;
        }
        list.items.push(DrawItem {
            layer_id: visible.layer.id.clone(),
            feature_id: feature.id.clone(),
            primitive: primitive_for(&feature.geometry, &visible.layer.style),
            popup: Popup::for_feature(feature),
        });
    }

    for layer in visible_layers(store) {
        bus.emit(
            frame,
            EventKind::LayerRendered,
            Some(layer.id.as_str()),
            format!("{} features", layer.feature_count()),
        );
    }
    debug!(
        frame = frame.index,
        items = list.items.len(),
        skipped = list.skipped,
        "render pass complete"
    );
    list
}

#[cfg(test)]
mod tests {
    use super::{POPUP_PROPERTY_LIMIT, Popup, Primitive, render};
    use foundation::time::Timestamp;
    use formats::{Feature, Geometry, Properties};
    use layers::LayerStore;
    use layers::query::FeatureFilter;
    use pretty_assertions::assert_eq;
    use runtime::{EventBus, EventKind, Frame};
    use serde_json::json;

    fn ts() -> Timestamp {
        Timestamp::from_unix_seconds(0).unwrap()
    }

    fn point(id: &str) -> Feature {
        Feature::new(id, id, Geometry::Point([-46.0, -23.0]), Properties::new())
    }

    fn square() -> Feature {
        let ring = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]];
        Feature::new("sq", "Square", Geometry::Polygon(vec![ring]), Properties::new())
    }

    #[test]
    fn paints_bottom_layer_first() {
        let mut store = LayerStore::new();
        for name in ["C", "B", "A"] {
            store
                .add_imported_layer(vec![point(name)], &format!("{name}.csv"), ts())
                .unwrap();
        }
        let mut bus = EventBus::new();
        let list = render(&store, &FeatureFilter::all(), Frame::new(0), &mut bus);
        let painted: Vec<&str> = list.items.iter().map(|i| i.feature_id.as_str()).collect();
        assert_eq!(painted, vec!["C", "B", "A"]);
        assert_eq!(list.layer_order().len(), 3);
    }

    #[test]
    fn polygon_fill_uses_derived_opacity() {
        let mut store = LayerStore::new();
        let id = store.add_imported_layer(vec![square()], "sq.geojson", ts()).unwrap();
        store.set_opacity(&id, 0.5);

        let mut bus = EventBus::new();
        let list = render(&store, &FeatureFilter::all(), Frame::new(3), &mut bus);
        let Primitive::Shape {
            fill,
            stroke,
            fill_triangles,
            rings,
        } = &list.items[0].primitive
        else {
            panic!("expected a shape");
        };
        assert!((fill[3] - 0.2).abs() < 1e-6);
        assert_eq!(stroke[3], 1.0);
        assert_eq!(fill_triangles.len(), 6);
        assert_eq!(rings.len(), 1);
    }

    #[test]
    fn markers_carry_layer_opacity() {
        let mut store = LayerStore::new();
        let id = store.add_imported_layer(vec![point("p")], "p.csv", ts()).unwrap();
        store.set_opacity(&id, 0.25);
        let list = render(&store, &FeatureFilter::all(), Frame::new(0), &mut EventBus::new());
        match &list.items[0].primitive {
            Primitive::Marker { position, color } => {
                assert_eq!(*position, [-46.0, -23.0]);
                assert_eq!(color[3], 0.25);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_features_are_skipped_not_fatal() {
        let mut store = LayerStore::new();
        let bad = Feature::new("bad", "bad", Geometry::Point([f64::NAN, 1.0]), Properties::new());
        store
            .add_imported_layer(vec![bad, point("ok")], "x.csv", ts())
            .unwrap();
        let list = render(&store, &FeatureFilter::all(), Frame::new(0), &mut EventBus::new());
        assert_eq!(list.skipped, 1);
        assert_eq!(list.len(), 1);
        assert_eq!(list.items[0].feature_id, "ok");
    }

    #[test]
    fn hidden_layers_are_not_drawn_or_signalled() {
        let mut store = LayerStore::new();
        let hidden = store.add_imported_layer(vec![point("h")], "h.csv", ts()).unwrap();
        let shown = store.add_imported_layer(vec![point("s")], "s.csv", ts()).unwrap();
        store.toggle_visibility(&hidden);

        let mut bus = EventBus::new();
        let list = render(&store, &FeatureFilter::all(), Frame::new(7), &mut bus);
        assert_eq!(list.len(), 1);
        let rendered: Vec<&str> = bus
            .of_kind(EventKind::LayerRendered)
            .filter_map(|e| e.subject.as_deref())
            .collect();
        assert_eq!(rendered, vec![shown.as_str()]);
        assert_eq!(bus.events()[0].frame_index, 7);
    }

    #[test]
    fn popup_shows_at_most_three_properties() {
        let props = json!({ "a": 1, "b": "two", "c": null, "d": 4 });
        let f = Feature::new(
            "f",
            "Feature",
            Geometry::Point([0.0, 0.0]),
            props.as_object().unwrap().clone(),
        );
        let popup = Popup::for_feature(&f);
        assert_eq!(popup.title, "Feature");
        assert_eq!(popup.rows.len(), POPUP_PROPERTY_LIMIT);
        assert_eq!(
            popup.rows,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "two".to_string()),
                ("c".to_string(), String::new()),
            ]
        );
    }
}
