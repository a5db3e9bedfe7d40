use crate::render::{DrawItem, DrawList, Primitive};
use crate::viewport::MapHandle;

/// Default marker hit radius in screen pixels.
pub const MARKER_HIT_RADIUS_PX: f64 = 12.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickOptions {
    pub marker_radius_px: f64,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            marker_radius_px: MARKER_HIT_RADIUS_PX,
        }
    }
}

/// Screen-space hit test over a draw list.
///
/// Ordering contract:
/// - Items painted last are tested first, so the visually topmost item wins.
/// - Markers hit within `marker_radius_px` of their center.
/// - Shapes hit inside their filled area (outer rings only).
pub fn pick_screen<'a>(
    list: &'a DrawList,
    map: &dyn MapHandle,
    screen: [f64; 2],
    opts: PickOptions,
) -> Option<&'a DrawItem> {
    let camera = map.camera();
    let viewport = map.viewport_px();
    let r2 = opts.marker_radius_px * opts.marker_radius_px;

    list.items.iter().rev().find(|item| match &item.primitive {
        Primitive::Marker { position, .. } => {
            let s = camera.to_screen(*position, viewport);
            let dx = s[0] - screen[0];
            let dy = s[1] - screen[1];
            dx * dx + dy * dy <= r2
        }
        Primitive::Shape { fill_triangles, .. } => fill_triangles.chunks_exact(3).any(|t| {
            let a = camera.to_screen(t[0], viewport);
            let b = camera.to_screen(t[1], viewport);
            let c = camera.to_screen(t[2], viewport);
            point_in_triangle(screen, a, b, c)
        }),
    })
}

fn point_in_triangle(p: [f64; 2], a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> bool {
    let d1 = edge(p, a, b);
    let d2 = edge(p, b, c);
    let d3 = edge(p, c, a);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

fn edge(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    (p[0] - b[0]) * (a[1] - b[1]) - (a[0] - b[0]) * (p[1] - b[1])
}

#[cfg(test)]
mod tests {
    use super::{PickOptions, pick_screen, point_in_triangle};
    use crate::camera::{MapCamera, MapView};
    use crate::render::render;
    use crate::viewport::MapHandle;
    use foundation::time::Timestamp;
    use formats::{Feature, Geometry, Properties};
    use layers::LayerStore;
    use layers::query::FeatureFilter;
    use runtime::{EventBus, Frame};

    fn ts() -> Timestamp {
        Timestamp::from_unix_seconds(0).unwrap()
    }

    fn square(id: &str) -> Feature {
        let ring = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]];
        Feature::new(id, id, Geometry::Polygon(vec![ring]), Properties::new())
    }

    #[test]
    fn triangle_containment() {
        let (a, b, c) = ([0.0, 0.0], [10.0, 0.0], [0.0, 10.0]);
        assert!(point_in_triangle([1.0, 1.0], a, b, c));
        assert!(!point_in_triangle([9.0, 9.0], a, b, c));
    }

    #[test]
    fn topmost_layer_wins() {
        let mut store = LayerStore::new();
        store.add_imported_layer(vec![square("under")], "u.geojson", ts()).unwrap();
        store.add_imported_layer(vec![square("over")], "o.geojson", ts()).unwrap();
        let list = render(&store, &FeatureFilter::all(), Frame::new(0), &mut EventBus::new());

        let map = MapView::new(MapCamera::new([0.5, 0.5], 7.0), [800.0, 600.0]);
        let hit = pick_screen(&list, &map, [400.0, 300.0], PickOptions::default()).unwrap();
        assert_eq!(hit.feature_id, "over");
        assert!(pick_screen(&list, &map, [5.0, 5.0], PickOptions::default()).is_none());
    }

    #[test]
    fn markers_hit_within_radius() {
        let mut store = LayerStore::new();
        let p = Feature::new("p", "p", Geometry::Point([-46.0, -23.0]), Properties::new());
        store.add_imported_layer(vec![p], "p.csv", ts()).unwrap();
        let list = render(&store, &FeatureFilter::all(), Frame::new(0), &mut EventBus::new());

        let map = MapView::new(MapCamera::new([-46.0, -23.0], 10.0), [800.0, 600.0]);
        let center = map.camera().to_screen([-46.0, -23.0], map.viewport_px());
        let opts = PickOptions::default();
        assert!(pick_screen(&list, &map, [center[0] + 8.0, center[1]], opts).is_some());
        assert!(pick_screen(&list, &map, [center[0] + 20.0, center[1]], opts).is_none());
    }
}
