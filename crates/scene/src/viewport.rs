//! Bounds fitting for "zoom to layer", "zoom to feature" and auto-zoom.
//!
//! The controller never looks the map up; callers hand it a [`MapHandle`].

use foundation::bounds::Aabb2;
use formats::{Feature, Geometry};
use layers::{Layer, LayerId, LayerStore};
use runtime::{Event, EventKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::camera::MapCamera;

/// Half side, in degrees, of the box synthesized around a point.
pub const POINT_FIT_HALF_EXTENT_DEG: f64 = 0.005;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    /// Margin kept free on every side of the viewport.
    pub padding_px: f64,
    pub max_zoom: f64,
}

impl FitOptions {
    pub const LAYER: FitOptions = FitOptions::new(50.0, 12.0);
    pub const FEATURE: FitOptions = FitOptions::new(30.0, 15.0);

    pub const fn new(padding_px: f64, max_zoom: f64) -> Self {
        Self {
            padding_px,
            max_zoom,
        }
    }
}

/// The map component, as seen by the viewport controller.
pub trait MapHandle {
    fn camera(&self) -> MapCamera;
    fn set_camera(&mut self, camera: MapCamera);
    fn viewport_px(&self) -> [f64; 2];
    /// Moves the camera so `bounds` is in view; returns the new camera.
    fn fit_bounds(&mut self, bounds: Aabb2, options: FitOptions) -> MapCamera;
}

/// Box over every vertex of every ring of every feature in `layer`.
pub fn layer_bounds(layer: &Layer) -> Option<Aabb2> {
    layer.bounds()
}

/// Box around one feature; points get a small synthetic extent.
pub fn feature_bounds(feature: &Feature, point_half_extent_deg: f64) -> Option<Aabb2> {
    match &feature.geometry {
        Geometry::Point(p) if p[0].is_finite() && p[1].is_finite() => {
            Some(Aabb2::around(*p, point_half_extent_deg))
        }
        Geometry::Point(_) => None,
        geometry => geometry.bounds(),
    }
}

#[derive(Debug, Clone)]
pub struct ViewportController {
    pub layer_fit: FitOptions,
    pub feature_fit: FitOptions,
    pub point_half_extent_deg: f64,
    pending_auto_zoom: Option<LayerId>,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(FitOptions::LAYER, FitOptions::FEATURE, POINT_FIT_HALF_EXTENT_DEG)
    }
}

impl ViewportController {
    pub fn new(layer_fit: FitOptions, feature_fit: FitOptions, point_half_extent_deg: f64) -> Self {
        Self {
            layer_fit,
            feature_fit,
            point_half_extent_deg,
            pending_auto_zoom: None,
        }
    }

    /// Fits the map to `layer`. `None` (camera untouched) when the layer has
    /// no valid coordinates.
    pub fn zoom_to_layer(&self, map: &mut dyn MapHandle, layer: &Layer) -> Option<MapCamera> {
        let Some(bounds) = layer_bounds(layer) else {
            debug!(layer = %layer.id, "zoom to layer skipped: no coordinates");
            return None;
        };
        Some(map.fit_bounds(bounds, self.layer_fit))
    }

    pub fn zoom_to_feature(&self, map: &mut dyn MapHandle, feature: &Feature) -> Option<MapCamera> {
        let Some(bounds) = feature_bounds(feature, self.point_half_extent_deg) else {
            debug!(feature = %feature.id, "zoom to feature skipped: no coordinates");
            return None;
        };
        Some(map.fit_bounds(bounds, self.feature_fit))
    }

    /// Arms auto-zoom; it fires on the next render of `layer`.
    pub fn request_auto_zoom(&mut self, layer: LayerId) {
        self.pending_auto_zoom = Some(layer);
    }

    pub fn pending_auto_zoom(&self) -> Option<&LayerId> {
        self.pending_auto_zoom.as_ref()
    }

    pub fn cancel_auto_zoom(&mut self) {
        self.pending_auto_zoom = None;
    }

    /// Consumes render events and performs the armed auto-zoom once its
    /// layer has been drawn.
    pub fn on_events(
        &mut self,
        map: &mut dyn MapHandle,
        store: &LayerStore,
        events: &[Event],
    ) -> Option<MapCamera> {
        let pending = self.pending_auto_zoom.as_ref()?;
        let rendered = events.iter().any(|e| {
            e.kind == EventKind::LayerRendered && e.subject.as_deref() == Some(pending.as_str())
        });
        if !rendered {
            return None;
        }
        let id = self.pending_auto_zoom.take()?;
        let layer = store.get(&id)?;
        let camera = self.zoom_to_layer(map, layer);
        if camera.is_some() {
            info!(layer = %id, "auto-zoomed to imported layer");
        }
        camera
    }
}
