//! Web-Mercator slippy-map camera.

use foundation::bounds::Aabb2;
use foundation::math::Position;
use foundation::math::geodesy::{clamp, wrap_lon_deg};
use foundation::math::mercator::{
    MERCATOR_MAX_LAT_DEG, WORLD_WIDTH_M, inverse_mercator_lat_deg, inverse_mercator_lon_deg,
    mercator_x_m, mercator_y_m,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::viewport::{FitOptions, MapHandle};

pub const TILE_SIZE_PX: f64 = 256.0;
pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 19.0;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapCamera {
    /// `[lon, lat]` at the viewport center.
    pub center: Position,
    pub zoom: f64,
}

impl MapCamera {
    pub fn new(center: Position, zoom: f64) -> Self {
        Self {
            center: [
                wrap_lon_deg(center[0]),
                clamp(center[1], -MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG),
            ],
            zoom: clamp(zoom, MIN_ZOOM, MAX_ZOOM),
        }
    }

    /// Camera from a `(lat, lng)` pair, the order settings use.
    pub fn from_lat_lng(lat: f64, lng: f64, zoom: f64) -> Self {
        Self::new([lng, lat], zoom)
    }

    pub fn world_size_px(&self) -> f64 {
        world_size_px(self.zoom)
    }

    /// Viewport pixel of `p`, origin at the top-left corner.
    pub fn to_screen(&self, p: Position, viewport: [f64; 2]) -> [f64; 2] {
        let size = self.world_size_px();
        let c = project_unit(self.center);
        let q = project_unit(p);
        [
            (q[0] - c[0]) * size + viewport[0] * 0.5,
            (q[1] - c[1]) * size + viewport[1] * 0.5,
        ]
    }

    pub fn to_geo(&self, screen: [f64; 2], viewport: [f64; 2]) -> Position {
        let size = self.world_size_px();
        let c = project_unit(self.center);
        unproject_unit([
            c[0] + (screen[0] - viewport[0] * 0.5) / size,
            c[1] + (screen[1] - viewport[1] * 0.5) / size,
        ])
    }

    /// Geographic box covered by `viewport`.
    pub fn visible_bounds(&self, viewport: [f64; 2]) -> Aabb2 {
        let a = self.to_geo([0.0, 0.0], viewport);
        let b = self.to_geo(viewport, viewport);
        Aabb2::new([a[0].min(b[0]), a[1].min(b[1])], [a[0].max(b[0]), a[1].max(b[1])])
    }
}

pub fn world_size_px(zoom: f64) -> f64 {
    TILE_SIZE_PX * 2f64.powf(zoom)
}

/// Position in world units: `[0, 1]` on both axes, y growing south.
pub fn project_unit(p: Position) -> [f64; 2] {
    [
        mercator_x_m(p[0]) / WORLD_WIDTH_M + 0.5,
        0.5 - mercator_y_m(p[1]) / WORLD_WIDTH_M,
    ]
}

pub fn unproject_unit(u: [f64; 2]) -> Position {
    [
        inverse_mercator_lon_deg((u[0] - 0.5) * WORLD_WIDTH_M),
        inverse_mercator_lat_deg((0.5 - u[1]) * WORLD_WIDTH_M),
    ]
}

/// Largest whole zoom at which `bounds` plus padding fits `viewport`,
/// capped at `max_zoom`.
pub fn bounds_zoom(bounds: &Aabb2, viewport: [f64; 2], options: FitOptions) -> f64 {
    let lo = project_unit([bounds.min[0], bounds.max[1]]);
    let hi = project_unit([bounds.max[0], bounds.min[1]]);
    let span = [(hi[0] - lo[0]).abs(), (hi[1] - lo[1]).abs()];

    let avail = [
        (viewport[0] - 2.0 * options.padding_px).max(1.0),
        (viewport[1] - 2.0 * options.padding_px).max(1.0),
    ];
    let scale = |avail: f64, span: f64| {
        if span > 0.0 {
            avail / (span * TILE_SIZE_PX)
        } else {
            f64::INFINITY
        }
    };
    let s = scale(avail[0], span[0]).min(scale(avail[1], span[1]));
    let max_zoom = options.max_zoom.min(MAX_ZOOM);
    if !s.is_finite() {
        return max_zoom;
    }
    clamp(s.log2().floor(), MIN_ZOOM, max_zoom)
}

/// Camera that fits `bounds` into `viewport`.
pub fn fit_camera(bounds: &Aabb2, viewport: [f64; 2], options: FitOptions) -> MapCamera {
    let lo = project_unit(bounds.min);
    let hi = project_unit(bounds.max);
    let center = unproject_unit([(lo[0] + hi[0]) * 0.5, (lo[1] + hi[1]) * 0.5]);
    MapCamera::new(center, bounds_zoom(bounds, viewport, options))
}

/// In-process map: a camera plus the viewport it renders into.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    camera: MapCamera,
    viewport: [f64; 2],
}

impl MapView {
    pub fn new(camera: MapCamera, viewport: [f64; 2]) -> Self {
        Self {
            camera,
            viewport: [viewport[0].max(1.0), viewport[1].max(1.0)],
        }
    }

    pub fn resize(&mut self, viewport: [f64; 2]) {
        self.viewport = [viewport[0].max(1.0), viewport[1].max(1.0)];
    }
}

impl MapHandle for MapView {
    fn camera(&self) -> MapCamera {
        self.camera
    }

    fn set_camera(&mut self, camera: MapCamera) {
        self.camera = camera;
    }

    fn viewport_px(&self) -> [f64; 2] {
        self.viewport
    }

    fn fit_bounds(&mut self, bounds: Aabb2, options: FitOptions) -> MapCamera {
        self.camera = fit_camera(&bounds, self.viewport, options);
        debug!(
            lon = self.camera.center[0],
            lat = self.camera.center[1],
            zoom = self.camera.zoom,
            "camera fitted"
        );
        self.camera
    }
}
