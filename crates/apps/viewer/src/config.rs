//! Viewer settings: JSON file first, then `GEO_*` environment overrides.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use scene::{FitOptions, MapCamera, POINT_FIT_HALF_EXTENT_DEG, picking::MARKER_HIT_RADIUS_PX};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write settings {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MapStyle {
    #[default]
    #[serde(alias = "openstreetmap")]
    Street,
    Satellite,
    Terrain,
    Hybrid,
}

impl MapStyle {
    pub const ALL: [MapStyle; 4] = [
        MapStyle::Street,
        MapStyle::Satellite,
        MapStyle::Terrain,
        MapStyle::Hybrid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MapStyle::Street => "street",
            MapStyle::Satellite => "satellite",
            MapStyle::Terrain => "terrain",
            MapStyle::Hybrid => "hybrid",
        }
    }

    /// XYZ tile URL template (`{s}` subdomain, `{z}/{x}/{y}`).
    pub fn tile_url(self) -> &'static str {
        match self {
            MapStyle::Satellite => {
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
            }
            MapStyle::Terrain => "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
            MapStyle::Street | MapStyle::Hybrid => "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
        }
    }

    pub fn attribution(self) -> &'static str {
        match self {
            MapStyle::Satellite => "© Esri",
            MapStyle::Street | MapStyle::Terrain | MapStyle::Hybrid => {
                "© OpenStreetMap contributors"
            }
        }
    }
}

impl fmt::Display for MapStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "street" | "openstreetmap" => Ok(MapStyle::Street),
            "satellite" => Ok(MapStyle::Satellite),
            "terrain" => Ok(MapStyle::Terrain),
            "hybrid" => Ok(MapStyle::Hybrid),
            other => Err(format!("unknown map style: {other}")),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerSettings {
    pub default_zoom: f64,
    pub default_center: LatLng,
    pub map_style: MapStyle,
    pub layer_fit: FitOptions,
    pub feature_fit: FitOptions,
    pub point_fit_half_extent_deg: f64,
    pub viewport: ViewportSize,
    pub marker_hit_radius_px: f64,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            default_zoom: 6.0,
            default_center: LatLng {
                lat: -15.7801,
                lng: -47.9292,
            },
            map_style: MapStyle::Street,
            layer_fit: FitOptions::LAYER,
            feature_fit: FitOptions::FEATURE,
            point_fit_half_extent_deg: POINT_FIT_HALF_EXTENT_DEG,
            viewport: ViewportSize {
                width: 1024.0,
                height: 768.0,
            },
            marker_hit_radius_px: MARKER_HIT_RADIUS_PX,
        }
    }
}

impl ViewerSettings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let payload = serde_json::to_string_pretty(self)?;
        std::fs::write(path, payload).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults (or `path`, when given) with process environment overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        settings.apply_env(|key| env::var(key).ok());
        Ok(settings)
    }

    /// Applies `GEO_*` overrides from `lookup`. Unparsable values are logged
    /// and ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = env_parse::<f64, _>(&lookup, "GEO_DEFAULT_ZOOM") {
            self.default_zoom = v;
        }
        if let Some(v) = env_parse::<f64, _>(&lookup, "GEO_DEFAULT_LAT") {
            self.default_center.lat = v;
        }
        if let Some(v) = env_parse::<f64, _>(&lookup, "GEO_DEFAULT_LNG") {
            self.default_center.lng = v;
        }
        if let Some(v) = env_parse::<MapStyle, _>(&lookup, "GEO_MAP_STYLE") {
            self.map_style = v;
        }
        if let Some(v) = env_parse::<f64, _>(&lookup, "GEO_VIEWPORT_WIDTH") {
            self.viewport.width = v;
        }
        if let Some(v) = env_parse::<f64, _>(&lookup, "GEO_VIEWPORT_HEIGHT") {
            self.viewport.height = v;
        }
    }

    pub fn initial_camera(&self) -> MapCamera {
        MapCamera::from_lat_lng(
            self.default_center.lat,
            self.default_center.lng,
            self.default_zoom,
        )
    }

    pub fn viewport_px(&self) -> [f64; 2] {
        [self.viewport.width, self.viewport.height]
    }
}

fn env_parse<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable setting override");
            None
        }
    }
}
