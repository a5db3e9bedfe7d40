//! Spherical Web-Mercator helpers shared by the camera and picking code.

use super::geodesy::{WGS84_A, clamp};

pub const MERCATOR_MAX_LAT_DEG: f64 = 85.05112878;

/// Full world width in projected meters.
pub const WORLD_WIDTH_M: f64 = 2.0 * std::f64::consts::PI * WGS84_A;

pub fn mercator_x_m(lon_deg: f64) -> f64 {
    WGS84_A * lon_deg.to_radians()
}

pub fn mercator_y_m(lat_deg: f64) -> f64 {
    let lat = clamp(lat_deg, -MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG).to_radians();
    WGS84_A * (0.5 * (std::f64::consts::FRAC_PI_2 + lat)).tan().ln()
}

pub fn inverse_mercator_lon_deg(x_m: f64) -> f64 {
    (x_m / WGS84_A).to_degrees()
}

pub fn inverse_mercator_lat_deg(y_m: f64) -> f64 {
    let lat = 2.0 * (y_m / WGS84_A).exp().atan() - std::f64::consts::FRAC_PI_2;
    lat.to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_round_trips() {
        for (lon, lat) in [(0.0, 0.0), (-46.6333, -23.5505), (120.0, 60.0)] {
            let x = mercator_x_m(lon);
            let y = mercator_y_m(lat);
            assert!((inverse_mercator_lon_deg(x) - lon).abs() < 1e-9);
            assert!((inverse_mercator_lat_deg(y) - lat).abs() < 1e-9);
        }
    }

    #[test]
    fn latitude_is_clamped_at_poles() {
        assert_eq!(mercator_y_m(90.0), mercator_y_m(MERCATOR_MAX_LAT_DEG));
    }
}
