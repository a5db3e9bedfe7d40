pub mod geodesy;
pub mod mercator;

pub use geodesy::*;
pub use mercator::*;

/// Geographic position in degrees, `[longitude, latitude]`.
pub type Position = [f64; 2];
