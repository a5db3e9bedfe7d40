//! Polygon geometry prepared for drawing.
//!
//! Fills cover the outer ring of each part only; interior rings are stroked
//! but not cut out of the fill.

use earcutr::earcut;
use foundation::math::Position;
use formats::{Geometry, Ring};

/// Outer ring of every polygon part.
pub fn fill_rings(geometry: &Geometry) -> Vec<&Ring> {
    match geometry {
        Geometry::Point(_) => Vec::new(),
        Geometry::Polygon(rings) => rings.first().into_iter().collect(),
        Geometry::MultiPolygon(polys) => polys.iter().filter_map(|rings| rings.first()).collect(),
    }
}

/// Every ring of every part, outer and inner.
pub fn outline_rings(geometry: &Geometry) -> Vec<&Ring> {
    match geometry {
        Geometry::Point(_) => Vec::new(),
        Geometry::Polygon(rings) => rings.iter().collect(),
        Geometry::MultiPolygon(polys) => polys.iter().flatten().collect(),
    }
}

/// Flat triangle list (3 vertices per triangle) covering every fill ring.
pub fn fill_triangles(geometry: &Geometry) -> Vec<Position> {
    fill_rings(geometry)
        .into_iter()
        .flat_map(|ring| triangulate_ring(ring))
        .collect()
}

/// Ear-clips one ring in the lon/lat plane.
pub fn triangulate_ring(ring: &[Position]) -> Vec<Position> {
    let mut pts: Vec<Position> = ring.to_vec();
    drop_closing_duplicate(&mut pts);
    if pts.len() < 3 {
        return Vec::new();
    }

    let coords: Vec<f64> = pts.iter().flat_map(|p| [p[0], p[1]]).collect();
    let indices = match earcut(&coords, &[], 2) {
        Ok(ix) => ix,
        Err(_) => return Vec::new(),
    };

    indices.into_iter().filter_map(|i| pts.get(i).copied()).collect()
}

fn drop_closing_duplicate(points: &mut Vec<Position>) {
    if let (Some(first), Some(last)) = (points.first().copied(), points.last().copied())
        && points.len() >= 2
        && (first[0] - last[0]).abs() < 1e-12
        && (first[1] - last[1]).abs() < 1e-12
    {
        points.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::{fill_rings, fill_triangles, outline_rings, triangulate_ring};
    use formats::Geometry;

    fn square(x: f64) -> Vec<[f64; 2]> {
        vec![[x, 0.0], [x + 1.0, 0.0], [x + 1.0, 1.0], [x, 1.0], [x, 0.0]]
    }

    fn area(tris: &[[f64; 2]]) -> f64 {
        tris.chunks(3)
            .map(|t| {
                ((t[1][0] - t[0][0]) * (t[2][1] - t[0][1]) - (t[2][0] - t[0][0]) * (t[1][1] - t[0][1]))
                    .abs()
                    / 2.0
            })
            .sum()
    }

    #[test]
    fn square_becomes_two_triangles() {
        let tris = triangulate_ring(&square(0.0));
        assert_eq!(tris.len(), 6);
        assert!((area(&tris) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn holes_are_not_subtracted_from_fill() {
        let hole = vec![[0.25, 0.25], [0.75, 0.25], [0.75, 0.75], [0.25, 0.25]];
        let g = Geometry::Polygon(vec![square(0.0), hole]);
        assert_eq!(fill_rings(&g).len(), 1);
        assert_eq!(outline_rings(&g).len(), 2);
        assert!((area(&fill_triangles(&g)) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn every_multipolygon_part_is_filled() {
        let g = Geometry::MultiPolygon(vec![vec![square(0.0)], vec![square(5.0)]]);
        assert_eq!(fill_rings(&g).len(), 2);
        assert!((area(&fill_triangles(&g)) - 2.0).abs() < 1e-9);
        assert!(fill_triangles(&Geometry::Point([0.0, 0.0])).is_empty());
    }

    #[test]
    fn degenerate_rings_yield_nothing() {
        assert!(triangulate_ring(&[[0.0, 0.0], [1.0, 1.0], [0.0, 0.0]]).is_empty());
    }
}
