use foundation::bounds::Aabb2;
use foundation::math::Position;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Closed linear ring, `[lon, lat]` vertices.
pub type Ring = Vec<Position>;

/// Source attributes carried through verbatim, in source order.
pub type Properties = Map<String, Value>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    Polygon,
    MultiPolygon,
}

impl GeometryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPolygon => "MultiPolygon",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Position),
    /// First ring is the outer boundary.
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::Polygon(_) => GeometryKind::Polygon,
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
        }
    }

    /// Every vertex of every ring of every part.
    pub fn positions(&self) -> Box<dyn Iterator<Item = Position> + '_> {
        match self {
            Geometry::Point(p) => Box::new(std::iter::once(*p)),
            Geometry::Polygon(rings) => Box::new(rings.iter().flatten().copied()),
            Geometry::MultiPolygon(polys) => {
                Box::new(polys.iter().flatten().flatten().copied())
            }
        }
    }

    /// `true` when every ordinate is finite and no part is empty.
    pub fn is_well_formed(&self) -> bool {
        let non_empty = match self {
            Geometry::Point(_) => true,
            Geometry::Polygon(rings) => rings.first().is_some_and(|r| !r.is_empty()),
            Geometry::MultiPolygon(polys) => {
                !polys.is_empty()
                    && polys
                        .iter()
                        .all(|rings| rings.first().is_some_and(|r| !r.is_empty()))
            }
        };
        non_empty && self.positions().all(|p| p[0].is_finite() && p[1].is_finite())
    }

    pub fn bounds(&self) -> Option<Aabb2> {
        Aabb2::from_positions(self.positions())
    }

    /// Single position standing in for the geometry in point-only outputs.
    ///
    /// Polygons use the vertex centroid of the outer ring (first part for
    /// multipolygons), ignoring a closing duplicate vertex.
    pub fn representative_position(&self) -> Option<Position> {
        match self {
            Geometry::Point(p) => Some(*p),
            Geometry::Polygon(rings) => rings.first().and_then(|r| ring_centroid(r)),
            Geometry::MultiPolygon(polys) => polys
                .first()
                .and_then(|rings| rings.first())
                .and_then(|r| ring_centroid(r)),
        }
    }
}

fn ring_centroid(ring: &[Position]) -> Option<Position> {
    let open = match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    };
    let mut sx = 0.0;
    let mut sy = 0.0;
    let mut n = 0usize;
    for p in open {
        if p[0].is_finite() && p[1].is_finite() {
            sx += p[0];
            sy += p[1];
            n += 1;
        }
    }
    (n > 0).then(|| [sx / n as f64, sy / n as f64])
}

/// One geographic entity after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: String,
    pub name: String,
    pub geometry: Geometry,
    pub properties: Properties,
}

impl Feature {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        geometry: Geometry,
        properties: Properties,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            geometry,
            properties,
        }
    }

    pub fn kind(&self) -> GeometryKind {
        self.geometry.kind()
    }

    /// Property rendered as display text. Strings are returned unquoted,
    /// other scalars in their JSON form; `null` and absent keys are `None`.
    pub fn property_text(&self, key: &str) -> Option<String> {
        value_text(self.properties.get(key)?)
    }
}

pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{Geometry, GeometryKind};

    fn square() -> Vec<[f64; 2]> {
        vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0], [0.0, 0.0]]
    }

    #[test]
    fn positions_cover_every_ring_and_part() {
        let g = Geometry::MultiPolygon(vec![
            vec![square(), vec![[0.5, 0.5], [1.0, 0.5], [1.0, 1.0]]],
            vec![square()],
        ]);
        assert_eq!(g.kind(), GeometryKind::MultiPolygon);
        assert_eq!(g.positions().count(), 13);
    }

    #[test]
    fn representative_position_of_polygon_is_outer_centroid() {
        let g = Geometry::Polygon(vec![square()]);
        assert_eq!(g.representative_position(), Some([1.0, 1.0]));
    }

    #[test]
    fn non_finite_geometry_is_malformed() {
        assert!(Geometry::Point([1.0, 2.0]).is_well_formed());
        assert!(!Geometry::Point([f64::NAN, 2.0]).is_well_formed());
        assert!(!Geometry::Polygon(vec![]).is_well_formed());
        assert!(!Geometry::MultiPolygon(vec![vec![vec![[0.0, f64::INFINITY]]]]).is_well_formed());
    }
}
