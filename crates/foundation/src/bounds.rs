use crate::math::Position;

/// Axis-aligned bounding box in geographic degrees.
///
/// Component order follows GeoJSON: `[longitude, latitude]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    /// An inverted box that any `extend` call will replace.
    pub fn empty() -> Self {
        Aabb2 {
            min: [f64::INFINITY, f64::INFINITY],
            max: [f64::NEG_INFINITY, f64::NEG_INFINITY],
        }
    }

    /// Builds the tightest box around the finite positions in `positions`.
    ///
    /// Returns `None` when no finite position was seen.
    pub fn from_positions<I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = Position>,
    {
        let mut b = Self::empty();
        for p in positions {
            b.extend(p);
        }
        (!b.is_empty()).then_some(b)
    }

    /// Box of `half_extent` degrees on each side of `center`.
    pub fn around(center: Position, half_extent: f64) -> Self {
        let h = half_extent.abs();
        Aabb2 {
            min: [center[0] - h, center[1] - h],
            max: [center[0] + h, center[1] + h],
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.min[0] <= self.max[0] && self.min[1] <= self.max[1])
    }

    /// Grows the box to include `p`. Non-finite positions are ignored.
    ///
    /// Returns `true` if `p` was accepted.
    pub fn extend(&mut self, p: Position) -> bool {
        if !(p[0].is_finite() && p[1].is_finite()) {
            return false;
        }
        self.min[0] = self.min[0].min(p[0]);
        self.min[1] = self.min[1].min(p[1]);
        self.max[0] = self.max[0].max(p[0]);
        self.max[1] = self.max[1].max(p[1]);
        true
    }

    pub fn union(&self, other: &Self) -> Self {
        Aabb2 {
            min: [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            max: [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        }
    }

    pub fn center(&self) -> Position {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
        ]
    }

    pub fn span(&self) -> [f64; 2] {
        [self.max[0] - self.min[0], self.max[1] - self.min[1]]
    }

    pub fn contains(&self, p: Position) -> bool {
        p[0] >= self.min[0] && p[0] <= self.max[0] && p[1] >= self.min[1] && p[1] <= self.max[1]
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb2;

    #[test]
    fn from_positions_skips_non_finite() {
        let b = Aabb2::from_positions([[1.0, 2.0], [f64::NAN, 0.0], [-3.0, 5.0]]).unwrap();
        assert_eq!(b.min, [-3.0, 2.0]);
        assert_eq!(b.max, [1.0, 5.0]);
    }

    #[test]
    fn no_finite_positions_is_none() {
        assert!(Aabb2::from_positions([[f64::NAN, f64::INFINITY]]).is_none());
        assert!(Aabb2::from_positions(std::iter::empty()).is_none());
    }

    #[test]
    fn around_builds_symmetric_box() {
        let b = Aabb2::around([10.0, -20.0], 0.5);
        assert_eq!(b.center(), [10.0, -20.0]);
        assert_eq!(b.span(), [1.0, 1.0]);
        assert!(b.contains([10.4, -19.6]));
        assert!(!b.contains([11.0, -20.0]));
    }

    #[test]
    fn union_covers_both() {
        let a = Aabb2::new([-47.0, -16.0], [-46.0, -15.0]);
        let b = Aabb2::new([-44.0, -23.0], [-43.0, -22.0]);
        let u = a.union(&b);
        assert_eq!(u.min, [-47.0, -23.0]);
        assert_eq!(u.max, [-43.0, -15.0]);
    }
}
