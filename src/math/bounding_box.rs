use super::{Scalar, Vector};

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    /// The minimum corner, the left and bottom edges.
    pub min: Vector,
    /// The maximum corner, the right and top edges.
    pub max: Vector,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min: Vector::ZERO,
            max: Vector::ZERO,
        }
    }
}

impl BoundingBox {
    /// Creates a bounding box from its minimum and maximum corners.
    #[inline]
    pub const fn new(min: Vector, max: Vector) -> Self {
        Self { min, max }
    }

    /// Creates a bounding box from its left, bottom, right and top edges.
    #[inline]
    pub const fn from_edges(left: Scalar, bottom: Scalar, right: Scalar, top: Scalar) -> Self {
        Self {
            min: Vector::new(left, bottom),
            max: Vector::new(right, top),
        }
    }

    /// Creates a bounding box centered on `center` with the given half extents.
    #[inline]
    pub fn for_extents(center: Vector, half_width: Scalar, half_height: Scalar) -> Self {
        let half_extents = Vector::new(half_width, half_height);
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Creates a bounding box that fits a circle.
    #[inline]
    pub fn for_circle(center: Vector, radius: Scalar) -> Self {
        Self::for_extents(center, radius, radius)
    }

    /// Returns `true` if the bounding boxes overlap or touch.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// Returns `true` if `other` lies completely within `self`.
    #[inline]
    pub fn contains_bb(&self, other: &Self) -> bool {
        self.min.x <= other.min.x
            && self.max.x >= other.max.x
            && self.min.y <= other.min.y
            && self.max.y >= other.max.y
    }

    /// Returns `true` if the point lies within the bounding box.
    #[inline]
    pub fn contains_vect(&self, v: Vector) -> bool {
        self.min.x <= v.x && self.max.x >= v.x && self.min.y <= v.y && self.max.y >= v.y
    }

    /// Returns a bounding box that contains both `self` and `other`.
    #[inline]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Returns a bounding box that contains both `self` and the point `v`.
    #[inline]
    pub fn expand(&self, v: Vector) -> Self {
        Self {
            min: self.min.min(v),
            max: self.max.max(v),
        }
    }

    /// Returns the bounding box grown by `amount` on every side.
    #[inline]
    pub fn grow(&self, amount: Scalar) -> Self {
        Self {
            min: self.min - Vector::splat(amount),
            max: self.max + Vector::splat(amount),
        }
    }

    /// Returns the center point of the bounding box.
    #[inline]
    pub fn center(&self) -> Vector {
        (self.min + self.max) * 0.5
    }

    /// Returns the area of the bounding box.
    #[inline]
    pub fn area(&self) -> Scalar {
        let size = self.max - self.min;
        size.x * size.y
    }

    /// Returns the area of the bounding box that would contain both `self` and `other`.
    #[inline]
    pub fn merged_area(&self, other: &Self) -> Scalar {
        self.merge(other).area()
    }

    /// Returns the fraction along the segment `a`-`b` where it first enters the bounding box,
    /// or [`Scalar::INFINITY`] if the segment misses it.
    ///
    /// A segment that starts inside the box returns `0.0`.
    pub fn segment_query(&self, a: Vector, b: Vector) -> Scalar {
        let delta = b - a;
        let mut t_min = Scalar::NEG_INFINITY;
        let mut t_max = Scalar::INFINITY;

        for axis in 0..2 {
            let (start, dir, lo, hi) = (a[axis], delta[axis], self.min[axis], self.max[axis]);
            if dir == 0.0 {
                if start < lo || hi < start {
                    return Scalar::INFINITY;
                }
            } else {
                let t1 = (lo - start) / dir;
                let t2 = (hi - start) / dir;
                t_min = t_min.max(t1.min(t2));
                t_max = t_max.min(t1.max(t2));
            }
        }

        if t_min <= t_max && 0.0 <= t_max && t_min <= 1.0 {
            t_min.max(0.0)
        } else {
            Scalar::INFINITY
        }
    }

    /// Returns `true` if the segment `a`-`b` intersects the bounding box.
    #[inline]
    pub fn intersects_segment(&self, a: Vector, b: Vector) -> bool {
        self.segment_query(a, b) != Scalar::INFINITY
    }

    /// Clamps a point to the bounding box.
    #[inline]
    pub fn clamp_vect(&self, v: Vector) -> Vector {
        v.clamp(self.min, self.max)
    }

    /// Wraps a point into the bounding box as if its edges were periodic.
    pub fn wrap_vect(&self, v: Vector) -> Vector {
        let size = (self.max - self.min).abs();
        let wrap = |value: Scalar, min: Scalar, extent: Scalar| {
            if extent == 0.0 {
                return min;
            }
            let modulo = (value - min) % extent;
            let offset = if modulo > 0.0 { modulo } else { modulo + extent };
            offset + min
        };
        Vector::new(
            wrap(v.x, self.min.x, size.x),
            wrap(v.y, self.min.y, size.y),
        )
    }

    /// Returns the bounding box translated by `v`.
    #[inline]
    pub fn offset(&self, v: Vector) -> Self {
        Self {
            min: self.min + v,
            max: self.max + v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> BoundingBox {
        BoundingBox::from_edges(0.0, 0.0, 1.0, 1.0)
    }

    #[test]
    fn intersection_and_containment() {
        let bb = unit_box();
        let other = BoundingBox::from_edges(0.5, 0.5, 2.0, 2.0);
        let far = BoundingBox::from_edges(3.0, 3.0, 4.0, 4.0);

        assert!(bb.intersects(&other));
        assert!(!bb.intersects(&far));
        assert!(bb.merge(&far).contains_bb(&other));
        assert!(bb.contains_vect(Vector::new(0.5, 1.0)));
        assert!(!bb.contains_vect(Vector::new(1.5, 0.5)));
        assert_relative_eq!(bb.merged_area(&far), 16.0);
    }

    #[test]
    fn segment_query_fractions() {
        let bb = unit_box();
        let t = bb.segment_query(Vector::new(-1.0, 0.5), Vector::new(3.0, 0.5));
        assert_relative_eq!(t, 0.25);
        // Starts inside.
        assert_eq!(bb.segment_query(Vector::new(0.5, 0.5), Vector::new(5.0, 5.0)), 0.0);
        // Parallel miss.
        assert_eq!(
            bb.segment_query(Vector::new(-1.0, 2.0), Vector::new(3.0, 2.0)),
            Scalar::INFINITY
        );
        assert!(!bb.intersects_segment(Vector::new(-1.0, -1.0), Vector::new(-0.5, 3.0)));
    }

    #[test]
    fn wrap_and_clamp() {
        let bb = BoundingBox::from_edges(-1.0, -1.0, 1.0, 1.0);
        assert_relative_eq!(bb.wrap_vect(Vector::new(1.5, -1.5)), Vector::new(-0.5, 0.5));
        assert_relative_eq!(bb.clamp_vect(Vector::new(4.0, 0.2)), Vector::new(1.0, 0.2));
    }
}
