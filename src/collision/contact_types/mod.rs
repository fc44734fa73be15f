//! Contact types produced by the narrow phase and stored in [arbiters](Arbiter).

mod arbiter;

pub use arbiter::{Arbiter, ArbiterState};

use arrayvec::ArrayVec;

use crate::math::*;

/// The maximum number of contact points between two shapes.
pub const MAX_CONTACTS_PER_ARBITER: usize = 2;

/// A contact point between two shapes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ContactPoint {
    /// The contact point on the surface of the first shape, in world space.
    pub point_a: Vector,
    /// The contact point on the surface of the second shape, in world space.
    pub point_b: Vector,
    /// The penetration depth along the normal. Positive when the shapes overlap.
    pub penetration: Scalar,
}

/// The contact points between two shapes along with a shared normal.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ContactPointSet {
    /// The contact normal, pointing from the first shape to the second.
    pub normal: Vector,
    /// The contact points.
    pub points: ArrayVec<ContactPoint, MAX_CONTACTS_PER_ARBITER>,
}

impl ContactPointSet {
    /// Returns the number of contact points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if there are no contact points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the contact set as seen from the second shape.
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            points: self
                .points
                .iter()
                .map(|point| ContactPoint {
                    point_a: point.point_b,
                    point_b: point.point_a,
                    penetration: point.penetration,
                })
                .collect(),
        }
    }
}

/// A contact point computed by the narrow phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ManifoldPoint {
    pub point_a: Vector,
    pub point_b: Vector,
    /// The signed distance between the surfaces along the normal, negative when penetrating.
    pub distance: Scalar,
    /// Identifies the pair of features that produced the point, for matching across steps.
    pub id: u64,
}

/// The contact points computed by the narrow phase for a pair of shapes.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ContactManifold {
    pub normal: Vector,
    pub points: ArrayVec<ManifoldPoint, MAX_CONTACTS_PER_ARBITER>,
}

impl ContactManifold {
    pub fn single(normal: Vector, point: ManifoldPoint) -> Self {
        let mut manifold = Self {
            normal,
            points: ArrayVec::new(),
        };
        manifold.points.push(point);
        manifold
    }

    #[inline]
    pub fn push(&mut self, point: ManifoldPoint) {
        self.points.push(point);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Swaps the roles of the two shapes.
    pub fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        for point in &mut self.points {
            core::mem::swap(&mut point.point_a, &mut point.point_b);
        }
        self
    }

    /// Converts the manifold to the public representation.
    pub fn to_point_set(&self) -> ContactPointSet {
        ContactPointSet {
            normal: self.normal,
            points: self
                .points
                .iter()
                .map(|point| ContactPoint {
                    point_a: point.point_a,
                    point_b: point.point_b,
                    penetration: -point.distance,
                })
                .collect(),
        }
    }
}
