//! Collision filtering with groups, categories and masks.
//!
//! See [`ShapeFilter`].

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not};

use derive_more::From;

/// An arbitrary tag attached to a shape and used to select collision handlers.
pub type CollisionType = u64;

/// The collision type that wildcard handlers are registered under internally.
pub const WILDCARD_COLLISION_TYPE: CollisionType = CollisionType::MAX;

/// A group identifier. Shapes in the same non-zero group never collide.
pub type Group = u64;

/// A bitmask of collision categories.
///
/// # Example
///
/// ```
/// use rigid2d::prelude::*;
///
/// let mut layers = LayerMask(0b0010);
/// layers.add(LayerMask(0b0100));
/// assert!(layers.has_all(LayerMask(0b0110)));
///
/// layers.remove(LayerMask(0b0010));
/// assert_eq!(layers, LayerMask(0b0100));
/// ```
#[derive(Clone, Copy, Debug, Eq, From, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Contains all layers.
    pub const ALL: Self = Self(0xffff_ffff);
    /// Contains no layers.
    pub const NONE: Self = Self(0);

    /// Adds the given layers.
    pub fn add(&mut self, layers: impl Into<Self>) {
        let layers: LayerMask = layers.into();
        *self |= layers;
    }

    /// Removes the given layers.
    pub fn remove(&mut self, layers: impl Into<Self>) {
        let layers: LayerMask = layers.into();
        *self &= !layers;
    }

    /// Returns `true` if the mask contains all of the given layers.
    #[doc(alias = "contains_all")]
    pub fn has_all(self, layers: impl Into<Self>) -> bool {
        let layers: LayerMask = layers.into();
        (self & layers) == layers
    }

    /// Returns `true` if the mask shares at least one layer with `other`.
    pub fn intersects(self, other: impl Into<Self>) -> bool {
        (self & other).0 != 0
    }
}

impl<L: Into<LayerMask> + Copy> PartialEq<L> for LayerMask {
    fn eq(&self, other: &L) -> bool {
        let other: Self = (*other).into();
        self.0 == other.0
    }
}

impl<L: Into<LayerMask>> BitAnd<L> for LayerMask {
    type Output = Self;

    fn bitand(self, rhs: L) -> Self::Output {
        Self(self.0 & rhs.into().0)
    }
}

impl<L: Into<LayerMask>> BitAndAssign<L> for LayerMask {
    fn bitand_assign(&mut self, rhs: L) {
        self.0 &= rhs.into().0;
    }
}

impl<L: Into<LayerMask>> BitOr<L> for LayerMask {
    type Output = Self;

    fn bitor(self, rhs: L) -> Self::Output {
        Self(self.0 | rhs.into().0)
    }
}

impl<L: Into<LayerMask>> BitOrAssign<L> for LayerMask {
    fn bitor_assign(&mut self, rhs: L) {
        self.0 |= rhs.into().0;
    }
}

impl<L: Into<LayerMask>> BitXor<L> for LayerMask {
    type Output = Self;

    fn bitxor(self, rhs: L) -> Self::Output {
        Self(self.0 ^ rhs.into().0)
    }
}

impl<L: Into<LayerMask>> BitXorAssign<L> for LayerMask {
    fn bitxor_assign(&mut self, rhs: L) {
        self.0 ^= rhs.into().0;
    }
}

impl Not for LayerMask {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

/// Determines which shapes are allowed to collide with each other.
///
/// Two shapes collide only if:
///
/// - They are not in the same non-zero `group`.
/// - The `categories` of each shape intersect the `mask` of the other.
///
/// The same filter is used for spatial queries, where the query filter is
/// tested against the filter of each candidate shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeFilter {
    /// Shapes in the same non-zero group do not collide.
    /// This is useful for ignoring collisions between the parts of a ragdoll, for example.
    pub group: Group,
    /// The categories that the shape belongs to.
    pub categories: LayerMask,
    /// The categories that the shape collides with.
    pub mask: LayerMask,
}

impl Default for ShapeFilter {
    fn default() -> Self {
        Self::ALL
    }
}

impl ShapeFilter {
    /// Collides with everything.
    pub const ALL: Self = Self {
        group: 0,
        categories: LayerMask::ALL,
        mask: LayerMask::ALL,
    };

    /// Collides with nothing.
    pub const NONE: Self = Self {
        group: 0,
        categories: LayerMask::NONE,
        mask: LayerMask::NONE,
    };

    /// Creates a new filter.
    pub fn new(group: Group, categories: impl Into<LayerMask>, mask: impl Into<LayerMask>) -> Self {
        Self {
            group,
            categories: categories.into(),
            mask: mask.into(),
        }
    }

    /// Returns `true` if shapes with these filters must not collide.
    #[inline]
    pub fn rejects(self, other: Self) -> bool {
        (self.group != 0 && self.group == other.group)
            || !self.categories.intersects(other.mask)
            || !other.categories.intersects(self.mask)
    }
}
