//! Handles to the objects owned by a [`Space`](super::Space).
//!
//! A handle records the space that created it and a generational index into one of the
//! arenas of that space. Using a handle after its object was removed fails with
//! [`PhysicsError::StaleHandle`](crate::PhysicsError::StaleHandle), and using it with
//! another space fails with [`PhysicsError::ForeignSpace`](crate::PhysicsError::ForeignSpace).

use core::sync::atomic::{AtomicU32, Ordering};

use crate::data_structures::{arena::ArenaIndex, pair_key::PairKey};

static NEXT_SPACE_ID: AtomicU32 = AtomicU32::new(0);

/// A unique identifier for a [`Space`](super::Space).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpaceId(u32);

impl SpaceId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SPACE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

macro_rules! arena_handle {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name {
            pub(crate) space: SpaceId,
            pub(crate) index: ArenaIndex,
        }

        impl $name {
            #[inline]
            pub(crate) const fn new(space: SpaceId, index: ArenaIndex) -> Self {
                Self { space, index }
            }

            /// The space that owns the object.
            #[inline]
            pub const fn space(&self) -> SpaceId {
                self.space
            }

            /// The index of the object in the storage of its space.
            #[inline]
            pub const fn index(&self) -> ArenaIndex {
                self.index
            }
        }
    };
}

arena_handle!(
    /// A handle to a [`Body`](crate::dynamics::rigid_body::Body) in a space.
    BodyHandle
);

arena_handle!(
    /// A handle to a [`Shape`](crate::collision::shape::Shape) in a space.
    ///
    /// Shape handles are ordered by the slot of the shape, which is also
    /// the order of the shapes in an [`Arbiter`](crate::collision::contact_types::Arbiter).
    ShapeHandle
);

arena_handle!(
    /// A handle to a [`Constraint`](crate::dynamics::joints::Constraint) in a space.
    ConstraintHandle
);

/// A handle to an [`Arbiter`](crate::collision::contact_types::Arbiter).
///
/// A handle is only valid while the callback it was obtained in is running. Checking it with
/// [`Space::check_arbiter`](super::Space::check_arbiter) fails with
/// [`PhysicsError::ArbiterExpired`](crate::PhysicsError::ArbiterExpired) from any other
/// callback or after the step, even if the same pair of shapes is still touching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ArbiterHandle {
    pub(crate) space: SpaceId,
    pub(crate) key: PairKey,
    pub(crate) serial: u64,
}

impl ArbiterHandle {
    /// The space that owns the arbiter.
    #[inline]
    pub const fn space(&self) -> SpaceId {
        self.space
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_ids_are_unique() {
        let a = SpaceId::next();
        let b = SpaceId::next();
        assert_ne!(a, b);
    }
}
