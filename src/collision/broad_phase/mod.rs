//! Finds pairs of shapes with overlapping bounding boxes.
//!
//! A [`Space`](crate::space::Space) keeps two [`SpatialIndex`] structures: one for the shapes of
//! static bodies, which is only updated on demand, and one for all other shapes, which is updated
//! every step. Candidate pairs are found within the dynamic index and between the dynamic and
//! static indices, and then passed on to the [narrow phase](super::narrow_phase).
//!
//! Two index implementations are provided:
//!
//! - [`SweepAndPrune`]: Sorts bounding boxes along the x-axis. Good for most scenes.
//! - [`SpatialHash`]: A uniform grid. Good for many shapes of a similar size.

mod spatial_hash;
mod sweep_and_prune;

pub use spatial_hash::SpatialHash;
pub use sweep_and_prune::SweepAndPrune;

use core::fmt::Debug;

use crate::math::*;

/// A spatial acceleration structure for bounding boxes keyed by `u32` identifiers.
///
/// The identifiers used by the space are the slots of its shapes.
pub trait SpatialIndex: Debug + Send + Sync {
    /// Inserts or moves an entry.
    fn insert(&mut self, id: u32, bb: BoundingBox);

    /// Removes an entry, returning `true` if it existed.
    fn remove(&mut self, id: u32) -> bool;

    /// Returns `true` if the index contains the entry.
    fn contains(&self, id: u32) -> bool;

    /// The number of entries.
    fn len(&self) -> usize;

    /// Returns `true` if the index has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls `visit` once for each entry whose bounding box intersects `bb`.
    fn query(&self, bb: BoundingBox, visit: &mut dyn FnMut(u32));

    /// Calls `visit` once for each entry whose bounding box intersects the segment from `a` to `b`.
    fn segment_query(&self, a: Vector, b: Vector, visit: &mut dyn FnMut(u32));

    /// Appends every pair of entries with intersecting bounding boxes to `pairs`,
    /// with the smaller identifier first.
    fn overlapping_pairs(&mut self, pairs: &mut Vec<(u32, u32)>);

    /// Removes all entries.
    fn clear(&mut self);
}

/// The spatial index used by a space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum BroadPhaseKind {
    /// A [`SweepAndPrune`] index.
    #[default]
    SweepAndPrune,
    /// A [`SpatialHash`] index with the given cell size and number of buckets.
    SpatialHash {
        /// The width and height of a grid cell.
        cell_size: Scalar,
        /// The number of hash buckets. Rounded up to a prime.
        count: usize,
    },
}

impl BroadPhaseKind {
    /// Creates an empty index of this kind.
    pub fn build(&self) -> Box<dyn SpatialIndex> {
        match *self {
            Self::SweepAndPrune => Box::new(SweepAndPrune::default()),
            Self::SpatialHash { cell_size, count } => Box::new(SpatialHash::new(cell_size, count)),
        }
    }
}

/// Bounding boxes stored densely by identifier, shared by the index implementations.
#[derive(Clone, Debug, Default)]
pub(crate) struct BoundsTable {
    bounds: Vec<Option<BoundingBox>>,
    len: usize,
}

impl BoundsTable {
    /// Stores the bounding box, returning the previous one.
    pub fn insert(&mut self, id: u32, bb: BoundingBox) -> Option<BoundingBox> {
        let id = id as usize;
        if id >= self.bounds.len() {
            self.bounds.resize(id + 1, None);
        }
        let previous = self.bounds[id].replace(bb);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    pub fn remove(&mut self, id: u32) -> Option<BoundingBox> {
        let previous = self.bounds.get_mut(id as usize)?.take();
        if previous.is_some() {
            self.len -= 1;
        }
        previous
    }

    #[inline]
    pub fn get(&self, id: u32) -> Option<BoundingBox> {
        self.bounds.get(id as usize).copied().flatten()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn clear(&mut self) {
        self.bounds.clear();
        self.len = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, BoundingBox)> + '_ {
        self.bounds
            .iter()
            .enumerate()
            .filter_map(|(id, bb)| bb.map(|bb| (id as u32, bb)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_index(mut index: Box<dyn SpatialIndex>) {
        let unit = |x: Scalar, y: Scalar| {
            BoundingBox::new(Vector::new(x, y), Vector::new(x + 1.0, y + 1.0))
        };
        index.insert(0, unit(0.0, 0.0));
        index.insert(1, unit(0.5, 0.5));
        index.insert(2, unit(5.0, 5.0));
        index.insert(3, unit(5.5, 0.0));
        assert_eq!(index.len(), 4);

        let mut pairs = Vec::new();
        index.overlapping_pairs(&mut pairs);
        assert_eq!(pairs, vec![(0, 1)]);

        // Move 3 on top of 2.
        index.insert(3, unit(5.5, 5.5));
        pairs.clear();
        index.overlapping_pairs(&mut pairs);
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(0, 1), (2, 3)]);

        let mut found = Vec::new();
        index.query(unit(-0.8, -0.8), &mut |id| found.push(id));
        assert_eq!(found, vec![0]);

        found.clear();
        index.segment_query(Vector::new(-1.0, 0.25), Vector::new(10.0, 0.25), &mut |id| {
            found.push(id)
        });
        found.sort_unstable();
        assert_eq!(found, vec![0]);

        assert!(index.remove(1));
        assert!(!index.remove(1));
        assert!(!index.contains(1));
        pairs.clear();
        index.overlapping_pairs(&mut pairs);
        assert_eq!(pairs, vec![(2, 3)]);
    }

    #[test]
    fn sweep_and_prune() {
        check_index(BroadPhaseKind::SweepAndPrune.build());
    }

    #[test]
    fn spatial_hash() {
        check_index(
            BroadPhaseKind::SpatialHash {
                cell_size: 1.0,
                count: 100,
            }
            .build(),
        );
    }
}
