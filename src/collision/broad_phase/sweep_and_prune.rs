use super::{BoundsTable, SpatialIndex};
use crate::math::*;

/// A sweep and prune index.
///
/// Entries are kept sorted by the minimum x of their bounding boxes. Sweep and prune exploits
/// temporal coherence, as shapes are unlikely to move significantly between two steps, so the
/// order is restored with an insertion sort, which is very fast for nearly sorted lists.
#[derive(Clone, Debug, Default)]
pub struct SweepAndPrune {
    bounds: BoundsTable,
    /// Identifiers sorted by the minimum x of their bounding box, as of the last sort.
    order: Vec<u32>,
}

impl SweepAndPrune {
    fn sort(&mut self) {
        let bounds = &self.bounds;
        let min_x = |id: u32| bounds.get(id).map_or(Scalar::NEG_INFINITY, |bb| bb.min.x);
        insertion_sort(&mut self.order, |a, b| min_x(*a) > min_x(*b));
    }
}

impl SpatialIndex for SweepAndPrune {
    fn insert(&mut self, id: u32, bb: BoundingBox) {
        if self.bounds.insert(id, bb).is_none() {
            self.order.push(id);
        }
    }

    fn remove(&mut self, id: u32) -> bool {
        if self.bounds.remove(id).is_none() {
            return false;
        }
        if let Some(position) = self.order.iter().position(|&other| other == id) {
            self.order.remove(position);
        }
        true
    }

    fn contains(&self, id: u32) -> bool {
        self.bounds.get(id).is_some()
    }

    fn len(&self) -> usize {
        self.bounds.len()
    }

    fn query(&self, bb: BoundingBox, visit: &mut dyn FnMut(u32)) {
        // The order may be stale if entries moved since the last sweep, so no early out here.
        for &id in &self.order {
            if self.bounds.get(id).is_some_and(|other| other.intersects(&bb)) {
                visit(id);
            }
        }
    }

    fn segment_query(&self, a: Vector, b: Vector, visit: &mut dyn FnMut(u32)) {
        let segment_bb = BoundingBox::new(a.min(b), a.max(b));
        for &id in &self.order {
            if self
                .bounds
                .get(id)
                .is_some_and(|bb| bb.intersects(&segment_bb) && bb.intersects_segment(a, b))
            {
                visit(id);
            }
        }
    }

    fn overlapping_pairs(&mut self, pairs: &mut Vec<(u32, u32)>) {
        self.sort();

        for (i, &id1) in self.order.iter().enumerate() {
            let Some(bb1) = self.bounds.get(id1) else {
                continue;
            };
            for &id2 in &self.order[i + 1..] {
                let Some(bb2) = self.bounds.get(id2) else {
                    continue;
                };

                // x doesn't intersect, and neither does anything after this.
                if bb2.min.x > bb1.max.x {
                    break;
                }

                // y doesn't intersect.
                if bb1.min.y > bb2.max.y || bb1.max.y < bb2.min.y {
                    continue;
                }

                pairs.push((id1.min(id2), id1.max(id2)));
            }
        }
    }

    fn clear(&mut self) {
        self.bounds.clear();
        self.order.clear();
    }
}

/// Sorts a list iteratively using comparisons. In an ascending sort order, when a smaller value
/// is encountered, it is moved lower in the list until it is larger than the item before it.
///
/// This is relatively slow for large lists, but very efficient in cases where the list is
/// already mostly sorted.
fn insertion_sort<T>(items: &mut [T], mut comparison: impl FnMut(&T, &T) -> bool) {
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && comparison(&items[j - 1], &items[j]) {
            items.swap(j - 1, j);
            j -= 1;
        }
    }
}
