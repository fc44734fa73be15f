use itertools::Itertools;

use super::{BoundsTable, SpatialIndex};
use crate::math::*;

/// A spatial hash over a uniform grid.
///
/// Every entry is stored in the buckets of all grid cells its bounding box covers. Cells are
/// mapped to a fixed number of buckets by hashing their coordinates, so distant cells may share
/// a bucket. This works best when the cell size is close to the size of a typical shape.
///
/// Entries that cover more cells than there are buckets are kept in a separate list
/// and tested against every query.
#[derive(Clone, Debug)]
pub struct SpatialHash {
    cell_size: Scalar,
    buckets: Vec<Vec<u32>>,
    bounds: BoundsTable,
    oversized: Vec<u32>,
}

/// An inclusive range of grid cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CellRange {
    min_x: i64,
    min_y: i64,
    max_x: i64,
    max_y: i64,
}

impl CellRange {
    fn cells(self) -> impl Iterator<Item = (i64, i64)> {
        (self.min_x..=self.max_x).cartesian_product(self.min_y..=self.max_y)
    }
}

fn next_prime(n: usize) -> usize {
    let is_prime = |n: usize| n >= 2 && (2..).take_while(|d| d * d <= n).all(|d| n % d != 0);
    (n.max(2)..).find(|&n| is_prime(n)).unwrap_or(2)
}

impl SpatialHash {
    /// Creates an empty spatial hash with the given cell size and at least `count` buckets.
    pub fn new(cell_size: Scalar, count: usize) -> Self {
        let count = next_prime(count);
        Self {
            cell_size: if cell_size > 0.0 { cell_size } else { 1.0 },
            buckets: vec![Vec::new(); count],
            bounds: BoundsTable::default(),
            oversized: Vec::new(),
        }
    }

    /// The width and height of a grid cell.
    pub fn cell_size(&self) -> Scalar {
        self.cell_size
    }

    /// The number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    fn cell(&self, value: Scalar) -> i64 {
        (value / self.cell_size).floor() as i64
    }

    /// The cells covered by `bb`, or `None` if it covers more cells than there are buckets.
    fn cell_range(&self, bb: &BoundingBox) -> Option<CellRange> {
        if !bb.min.is_finite() || !bb.max.is_finite() {
            return None;
        }
        let extent = (bb.max - bb.min) / self.cell_size;
        if (extent.x + 1.0) * (extent.y + 1.0) > self.buckets.len() as Scalar {
            return None;
        }
        Some(CellRange {
            min_x: self.cell(bb.min.x),
            min_y: self.cell(bb.min.y),
            max_x: self.cell(bb.max.x),
            max_y: self.cell(bb.max.y),
        })
    }

    #[inline]
    fn bucket(&self, x: i64, y: i64) -> usize {
        let hash = (x as u64).wrapping_mul(1_640_531_513) ^ (y as u64).wrapping_mul(2_654_435_789);
        (hash % self.buckets.len() as u64) as usize
    }

    fn unlink(&mut self, id: u32, bb: &BoundingBox) {
        match self.cell_range(bb) {
            Some(range) => {
                for (x, y) in range.cells() {
                    let bucket = self.bucket(x, y);
                    self.buckets[bucket].retain(|&other| other != id);
                }
            }
            None => self.oversized.retain(|&other| other != id),
        }
    }

    fn link(&mut self, id: u32, bb: &BoundingBox) {
        match self.cell_range(bb) {
            Some(range) => {
                for (x, y) in range.cells() {
                    let bucket = self.bucket(x, y);
                    let bucket = &mut self.buckets[bucket];
                    if !bucket.contains(&id) {
                        bucket.push(id);
                    }
                }
            }
            None => self.oversized.push(id),
        }
    }

    /// Collects the sorted, deduplicated candidates for a bounding box.
    fn candidates(&self, bb: &BoundingBox) -> Vec<u32> {
        match self.cell_range(bb) {
            Some(range) => range
                .cells()
                .flat_map(|(x, y)| self.buckets[self.bucket(x, y)].iter().copied())
                .chain(self.oversized.iter().copied())
                .sorted_unstable()
                .dedup()
                .collect(),
            None => self.bounds.iter().map(|(id, _)| id).collect(),
        }
    }
}

impl SpatialIndex for SpatialHash {
    fn insert(&mut self, id: u32, bb: BoundingBox) {
        if let Some(previous) = self.bounds.insert(id, bb) {
            if self.cell_range(&previous) == self.cell_range(&bb) {
                return;
            }
            self.unlink(id, &previous);
        }
        self.link(id, &bb);
    }

    fn remove(&mut self, id: u32) -> bool {
        match self.bounds.remove(id) {
            Some(bb) => {
                self.unlink(id, &bb);
                true
            }
            None => false,
        }
    }

    fn contains(&self, id: u32) -> bool {
        self.bounds.get(id).is_some()
    }

    fn len(&self) -> usize {
        self.bounds.len()
    }

    fn query(&self, bb: BoundingBox, visit: &mut dyn FnMut(u32)) {
        for id in self.candidates(&bb) {
            if self.bounds.get(id).is_some_and(|other| other.intersects(&bb)) {
                visit(id);
            }
        }
    }

    fn segment_query(&self, a: Vector, b: Vector, visit: &mut dyn FnMut(u32)) {
        if !a.is_finite() || !b.is_finite() {
            return;
        }

        // Walk the grid cells along the segment.
        let delta = b - a;
        let (mut cell_x, mut cell_y) = (self.cell(a.x), self.cell(a.y));
        let (end_x, end_y) = (self.cell(b.x), self.cell(b.y));
        let step_x = delta.x.signum() as i64;
        let step_y = delta.y.signum() as i64;

        let boundary = |cell: i64, start: Scalar, d: Scalar| {
            if d > 0.0 {
                ((cell + 1) as Scalar * self.cell_size - start) / d
            } else if d < 0.0 {
                (cell as Scalar * self.cell_size - start) / d
            } else {
                Scalar::INFINITY
            }
        };
        let mut t_max_x = boundary(cell_x, a.x, delta.x);
        let mut t_max_y = boundary(cell_y, a.y, delta.y);
        let t_delta_x = (self.cell_size / delta.x).abs();
        let t_delta_y = (self.cell_size / delta.y).abs();

        let max_steps = (end_x - cell_x).unsigned_abs() + (end_y - cell_y).unsigned_abs() + 1;
        let mut buckets = Vec::new();
        for _ in 0..max_steps {
            buckets.push(self.bucket(cell_x, cell_y));
            if t_max_x < t_max_y {
                if t_max_x > 1.0 {
                    break;
                }
                cell_x += step_x;
                t_max_x += t_delta_x;
            } else {
                if t_max_y > 1.0 {
                    break;
                }
                cell_y += step_y;
                t_max_y += t_delta_y;
            }
        }

        let candidates = buckets
            .into_iter()
            .flat_map(|bucket| self.buckets[bucket].iter().copied())
            .chain(self.oversized.iter().copied())
            .sorted_unstable()
            .dedup();
        for id in candidates {
            if self.bounds.get(id).is_some_and(|bb| bb.intersects_segment(a, b)) {
                visit(id);
            }
        }
    }

    fn overlapping_pairs(&mut self, pairs: &mut Vec<(u32, u32)>) {
        for (id, bb) in self.bounds.iter() {
            for other in self.candidates(&bb) {
                if other <= id {
                    continue;
                }
                if self.bounds.get(other).is_some_and(|other| other.intersects(&bb)) {
                    pairs.push((id, other));
                }
            }
        }
    }

    fn clear(&mut self) {
        self.buckets.iter_mut().for_each(Vec::clear);
        self.bounds.clear();
        self.oversized.clear();
    }
}
