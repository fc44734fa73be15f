//! Convex hull reduction with QuickHull.

use crate::math::{Scalar, Vector, cross};

/// Computes the convex hull of a point set with counterclockwise winding.
///
/// Points that are within `tolerance` of a hull edge, relative to the edge length,
/// are discarded. Returns the hull and the index in `points` of the first hull vertex,
/// which is the leftmost point (lowest if there is a tie).
///
/// An empty input produces an empty hull. If every point is the same, the hull has
/// a single vertex.
pub fn convex_hull(points: &[Vector], tolerance: Scalar) -> (Vec<Vector>, usize) {
    let Some(&first_point) = points.first() else {
        return (Vec::new(), 0);
    };

    // Find the extreme points along the x axis, breaking ties along y.
    let (mut start, mut end) = (0, 0);
    let (mut min, mut max) = (first_point, first_point);
    for (i, &v) in points.iter().enumerate().skip(1) {
        if v.x < min.x || (v.x == min.x && v.y < min.y) {
            min = v;
            start = i;
        } else if v.x > max.x || (v.x == max.x && v.y > max.y) {
            max = v;
            end = i;
        }
    }

    if start == end {
        return (vec![first_point], 0);
    }

    let (a, b) = (points[start], points[end]);
    let mut remaining: Vec<Vector> = points
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != start && i != end)
        .map(|(_, &v)| v)
        .collect();

    let mut hull = Vec::with_capacity(points.len());
    hull.push(a);
    reduce(&mut remaining, a, b, tolerance, &mut hull);
    hull.push(b);
    reduce(&mut remaining, b, a, tolerance, &mut hull);

    (hull, start)
}

/// Moves the points that lie outside of the directed edge `a`-`b` to the front of `points`
/// with the farthest one first, and returns how many there are.
fn partition(points: &mut [Vector], a: Vector, b: Vector, tolerance: Scalar) -> usize {
    if points.is_empty() {
        return 0;
    }

    let delta = b - a;
    let value_tolerance = tolerance * delta.length();

    let mut max = 0.0;
    let mut pivot = 0;
    let mut head = 0;
    let mut tail = points.len();

    while head < tail {
        let value = cross(points[head] - a, delta);
        if value > value_tolerance {
            if value > max {
                max = value;
                pivot = head;
            }
            head += 1;
        } else {
            tail -= 1;
            points.swap(head, tail);
        }
    }

    if pivot != 0 {
        points.swap(0, pivot);
    }
    head
}

fn reduce(points: &mut [Vector], a: Vector, b: Vector, tolerance: Scalar, hull: &mut Vec<Vector>) {
    let count = partition(points, a, b, tolerance);
    let Some((&mut pivot, rest)) = points[..count].split_first_mut() else {
        return;
    };

    reduce(rest, a, pivot, tolerance, hull);
    hull.push(pivot);
    reduce(rest, pivot, b, tolerance, hull);
}
