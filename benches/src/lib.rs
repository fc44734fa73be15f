//! Benchmark scenes for `rigid2d`, shared by the command line runner and the Criterion benches.

use rigid2d::prelude::*;

/// A benchmark that can be run with the CLI.
#[derive(Clone, Copy, Debug)]
pub struct Benchmark {
    /// The name of the benchmark.
    pub name: &'static str,
    /// A function that constructs the space of the benchmark.
    pub constructor: fn() -> Space,
}

impl Benchmark {
    /// Creates a new benchmark with the given name and constructor function.
    pub const fn new(name: &'static str, constructor: fn() -> Space) -> Self {
        Self { name, constructor }
    }
}

/// All benchmarks.
pub const BENCHMARKS: &[Benchmark] = &[
    Benchmark::new("Large Pyramid", || large_pyramid(100)),
    Benchmark::new("Many Pyramids", || many_pyramids(10, 10, 10)),
    Benchmark::new("Ball Pit", || ball_pit(40, 50)),
    Benchmark::new("Chains", || chains(20, 40)),
];

/// All benchmarks use a fixed time step of 60 FPS.
pub const TIME_STEP: Scalar = 1.0 / 60.0;

fn create_space() -> Space {
    let mut space = Space::new();
    space.set_gravity(Vector::new(0.0, -10.0));
    space.set_iterations(10);
    space
}

fn add_box(space: &mut Space, position: Vector, size: Scalar) {
    let moment = moment_for_box(1.0, size, size);
    let body = space
        .add_body(Body::dynamic(1.0, moment).with_position(position))
        .unwrap();
    let shape = Shape::box_shape(size, size, 0.0).unwrap();
    space.add_shape(body, shape.with_friction(0.6)).unwrap();
}

fn add_ground(space: &mut Space, half_width: Scalar) {
    let bb = BoundingBox::new(Vector::new(-half_width, -40.0), Vector::new(half_width, 0.0));
    let ground = Shape::box_from_bb(bb, 0.0).unwrap();
    space
        .add_shape(space.static_body(), ground.with_friction(0.6))
        .unwrap();
}

fn add_pyramid(space: &mut Space, base_count: usize, offset: Vector) {
    let h = 0.5;
    let box_size = 2.0 * h;
    let shift = h;
    for i in 0..base_count {
        let y = (2.0 * i as Scalar + 1.0) * shift * 0.99;

        for j in i..base_count {
            let x = (i as Scalar + 1.0) * shift + 2.0 * (j - i) as Scalar * shift
                - h * base_count as Scalar;
            add_box(space, offset + Vector::new(x, y), box_size);
        }
    }
}

/// A single pyramid of boxes with `base_count` boxes at the bottom.
pub fn large_pyramid(base_count: usize) -> Space {
    let mut space = create_space();
    add_ground(&mut space, 400.0);
    add_pyramid(&mut space, base_count, Vector::ZERO);
    space
}

/// A grid of `rows * columns` pyramids with `base_count` boxes at the bottom,
/// each row resting on its own shelf.
pub fn many_pyramids(base_count: usize, rows: usize, columns: usize) -> Space {
    let mut space = create_space();
    let spacing = base_count as Scalar + 2.0;
    add_ground(&mut space, 0.5 * spacing * (columns as Scalar + 2.0));

    for row in 0..rows {
        let y = row as Scalar * spacing;
        for column in 0..columns {
            let x = (column as Scalar - 0.5 * (columns as Scalar - 1.0)) * spacing;
            if row > 0 {
                let bb = BoundingBox::new(
                    Vector::new(x - 0.5 * spacing, y - 0.5),
                    Vector::new(x + 0.5 * spacing, y),
                );
                let shelf = Shape::box_from_bb(bb, 0.0).unwrap();
                space
                    .add_shape(space.static_body(), shelf.with_friction(0.6))
                    .unwrap();
            }
            add_pyramid(&mut space, base_count, Vector::new(x, y));
        }
    }
    space
}

/// A box of `columns * rows` balls dropped into a pit.
pub fn ball_pit(columns: usize, rows: usize) -> Space {
    let mut space = create_space();
    let radius = 0.5;
    let width = columns as Scalar * 2.0 * radius;

    let walls = [
        (Vector::new(-0.5 * width - 1.0, 0.0), Vector::new(0.5 * width + 1.0, 0.0)),
        (Vector::new(-0.5 * width - 1.0, 0.0), Vector::new(-0.5 * width - 1.0, 200.0)),
        (Vector::new(0.5 * width + 1.0, 0.0), Vector::new(0.5 * width + 1.0, 200.0)),
    ];
    for (a, b) in walls {
        let wall = Shape::segment(a, b, 0.5).unwrap();
        space
            .add_shape(space.static_body(), wall.with_friction(0.5))
            .unwrap();
    }

    let moment = moment_for_circle(1.0, 0.0, radius, Vector::ZERO);
    for row in 0..rows {
        for column in 0..columns {
            // Stagger the rows so that the balls do not stack perfectly.
            let stagger = if row % 2 == 0 { 0.0 } else { 0.5 * radius };
            let position = Vector::new(
                -0.5 * width + (2.0 * column as Scalar + 1.0) * radius + stagger,
                2.0 + row as Scalar * 2.1 * radius,
            );
            let body = space
                .add_body(Body::dynamic(1.0, moment).with_position(position))
                .unwrap();
            let shape = Shape::circle(radius, Vector::ZERO).unwrap();
            space
                .add_shape(body, shape.with_friction(0.5).with_elasticity(0.2))
                .unwrap();
        }
    }
    space
}

/// `count` chains of `links` capsules connected with pivot joints, hanging from the static body.
pub fn chains(count: usize, links: usize) -> Space {
    let mut space = create_space();
    let link_length = 1.0;
    let radius = 0.15;
    let moment = moment_for_segment(1.0, Vector::new(-0.5, 0.0), Vector::new(0.5, 0.0), radius);

    for chain in 0..count {
        let x = chain as Scalar * 3.0 - 1.5 * count as Scalar;
        let mut previous = space.static_body();
        for link in 0..links {
            let center = Vector::new(x + (link as Scalar + 0.5) * link_length, 50.0);
            let body = space
                .add_body(Body::dynamic(1.0, moment).with_position(center))
                .unwrap();
            let half = Vector::new(0.5 * link_length, 0.0);
            // Links of the same chain share a group so that neighbors do not collide.
            let filter = ShapeFilter::new(chain as u64 + 1, LayerMask::ALL, LayerMask::ALL);
            let shape = Shape::segment(-half, half, radius).unwrap();
            space.add_shape(body, shape.with_filter(filter)).unwrap();
            space
                .add_constraint(Constraint::pivot(previous, body, center - half))
                .unwrap();
            previous = body;
        }
    }
    space
}
