//! A determinism test.
//!
//! This scene is designed to produce a chaotic result engaging:
//!
//! - the contact solver
//! - persistent contacts and warm starting
//! - joints
//!
//! The scene is simulated several times, and the final positions and angles must match exactly.
//!
//! The scene is based on the `FallingHinges` test in the Box2D physics engine
//! <https://github.com/erincatto/box2d/blob/90c2781f64775085035655661d5fe6542bf0fbd5/samples/sample_determinism.cpp>

use itertools::Itertools;

use crate::prelude::*;

// How many steps to simulate.
const STEP_COUNT: usize = 300;

const ROWS: u32 = 12;
const COLUMNS: u32 = 4;

fn setup_scene(space: &mut Space) -> Vec<BodyHandle> {
    space.set_gravity(Vector::new(0.0, -10.0));

    let ground = Shape::box_from_bb(
        BoundingBox::new(Vector::new(-20.0, -2.0), Vector::new(20.0, 0.0)),
        0.0,
    )
    .unwrap()
    .with_friction(0.6);
    space.add_shape(space.static_body(), ground).unwrap();

    let half_size = 0.25;
    let offset = 0.4 * half_size;
    let delta_x = 10.0 * half_size;
    let x_root = -0.5 * delta_x * (COLUMNS as Scalar - 1.0);
    let moment = moment_for_box(1.0, 2.0 * half_size, 2.0 * half_size);

    let mut bodies = Vec::new();
    for col in 0..COLUMNS {
        let x = x_root + col as Scalar * delta_x;
        let mut previous = None;

        for row in 0..ROWS {
            let body = Body::dynamic(1.0, moment)
                .with_position(Vector::new(
                    x + offset * row as Scalar,
                    half_size + 2.0 * half_size * row as Scalar,
                ))
                .with_angle(0.1 * row as Scalar - 1.0);
            let body = space.add_body(body).unwrap();
            space
                .add_shape(
                    body,
                    Shape::box_shape(2.0 * half_size, 2.0 * half_size, 0.0)
                        .unwrap()
                        .with_friction(0.6),
                )
                .unwrap();

            if let Some(previous) = previous {
                let pivot = Vector::new(x + half_size, 2.0 * half_size * row as Scalar);
                space
                    .add_constraint(Constraint::pivot(previous, body, pivot).with_collide_bodies(false))
                    .unwrap();
            }

            previous = (row & 1 == 0).then_some(body);
            bodies.push(body);
        }
    }
    bodies
}

fn run_scene() -> Vec<(Vector, Scalar)> {
    let mut space = Space::new();
    let bodies = setup_scene(&mut space);

    for _ in 0..STEP_COUNT {
        space.step(1.0 / 64.0).unwrap();
    }

    bodies
        .into_iter()
        .map(|handle| {
            let body = space.body(handle).unwrap();
            (body.position(), body.angle())
        })
        .collect()
}

#[test]
fn falling_hinges_are_locally_deterministic() {
    for (a, b) in (0..3).map(|_| run_scene()).tuple_windows() {
        assert_eq!(a, b);
    }
}
