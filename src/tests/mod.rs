use crate::prelude::*;
use approx::assert_relative_eq;
use std::sync::{Arc, Mutex};

mod determinism;

const DT: Scalar = 1.0 / 60.0;

fn create_space() -> Space {
    let mut space = Space::new();
    space.set_gravity(Vector::new(0.0, -10.0));
    let floor = Shape::segment(Vector::new(-20.0, 0.0), Vector::new(20.0, 0.0), 0.0)
        .unwrap()
        .with_friction(1.0);
    space.add_shape(space.static_body(), floor).unwrap();
    space
}

fn add_ball(space: &mut Space, position: Vector, radius: Scalar) -> (BodyHandle, ShapeHandle) {
    let body = space
        .add_body(Body::dynamic(1.0, moment_for_circle(1.0, 0.0, radius, Vector::ZERO)).with_position(position))
        .unwrap();
    let shape = space
        .add_shape(body, Shape::circle(radius, Vector::ZERO).unwrap().with_friction(0.7))
        .unwrap();
    (body, shape)
}

fn run(space: &mut Space, steps: usize) {
    for _ in 0..steps {
        space.step(DT).unwrap();
    }
}

#[test]
fn body_with_velocity_moves() {
    let mut space = Space::new();
    let body = space
        .add_body(Body::dynamic(1.0, 1.0).with_velocity(Vector::X))
        .unwrap();

    const STEPS: usize = 500;
    run(&mut space, STEPS);

    let position = space.body(body).unwrap().position();
    assert_relative_eq!(position.y, 0.0);
    assert_relative_eq!(position.x, STEPS as Scalar * DT, epsilon = 1e-9);
}

#[test]
fn static_bodies_never_move() {
    let mut space = create_space();
    let wall = space
        .add_body(Body::static_body().with_position(Vector::new(3.0, 1.0)))
        .unwrap();
    space
        .add_shape(wall, Shape::box_shape(1.0, 2.0, 0.0).unwrap())
        .unwrap();

    // A ball thrown against the wall.
    let (ball, _) = add_ball(&mut space, Vector::new(0.0, 1.0), 0.5);
    space.body_mut(ball).unwrap().set_velocity(Vector::new(10.0, 0.0));

    run(&mut space, 120);

    let wall = space.body(wall).unwrap();
    assert_eq!(wall.position(), Vector::new(3.0, 1.0));
    assert_eq!(wall.velocity(), Vector::ZERO);
    assert_eq!(wall.angle(), 0.0);
    assert_eq!(space.body(space.static_body()).unwrap().position(), Vector::ZERO);

    // The ball bounced off instead of passing through.
    assert!(space.body(ball).unwrap().position().x < 3.0);
}

#[test]
fn bounding_boxes_are_idempotent() {
    let mut shape = Shape::box_shape(2.0, 1.0, 0.1).unwrap();
    let transform = Transform::rigid(Vector::new(1.0, 2.0), 0.7);
    let first = shape.update(&transform);
    let second = shape.update(&transform);
    assert_eq!(first, second);
    assert_eq!(shape.bb(), first);
}

#[test]
fn local_to_world_round_trip() {
    let body = Body::dynamic(1.0, 1.0)
        .with_position(Vector::new(3.0, -2.0))
        .with_angle(1.2);
    for point in [Vector::ZERO, Vector::new(1.0, 0.5), Vector::new(-4.0, 7.0)] {
        let world = body.local_to_world(point);
        assert_relative_eq!(body.world_to_local(world), point, epsilon = 1e-9);
    }
}

#[test]
fn resting_contact_is_warm_started() {
    let mut space = create_space();
    add_ball(&mut space, Vector::new(0.0, 0.5), 0.5);
    run(&mut space, 120);

    let mut impulses = Vec::new();
    space
        .each_arbiter(|arbiter| {
            assert!(!arbiter.is_first_contact());
            impulses.push(arbiter.total_impulse());
            Ok::<(), ()>(())
        })
        .unwrap();

    // The contact supports the weight of the ball over one step.
    assert_eq!(impulses.len(), 1);
    assert_relative_eq!(impulses[0].length(), 10.0 * DT, epsilon = 0.05);
}

/// The `(feature id, accumulated normal impulse)` of every contact in the space.
fn contact_impulses(space: &Space) -> Vec<(u64, Scalar)> {
    let mut impulses = Vec::new();
    space
        .each_arbiter(|arbiter| {
            impulses.extend(arbiter.contacts.iter().map(|c| (c.id, c.normal_impulse)));
            Ok::<(), ()>(())
        })
        .unwrap();
    impulses
}

#[test]
fn resting_contact_impulses_carry_over_between_steps() {
    let mut space = create_space();
    add_ball(&mut space, Vector::new(0.0, 0.5), 0.5);
    run(&mut space, 120);

    let settled = contact_impulses(&space);
    assert_eq!(settled.len(), 1);
    assert_relative_eq!(settled[0].1, 10.0 * DT, max_relative = 0.1);

    // Before solving, the contact starts from the impulse of the previous step.
    let carried = Arc::new(Mutex::new(Vec::new()));
    let log = carried.clone();
    space.default_collision_handler().set_pre_solve(move |arbiter, _| {
        log.lock()
            .unwrap()
            .extend(arbiter.contacts.iter().map(|c| (c.id, c.normal_impulse)));
        true
    });
    space.step(DT).unwrap();
    assert_eq!(*carried.lock().unwrap(), settled);

    let next = contact_impulses(&space);
    assert_eq!(next[0].0, settled[0].0);
    assert_relative_eq!(next[0].1, settled[0].1, max_relative = 0.02);

    // Halving the time step halves the impulse needed to hold the ball up.
    space.step(DT / 2.0).unwrap();
    let halved = contact_impulses(&space);
    assert_eq!(halved[0].0, settled[0].0);
    assert_relative_eq!(halved[0].1, settled[0].1 / 2.0, max_relative = 0.1);
}

#[test]
fn pin_joint_keeps_distance() {
    let mut space = Space::new();
    space.set_gravity(Vector::new(0.0, -10.0));

    let bob = space
        .add_body(Body::dynamic(1.0, moment_for_circle(1.0, 0.0, 0.25, Vector::ZERO)).with_position(Vector::new(3.0, 0.0)))
        .unwrap();
    space
        .add_constraint(Constraint::pin(space.static_body(), bob, Vector::ZERO, Vector::ZERO))
        .unwrap();

    for _ in 0..300 {
        space.step(DT).unwrap();
        let distance = space.body(bob).unwrap().position().length();
        assert_relative_eq!(distance, 3.0, epsilon = 0.05);
    }
}

#[test]
fn pin_joint_between_free_bodies_keeps_distance() {
    let mut space = Space::new();
    let a = space
        .add_body(Body::dynamic(1.0, 1.0).with_velocity(Vector::new(0.0, 2.0)))
        .unwrap();
    let b = space
        .add_body(
            Body::dynamic(2.0, 1.0)
                .with_position(Vector::new(4.0, 0.0))
                .with_velocity(Vector::new(-1.0, -1.0)),
        )
        .unwrap();
    space
        .add_constraint(Constraint::pin(a, b, Vector::ZERO, Vector::ZERO))
        .unwrap();

    run(&mut space, 600);

    let distance = space
        .body(a)
        .unwrap()
        .position()
        .distance(space.body(b).unwrap().position());
    assert_relative_eq!(distance, 4.0, epsilon = 0.01);
}

#[test]
fn sensors_report_but_do_not_collide() {
    let mut space = create_space();
    let (ball, shape) = add_ball(&mut space, Vector::new(0.0, 1.0), 0.5);
    space.shape_mut(shape).unwrap().set_sensor(true);

    let began = Arc::new(Mutex::new(0));
    let count = began.clone();
    space.default_collision_handler().set_begin(move |arbiter, _| {
        assert!(arbiter.is_sensor());
        *count.lock().unwrap() += 1;
        true
    });

    run(&mut space, 60);

    assert_eq!(*began.lock().unwrap(), 1);
    assert!(space.body(ball).unwrap().position().y < -1.0);
}

#[test]
fn changes_are_deferred_while_locked() {
    const BALL: CollisionType = 1;

    let mut space = create_space();
    let (ball, shape) = add_ball(&mut space, Vector::new(0.0, 0.5), 0.5);
    space.shape_mut(shape).unwrap().set_collision_type(BALL);

    let errors = Arc::new(Mutex::new(Vec::new()));
    let log = errors.clone();
    space
        .wildcard_collision_handler(BALL)
        .set_begin(move |arbiter, space| {
            let (body, _) = arbiter.bodies();
            let bodies = space.body_count();
            log.lock().unwrap().push(space.remove_body(body).unwrap_err());
            log.lock().unwrap().extend(space.add_body(Body::kinematic()).err());

            space.add_post_step_callback_keyed(body, move |space| {
                space.remove_body(body).unwrap();
                assert_eq!(space.body_count(), bodies - 1);
            });
            true
        });

    space.step(DT).unwrap();

    assert_eq!(*errors.lock().unwrap(), [PhysicsError::Locked, PhysicsError::Locked]);
    assert!(!space.contains_body(ball));
    assert_eq!(space.body_count(), 0);
    assert_eq!(space.shape_count(), 1);
    assert_eq!(space.arbiter_count(), 0);
}

#[test]
fn sleeping_bodies_wake_when_touched() {
    let mut space = create_space();
    space.set_sleep_time_threshold(0.5);
    let (resting, _) = add_ball(&mut space, Vector::new(0.0, 0.5), 0.5);

    run(&mut space, 120);
    assert!(space.body(resting).unwrap().is_sleeping());

    // Lands on top of the sleeping ball after about 33 steps.
    let (falling, _) = add_ball(&mut space, Vector::new(0.0, 3.0), 0.5);
    run(&mut space, 45);
    assert!(!space.body(resting).unwrap().is_sleeping());
    assert!(space.body(falling).unwrap().position().y > 1.0);
}
