//! Draws the contents of a [`Space`] for debugging purposes.
//!
//! The engine does not render anything itself. Instead, [`Space::debug_draw`] walks the
//! shapes, constraints and contacts of the space and calls the primitives of a [`DebugDraw`]
//! implementation, which can forward them to any renderer.
//!
//! Drawing has no effect on the simulation.

#![allow(clippy::unnecessary_cast)]

mod configuration;

pub use configuration::*;

use crate::{
    collision::shape::{Shape, ShapeKind},
    dynamics::{joints::ConstraintKind, rigid_body::Body},
    math::*,
    space::Space,
};

/// The number of zigzag turns used to draw a [`DampedSpring`](crate::dynamics::joints::DampedSpring).
const SPRING_COILS: usize = 8;

/// Draw primitives used by [`Space::debug_draw`].
///
/// All coordinates are in world space.
pub trait DebugDraw {
    /// Draws a circle. `angle` is the rotation of its body, so that the rotation can be
    /// visualized with a line from the center.
    fn draw_circle(
        &mut self,
        center: Vector,
        angle: Scalar,
        radius: Scalar,
        outline: DebugColor,
        fill: DebugColor,
    );

    /// Draws a thin line.
    fn draw_segment(&mut self, a: Vector, b: Vector, color: DebugColor);

    /// Draws a line with rounded ends and the given `radius`.
    fn draw_fat_segment(
        &mut self,
        a: Vector,
        b: Vector,
        radius: Scalar,
        outline: DebugColor,
        fill: DebugColor,
    );

    /// Draws a convex polygon with corners rounded by `radius`.
    fn draw_polygon(
        &mut self,
        vertices: &[Vector],
        radius: Scalar,
        outline: DebugColor,
        fill: DebugColor,
    );

    /// Draws a dot with a `size` in pixels.
    fn draw_dot(&mut self, size: Scalar, position: Vector, color: DebugColor);

    /// Picks the fill color of a shape. Returning `None` uses the colors of the options.
    fn color_for_shape(&mut self, shape: &Shape, body: &Body) -> Option<DebugColor> {
        let _ = (shape, body);
        None
    }
}

impl Space {
    /// Draws the space with the primitives of `drawer`.
    ///
    /// [`DebugDrawOptions::flags`] selects what gets drawn.
    pub fn debug_draw(&self, options: &DebugDrawOptions, drawer: &mut impl DebugDraw) {
        if options.flags.contains(DebugDrawFlags::SHAPES) {
            for (_, shape) in self.shapes.iter() {
                self.draw_shape(shape, options, drawer);
            }
        }

        if options.flags.contains(DebugDrawFlags::CONSTRAINTS) {
            for (_, constraint) in self.constraints.iter() {
                let (Ok(body_a), Ok(body_b)) =
                    (self.body(constraint.body_a), self.body(constraint.body_b))
                else {
                    continue;
                };
                draw_constraint(&constraint.kind, body_a, body_b, options.constraint_color, drawer);
            }
        }

        if options.flags.contains(DebugDrawFlags::COLLISION_POINTS) {
            for arbiter in self
                .arbiters
                .values()
                .filter(|arbiter| self.arbiter_is_touching(arbiter))
            {
                let normal = arbiter.normal();
                for i in 0..arbiter.count() {
                    let (Some(a), Some(b)) = (arbiter.point_a(i), arbiter.point_b(i)) else {
                        continue;
                    };
                    drawer.draw_segment(
                        a - normal * 2.0,
                        b + normal * 2.0,
                        options.collision_point_color,
                    );
                }
            }
        }
    }

    fn draw_shape(&self, shape: &Shape, options: &DebugDrawOptions, drawer: &mut impl DebugDraw) {
        let Some(body) = shape.body.and_then(|body| self.body(body).ok()) else {
            return;
        };

        let fill = drawer.color_for_shape(shape, body).unwrap_or(if body.is_sleeping() {
            options.sleeping_color
        } else {
            options.shape_color
        });
        let outline = options.shape_outline_color;

        match &shape.kind {
            ShapeKind::Circle(circle) => {
                drawer.draw_circle(circle.world_center, body.angle(), circle.radius, outline, fill);
            }
            ShapeKind::Segment(segment) => {
                drawer.draw_fat_segment(segment.world_a, segment.world_b, segment.radius, outline, fill);
            }
            ShapeKind::Polygon(polygon) => {
                drawer.draw_polygon(&polygon.world_vertices, polygon.radius, outline, fill);
            }
        }
    }
}

fn draw_constraint(
    kind: &ConstraintKind,
    body_a: &Body,
    body_b: &Body,
    color: DebugColor,
    drawer: &mut impl DebugDraw,
) {
    match kind {
        ConstraintKind::Pin(joint) => {
            let a = body_a.local_to_world(joint.anchor_a);
            let b = body_b.local_to_world(joint.anchor_b);
            drawer.draw_dot(5.0, a, color);
            drawer.draw_dot(5.0, b, color);
            drawer.draw_segment(a, b, color);
        }
        ConstraintKind::Slide(joint) => {
            let a = body_a.local_to_world(joint.anchor_a);
            let b = body_b.local_to_world(joint.anchor_b);
            drawer.draw_dot(5.0, a, color);
            drawer.draw_dot(5.0, b, color);
            drawer.draw_segment(a, b, color);
        }
        ConstraintKind::Pivot(joint) => {
            drawer.draw_dot(10.0, body_a.local_to_world(joint.anchor_a), color);
            drawer.draw_dot(10.0, body_b.local_to_world(joint.anchor_b), color);
        }
        ConstraintKind::Groove(joint) => {
            let a = body_a.local_to_world(joint.groove_a());
            let b = body_a.local_to_world(joint.groove_b());
            drawer.draw_segment(a, b, color);
            drawer.draw_dot(5.0, body_b.local_to_world(joint.anchor_b), color);
        }
        ConstraintKind::DampedSpring(spring) => {
            let a = body_a.local_to_world(spring.anchor_a);
            let b = body_b.local_to_world(spring.anchor_b);
            drawer.draw_dot(5.0, a, color);
            drawer.draw_dot(5.0, b, color);

            let delta = b - a;
            let side = delta.perp().normalize_or_zero() * 0.25;
            let mut previous = a;
            for i in 1..=SPRING_COILS {
                let t = i as Scalar / SPRING_COILS as Scalar;
                let offset = match i {
                    _ if i == SPRING_COILS => Vector::ZERO,
                    _ if i % 2 == 0 => -side,
                    _ => side,
                };
                let next = a + delta * t + offset;
                drawer.draw_segment(previous, next, color);
                previous = next;
            }
        }
        // Purely angular constraints have nothing meaningful to draw.
        ConstraintKind::DampedRotarySpring(_)
        | ConstraintKind::RotaryLimit(_)
        | ConstraintKind::Ratchet(_)
        | ConstraintKind::Gear(_)
        | ConstraintKind::SimpleMotor(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[derive(Default)]
    struct Recorder {
        circles: Vec<Vector>,
        segments: usize,
        fat_segments: usize,
        polygons: Vec<usize>,
        dots: usize,
        fills: Vec<DebugColor>,
    }

    impl DebugDraw for Recorder {
        fn draw_circle(&mut self, center: Vector, _: Scalar, _: Scalar, _: DebugColor, fill: DebugColor) {
            self.circles.push(center);
            self.fills.push(fill);
        }

        fn draw_segment(&mut self, _: Vector, _: Vector, _: DebugColor) {
            self.segments += 1;
        }

        fn draw_fat_segment(&mut self, _: Vector, _: Vector, _: Scalar, _: DebugColor, fill: DebugColor) {
            self.fat_segments += 1;
            self.fills.push(fill);
        }

        fn draw_polygon(&mut self, vertices: &[Vector], _: Scalar, _: DebugColor, fill: DebugColor) {
            self.polygons.push(vertices.len());
            self.fills.push(fill);
        }

        fn draw_dot(&mut self, _: Scalar, _: Vector, _: DebugColor) {
            self.dots += 1;
        }
    }

    fn scene() -> Space {
        let mut space = Space::new();
        let ground = space.static_body();
        space
            .add_shape(ground, Shape::segment(Vector::new(-5.0, 0.0), Vector::new(5.0, 0.0), 0.0).unwrap())
            .unwrap();

        let a = space
            .add_body(Body::dynamic(1.0, 1.0).with_position(Vector::new(0.0, 3.0)))
            .unwrap();
        space.add_shape(a, Shape::circle(0.5, Vector::ZERO).unwrap()).unwrap();

        let b = space
            .add_body(Body::dynamic(1.0, 1.0).with_position(Vector::new(2.0, 3.0)))
            .unwrap();
        space.add_shape(b, Shape::box_shape(1.0, 1.0, 0.0).unwrap()).unwrap();

        space
            .add_constraint(Constraint::pin(a, b, Vector::ZERO, Vector::ZERO))
            .unwrap();
        space
    }

    #[test]
    fn draws_shapes_and_constraints() {
        let space = scene();
        let mut recorder = Recorder::default();
        space.debug_draw(&DebugDrawOptions::default(), &mut recorder);

        assert_eq!(recorder.circles, [Vector::new(0.0, 3.0)]);
        assert_eq!(recorder.fat_segments, 1);
        assert_eq!(recorder.polygons, [4]);
        assert_eq!(recorder.dots, 2);
        assert_eq!(recorder.segments, 1);
    }

    #[test]
    fn flags_select_what_is_drawn() {
        let space = scene();
        let mut recorder = Recorder::default();
        let options = DebugDrawOptions {
            flags: DebugDrawFlags::CONSTRAINTS,
            ..Default::default()
        };
        space.debug_draw(&options, &mut recorder);

        assert!(recorder.circles.is_empty());
        assert!(recorder.polygons.is_empty());
        assert_eq!(recorder.dots, 2);
    }

    #[test]
    fn drawer_can_pick_shape_colors() {
        struct Red(Recorder);

        impl DebugDraw for Red {
            fn draw_circle(&mut self, c: Vector, a: Scalar, r: Scalar, o: DebugColor, f: DebugColor) {
                self.0.draw_circle(c, a, r, o, f);
            }
            fn draw_segment(&mut self, a: Vector, b: Vector, c: DebugColor) {
                self.0.draw_segment(a, b, c);
            }
            fn draw_fat_segment(&mut self, a: Vector, b: Vector, r: Scalar, o: DebugColor, f: DebugColor) {
                self.0.draw_fat_segment(a, b, r, o, f);
            }
            fn draw_polygon(&mut self, v: &[Vector], r: Scalar, o: DebugColor, f: DebugColor) {
                self.0.draw_polygon(v, r, o, f);
            }
            fn draw_dot(&mut self, s: Scalar, p: Vector, c: DebugColor) {
                self.0.draw_dot(s, p, c);
            }
            fn color_for_shape(&mut self, shape: &Shape, _: &Body) -> Option<DebugColor> {
                matches!(shape.kind(), ShapeKind::Circle(_)).then_some(DebugColor::rgb(1.0, 0.0, 0.0))
            }
        }

        let space = scene();
        let mut red = Red(Recorder::default());
        let options = DebugDrawOptions {
            flags: DebugDrawFlags::SHAPES,
            ..Default::default()
        };
        space.debug_draw(&options, &mut red);

        assert_eq!(red.0.fills.len(), 3);
        assert!(red.0.fills.contains(&DebugColor::rgb(1.0, 0.0, 0.0)));
        assert!(red.0.fills.contains(&options.shape_color));
    }
}
