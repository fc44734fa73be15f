//! # rigid2d
//!
//! **rigid2d** is an impulse-based 2D rigid body physics engine. Bodies are simulated with an
//! iterative sequential impulse solver that keeps contacts between steps, so stacks and piles
//! stay stable with a handful of iterations.
//!
//! ## Features
//!
//! - Dynamic, kinematic and static [bodies](dynamics::rigid_body) with mass properties
//!   computed from their shapes
//! - Circle, segment and convex polygon [shapes](collision::shape), optionally rounded
//! - Persistent contacts with friction, restitution and surface velocity
//! - [Constraints](dynamics::joints): pin, slide, pivot and groove joints, linear and rotary
//!   springs, rotary limits, ratchets, gears and motors
//! - [Collision callbacks](collision::hooks) for pairs of collision types and wildcards
//! - Filtering with groups, categories and masks
//! - [Sleeping](dynamics::sleeping) of idle groups of bodies
//! - [Spatial queries](spatial_query): point, segment, bounding box and shape queries
//! - [Debug drawing](debug_render) through a user-provided set of primitives
//! - A parallel narrow phase with the `parallel` feature
//! - `f32` or `f64` precision
//!
//! ## Getting Started
//!
//! Everything lives in a [`Space`](space::Space). Bodies, shapes and constraints are added to a
//! space, which returns handles to them, and the space is then [stepped](space::Space::step)
//! with a fixed time step.
//!
//! ```
//! use rigid2d::prelude::*;
//!
//! let mut space = Space::new();
//! space.set_gravity(Vector::new(0.0, -100.0));
//!
//! // A static floor.
//! let floor = Shape::segment(Vector::new(-20.0, 5.0), Vector::new(20.0, -5.0), 0.0)?
//!     .with_friction(1.0);
//! space.add_shape(space.static_body(), floor)?;
//!
//! // A ball rolling down the floor.
//! let radius = 5.0;
//! let mass = 1.0;
//! let moment = moment_for_circle(mass, 0.0, radius, Vector::ZERO);
//! let ball = space.add_body(Body::dynamic(mass, moment).with_position(Vector::new(0.0, 15.0)))?;
//! space.add_shape(ball, Shape::circle(radius, Vector::ZERO)?.with_friction(0.7))?;
//!
//! for _ in 0..120 {
//!     space.step(1.0 / 60.0)?;
//! }
//!
//! let ball = space.body(ball)?;
//! assert!(ball.position().x > 0.0);
//! # Ok::<(), PhysicsError>(())
//! ```
//!
//! ## Locking
//!
//! Callbacks run while the space is stepping, and the space is locked for their duration.
//! Adding or removing objects while locked fails with [`PhysicsError::Locked`]; use a
//! [post-step callback](space::Space::add_post_step_callback) instead.
//!
//! ## Logging
//!
//! Diagnostics are emitted with [`tracing`]. Nothing is printed unless a subscriber is installed.

#![allow(clippy::type_complexity)]
#![warn(missing_docs)]

#[cfg(all(feature = "f32", feature = "f64"))]
compile_error!("feature \"f32\" and feature \"f64\" cannot be enabled at the same time");

#[cfg(not(any(feature = "f32", feature = "f64")))]
compile_error!("either feature \"f32\" or feature \"f64\" must be enabled");

pub mod collision;
pub mod data_structures;
pub mod debug_render;
pub mod dynamics;
mod error;
pub mod math;
pub mod space;
pub mod spatial_query;

#[cfg(test)]
mod tests;

pub use error::{PhysicsError, Result};

/// Re-exports common types.
pub mod prelude {
    pub use crate::{
        PhysicsError,
        collision::{
            Arbiter, ArbiterState, CollisionHandler, CollisionType, ContactPoint, ContactPointSet,
            Group, LayerMask, Shape, ShapeFilter, ShapeKind,
            broad_phase::{BroadPhaseKind, SpatialHash, SpatialIndex, SweepAndPrune},
            hooks::{ArbiterFilterFn, ArbiterNotifyFn},
            layers::WILDCARD_COLLISION_TYPE,
            shape::{Circle, Polygon, Segment, convex_hull},
            shapes_collide,
        },
        debug_render::{DebugColor, DebugDraw, DebugDrawFlags, DebugDrawOptions},
        dynamics::{
            joints::*,
            rigid_body::{
                Body, BodyType, PositionUpdateFn, VelocityUpdateFn,
                mass_properties::{
                    MassInfo, area_for_circle, area_for_poly, area_for_segment, centroid_for_poly,
                    moment_for_box, moment_for_circle, moment_for_poly, moment_for_segment,
                },
            },
        },
        math::{BoundingBox, Matrix2, PI, Scalar, Transform, Vector},
        space::{
            ArbiterHandle, BodyHandle, ConstraintHandle, PostStepKey, ShapeHandle, Space,
            SpaceConfig, SpaceId,
        },
        spatial_query::{PointQueryInfo, SegmentQueryInfo},
    };
}
