//! Rigid body dynamics, handling motion and physical interactions,
//! including contacts and joints.

pub mod joints;
pub mod rigid_body;
pub mod sleeping;
pub mod solver;

pub use joints::{Constraint, ConstraintKind};
pub use rigid_body::{Body, BodyType};
