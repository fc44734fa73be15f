#![allow(unused)] // Clippy doesn't like when the `f32` feature is disabled

use bevy_math::*;

pub type Vector = Vec2;

pub type Matrix2 = Mat2;

pub type Scalar = f32;

pub const PI: Scalar = core::f32::consts::PI;
