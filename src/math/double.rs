#![allow(unused)] // Clippy doesn't like when the `f64` feature is disabled

use bevy_math::*;

pub type Vector = DVec2;

pub type Matrix2 = DMat2;

pub type Scalar = f64;

pub const PI: Scalar = core::f64::consts::PI;
