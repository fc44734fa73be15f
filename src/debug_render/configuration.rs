/// An RGBA color with components in the `0.0..=1.0` range.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DebugColor {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl DebugColor {
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    /// Fully transparent.
    pub const NONE: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);

    /// Creates an opaque color.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Creates a color with an alpha channel.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

bitflags::bitflags! {
    /// What gets drawn by [`Space::debug_draw`](crate::space::Space::debug_draw).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
    pub struct DebugDrawFlags: u32 {
        /// Draw the shapes.
        const SHAPES = 1 << 0;
        /// Draw pin, slide, pivot, groove and spring constraints.
        const CONSTRAINTS = 1 << 1;
        /// Draw the contact points of touching shapes.
        const COLLISION_POINTS = 1 << 2;
    }
}

/// Configuration for [`Space::debug_draw`](crate::space::Space::debug_draw).
///
/// ```
/// use rigid2d::prelude::*;
///
/// let options = DebugDrawOptions {
///     flags: DebugDrawFlags::SHAPES,
///     shape_color: DebugColor::rgb(0.2, 0.6, 1.0),
///     ..Default::default()
/// };
/// assert!(!options.flags.contains(DebugDrawFlags::CONSTRAINTS));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DebugDrawOptions {
    /// What to draw.
    pub flags: DebugDrawFlags,
    /// The outline color of shapes.
    pub shape_outline_color: DebugColor,
    /// The fill color of shapes, unless [`DebugDraw::color_for_shape`](super::DebugDraw::color_for_shape)
    /// picks one.
    pub shape_color: DebugColor,
    /// The fill color of shapes attached to sleeping bodies.
    pub sleeping_color: DebugColor,
    /// The color of constraints.
    pub constraint_color: DebugColor,
    /// The color of contact points.
    pub collision_point_color: DebugColor,
}

impl Default for DebugDrawOptions {
    fn default() -> Self {
        Self {
            flags: DebugDrawFlags::all(),
            shape_outline_color: DebugColor::rgb(0.78, 0.82, 0.88),
            shape_color: DebugColor::rgb(0.33, 0.55, 0.8),
            sleeping_color: DebugColor::rgb(0.45, 0.45, 0.45),
            constraint_color: DebugColor::rgb(0.0, 0.75, 0.0),
            collision_point_color: DebugColor::rgb(1.0, 0.0, 0.0),
        }
    }
}
