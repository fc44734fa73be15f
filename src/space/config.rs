use crate::{collision::broad_phase::BroadPhaseKind, math::*};

/// The simulation parameters of a [`Space`](super::Space).
///
/// Every field can also be read and changed through the getters and setters of the space.
///
/// ```
/// use rigid2d::prelude::*;
///
/// let config = SpaceConfig {
///     gravity: Vector::new(0.0, -9.81),
///     iterations: 20,
///     ..Default::default()
/// };
/// let space = Space::with_config(config);
/// assert_eq!(space.iterations(), 20);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SpaceConfig {
    /// The number of solver iterations per step. More iterations make stacks and chains
    /// of constraints stiffer at a higher cost.
    pub iterations: usize,
    /// The gravity applied to every dynamic body.
    pub gravity: Vector,
    /// The fraction of velocity that bodies keep after one second.
    /// `1.0` means no damping, `0.9` means that 10% of the velocity is lost per second.
    pub damping: Scalar,
    /// The speed below which a body is considered idle. When zero, the speed gained
    /// from gravity in a single step is used instead.
    pub idle_speed_threshold: Scalar,
    /// How long a group of bodies must be idle before it falls asleep.
    /// Sleeping is disabled when this is infinite.
    pub sleep_time_threshold: Scalar,
    /// The amount of overlap allowed between shapes. Some overlap keeps contacts stable.
    pub collision_slop: Scalar,
    /// The fraction of overlap left uncorrected after one second.
    pub collision_bias: Scalar,
    /// The number of steps an arbiter is kept after its shapes stop touching.
    pub collision_persistence: u64,
    /// The number of threads used for the narrow phase. Only used with the `parallel` feature.
    pub threads: usize,
    /// The spatial index used for the broad phase.
    pub broad_phase: BroadPhaseKind,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            gravity: Vector::ZERO,
            damping: 1.0,
            idle_speed_threshold: 0.0,
            sleep_time_threshold: Scalar::INFINITY,
            collision_slop: 0.1,
            collision_bias: (1.0 as Scalar - 0.1).powi(60),
            collision_persistence: 3,
            threads: 1,
            broad_phase: BroadPhaseKind::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_collision_bias_corrects_ten_percent_per_step() {
        let config = SpaceConfig::default();
        let dt = 1.0 / 60.0;
        assert_relative_eq!(1.0 - config.collision_bias.powf(dt), 0.1, epsilon = 1e-9);
        assert!(config.sleep_time_threshold.is_infinite());
    }
}
