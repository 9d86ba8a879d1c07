//! Displacement model for differential drive kinematics.
//!
//! Converts a synchronized wheel-velocity pair and an elapsed interval into
//! a robot-frame displacement (forward distance, zero lateral, rotation)
//! plus the measured body twist.
//!
//! The rotation uses the trigonometric form `atan2(d_l - d_r, wheel_base)`
//! rather than the small-angle ratio `(d_r - d_l) / wheel_base`. The two
//! agree for small per-cycle displacements and diverge for large ones;
//! swapping in the linear ratio changes curvature behavior downstream.

use crate::core::types::{Pose2D, Twist2D};
use crate::error::{EstimatorError, Result};

/// Robot geometry for the displacement model.
#[derive(Debug, Clone, Copy)]
pub struct DisplacementConfig {
    /// Drive wheel radius in meters.
    pub wheel_radius: f32,

    /// Distance between wheel centers in meters.
    pub wheel_base: f32,
}

impl Default for DisplacementConfig {
    fn default() -> Self {
        Self {
            wheel_radius: 0.035,
            wheel_base: 0.235,
        }
    }
}

/// Converts wheel angular velocities into robot-frame displacements.
///
/// # Kinematics
///
/// ```text
/// d_l = v_l * r * Δt          per-wheel travel
/// d_r = v_r * r * Δt
/// d   = (d_l + d_r) / 2       center-point travel
/// Δθ  = atan2(d_l - d_r, wheel_base)
/// ```
///
/// The returned displacement is `(d, 0, Δθ)` in the robot frame at the
/// start of the interval. The twist `(d/Δt, Δθ/Δt)` is derived for the
/// outbound velocity report and is not consumed by the filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplacementModel {
    config: DisplacementConfig,
}

impl DisplacementModel {
    /// Create a model for the given geometry.
    pub fn new(config: DisplacementConfig) -> Self {
        Self { config }
    }

    /// Compute the robot-frame displacement over `delta_t` seconds.
    ///
    /// `delta_t` must be positive; a zero, negative, or NaN interval fails
    /// with [`EstimatorError::InvalidInterval`] and the cycle is skipped.
    pub fn compute(
        &self,
        left_velocity: f32,
        right_velocity: f32,
        delta_t: f32,
    ) -> Result<(Pose2D, Twist2D)> {
        if !(delta_t > 0.0) {
            return Err(EstimatorError::InvalidInterval { delta_t });
        }

        let d_l = left_velocity * self.config.wheel_radius * delta_t;
        let d_r = right_velocity * self.config.wheel_radius * delta_t;
        let d = (d_l + d_r) / 2.0;
        let delta_theta = (d_l - d_r).atan2(self.config.wheel_base);

        let displacement = Pose2D::new(d, 0.0, delta_theta);
        let twist = Twist2D::new(d / delta_t, delta_theta / delta_t);
        Ok((displacement, twist))
    }

    /// The configured geometry.
    pub fn config(&self) -> &DisplacementConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn model() -> DisplacementModel {
        DisplacementModel::new(DisplacementConfig::default())
    }

    #[test]
    fn test_straight_line() {
        // v_l = v_r = 1.0 rad/s over 1s with r = 0.035: each wheel 0.035m
        let (uk, twist) = model().compute(1.0, 1.0, 1.0).unwrap();
        assert_relative_eq!(uk.x, 0.035, epsilon = 1e-7);
        assert_relative_eq!(uk.y, 0.0);
        assert_relative_eq!(uk.theta, 0.0, epsilon = 1e-7);
        assert_relative_eq!(twist.linear, 0.035, epsilon = 1e-7);
        assert_relative_eq!(twist.angular, 0.0, epsilon = 1e-7);
    }

    #[test]
    fn test_rotation_in_place() {
        // Opposite wheel velocities: no net travel, pure rotation
        let (uk, twist) = model().compute(1.0, -1.0, 1.0).unwrap();
        assert_relative_eq!(uk.x, 0.0, epsilon = 1e-7);
        let expected = (2.0f32 * 0.035).atan2(0.235);
        assert_relative_eq!(uk.theta, expected, epsilon = 1e-6);
        assert_relative_eq!(expected, 0.28993, epsilon = 1e-4);
        assert_relative_eq!(twist.angular, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_trigonometric_rotation_not_small_angle() {
        // At large differential travel the atan2 form saturates below the
        // linear ratio; this divergence is intentional model behavior.
        let config = DisplacementConfig {
            wheel_radius: 1.0,
            wheel_base: 1.0,
        };
        let (uk, _) = DisplacementModel::new(config).compute(10.0, -10.0, 1.0).unwrap();
        let linear_ratio = 20.0;
        assert!(uk.theta < linear_ratio);
        assert_relative_eq!(uk.theta, 20.0f32.atan2(1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_arc_scales_with_interval() {
        let (uk_1, twist_1) = model().compute(2.0, 1.0, 0.5).unwrap();
        let (uk_2, _) = model().compute(2.0, 1.0, 1.0).unwrap();
        assert_relative_eq!(uk_2.x, 2.0 * uk_1.x, epsilon = 1e-7);
        // Twist reports the velocity, independent of the window length
        assert_relative_eq!(twist_1.linear, uk_1.x / 0.5, epsilon = 1e-7);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = model().compute(1.0, 1.0, 0.0).unwrap_err();
        assert!(matches!(err, EstimatorError::InvalidInterval { .. }));
    }

    #[test]
    fn test_negative_interval_rejected() {
        let err = model().compute(1.0, 1.0, -0.1).unwrap_err();
        assert!(matches!(
            err,
            EstimatorError::InvalidInterval { delta_t } if delta_t < 0.0
        ));
    }

    #[test]
    fn test_nan_interval_rejected() {
        let err = model().compute(1.0, 1.0, f32::NAN).unwrap_err();
        assert!(matches!(err, EstimatorError::InvalidInterval { .. }));
    }

    #[test]
    fn test_backward_motion() {
        let (uk, twist) = model().compute(-1.0, -1.0, 1.0).unwrap();
        assert_relative_eq!(uk.x, -0.035, epsilon = 1e-7);
        assert_relative_eq!(uk.theta, 0.0, epsilon = 1e-7);
        assert_relative_eq!(twist.linear, -0.035, epsilon = 1e-7);
    }
}
