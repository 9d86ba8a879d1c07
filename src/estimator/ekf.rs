//! Extended Kalman Filter for 3-DoF differential-drive pose estimation.
//!
//! State vector is the pose (x, y, θ); the input is a robot-frame
//! displacement produced by the displacement model. Heading corrections come
//! from an intermittent absolute-orientation measurement.
//!
//! # Algorithm
//!
//! Prediction propagates the pose through the nonlinear motion model
//! `x_k = x_{k-1} ⊕ u_k` and the covariance through its Jacobians:
//!
//! ```text
//! F = | 1  0  -d·sinθ - l·cosθ |     W = | cosθ  -sinθ  0 |
//!     | 0  1   d·cosθ - l·sinθ |         | sinθ   cosθ  0 |
//!     | 0  0   1               |         | 0      0     1 |
//!
//! P⁻ = F·P·Fᵀ + W·Q·Wᵀ
//! ```
//!
//! where (d, l) is the displacement and θ the heading *before* the step
//! (the linearization point of the model). The update is the standard
//! scalar correction for H = [0, 0, 1]:
//!
//! ```text
//! ν = normalize(z - θ̂)      S = Pθθ + R      K = P·Hᵀ / S
//! x = x̂ + K·ν               P = (I - K·H)·P
//! ```
//!
//! # Lifecycle
//!
//! The filter starts **NotReady**: predict and update fail until a reset
//! seeds the state from an external reference pose. After that it tracks
//! indefinitely; every step re-normalizes the heading into (-π, π] and
//! re-symmetrizes the covariance.

use crate::core::math::{angle_diff, normalize_angle};
use crate::core::types::{Covariance2D, Pose2D};
use crate::error::{EstimatorError, Result};

/// Innovation covariance below this is treated as singular.
const INNOVATION_FLOOR: f32 = 1e-10;

/// Fixed diagonal process noise Qk, one variance per displacement component.
///
/// Configuration constants; never mutated at runtime.
#[derive(Debug, Clone, Copy)]
pub struct ProcessNoise {
    /// Variance of the forward displacement component (m²)
    pub forward_var: f32,
    /// Variance of the lateral displacement component (m²)
    pub lateral_var: f32,
    /// Variance of the rotation component (rad²)
    pub heading_var: f32,
}

impl Default for ProcessNoise {
    fn default() -> Self {
        Self {
            forward_var: 0.01 * 0.01,
            lateral_var: 0.001 * 0.001,
            heading_var: 0.1_f32.to_radians() * 0.1_f32.to_radians(),
        }
    }
}

/// Measurement noise for the absolute-heading observation.
#[derive(Debug, Clone, Copy)]
pub struct MeasurementNoise {
    /// Heading observation variance Rk (rad²)
    pub heading_var: f32,
}

impl Default for MeasurementNoise {
    fn default() -> Self {
        Self {
            heading_var: 1.0_f32.to_radians() * 1.0_f32.to_radians(),
        }
    }
}

/// One absolute-heading observation: zk with its variance Rk.
///
/// The observation Jacobian H = [0, 0, 1] and the measurement-noise
/// Jacobian V = I are structural and folded into the update arithmetic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingMeasurement {
    /// Observed heading in radians
    pub yaw: f32,
    /// Observation variance in rad²
    pub variance: f32,
}

/// Configuration for the pose EKF.
#[derive(Debug, Clone, Copy, Default)]
pub struct EkfConfig {
    /// Process noise injected each prediction
    pub process_noise: ProcessNoise,
    /// Heading measurement noise
    pub measurement_noise: MeasurementNoise,
}

/// Filter lifecycle: no valid state until the first reset.
#[derive(Debug, Clone, Copy)]
enum FilterState {
    /// No reference pose observed yet; predict/update are refused.
    NotReady,
    /// Live estimate.
    Tracking {
        pose: Pose2D,
        covariance: Covariance2D,
    },
}

/// 3-DoF pose EKF with pending-input bookkeeping.
///
/// Owns the state vector and covariance exclusively; callers observe them
/// only through snapshots. The pending flags record whether fresh encoder
/// or heading data arrived since the last cycle, so each completed
/// synchronization triggers exactly one predict and each heading sample
/// exactly one update.
#[derive(Debug)]
pub struct PoseEkf {
    config: EkfConfig,
    state: FilterState,
    /// Set by a completed encoder synchronization, consumed by one predict.
    encoder_pending: bool,
    /// Latest unconsumed heading observation; replaced on arrival.
    heading_pending: Option<HeadingMeasurement>,
}

impl PoseEkf {
    /// Create a filter in the NotReady state.
    pub fn new(config: EkfConfig) -> Self {
        Self {
            config,
            state: FilterState::NotReady,
            encoder_pending: false,
            heading_pending: None,
        }
    }

    /// Whether the filter holds a valid estimate.
    pub fn is_tracking(&self) -> bool {
        matches!(self.state, FilterState::Tracking { .. })
    }

    /// Snapshot of the current pose, if tracking.
    pub fn pose(&self) -> Option<Pose2D> {
        match self.state {
            FilterState::Tracking { pose, .. } => Some(pose),
            FilterState::NotReady => None,
        }
    }

    /// Snapshot of the current covariance, if tracking.
    pub fn covariance(&self) -> Option<Covariance2D> {
        match self.state {
            FilterState::Tracking { covariance, .. } => Some(covariance),
            FilterState::NotReady => None,
        }
    }

    /// The filter configuration.
    pub fn config(&self) -> &EkfConfig {
        &self.config
    }

    /// Flag that a completed encoder synchronization is awaiting a predict.
    pub fn note_encoder_data(&mut self) {
        self.encoder_pending = true;
    }

    /// Consume the encoder-pending flag.
    pub fn take_encoder_pending(&mut self) -> bool {
        std::mem::take(&mut self.encoder_pending)
    }

    /// Store the latest heading observation, replacing any unconsumed one.
    pub fn set_heading_measurement(&mut self, measurement: HeadingMeasurement) {
        self.heading_pending = Some(measurement);
    }

    /// Consume the pending heading observation, if any.
    pub fn take_heading_measurement(&mut self) -> Option<HeadingMeasurement> {
        self.heading_pending.take()
    }

    /// Reinitialize the state wholesale from a reference pose.
    ///
    /// Sets `xk = pose` and `Pk = 0`. Idempotent, valid from any state,
    /// and the only transition out of NotReady.
    pub fn reset(&mut self, pose: Pose2D) {
        self.state = FilterState::Tracking {
            pose,
            covariance: Covariance2D::zero(),
        };
    }

    /// Prediction step: propagate pose and covariance through a robot-frame
    /// displacement `uk` with process noise `qk`.
    ///
    /// Returns the predicted `(pose, covariance)`; the heading of the result
    /// is normalized to (-π, π] and the covariance re-symmetrized.
    pub fn predict(&mut self, uk: Pose2D, qk: &ProcessNoise) -> Result<(Pose2D, Covariance2D)> {
        let FilterState::Tracking { pose, covariance } = self.state else {
            return Err(EstimatorError::NotReady);
        };

        // Linearize at the prior heading: the motion model rotates the
        // displacement by θ_{k-1}.
        let (sin_t, cos_t) = pose.theta.sin_cos();
        let dx = uk.x;
        let dy = uk.y;

        let predicted = pose.compose(&uk);

        // F deviates from identity only in its last column.
        let f02 = -dx * sin_t - dy * cos_t;
        let f12 = dx * cos_t - dy * sin_t;

        let p = covariance.as_slice();

        // P * F^T
        // F^T = | 1    0    0 |
        //       | 0    1    0 |
        //       | f02  f12  1 |
        let pft00 = p[0] + p[2] * f02;
        let pft01 = p[1] + p[2] * f12;
        let pft02 = p[2];
        let pft10 = p[3] + p[5] * f02;
        let pft11 = p[4] + p[5] * f12;
        let pft12 = p[5];
        let pft20 = p[6] + p[8] * f02;
        let pft21 = p[7] + p[8] * f12;
        let pft22 = p[8];

        // F * (P * F^T)
        let fpf = [
            pft00 + f02 * pft20,
            pft01 + f02 * pft21,
            pft02 + f02 * pft22,
            pft10 + f12 * pft20,
            pft11 + f12 * pft21,
            pft12 + f12 * pft22,
            pft20,
            pft21,
            pft22,
        ];

        // W * Q * W^T for diagonal Q: the rotation mixes the forward and
        // lateral variances into the position block, heading passes through.
        let (qf, ql, qt) = (qk.forward_var, qk.lateral_var, qk.heading_var);
        let w00 = qf * cos_t * cos_t + ql * sin_t * sin_t;
        let w01 = (qf - ql) * sin_t * cos_t;
        let w11 = qf * sin_t * sin_t + ql * cos_t * cos_t;

        let predicted_cov = Covariance2D::from_array([
            fpf[0] + w00,
            fpf[1] + w01,
            fpf[2],
            fpf[3] + w01,
            fpf[4] + w11,
            fpf[5],
            fpf[6],
            fpf[7],
            fpf[8] + qt,
        ])
        .symmetrized();

        self.state = FilterState::Tracking {
            pose: predicted,
            covariance: predicted_cov,
        };
        Ok((predicted, predicted_cov))
    }

    /// Update step: correct the state with an absolute-heading observation.
    ///
    /// The innovation is the shortest arc from the predicted heading to the
    /// measurement, so corrections across the ±π seam stay small. On a
    /// singular innovation covariance the predicted state is left intact and
    /// [`EstimatorError::SingularInnovationCovariance`] is returned; the
    /// caller skips the update rather than propagating a degenerate gain.
    pub fn update_heading(
        &mut self,
        measurement: &HeadingMeasurement,
    ) -> Result<(Pose2D, Covariance2D)> {
        let FilterState::Tracking { pose, covariance } = self.state else {
            return Err(EstimatorError::NotReady);
        };

        let innovation = angle_diff(pose.theta, measurement.yaw);

        // S = H·P·Hᵀ + V·R·Vᵀ collapses to a scalar for H = [0, 0, 1].
        let p = covariance.as_slice();
        let s = p[8] + measurement.variance;
        if s.abs() < INNOVATION_FLOOR {
            return Err(EstimatorError::SingularInnovationCovariance { s });
        }

        // K = P·Hᵀ/S is the θ column of P scaled by 1/S.
        let k0 = p[2] / s;
        let k1 = p[5] / s;
        let k2 = p[8] / s;

        let corrected = Pose2D {
            x: pose.x + k0 * innovation,
            y: pose.y + k1 * innovation,
            theta: normalize_angle(pose.theta + k2 * innovation),
        };

        // P = (I - K·H)·P subtracts K-scaled copies of the θ row.
        let corrected_cov = Covariance2D::from_array([
            p[0] - k0 * p[6],
            p[1] - k0 * p[7],
            p[2] - k0 * p[8],
            p[3] - k1 * p[6],
            p[4] - k1 * p[7],
            p[5] - k1 * p[8],
            (1.0 - k2) * p[6],
            (1.0 - k2) * p[7],
            (1.0 - k2) * p[8],
        ])
        .symmetrized();

        self.state = FilterState::Tracking {
            pose: corrected,
            covariance: corrected_cov,
        };
        Ok((corrected, corrected_cov))
    }
}
