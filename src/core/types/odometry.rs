//! Odometry-related types.

use serde::{Deserialize, Serialize};

/// 3x3 covariance matrix for 2D pose uncertainty (x, y, theta).
///
/// Stored as row-major array: [xx, xy, xt, yx, yy, yt, tx, ty, tt]
/// where t = theta.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Covariance2D {
    /// Row-major 3x3 matrix data
    data: [f32; 9],
}

impl Covariance2D {
    /// Create a zero covariance matrix.
    #[inline]
    pub fn zero() -> Self {
        Self { data: [0.0; 9] }
    }

    /// Create a diagonal covariance matrix.
    ///
    /// Parameters are variances: xx = σ²_x, yy = σ²_y, tt = σ²_θ
    #[inline]
    pub fn diagonal(xx: f32, yy: f32, tt: f32) -> Self {
        Self {
            data: [xx, 0.0, 0.0, 0.0, yy, 0.0, 0.0, 0.0, tt],
        }
    }

    /// Create from row-major array.
    #[inline]
    pub fn from_array(data: [f32; 9]) -> Self {
        Self { data }
    }

    /// Get variance of theta (element [2,2]).
    #[inline]
    pub fn var_theta(&self) -> f32 {
        self.data[8]
    }

    /// Get raw data as slice.
    #[inline]
    pub fn as_slice(&self) -> &[f32; 9] {
        &self.data
    }

    /// Return a symmetrized copy: off-diagonal pairs averaged.
    ///
    /// Applied after every filter step so floating-point drift cannot
    /// accumulate asymmetry across cycles.
    #[inline]
    pub fn symmetrized(&self) -> Self {
        let p = &self.data;
        let xy = 0.5 * (p[1] + p[3]);
        let xt = 0.5 * (p[2] + p[6]);
        let yt = 0.5 * (p[5] + p[7]);
        Self {
            data: [p[0], xy, xt, xy, p[4], yt, xt, yt, p[8]],
        }
    }

    /// Largest absolute difference between mirrored off-diagonal entries.
    #[inline]
    pub fn max_abs_asymmetry(&self) -> f32 {
        let p = &self.data;
        (p[1] - p[3])
            .abs()
            .max((p[2] - p[6]).abs())
            .max((p[5] - p[7]).abs())
    }
}

impl Default for Covariance2D {
    fn default() -> Self {
        Self::zero()
    }
}

/// 2D body velocity: linear (m/s) and angular (rad/s).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist2D {
    /// Forward velocity in m/s
    pub linear: f32,
    /// Angular velocity in rad/s, CCW positive
    pub angular: f32,
}

impl Twist2D {
    /// Create a new twist.
    #[inline]
    pub fn new(linear: f32, angular: f32) -> Self {
        Self { linear, angular }
    }
}
