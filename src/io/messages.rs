//! Wire message types for the sensor feed and the odometry stream.
//!
//! Both directions use 4-byte big-endian length-prefixed JSON frames (see
//! [`crate::io::receiver`] / [`crate::io::publisher`] for the framing).

use serde::{Deserialize, Serialize};

use crate::core::types::Pose2D;
use crate::engine::PoseEstimate;
use crate::sensors::WheelSide;

/// Inbound sample from the transport collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorEvent {
    /// One wheel-encoder sample.
    Encoder {
        /// Which wheel reported
        wheel: WheelSide,
        /// Wheel angular position in radians
        position: f32,
        /// Wheel angular velocity in rad/s
        velocity: f32,
        /// Sensor timestamp in microseconds
        timestamp_us: u64,
    },
    /// Absolute reference pose (position + yaw), e.g. from ground truth.
    ReferencePose {
        /// X position in meters
        x: f32,
        /// Y position in meters
        y: f32,
        /// Heading in radians
        yaw: f32,
        /// Sensor timestamp in microseconds
        timestamp_us: u64,
    },
}

/// Outbound odometry message.
///
/// Pose with heading encoded as a yaw-only quaternion, the pose covariance
/// scattered into a row-major 6×6 (x, y, z, roll, pitch, yaw) layout, and
/// the measured body twist. Mirrors the flat planar convention: only
/// rows/cols {0, 1, 5} carry data, everything else is zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OdometryMessage {
    /// Timestamp in microseconds.
    pub timestamp_us: u64,
    /// World frame identifier.
    pub frame_id: String,
    /// Robot body frame identifier.
    pub child_frame_id: String,
    /// X position in meters.
    pub x: f32,
    /// Y position in meters.
    pub y: f32,
    /// Orientation as quaternion [x, y, z, w] (yaw-only).
    pub orientation: [f32; 4],
    /// Row-major 6×6 pose covariance.
    pub covariance: Vec<f32>,
    /// Forward velocity in m/s.
    pub linear_velocity: f32,
    /// Angular velocity in rad/s.
    pub angular_velocity: f32,
}

impl OdometryMessage {
    /// Build a message from a pipeline estimate.
    pub fn from_estimate(estimate: &PoseEstimate, frame_id: &str, child_frame_id: &str) -> Self {
        Self {
            timestamp_us: estimate.timestamp_us,
            frame_id: frame_id.to_string(),
            child_frame_id: child_frame_id.to_string(),
            x: estimate.pose.x,
            y: estimate.pose.y,
            orientation: yaw_to_quaternion(estimate.pose.theta),
            covariance: scatter_covariance_6x6(estimate.covariance.as_slice()),
            linear_velocity: estimate.twist.linear,
            angular_velocity: estimate.twist.angular,
        }
    }

    /// Recover the yaw angle encoded in `orientation`.
    pub fn yaw(&self) -> f32 {
        // Planar quaternion: yaw = 2·atan2(z, w) up to the double cover
        let yaw = 2.0 * self.orientation[2].atan2(self.orientation[3]);
        crate::core::math::normalize_angle(yaw)
    }

    /// Reference pose carried by this message.
    pub fn pose(&self) -> Pose2D {
        Pose2D::new(self.x, self.y, self.yaw())
    }
}

/// Encode a yaw angle as an [x, y, z, w] quaternion about +Z.
pub fn yaw_to_quaternion(yaw: f32) -> [f32; 4] {
    let half = yaw / 2.0;
    [0.0, 0.0, half.sin(), half.cos()]
}

/// Scatter a row-major 3×3 (x, y, θ) covariance into the row-major 6×6
/// (x, y, z, roll, pitch, yaw) layout with zeros off the planar entries.
pub fn scatter_covariance_6x6(p: &[f32; 9]) -> Vec<f32> {
    // 3x3 index -> 6x6 index for rows/cols {0, 1, 5}
    const MAP: [usize; 3] = [0, 1, 5];
    let mut out = vec![0.0f32; 36];
    for r in 0..3 {
        for c in 0..3 {
            out[MAP[r] * 6 + MAP[c]] = p[r * 3 + c];
        }
    }
    out
}
