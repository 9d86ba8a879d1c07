//! Wheel encoder sample store and synchronizer.
//!
//! The left and right encoder streams arrive independently, each on its own
//! clock. The synchronizer holds the latest reading per wheel and emits one
//! merged velocity pair as soon as both wheels have reported since the last
//! emission. Stored readings are consumed by the merge, so each completed
//! (left, right) pair produces exactly one event regardless of arrival order.
//!
//! Readings never expire: a stalled wheel stream blocks all future
//! synchronization until that wheel reports again. This is an
//! at-most-one-merge-per-arrival policy, not a timeout-based one.
//!
//! The synchronization timestamp is the wall-clock time at which the merge
//! happens (`now_us`, injected by the caller), not an average of the sensor
//! stamps. Under scheduling jitter this can misattribute elapsed time; the
//! trade is a simple, race-free merge point.

use serde::{Deserialize, Serialize};

/// Which wheel an encoder sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WheelSide {
    /// Left drive wheel
    Left,
    /// Right drive wheel
    Right,
}

/// Latest sample from one wheel encoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncoderReading {
    /// Wheel angular position in radians
    pub position: f32,
    /// Wheel angular velocity in rad/s
    pub velocity: f32,
    /// Sensor timestamp in microseconds
    pub timestamp_us: u64,
}

/// Merged left/right angular velocity pair.
///
/// `timestamp_us` is the wall-clock merge time, not a sensor stamp.
/// Read-only to downstream components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynchronizedVelocity {
    /// Left wheel angular velocity in rad/s
    pub left: f32,
    /// Right wheel angular velocity in rad/s
    pub right: f32,
    /// Wall-clock time of synchronization in microseconds
    pub timestamp_us: u64,
}

/// Merges two independently arriving encoder streams.
///
/// # Example
///
/// ```
/// use gati_odom::sensors::{EncoderReading, EncoderSynchronizer, WheelSide};
///
/// let mut sync = EncoderSynchronizer::new();
/// let left = EncoderReading { position: 0.1, velocity: 1.0, timestamp_us: 10 };
/// let right = EncoderReading { position: 0.2, velocity: 1.2, timestamp_us: 12 };
///
/// assert!(sync.ingest(WheelSide::Left, left, 100).is_none());
/// let pair = sync.ingest(WheelSide::Right, right, 110).unwrap();
/// assert_eq!(pair.left, 1.0);
/// assert_eq!(pair.right, 1.2);
/// assert_eq!(pair.timestamp_us, 110);
/// ```
#[derive(Debug, Default)]
pub struct EncoderSynchronizer {
    left: Option<EncoderReading>,
    right: Option<EncoderReading>,
}

impl EncoderSynchronizer {
    /// Create a synchronizer with both wheels unreported.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a reading and merge if both wheels are now fresh.
    ///
    /// Returns `Some(pair)` exactly when this arrival completes a
    /// (left, right) pair; the stored readings are cleared so the next
    /// merge requires a fresh sample from each wheel again. Returns `None`
    /// while the other wheel is still pending.
    pub fn ingest(
        &mut self,
        side: WheelSide,
        reading: EncoderReading,
        now_us: u64,
    ) -> Option<SynchronizedVelocity> {
        match side {
            WheelSide::Left => self.left = Some(reading),
            WheelSide::Right => self.right = Some(reading),
        }

        match (self.left, self.right) {
            (Some(left), Some(right)) => {
                self.left = None;
                self.right = None;
                Some(SynchronizedVelocity {
                    left: left.velocity,
                    right: right.velocity,
                    timestamp_us: now_us,
                })
            }
            _ => None,
        }
    }

    /// Whether a reading is pending for the given wheel.
    pub fn has_pending(&self, side: WheelSide) -> bool {
        match side {
            WheelSide::Left => self.left.is_some(),
            WheelSide::Right => self.right.is_some(),
        }
    }
}
