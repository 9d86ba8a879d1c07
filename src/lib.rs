//! GatiOdom - EKF odometry for differential-drive robots
//!
//! Fuses two asynchronous wheel-encoder streams with an intermittent
//! absolute-heading measurement into a 2-D pose (x, y, heading) and pose
//! covariance, using an Extended Kalman Filter over a kinematic
//! displacement motion model.
//!
//! # Architecture
//!
//! The crate is organized into 5 logical layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      bin/                           │  ← Daemon
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Infrastructure
//! │           (messages, receiver, publisher)           │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │               (estimation pipeline)                 │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  estimator/                         │  ← Filtering
//! │               (pose EKF, reset)                     │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   sensors/                          │  ← Sensor processing
//! │         (encoder sync, displacement model)          │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                 (types, math)                       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Data Flow
//!
//! Raw encoder samples land in the per-wheel sample store; once both wheels
//! have reported, the synchronizer emits one merged velocity pair. The
//! displacement model turns the pair held from the previous merge plus the
//! elapsed wall-clock interval into a robot-frame displacement and its
//! process noise, which drives the EKF prediction. When an absolute-heading
//! measurement is pending, the update step corrects the heading. The
//! resulting pose, 3×3 covariance, and measured twist are handed to the
//! publisher. A periodic reset controller re-anchors the filter from the
//! latest external reference pose — also the only way the filter leaves its
//! initial NotReady state.

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: Sensor processing (depends on core)
// ============================================================================
pub mod sensors;

// ============================================================================
// Layer 3: Estimation (depends on core, sensors)
// ============================================================================
pub mod estimator;

// ============================================================================
// Layer 4: Orchestration (depends on core, sensors, estimator)
// ============================================================================
pub mod engine;

// ============================================================================
// Layer 5: I/O infrastructure (depends on all layers)
// ============================================================================
pub mod io;

pub mod error;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use crate::core::math;
pub use crate::core::types::{Covariance2D, Pose2D, Timestamped, Twist2D};

// Errors
pub use error::{EstimatorError, Result};

// Sensors
pub use sensors::{
    DisplacementConfig, DisplacementModel, EncoderReading, EncoderSynchronizer,
    SynchronizedVelocity, WheelSide,
};

// Estimator
pub use estimator::{
    EkfConfig, HeadingMeasurement, MeasurementNoise, PoseEkf, PoseResetController, ProcessNoise,
    ResetConfig,
};

// Engine
pub use engine::{EstimatorPipeline, PipelineConfig, PoseEstimate};

// I/O
pub use io::{
    OdometryMessage, OdometryPublisher, PublisherConfig, ReceiverConfig, SensorEvent,
    SensorReceiver,
};
