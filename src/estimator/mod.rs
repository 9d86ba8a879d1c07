//! Estimation layer: the pose EKF and its reset controller
//! (depends on core).

mod ekf;
mod reset;

pub use ekf::{EkfConfig, HeadingMeasurement, MeasurementNoise, PoseEkf, ProcessNoise};
pub use reset::{PoseResetController, ResetConfig};
