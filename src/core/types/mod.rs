//! Core data types for pose estimation.
//!
//! - [`Pose2D`]: Robot pose (x, y, theta) in meters and radians
//! - [`Covariance2D`]: 3x3 covariance matrix for pose uncertainty
//! - [`Twist2D`]: 2D body velocity (linear and angular)
//! - [`Timestamped<T>`]: Generic timestamp wrapper

mod odometry;
mod pose;
mod timestamped;

pub use odometry::{Covariance2D, Twist2D};
pub use pose::Pose2D;
pub use timestamped::Timestamped;
