//! Sensor processing layer: encoder synchronization and the displacement
//! model (depends on core).

mod displacement;
mod encoder;

pub use displacement::{DisplacementConfig, DisplacementModel};
pub use encoder::{EncoderReading, EncoderSynchronizer, SynchronizedVelocity, WheelSide};
