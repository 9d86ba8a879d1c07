//! I/O infrastructure: wire messages, the UDP sensor receiver, and the
//! UDP odometry publisher (depends on all layers).

pub mod messages;
pub mod publisher;
pub mod receiver;

pub use messages::{OdometryMessage, SensorEvent};
pub use publisher::{OdometryPublisher, PublisherConfig};
pub use receiver::{ReceiverConfig, SensorReceiver};
