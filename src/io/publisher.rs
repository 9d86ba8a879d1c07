//! UDP publisher for the odometry stream.
//!
//! Sends [`OdometryMessage`]s to a single configured client using the same
//! 4-byte big-endian length-prefixed JSON framing as the inbound feed.
//! Sends are non-blocking and best-effort: a missing or slow client never
//! back-pressures the estimation loop.

use std::net::UdpSocket;
use thiserror::Error;

use crate::io::messages::OdometryMessage;

/// Publisher errors
#[derive(Error, Debug)]
pub enum PublisherError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encode error: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for PublisherError {
    fn from(e: serde_json::Error) -> Self {
        PublisherError::Encode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PublisherError>;

/// Configuration for the odometry publisher.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Destination address for odometry frames (e.g. "127.0.0.1:6021").
    pub target_addr: String,
    /// World frame identifier stamped into every message.
    pub frame_id: String,
    /// Body frame identifier stamped into every message.
    pub child_frame_id: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            target_addr: "127.0.0.1:6021".to_string(),
            frame_id: "world".to_string(),
            child_frame_id: "base_footprint".to_string(),
        }
    }
}

/// UDP unicast publisher for odometry messages.
pub struct OdometryPublisher {
    socket: UdpSocket,
    config: PublisherConfig,
    send_buffer: Vec<u8>,
}

impl OdometryPublisher {
    /// Bind an ephemeral local socket aimed at the configured target.
    pub fn new(config: PublisherConfig) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        log::info!("odometry publisher targeting {}", config.target_addr);

        Ok(Self {
            socket,
            config,
            send_buffer: Vec::with_capacity(1024),
        })
    }

    /// World/body frame identifiers for message construction.
    pub fn frames(&self) -> (&str, &str) {
        (&self.config.frame_id, &self.config.child_frame_id)
    }

    /// Publish one odometry message, best-effort.
    ///
    /// Serialization failures are reported; send failures are traced and
    /// swallowed (UDP is lossy by design here).
    pub fn publish(&mut self, msg: &OdometryMessage) -> Result<()> {
        let payload = serde_json::to_vec(msg)?;

        self.send_buffer.clear();
        self.send_buffer
            .extend_from_slice(&(payload.len() as u32).to_be_bytes());
        self.send_buffer.extend_from_slice(&payload);

        if let Err(e) = self
            .socket
            .send_to(&self.send_buffer, &self.config.target_addr)
        {
            if e.kind() != std::io::ErrorKind::WouldBlock {
                log::trace!("odometry send failed: {}", e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Covariance2D, Pose2D, Twist2D};
    use crate::engine::PoseEstimate;

    fn message() -> OdometryMessage {
        let estimate = PoseEstimate {
            pose: Pose2D::new(1.0, 2.0, 0.5),
            covariance: Covariance2D::diagonal(0.1, 0.1, 0.05),
            twist: Twist2D::new(0.3, 0.0),
            timestamp_us: 7,
        };
        OdometryMessage::from_estimate(&estimate, "world", "base_footprint")
    }

    #[test]
    fn test_publish_and_receive_frame() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(std::time::Duration::from_secs(2)))
            .unwrap();
        let target = receiver.local_addr().unwrap().to_string();

        let config = PublisherConfig {
            target_addr: target,
            ..PublisherConfig::default()
        };
        let mut publisher = OdometryPublisher::new(config).unwrap();
        publisher.publish(&message()).unwrap();

        let mut buf = [0u8; 4096];
        let len = receiver.recv(&mut buf).unwrap();
        assert!(len > 4);

        let declared = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        assert_eq!(declared, len - 4);

        let msg: OdometryMessage = serde_json::from_slice(&buf[4..len]).unwrap();
        assert_eq!(msg.timestamp_us, 7);
        assert_eq!(msg.child_frame_id, "base_footprint");
    }

    #[test]
    fn test_publish_without_listener_is_ok() {
        // Nobody bound at the target: send errors are swallowed
        let config = PublisherConfig {
            target_addr: "127.0.0.1:1".to_string(),
            ..PublisherConfig::default()
        };
        let mut publisher = OdometryPublisher::new(config).unwrap();
        assert!(publisher.publish(&message()).is_ok());
    }
}
