//! UDP receiver for inbound sensor events.
//!
//! Listens on a UDP socket and forwards decoded [`SensorEvent`]s to the
//! estimation loop via a bounded crossbeam channel.
//!
//! # Wire Format
//!
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ JSON SensorEvent         │
//! │ Big-endian u32   │ (variable size)          │
//! └──────────────────┴──────────────────────────┘
//! ```
//!
//! Malformed frames are logged and discarded; the socket stays open. The
//! channel capacity is deliberately small so a slow consumer sheds stale
//! samples instead of buffering them.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::net::UdpSocket;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

use crate::io::messages::SensorEvent;

/// Receiver errors
#[derive(Error, Debug)]
pub enum ReceiverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for ReceiverError {
    fn from(e: serde_json::Error) -> Self {
        ReceiverError::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReceiverError>;

/// Configuration for the UDP receiver.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Address to bind the UDP socket (e.g. "0.0.0.0:6020").
    pub bind_addr: String,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:6020".to_string(),
        }
    }
}

/// Channel capacity for sensor events (small to avoid buffering old data).
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Maximum UDP datagram size.
const MAX_DATAGRAM_SIZE: usize = 2048;

/// Background UDP receiver feeding the estimation loop.
pub struct SensorReceiver {
    handle: JoinHandle<()>,
    running: Arc<AtomicBool>,
}

impl SensorReceiver {
    /// Bind the socket and spawn the receive thread.
    ///
    /// Returns the handle and the consuming end of the event channel.
    pub fn spawn(
        config: ReceiverConfig,
        running: Arc<AtomicBool>,
    ) -> Result<(Self, Receiver<SensorEvent>)> {
        let socket = UdpSocket::bind(&config.bind_addr)?;
        // Periodic wakeups so the thread notices shutdown
        socket.set_read_timeout(Some(Duration::from_millis(100)))?;
        log::info!("sensor receiver bound to {}", config.bind_addr);

        let (tx, rx) = bounded(EVENT_CHANNEL_CAPACITY);
        let thread_running = running.clone();
        let handle = thread::Builder::new()
            .name("sensor-rx".into())
            .spawn(move || receive_loop(socket, tx, thread_running))
            .expect("Failed to spawn sensor receiver thread");

        Ok((Self { handle, running }, rx))
    }

    /// Signal shutdown and wait for the thread to exit.
    pub fn join(self) -> thread::Result<()> {
        self.running.store(false, Ordering::Relaxed);
        self.handle.join()
    }
}

fn receive_loop(socket: UdpSocket, tx: Sender<SensorEvent>, running: Arc<AtomicBool>) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];

    while running.load(Ordering::Relaxed) {
        let len = match socket.recv(&mut buf) {
            Ok(len) => len,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                log::warn!("sensor receive failed: {}", e);
                continue;
            }
        };

        match decode_frame(&buf[..len]) {
            Ok(event) => {
                // try_send: shed load instead of blocking the socket drain
                if tx.try_send(event).is_err() {
                    log::trace!("sensor channel full, dropping event");
                }
            }
            Err(e) => log::warn!("discarding malformed sensor frame: {}", e),
        }
    }

    log::debug!("sensor receiver stopped");
}

/// Decode one length-prefixed JSON frame.
fn decode_frame(frame: &[u8]) -> Result<SensorEvent> {
    if frame.len() < 4 {
        return Err(ReceiverError::Decode(format!(
            "frame too short: {} bytes",
            frame.len()
        )));
    }
    let declared = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    let payload = &frame[4..];
    if declared != payload.len() {
        return Err(ReceiverError::Decode(format!(
            "length prefix {} does not match payload {}",
            declared,
            payload.len()
        )));
    }
    Ok(serde_json::from_slice(payload)?)
}

/// Encode one length-prefixed JSON frame (shared with the publisher side
/// and test harnesses).
pub fn encode_frame<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(value)?;
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}
