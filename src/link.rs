//! Byte and packet level link to one flasher.
//!
//! The firmware services its UART from a fixed-latency poll loop and drops
//! bytes that arrive faster than it can handle, so single bytes are paced.
//! Chunk payloads go out as one unpaced bulk write because the firmware reads
//! them into a dedicated buffer.

use std::io;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::protocol::{Packet, SEND_DELAY};

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("no GB Shooper device found")]
    NoDevice,

    #[error("serial port enumeration failed: {0}")]
    Enumerate(#[source] serialport::Error),

    #[error("unable to open serial port '{port}': {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("link write failed: {0}")]
    Write(#[source] io::Error),

    #[error("link read failed: {0}")]
    Read(#[source] io::Error),

    #[error("timed out waiting for device")]
    Timeout,
}

/// Raw byte pipe to the device.
pub trait Transport {
    /// Write every byte of `data`.
    fn write_all(&mut self, data: &[u8]) -> Result<(), LinkError>;

    /// Wait at most `wait` for a single byte.
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    fn read_byte(&mut self, wait: Duration) -> Result<Option<u8>, LinkError>;

    /// Drop whatever is sitting in the input buffer.
    fn clear_input(&mut self) -> Result<(), LinkError>;
}

/// Opens a fresh transport to the flasher. Called once per operation.
pub trait Connector {
    type Transport: Transport;

    fn connect(&self) -> Result<Self::Transport, LinkError>;
}

#[derive(Debug, Clone)]
pub struct LinkOptions {
    pub baud_rate: u32,
    /// Pause after every paced byte.
    pub send_delay: Duration,
    /// Longest single blocking read while waiting for a deadline.
    pub poll_interval: Duration,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            baud_rate: 230_400,
            send_delay: SEND_DELAY,
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// An open link, owned by exactly one operation.
pub struct DeviceLink<T: Transport> {
    transport: T,
    send_delay: Duration,
    poll_interval: Duration,
}

impl<T: Transport> DeviceLink<T> {
    pub fn new(transport: T, opts: &LinkOptions) -> Self {
        Self {
            transport,
            send_delay: opts.send_delay,
            poll_interval: opts.poll_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn close(self) {
        drop(self);
    }

    pub fn send_byte(&mut self, b: u8) -> Result<(), LinkError> {
        self.transport.write_all(&[b])?;
        if !self.send_delay.is_zero() {
            std::thread::sleep(self.send_delay);
        }
        Ok(())
    }

    pub fn send_packet(&mut self, packet: Packet) -> Result<(), LinkError> {
        tracing::trace!(kind = ?packet.kind, payload = packet.payload, "tx packet");
        let [kind, payload] = packet.to_bytes();
        self.send_byte(kind)?;
        self.send_byte(payload)
    }

    /// Unpaced bulk write.
    pub fn send_buffer(&mut self, data: &[u8]) -> Result<(), LinkError> {
        self.transport.write_all(data)
    }

    pub fn receive_byte(&mut self, timeout: Duration) -> Result<u8, LinkError> {
        self.receive_byte_until(deadline_after(timeout))
    }

    /// Both bytes must arrive before one shared deadline.
    pub fn receive_packet(&mut self, timeout: Duration) -> Result<Packet, LinkError> {
        let deadline = deadline_after(timeout);
        let kind = self.receive_byte_until(deadline)?;
        let payload = self.receive_byte_until(deadline)?;
        let packet = Packet::from_bytes([kind, payload]);
        tracing::trace!(kind = ?packet.kind, payload = packet.payload, "rx packet");
        Ok(packet)
    }

    pub fn purge_read_buffer(&mut self) -> Result<(), LinkError> {
        self.transport.clear_input()
    }

    /// `None` waits without a deadline.
    fn receive_byte_until(&mut self, deadline: Option<Instant>) -> Result<u8, LinkError> {
        loop {
            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(LinkError::Timeout);
                    }
                    (deadline - now).min(self.poll_interval)
                }
                None => self.poll_interval,
            };
            if let Some(b) = self.transport.read_byte(wait)? {
                // A byte that shows up at the deadline is already late.
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return Err(LinkError::Timeout);
                }
                return Ok(b);
            }
        }
    }
}

/// A timeout too large to represent as an instant never expires.
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

impl<T: Transport> Drop for DeviceLink<T> {
    fn drop(&mut self) {
        tracing::debug!("device link closed");
    }
}
