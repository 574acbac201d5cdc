//! Host-side driver for the GB Shooper Game Boy cartridge flasher.
//!
//! [`api::Flasher`] runs one hardware operation per call over a fresh
//! [`link::DeviceLink`]; [`runner::spawn`] moves any of them onto a worker
//! thread and streams progress back over a channel.

pub mod api;
pub mod cart;
pub mod image;
pub mod link;
pub mod operation;
pub mod protocol;
pub mod runner;
pub mod serial;

#[cfg(test)]
pub(crate) mod testing;
