//! GB Shooper wire protocol.
//!
//! Every request and response is a 2-byte packet `{type, payload}`. Bulk data
//! (cartridge title, 256-byte chunks) travels as raw bytes outside the packet
//! envelope and is followed by a checksum packet.

use std::fmt;
use std::time::Duration;

/// Identity byte returned as the first reply to an INFO request.
pub const DEVICE_ID: u8 = 0x17;

/// Size of one data chunk, in both directions.
pub const CHUNK_SIZE: usize = 256;

/// Number of title packets following the three header code packets.
pub const TITLE_LEN: usize = 16;

pub const STAT_OK: u8 = 0x14;
pub const STAT_ERROR: u8 = 0xEE;
pub const STAT_TIMEOUT: u8 = 0xAA;

/// Ack payload the firmware sends when a host-reported read checksum does
/// not match its own.
pub const CHECKSUM_FAIL: u8 = Command::End as u8;

pub const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(3);
pub const ERASE_TIMEOUT: Duration = Duration::from_secs(60);
pub const SEND_DELAY: Duration = Duration::from_micros(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Command,
    Data,
    Status,
    Info,
    /// Type byte outside the four known values. Kept as-is; replies are
    /// decoded by payload only.
    Other(u8),
}

impl PacketKind {
    pub fn as_byte(self) -> u8 {
        match self {
            PacketKind::Command => 0x11,
            PacketKind::Data => 0x22,
            PacketKind::Status => 0x33,
            PacketKind::Info => 0x44,
            PacketKind::Other(b) => b,
        }
    }
}

impl From<u8> for PacketKind {
    fn from(b: u8) -> Self {
        match b {
            0x11 => PacketKind::Command,
            0x22 => PacketKind::Data,
            0x33 => PacketKind::Status,
            0x44 => PacketKind::Info,
            other => PacketKind::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Identify = 0x01,
    ReadHeader = 0x02,
    EraseFlash = 0x03,
    ProgramFlashChunk = 0x04,
    ReadFlashChunk = 0x05,
    ProgramRamChunk = 0x06,
    ReadRamChunk = 0x07,
    EraseRam = 0x08,
    End = 0xFF,
}

impl Command {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x01 => Command::Identify,
            0x02 => Command::ReadHeader,
            0x03 => Command::EraseFlash,
            0x04 => Command::ProgramFlashChunk,
            0x05 => Command::ReadFlashChunk,
            0x06 => Command::ProgramRamChunk,
            0x07 => Command::ReadRamChunk,
            0x08 => Command::EraseRam,
            0xFF => Command::End,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub kind: PacketKind,
    pub payload: u8,
}

impl Packet {
    pub fn new(kind: PacketKind, payload: u8) -> Self {
        Self { kind, payload }
    }

    pub fn command(cmd: Command) -> Self {
        Self::new(PacketKind::Command, cmd.code())
    }

    pub fn data(payload: u8) -> Self {
        Self::new(PacketKind::Data, payload)
    }

    pub fn info(payload: u8) -> Self {
        Self::new(PacketKind::Info, payload)
    }

    pub fn status(payload: u8) -> Self {
        Self::new(PacketKind::Status, payload)
    }

    pub fn to_bytes(self) -> [u8; 2] {
        [self.kind.as_byte(), self.payload]
    }

    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self::new(PacketKind::from(bytes[0]), bytes[1])
    }
}

/// Status byte as reported by the firmware after an erase or program request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Ok,
    Error,
    Timeout,
    Unknown(u8),
}

impl From<u8> for DeviceStatus {
    fn from(b: u8) -> Self {
        match b {
            STAT_OK => DeviceStatus::Ok,
            STAT_ERROR => DeviceStatus::Error,
            STAT_TIMEOUT => DeviceStatus::Timeout,
            other => DeviceStatus::Unknown(other),
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceStatus::Ok => f.write_str("ok"),
            DeviceStatus::Error => f.write_str("error (0xEE)"),
            DeviceStatus::Timeout => f.write_str("device timeout (0xAA)"),
            DeviceStatus::Unknown(b) => write!(f, "unexpected status 0x{b:02X}"),
        }
    }
}

/// 8-bit wraparound sum, used for every chunk in both directions.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}
