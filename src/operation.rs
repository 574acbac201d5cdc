use std::fmt;

use serde::Serialize;

use crate::protocol::Command;

/// Cartridge memory targeted by a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Memory {
    Flash,
    Ram,
}

impl Memory {
    pub fn program_command(self) -> Command {
        match self {
            Memory::Flash => Command::ProgramFlashChunk,
            Memory::Ram => Command::ProgramRamChunk,
        }
    }

    pub fn read_command(self) -> Command {
        match self {
            Memory::Flash => Command::ReadFlashChunk,
            Memory::Ram => Command::ReadRamChunk,
        }
    }

    pub fn pad_byte(self) -> u8 {
        match self {
            Memory::Flash => crate::image::FLASH_PAD,
            Memory::Ram => crate::image::RAM_PAD,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Memory::Flash => "flash",
            Memory::Ram => "RAM",
        }
    }
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Status,
    ChipId,
    ReadHeader,
    EraseFlash,
    EraseRam,
    WriteFlash,
    ReadFlash,
    WriteRam,
    ReadRam,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Status => "status",
            Operation::ChipId => "chip_id",
            Operation::ReadHeader => "read_header",
            Operation::EraseFlash => "erase_flash",
            Operation::EraseRam => "erase_ram",
            Operation::WriteFlash => "write_flash",
            Operation::ReadFlash => "read_flash",
            Operation::WriteRam => "write_ram",
            Operation::ReadRam => "read_ram",
        }
    }

    pub fn write(memory: Memory) -> Self {
        match memory {
            Memory::Flash => Operation::WriteFlash,
            Memory::Ram => Operation::WriteRam,
        }
    }

    pub fn read(memory: Memory) -> Self {
        match memory {
            Memory::Flash => Operation::ReadFlash,
            Memory::Ram => Operation::ReadRam,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationEvent {
    DeviceOpened,
    TransferStart {
        memory: Memory,
        bytes: u64,
        chunks: usize,
    },
    Progress {
        percent: u8,
    },
    TransferDone {
        memory: Memory,
        bytes: u64,
    },
}

/// `floor(100 * done / total)`, clamped to 100.
pub fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (done.saturating_mul(100) / total).min(100) as u8
}
