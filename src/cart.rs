//! Lookup tables for flash chips and Game Boy cartridge header codes.
//!
//! Lookups never fail: a code that is not in a table yields a descriptor
//! marked unknown that still carries the raw code.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use serde::Serialize;

const FLASH_PRODUCERS: &[(u8, &str)] = &[
    (0x01, "AMD"),
    (0x02, "AMI"),
    (0xE5, "Analog Devices"),
    (0x1F, "Atmel"),
    (0x31, "Catalyst"),
    (0x34, "Cypress"),
    (0x04, "Fujitsu"),
    (0xE0, "Goldstar"),
    (0x07, "Hitachi"),
    (0xAD, "Hyundai"),
    (0xC1, "Infineon"),
    (0x89, "Intel"),
    (0xD5, "Intg. Silicon Systems"),
    (0xC2, "Macronix"),
    (0x29, "Microchip"),
    (0x2C, "Micron"),
    (0x1C, "Mitsubishi"),
    (0x10, "Nec"),
    (0x15, "Philips Semiconductors"),
    (0xCE, "Samsung"),
    (0x62, "Sanyo"),
    (0x20, "SGS Thomson"),
    (0xB0, "Sharp"),
    (0xBF, "SST"),
    (0x97, "Texas Instruments"),
    (0x98, "Toshiba"),
    (0xDA, "Winbond"),
    (0x19, "Xicor"),
    (0xC9, "Xilinx"),
];

const FLASH_CHIPS: &[(u8, &str)] = &[(0xA4, "29F040B"), (0xAD, "AM29F016")];

const CART_TYPES: &[(u8, &str)] = &[
    (0x00, "ROM ONLY"),
    (0x01, "ROM+MBC1"),
    (0x02, "ROM+MBC1+RAM"),
    (0x03, "ROM+MBC1+RAM+BATT"),
    (0x05, "ROM+MBC2"),
    (0x06, "ROM+MBC2+BATTERY"),
    (0x08, "ROM+RAM"),
    (0x09, "ROM+RAM+BATTERY"),
    (0x0B, "ROM+MMMO1"),
    (0x0C, "ROM+MMMO1+SRAM"),
    (0x0D, "ROM+MMMO1+SRAM+BATT"),
    (0x0F, "ROM+MBC3+TIMER+BATT"),
    (0x10, "ROM+MBC3+TIMER+RAM+BAT"),
    (0x11, "ROM+MBC3"),
    (0x12, "ROM+MBC3+RAM"),
    (0x13, "ROM+MBC3+RAM+BATT"),
    (0x19, "ROM+MBC5"),
    (0x1A, "ROM+MBC5+RAM"),
    (0x1B, "ROM+MBC5+RAM+BATT"),
    (0x1C, "ROM+MBC5+RUMBLE"),
    (0x1D, "ROM+MBC5+RUMBLE+SRAM"),
    (0x1E, "ROM+MBC5+RUMBLE+SRAM+BATT"),
    (0x1F, "Pocket Camera"),
    (0xFD, "Bandai TAMA5"),
    (0xFE, "Hudson HuC-3"),
];

const KB: usize = 1024;

const ROM_SIZES: &[(u8, &str, usize)] = &[
    (0x00, "32KB", 32 * KB),
    (0x01, "64KB", 64 * KB),
    (0x02, "128KB", 128 * KB),
    (0x03, "256KB", 256 * KB),
    (0x04, "512KB", 512 * KB),
    (0x05, "1MB", 1024 * KB),
    (0x06, "2MB", 2048 * KB),
    (0x07, "4MB", 4096 * KB),
    (0x52, "1.1MB", 1152 * KB),
    (0x53, "1.2MB", 1280 * KB),
    (0x54, "1.5MB", 1536 * KB),
];

const RAM_SIZES: &[(u8, &str, usize)] = &[
    (0x00, "0KB", 0),
    (0x01, "2KB", 2 * KB),
    (0x02, "8KB", 8 * KB),
    (0x03, "32KB", 32 * KB),
    (0x04, "128KB", 128 * KB),
];

type NameTable = HashMap<u8, &'static str>;
type SizeTable = HashMap<u8, (&'static str, usize)>;

static PRODUCER_MAP: LazyLock<NameTable> =
    LazyLock::new(|| FLASH_PRODUCERS.iter().copied().collect());
static CHIP_MAP: LazyLock<NameTable> = LazyLock::new(|| FLASH_CHIPS.iter().copied().collect());
static CART_MAP: LazyLock<NameTable> = LazyLock::new(|| CART_TYPES.iter().copied().collect());
static ROM_MAP: LazyLock<SizeTable> = LazyLock::new(|| size_table(ROM_SIZES));
static RAM_MAP: LazyLock<SizeTable> = LazyLock::new(|| size_table(RAM_SIZES));

fn size_table(rows: &[(u8, &'static str, usize)]) -> SizeTable {
    rows.iter()
        .map(|(code, label, bytes)| (*code, (*label, *bytes)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    pub code: u8,
    pub name: String,
    pub known: bool,
}

impl Descriptor {
    fn lookup(table: &NameTable, code: u8, what: &str) -> Self {
        match table.get(&code) {
            Some(name) => Self {
                code,
                name: (*name).to_string(),
                known: true,
            },
            None => Self {
                code,
                name: format!("unknown {what} 0x{code:02X}"),
                known: false,
            },
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// ROM or RAM capacity class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeClass {
    pub code: u8,
    pub label: String,
    /// None for codes missing from the table.
    pub bytes: Option<usize>,
}

impl SizeClass {
    fn lookup(table: &SizeTable, code: u8, what: &str) -> Self {
        match table.get(&code) {
            Some((label, bytes)) => Self {
                code,
                label: (*label).to_string(),
                bytes: Some(*bytes),
            },
            None => Self {
                code,
                label: format!("unknown {what} size 0x{code:02X}"),
                bytes: None,
            },
        }
    }

    pub fn known(&self) -> bool {
        self.bytes.is_some()
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

pub fn flash_producer(code: u8) -> Descriptor {
    Descriptor::lookup(&PRODUCER_MAP, code, "manufacturer")
}

pub fn flash_chip(code: u8) -> Descriptor {
    Descriptor::lookup(&CHIP_MAP, code, "flash chip")
}

pub fn cart_type(code: u8) -> Descriptor {
    Descriptor::lookup(&CART_MAP, code, "cart type")
}

pub fn rom_size(code: u8) -> SizeClass {
    SizeClass::lookup(&ROM_MAP, code, "ROM")
}

pub fn ram_size(code: u8) -> SizeClass {
    SizeClass::lookup(&RAM_MAP, code, "RAM")
}

/// ROM size class code, as found at 0x0148 of a cartridge header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomSize(pub u8);

impl RomSize {
    pub const KB_32: RomSize = RomSize(0x00);

    pub fn class(self) -> SizeClass {
        rom_size(self.0)
    }

    /// Known classes in table order.
    pub fn all() -> impl Iterator<Item = RomSize> {
        ROM_SIZES.iter().map(|(code, _, _)| RomSize(*code))
    }
}

impl Default for RomSize {
    fn default() -> Self {
        Self::KB_32
    }
}

/// RAM size class code, as found at 0x0149 of a cartridge header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamSize(pub u8);

impl RamSize {
    pub const KB_8: RamSize = RamSize(0x02);

    pub fn class(self) -> SizeClass {
        ram_size(self.0)
    }

    pub fn all() -> impl Iterator<Item = RamSize> {
        RAM_SIZES.iter().map(|(code, _, _)| RamSize(*code))
    }
}

impl Default for RamSize {
    fn default() -> Self {
        Self::KB_8
    }
}
