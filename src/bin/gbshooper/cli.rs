use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use gbshooper::cart::{RamSize, RomSize};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BaudArg {
    #[value(name = "115200")]
    B115200,
    #[value(name = "230400")]
    B230400,
    #[value(name = "1000000")]
    B1000000,
}

#[derive(Parser)]
#[command(name = "gbshooper")]
#[command(about = "GB Shooper Game Boy cartridge flasher")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check the flasher hardware and firmware version.
    Status(QueryArgs),

    /// Identify the flash chip on the inserted cartridge.
    Id(QueryArgs),

    /// Read the cartridge header: title, mapper and ROM/RAM sizes.
    Header(QueryArgs),

    /// Erase the whole flash chip.
    EraseFlash(QueryArgs),

    /// Clear the save RAM with zeros.
    EraseRam(EraseRamArgs),

    /// Read the flash chip into a file.
    ReadFlash(ReadFlashArgs),

    /// Program the flash chip from a file.
    WriteFlash(WriteArgs),

    /// Read the save RAM into a file.
    ReadRam(ReadRamArgs),

    /// Write the save RAM from a file.
    WriteRam(WriteArgs),

    /// List connected flashers.
    List(ListArgs),
}

#[derive(Parser, Clone)]
pub struct LinkArgs {
    /// Serial baud rate; must match the firmware build.
    #[arg(long, value_enum, default_value_t = BaudArg::B230400)]
    pub baud: BaudArg,

    /// Max time to wait for a reply or a chunk byte.
    #[arg(long, default_value_t = 3000)]
    pub timeout_ms: u64,

    /// Max time to wait for an erase to complete.
    #[arg(long, default_value_t = 60000)]
    pub erase_timeout_ms: u64,
}

#[derive(Parser, Clone)]
pub struct OutputArgs {
    /// Emit JSON line events to stdout.
    #[arg(long)]
    pub json: bool,

    /// Reduce output (only results and errors).
    #[arg(long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// More detail on stderr.
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Parser)]
pub struct QueryArgs {
    #[command(flatten)]
    pub link: LinkArgs,

    #[command(flatten)]
    pub out: OutputArgs,
}

#[derive(Parser)]
pub struct EraseRamArgs {
    /// RAM size: 1=8KB, 2=32KB, 3=128KB.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub size: u8,

    #[command(flatten)]
    pub link: LinkArgs,

    #[command(flatten)]
    pub out: OutputArgs,
}

#[derive(Parser)]
pub struct ReadFlashArgs {
    /// Destination file.
    pub file: PathBuf,

    /// ROM size: 1=32KB, 2=64KB, 3=128KB, 4=256KB, 5=512KB, 6=1MB, 7=2MB, 8=4MB.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=8))]
    pub size: u8,

    #[command(flatten)]
    pub link: LinkArgs,

    #[command(flatten)]
    pub out: OutputArgs,
}

#[derive(Parser)]
pub struct ReadRamArgs {
    /// Destination file.
    pub file: PathBuf,

    /// RAM size: 1=8KB, 2=32KB, 3=128KB.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub size: u8,

    #[command(flatten)]
    pub link: LinkArgs,

    #[command(flatten)]
    pub out: OutputArgs,
}

#[derive(Parser)]
pub struct WriteArgs {
    /// Source image.
    pub file: PathBuf,

    #[command(flatten)]
    pub link: LinkArgs,

    #[command(flatten)]
    pub out: OutputArgs,
}

#[derive(Parser)]
pub struct ListArgs {
    /// Emit JSON line output.
    #[arg(long)]
    pub json: bool,
}

/// `--size N` for ROM reads. Sizes 1..=8 are header codes 0x00..=0x07.
pub fn rom_size(n: u8) -> RomSize {
    RomSize(n.saturating_sub(1))
}

/// `--size N` for RAM reads and erases.
pub fn ram_size(n: u8) -> RamSize {
    match n {
        2 => RamSize(0x03),
        3 => RamSize(0x04),
        _ => RamSize::KB_8,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn size_selectors_map_to_header_codes() {
        assert_eq!(rom_size(1), RomSize::KB_32);
        assert_eq!(rom_size(8).class().label, "4MB");
        assert_eq!(ram_size(1).class().label, "8KB");
        assert_eq!(ram_size(2).class().label, "32KB");
        assert_eq!(ram_size(3).class().label, "128KB");
    }

    #[test]
    fn read_flash_defaults() {
        let cli = Cli::try_parse_from(["gbshooper", "read-flash", "dump.gb"]).unwrap();
        let Command::ReadFlash(args) = cli.command else {
            panic!("wrong subcommand");
        };
        assert_eq!(args.size, 1);
        assert_eq!(args.link.baud, BaudArg::B230400);
        assert_eq!(args.link.timeout_ms, 3000);
        assert!(!args.out.json);
    }

    #[test]
    fn out_of_range_size_is_rejected() {
        assert!(Cli::try_parse_from(["gbshooper", "read-ram", "--size", "4", "x.sav"]).is_err());
        assert!(Cli::try_parse_from(["gbshooper", "read-flash", "--size", "0", "x.gb"]).is_err());
    }
}
