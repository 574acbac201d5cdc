use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::{
    cart::{self, Descriptor, RamSize, RomSize, SizeClass},
    image::ChunkSource,
    link::{Connector, DeviceLink, LinkError, LinkOptions, Transport},
    operation::{percent, Memory, OperationEvent},
    protocol::{
        checksum, Command, DeviceStatus, Packet, CHECKSUM_FAIL, CHUNK_SIZE, DEVICE_ID,
        ERASE_TIMEOUT, EXCHANGE_TIMEOUT, STAT_OK, TITLE_LEN,
    },
    serial::SerialConnector,
};

#[derive(Debug, Clone)]
pub struct Timeouts {
    /// Deadline for query replies, acks and each byte of a chunk.
    pub exchange: Duration,
    /// Deadline for the single reply to an erase request.
    pub erase: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            exchange: EXCHANGE_TIMEOUT,
            erase: ERASE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlasherOptions {
    pub link: LinkOptions,
    pub timeouts: Timeouts,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DeviceNotFound,
    OpenFailed,
    Timeout,
    ProtocolMismatch,
    BadChecksum,
    HardwareError,
    Io,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::DeviceNotFound => "device_not_found",
            ErrorKind::OpenFailed => "open_failed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ProtocolMismatch => "protocol_mismatch",
            ErrorKind::BadChecksum => "bad_checksum",
            ErrorKind::HardwareError => "hardware_error",
            ErrorKind::Io => "io",
        }
    }
}

#[derive(Error, Debug)]
pub enum OperationError {
    #[error("{0}")]
    Link(#[from] LinkError),

    #[error("unexpected device id 0x{id:02X} (expected 0x17); is this a GB Shooper?")]
    ProtocolMismatch { id: u8 },

    #[error(
        "bad checksum on {memory} chunk {chunk}: sent 0x{sent:02X}, device acked 0x{acked:02X}"
    )]
    WriteChecksum {
        memory: Memory,
        chunk: usize,
        sent: u8,
        acked: u8,
    },

    #[error("bad checksum on {memory} chunk {chunk}: device rejected 0x{sum:02X}")]
    ReadChecksum {
        memory: Memory,
        chunk: usize,
        sum: u8,
    },

    #[error("{action} failed: device reported {status}")]
    Hardware {
        action: &'static str,
        status: DeviceStatus,
    },

    #[error("{}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("reading source: {0}")]
    Source(#[source] io::Error),

    #[error("writing destination: {0}")]
    Sink(#[source] io::Error),

    #[error("source image is empty")]
    EmptyImage,

    #[error("cannot transfer size class {size}")]
    UnsupportedSize { size: SizeClass },

    #[error("unable to start worker thread: {0}")]
    Worker(#[source] io::Error),

    #[error("operation worker stopped without a result")]
    WorkerPanicked,
}

impl OperationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OperationError::Link(e) => match e {
                LinkError::NoDevice => ErrorKind::DeviceNotFound,
                LinkError::Open { .. } => ErrorKind::OpenFailed,
                LinkError::Timeout => ErrorKind::Timeout,
                LinkError::Enumerate(_) | LinkError::Write(_) | LinkError::Read(_) => {
                    ErrorKind::Io
                }
            },
            OperationError::ProtocolMismatch { .. } => ErrorKind::ProtocolMismatch,
            OperationError::WriteChecksum { .. } | OperationError::ReadChecksum { .. } => {
                ErrorKind::BadChecksum
            }
            OperationError::Hardware { .. } => ErrorKind::HardwareError,
            OperationError::File { .. }
            | OperationError::Source(_)
            | OperationError::Sink(_)
            | OperationError::EmptyImage
            | OperationError::UnsupportedSize { .. }
            | OperationError::Worker(_)
            | OperationError::WorkerPanicked => ErrorKind::Io,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub device_id: u8,
    pub major: u8,
    pub minor: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChipId {
    pub manufacturer: Descriptor,
    pub chip: Descriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RomHeader {
    pub title: String,
    pub title_bytes: [u8; TITLE_LEN],
    pub cart: Descriptor,
    pub rom: SizeClass,
    pub ram: SizeClass,
}

impl RomHeader {
    fn decode(cart_code: u8, rom_code: u8, ram_code: u8, title_bytes: [u8; TITLE_LEN]) -> Self {
        // Header titles are uppercase ASCII; Latin-1 keeps any stray byte printable.
        let title: String = title_bytes.iter().map(|b| *b as char).collect();
        let title = title.trim_end_matches('\0').to_string();
        Self {
            title,
            title_bytes,
            cart: cart::cart_type(cart_code),
            rom: cart::rom_size(rom_code),
            ram: cart::ram_size(ram_code),
        }
    }
}

/// Runs hardware operations. Each call opens its own link and closes it
/// before returning; nothing is kept between calls.
pub struct Flasher<C> {
    connector: C,
    opts: FlasherOptions,
}

impl Flasher<SerialConnector> {
    pub fn serial(opts: FlasherOptions) -> Self {
        let connector = SerialConnector::new(opts.link.clone());
        Self::new(connector, opts)
    }
}

impl<C: Connector> Flasher<C> {
    pub fn new(connector: C, opts: FlasherOptions) -> Self {
        Self { connector, opts }
    }

    fn open(&self) -> Result<DeviceLink<C::Transport>, OperationError> {
        let transport = self.connector.connect()?;
        let mut link = DeviceLink::new(transport, &self.opts.link);
        link.purge_read_buffer()?;
        Ok(link)
    }

    #[tracing::instrument(skip(self))]
    pub fn status(&self) -> Result<Status, OperationError> {
        let t = self.opts.timeouts.exchange;
        let mut link = self.open()?;
        link.send_packet(Packet::info(0x00))?;
        let device_id = link.receive_packet(t)?.payload;
        let major = link.receive_packet(t)?.payload;
        let minor = link.receive_packet(t)?.payload;
        link.close();

        if device_id != DEVICE_ID {
            tracing::warn!(device_id, "device answered with a foreign id");
            return Err(OperationError::ProtocolMismatch { id: device_id });
        }
        tracing::info!(major, minor, "flasher status");
        Ok(Status {
            device_id,
            major,
            minor,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn chip_id(&self) -> Result<ChipId, OperationError> {
        let t = self.opts.timeouts.exchange;
        let mut link = self.open()?;
        link.send_packet(Packet::command(Command::Identify))?;
        let manufacturer = link.receive_packet(t)?.payload;
        let chip = link.receive_packet(t)?.payload;
        link.close();

        Ok(ChipId {
            manufacturer: cart::flash_producer(manufacturer),
            chip: cart::flash_chip(chip),
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn read_header(&self) -> Result<RomHeader, OperationError> {
        let t = self.opts.timeouts.exchange;
        let mut link = self.open()?;
        link.send_packet(Packet::command(Command::ReadHeader))?;
        let cart_code = link.receive_packet(t)?.payload;
        let rom_code = link.receive_packet(t)?.payload;
        let ram_code = link.receive_packet(t)?.payload;
        let mut title = [0u8; TITLE_LEN];
        for b in title.iter_mut() {
            *b = link.receive_packet(t)?.payload;
        }
        link.close();

        Ok(RomHeader::decode(cart_code, rom_code, ram_code, title))
    }

    #[tracing::instrument(skip(self))]
    pub fn erase_flash(&self) -> Result<(), OperationError> {
        let mut link = self.open()?;
        link.send_packet(Packet::command(Command::EraseFlash))?;
        self.await_erase(&mut link, "erase flash")?;
        link.close();
        Ok(())
    }

    /// The size code is a hint for the firmware; it is not checked against
    /// the inserted cartridge.
    #[tracing::instrument(skip(self))]
    pub fn erase_ram(&self, size: RamSize) -> Result<(), OperationError> {
        let mut link = self.open()?;
        link.send_packet(Packet::command(Command::EraseRam))?;
        link.send_packet(Packet::data(size.0))?;
        self.await_erase(&mut link, "erase RAM")?;
        link.close();
        Ok(())
    }

    fn await_erase(
        &self,
        link: &mut DeviceLink<C::Transport>,
        action: &'static str,
    ) -> Result<(), OperationError> {
        let reply = link.receive_packet(self.opts.timeouts.erase)?;
        match DeviceStatus::from(reply.payload) {
            DeviceStatus::Ok => {
                tracing::info!("{action} done");
                Ok(())
            }
            status => Err(OperationError::Hardware { action, status }),
        }
    }

    pub fn write_flash<R, F>(&self, source: R, on_event: F) -> Result<u64, OperationError>
    where
        R: Read + Seek,
        F: FnMut(OperationEvent),
    {
        self.write_memory(Memory::Flash, source, on_event)
    }

    pub fn write_ram<R, F>(&self, source: R, on_event: F) -> Result<u64, OperationError>
    where
        R: Read + Seek,
        F: FnMut(OperationEvent),
    {
        self.write_memory(Memory::Ram, source, on_event)
    }

    pub fn read_flash<W, F>(
        &self,
        size: RomSize,
        sink: W,
        on_event: F,
    ) -> Result<u64, OperationError>
    where
        W: Write,
        F: FnMut(OperationEvent),
    {
        let bytes = transfer_bytes(size.class())?;
        self.read_memory(Memory::Flash, bytes, sink, on_event)
    }

    pub fn read_ram<W, F>(&self, size: RamSize, sink: W, on_event: F) -> Result<u64, OperationError>
    where
        W: Write,
        F: FnMut(OperationEvent),
    {
        let bytes = transfer_bytes(size.class())?;
        self.read_memory(Memory::Ram, bytes, sink, on_event)
    }

    pub fn write_flash_file<F>(&self, path: &Path, on_event: F) -> Result<u64, OperationError>
    where
        F: FnMut(OperationEvent),
    {
        self.write_memory(Memory::Flash, open_source(path)?, on_event)
    }

    pub fn write_ram_file<F>(&self, path: &Path, on_event: F) -> Result<u64, OperationError>
    where
        F: FnMut(OperationEvent),
    {
        self.write_memory(Memory::Ram, open_source(path)?, on_event)
    }

    pub fn read_flash_file<F>(
        &self,
        path: &Path,
        size: RomSize,
        on_event: F,
    ) -> Result<u64, OperationError>
    where
        F: FnMut(OperationEvent),
    {
        let bytes = transfer_bytes(size.class())?;
        self.read_memory(Memory::Flash, bytes, create_sink(path)?, on_event)
    }

    pub fn read_ram_file<F>(
        &self,
        path: &Path,
        size: RamSize,
        on_event: F,
    ) -> Result<u64, OperationError>
    where
        F: FnMut(OperationEvent),
    {
        let bytes = transfer_bytes(size.class())?;
        self.read_memory(Memory::Ram, bytes, create_sink(path)?, on_event)
    }

    #[tracing::instrument(skip(self, source, on_event))]
    fn write_memory<R, F>(
        &self,
        memory: Memory,
        source: R,
        mut on_event: F,
    ) -> Result<u64, OperationError>
    where
        R: Read + Seek,
        F: FnMut(OperationEvent),
    {
        let mut src = ChunkSource::new(source, memory.pad_byte()).map_err(OperationError::Source)?;
        if src.is_empty() {
            return Err(OperationError::EmptyImage);
        }
        let total = src.len();

        let mut link = self.open()?;
        on_event(OperationEvent::DeviceOpened);
        on_event(OperationEvent::TransferStart {
            memory,
            bytes: total,
            chunks: src.chunk_count(),
        });

        with_end(&mut link, |link| {
            self.program_chunks(link, memory, &mut src, &mut on_event)
        })?;
        link.close();

        tracing::info!(bytes = total, "{} written", memory.name());
        on_event(OperationEvent::Progress { percent: 100 });
        on_event(OperationEvent::TransferDone {
            memory,
            bytes: total,
        });
        Ok(total)
    }

    fn program_chunks<R, F>(
        &self,
        link: &mut DeviceLink<C::Transport>,
        memory: Memory,
        src: &mut ChunkSource<R>,
        on_event: &mut F,
    ) -> Result<(), OperationError>
    where
        R: Read + Seek,
        F: FnMut(OperationEvent),
    {
        let t = self.opts.timeouts.exchange;
        let cmd = memory.program_command();

        link.send_packet(Packet::command(cmd))?;
        let ack = link.receive_packet(t)?;
        if ack.payload != STAT_OK {
            return Err(OperationError::Hardware {
                action: "start programming",
                status: DeviceStatus::from(ack.payload),
            });
        }

        let chunks = src.chunk_count();
        let mut buf = [0u8; CHUNK_SIZE];
        for index in 0..chunks {
            on_event(OperationEvent::Progress {
                percent: percent(src.consumed(), src.len()),
            });

            src.next_chunk(&mut buf).map_err(OperationError::Source)?;
            let sum = checksum(&buf);
            link.send_buffer(&buf)?;

            let ack = link.receive_packet(t)?;
            if ack.payload != sum {
                tracing::warn!(chunk = index, sum, ack = ack.payload, "chunk checksum mismatch");
                return Err(OperationError::WriteChecksum {
                    memory,
                    chunk: index,
                    sent: sum,
                    acked: ack.payload,
                });
            }
            tracing::debug!(chunk = index, chunks, sum, "chunk programmed");

            if index + 1 < chunks {
                link.send_packet(Packet::command(cmd))?;
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, sink, on_event))]
    fn read_memory<W, F>(
        &self,
        memory: Memory,
        bytes: usize,
        mut sink: W,
        mut on_event: F,
    ) -> Result<u64, OperationError>
    where
        W: Write,
        F: FnMut(OperationEvent),
    {
        let total = bytes as u64;
        let chunks = bytes / CHUNK_SIZE;

        let mut link = self.open()?;
        on_event(OperationEvent::DeviceOpened);
        on_event(OperationEvent::TransferStart {
            memory,
            bytes: total,
            chunks,
        });

        with_end(&mut link, |link| {
            self.read_chunks(link, memory, chunks, &mut sink, &mut on_event)
        })?;
        link.close();
        sink.flush().map_err(OperationError::Sink)?;

        tracing::info!(bytes = total, "{} read", memory.name());
        on_event(OperationEvent::Progress { percent: 100 });
        on_event(OperationEvent::TransferDone {
            memory,
            bytes: total,
        });
        Ok(total)
    }

    fn read_chunks<W, F>(
        &self,
        link: &mut DeviceLink<C::Transport>,
        memory: Memory,
        chunks: usize,
        sink: &mut W,
        on_event: &mut F,
    ) -> Result<(), OperationError>
    where
        W: Write,
        F: FnMut(OperationEvent),
    {
        let t = self.opts.timeouts.exchange;
        let cmd = memory.read_command();
        let total = (chunks * CHUNK_SIZE) as u64;

        link.send_packet(Packet::command(cmd))?;

        let mut buf = [0u8; CHUNK_SIZE];
        for index in 0..chunks {
            on_event(OperationEvent::Progress {
                percent: percent((index * CHUNK_SIZE) as u64, total),
            });

            for b in buf.iter_mut() {
                *b = link.receive_byte(t)?;
            }
            let sum = checksum(&buf);
            sink.write_all(&buf).map_err(OperationError::Sink)?;

            link.send_packet(Packet::data(sum))?;
            let ack = link.receive_packet(t)?;
            if ack.payload == CHECKSUM_FAIL {
                tracing::warn!(chunk = index, sum, "device rejected chunk checksum");
                return Err(OperationError::ReadChecksum {
                    memory,
                    chunk: index,
                    sum,
                });
            }
            tracing::debug!(chunk = index, chunks, sum, "chunk read");

            if index + 1 < chunks {
                link.send_packet(Packet::command(cmd))?;
            }
        }
        Ok(())
    }
}

/// Run a multi-step exchange and always follow it with END, so the firmware
/// is idle for the next operation. A failure while sending END after an
/// earlier error is logged and dropped; the earlier error wins.
fn with_end<T, R>(
    link: &mut DeviceLink<T>,
    body: impl FnOnce(&mut DeviceLink<T>) -> Result<R, OperationError>,
) -> Result<R, OperationError>
where
    T: Transport,
{
    match body(link) {
        Ok(v) => {
            link.send_packet(Packet::command(Command::End))?;
            Ok(v)
        }
        Err(e) => {
            tracing::warn!(error = %e, "aborting transfer");
            if let Err(end_err) = link.send_packet(Packet::command(Command::End)) {
                tracing::warn!(error = %end_err, "unable to send END after failure");
            }
            Err(e)
        }
    }
}

fn transfer_bytes(size: SizeClass) -> Result<usize, OperationError> {
    match size.bytes {
        Some(bytes) if bytes > 0 && bytes % CHUNK_SIZE == 0 => Ok(bytes),
        _ => Err(OperationError::UnsupportedSize { size }),
    }
}

fn open_source(path: &Path) -> Result<File, OperationError> {
    File::open(path).map_err(|e| OperationError::File {
        path: path.to_path_buf(),
        source: e,
    })
}

fn create_sink(path: &Path) -> Result<BufWriter<File>, OperationError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| OperationError::File {
            path: path.to_path_buf(),
            source: e,
        })
}
