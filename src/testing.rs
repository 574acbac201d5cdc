//! In-memory GB Shooper firmware for tests.
//!
//! `SimTransport` parses host bytes the way the firmware does and queues the
//! replies. Fault switches on `SimState` inject the failures the engine must
//! survive.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::{FlasherOptions, Timeouts};
use crate::link::{Connector, LinkError, LinkOptions, Transport};
use crate::operation::Memory;
use crate::protocol::{
    checksum, Command, Packet, PacketKind, CHECKSUM_FAIL, CHUNK_SIZE, DEVICE_ID, STAT_OK,
    TITLE_LEN,
};

/// No pacing and short deadlines, so failure paths finish quickly.
pub fn fast_options() -> FlasherOptions {
    FlasherOptions {
        link: LinkOptions {
            send_delay: Duration::ZERO,
            poll_interval: Duration::from_millis(1),
            ..Default::default()
        },
        timeouts: Timeouts {
            exchange: Duration::from_millis(200),
            erase: Duration::from_millis(200),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Mode {
    #[default]
    Idle,
    /// First program command acked; the next program command asks for a chunk.
    Programming(Memory),
    AwaitChunk(Memory),
    Reading(Memory),
    AwaitReadSum(Memory, u8),
    AwaitEraseRamSize,
}

pub struct SimState {
    pub flash: Vec<u8>,
    pub ram: Vec<u8>,
    pub device_id: u8,
    pub version: (u8, u8),
    pub chip: (u8, u8),
    pub header: (u8, u8, u8),
    pub title: [u8; TITLE_LEN],
    pub erase_status: u8,
    pub program_status: u8,

    /// Ack this write chunk (0-based) with a wrong checksum.
    pub corrupt_write_ack: Option<usize>,
    /// Flip a bit of this read chunk on the wire.
    pub corrupt_read_chunk: Option<usize>,
    /// Stop answering after this many read data bytes.
    pub stall_read_after: Option<usize>,
    /// Go silent after receiving this many write chunks.
    pub mute_after_chunks: Option<usize>,
    /// Never answer anything.
    pub mute: bool,
    /// Fail every host write.
    pub fail_writes: bool,
    pub present: bool,

    pub opens: usize,
    pub closes: usize,
    pub packets: Vec<Packet>,
    pub chunks_received: usize,
    pub erased_ram_code: Option<u8>,

    pub session: Session,
}

/// Firmware-side parser state.
#[derive(Default)]
pub struct Session {
    mode: Mode,
    pending: Vec<u8>,
    tx: VecDeque<u8>,
    offset: usize,
    chunk_index: usize,
    read_bytes_sent: usize,
}

impl Default for SimState {
    fn default() -> Self {
        let mut title = [0u8; TITLE_LEN];
        title[..8].copy_from_slice(b"TESTGAME");
        Self {
            flash: Vec::new(),
            ram: Vec::new(),
            device_id: DEVICE_ID,
            version: (0, 2),
            chip: (0x01, 0xA4),
            header: (0x13, 0x02, 0x02),
            title,
            erase_status: STAT_OK,
            program_status: STAT_OK,
            corrupt_write_ack: None,
            corrupt_read_chunk: None,
            stall_read_after: None,
            mute_after_chunks: None,
            mute: false,
            fail_writes: false,
            present: true,
            opens: 0,
            closes: 0,
            packets: Vec::new(),
            chunks_received: 0,
            erased_ram_code: None,
            session: Session::default(),
        }
    }
}

impl SimState {
    pub fn command_count(&self, cmd: Command) -> usize {
        self.packets
            .iter()
            .filter(|p| p.kind == PacketKind::Command && p.payload == cmd.code())
            .count()
    }

    pub fn end_count(&self) -> usize {
        self.command_count(Command::End)
    }

    /// Leave bytes in the input buffer as if an earlier exchange was cut off.
    pub fn queue_stale(&mut self, bytes: &[u8]) {
        self.session.tx.extend(bytes);
    }

    fn memory_mut(&mut self, memory: Memory) -> &mut Vec<u8> {
        match memory {
            Memory::Flash => &mut self.flash,
            Memory::Ram => &mut self.ram,
        }
    }

    fn reply(&mut self, kind: PacketKind, payload: u8) {
        if !self.mute {
            self.session.tx.extend(Packet::new(kind, payload).to_bytes());
        }
    }

    fn feed(&mut self, data: &[u8]) {
        for &b in data {
            self.session.pending.push(b);
            match self.session.mode {
                Mode::AwaitChunk(memory) => {
                    if self.session.pending.len() == CHUNK_SIZE {
                        let chunk = std::mem::take(&mut self.session.pending);
                        self.store_chunk(memory, &chunk);
                    }
                }
                _ => {
                    if self.session.pending.len() == 2 {
                        let pending = &mut self.session.pending;
                        let packet = Packet::from_bytes([pending[0], pending[1]]);
                        pending.clear();
                        self.handle_packet(packet);
                    }
                }
            }
        }
    }

    fn store_chunk(&mut self, memory: Memory, chunk: &[u8]) {
        let offset = self.session.offset;
        let mem = self.memory_mut(memory);
        if mem.len() < offset + CHUNK_SIZE {
            mem.resize(offset + CHUNK_SIZE, 0);
        }
        mem[offset..offset + CHUNK_SIZE].copy_from_slice(chunk);

        let mut ack = checksum(chunk);
        if self.corrupt_write_ack == Some(self.session.chunk_index) {
            ack = ack.wrapping_add(1);
        }
        self.session.offset += CHUNK_SIZE;
        self.session.chunk_index += 1;
        self.chunks_received += 1;
        if self.mute_after_chunks == Some(self.chunks_received) {
            self.mute = true;
        }
        self.session.mode = Mode::Programming(memory);
        self.reply(PacketKind::Status, ack);
    }

    fn send_read_chunk(&mut self, memory: Memory) {
        let offset = self.session.offset;
        let mut chunk = [0xFFu8; CHUNK_SIZE];
        let mem = self.memory_mut(memory);
        if offset < mem.len() {
            let end = mem.len().min(offset + CHUNK_SIZE);
            chunk[..end - offset].copy_from_slice(&mem[offset..end]);
        }
        let sum = checksum(&chunk);
        if self.corrupt_read_chunk == Some(self.session.chunk_index) {
            chunk[0] ^= 0x01;
        }
        for b in chunk {
            if let Some(limit) = self.stall_read_after {
                if self.session.read_bytes_sent >= limit {
                    self.mute = true;
                    break;
                }
            }
            if !self.mute {
                self.session.tx.push_back(b);
            }
            self.session.read_bytes_sent += 1;
        }
        self.session.offset += CHUNK_SIZE;
        self.session.chunk_index += 1;
        self.session.mode = Mode::AwaitReadSum(memory, sum);
    }

    fn reset_session(&mut self) {
        self.session.mode = Mode::Idle;
        self.session.offset = 0;
        self.session.chunk_index = 0;
    }

    fn handle_packet(&mut self, packet: Packet) {
        self.packets.push(packet);

        if let Mode::AwaitEraseRamSize = self.session.mode {
            if packet.kind == PacketKind::Data {
                self.erased_ram_code = Some(packet.payload);
                self.ram.fill(0);
                self.session.mode = Mode::Idle;
                let status = self.erase_status;
                self.reply(PacketKind::Status, status);
                return;
            }
        }
        if let Mode::AwaitReadSum(memory, expected) = self.session.mode {
            if packet.kind == PacketKind::Data {
                let ack = if packet.payload == expected {
                    STAT_OK
                } else {
                    CHECKSUM_FAIL
                };
                self.session.mode = Mode::Reading(memory);
                self.reply(PacketKind::Status, ack);
                return;
            }
        }

        match packet.kind {
            PacketKind::Info if packet.payload == 0x00 => {
                let (major, minor) = self.version;
                let id = self.device_id;
                self.reply(PacketKind::Info, id);
                self.reply(PacketKind::Info, major);
                self.reply(PacketKind::Info, minor);
            }
            PacketKind::Command => self.handle_command(packet.payload),
            _ => {}
        }
    }

    fn handle_command(&mut self, code: u8) {
        let Some(cmd) = Command::from_code(code) else {
            return;
        };
        match cmd {
            Command::Identify => {
                let (manufacturer, chip) = self.chip;
                self.reply(PacketKind::Data, manufacturer);
                self.reply(PacketKind::Data, chip);
            }
            Command::ReadHeader => {
                let (cart, rom, ram) = self.header;
                self.reply(PacketKind::Data, cart);
                self.reply(PacketKind::Data, rom);
                self.reply(PacketKind::Data, ram);
                for b in self.title {
                    self.reply(PacketKind::Data, b);
                }
            }
            Command::EraseFlash => {
                self.flash.fill(0xFF);
                let status = self.erase_status;
                self.reply(PacketKind::Status, status);
            }
            Command::EraseRam => {
                self.session.mode = Mode::AwaitEraseRamSize;
            }
            Command::ProgramFlashChunk | Command::ProgramRamChunk => {
                let memory = if cmd == Command::ProgramFlashChunk {
                    Memory::Flash
                } else {
                    Memory::Ram
                };
                if self.session.mode == Mode::Programming(memory) {
                    self.session.mode = Mode::AwaitChunk(memory);
                    return;
                }
                self.reset_session();
                let status = self.program_status;
                self.reply(PacketKind::Status, status);
                if status == STAT_OK {
                    self.session.mode = Mode::AwaitChunk(memory);
                }
            }
            Command::ReadFlashChunk | Command::ReadRamChunk => {
                let memory = if cmd == Command::ReadFlashChunk {
                    Memory::Flash
                } else {
                    Memory::Ram
                };
                if self.session.mode != Mode::Reading(memory) {
                    self.reset_session();
                }
                self.send_read_chunk(memory);
            }
            Command::End => self.reset_session(),
        }
    }
}

pub struct SimTransport {
    state: Arc<Mutex<SimState>>,
}

impl Transport for SimTransport {
    fn write_all(&mut self, data: &[u8]) -> Result<(), LinkError> {
        let mut st = self.state.lock().unwrap();
        if st.fail_writes {
            return Err(LinkError::Write(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "simulated write failure",
            )));
        }
        st.feed(data);
        Ok(())
    }

    fn read_byte(&mut self, wait: Duration) -> Result<Option<u8>, LinkError> {
        if let Some(b) = self.state.lock().unwrap().session.tx.pop_front() {
            return Ok(Some(b));
        }
        std::thread::sleep(wait);
        Ok(self.state.lock().unwrap().session.tx.pop_front())
    }

    fn clear_input(&mut self) -> Result<(), LinkError> {
        self.state.lock().unwrap().session.tx.clear();
        Ok(())
    }
}

impl Drop for SimTransport {
    fn drop(&mut self) {
        if let Ok(mut st) = self.state.lock() {
            st.closes += 1;
        }
    }
}

#[derive(Clone, Default)]
pub struct SimConnector {
    pub state: Arc<Mutex<SimState>>,
}

impl SimConnector {
    pub fn new(state: SimState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut SimState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

impl Connector for SimConnector {
    type Transport = SimTransport;

    fn connect(&self) -> Result<SimTransport, LinkError> {
        let mut st = self.state.lock().unwrap();
        if !st.present {
            return Err(LinkError::NoDevice);
        }
        st.opens += 1;
        Ok(SimTransport {
            state: Arc::clone(&self.state),
        })
    }
}
