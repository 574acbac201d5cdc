use std::io::{self, Read, Seek, SeekFrom};

use crate::protocol::CHUNK_SIZE;

/// Fill byte for the tail of a short final flash chunk (erased flash state).
pub const FLASH_PAD: u8 = 0xFF;
/// Fill byte for the tail of a short final RAM chunk.
pub const RAM_PAD: u8 = 0x00;

/// Splits a seekable source into 256-byte chunks. The final chunk is padded
/// with `pad` when the source length is not a multiple of the chunk size.
pub struct ChunkSource<R> {
    inner: R,
    len: u64,
    consumed: u64,
    pad: u8,
}

impl<R: Read + Seek> ChunkSource<R> {
    pub fn new(mut inner: R, pad: u8) -> io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner,
            len,
            consumed: 0,
            pad,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes handed out so far, not counting padding.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn has_remaining(&self) -> bool {
        self.consumed < self.len
    }

    pub fn chunk_count(&self) -> usize {
        self.len.div_ceil(CHUNK_SIZE as u64) as usize
    }

    /// Fill `buf` with the next chunk. Returns `false` once the source is
    /// exhausted, leaving `buf` untouched.
    pub fn next_chunk(&mut self, buf: &mut [u8; CHUNK_SIZE]) -> io::Result<bool> {
        let left = self.len - self.consumed;
        if left == 0 {
            return Ok(false);
        }
        let n = left.min(CHUNK_SIZE as u64) as usize;
        self.inner.read_exact(&mut buf[..n])?;
        buf[n..].fill(self.pad);
        self.consumed += n as u64;
        Ok(true)
    }
}
