//! Per-frame uniform staging arena.
//!
//! All uniform block data recorded during a frame is packed into one linear
//! buffer. Each write is placed at the current cursor and the cursor then
//! advances past the write, rounded up to the device's uniform offset
//! alignment, so every block start is a legal bind offset. At frame end the
//! used prefix is uploaded to the backend in a single call and draws bind
//! sub-ranges of it.

use crate::backend::RawId;

pub(crate) fn align_up(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

/// A bump arena for uniform data, reset every frame.
pub struct UniformArena {
    data: Vec<u8>,
    alignment: usize,
    cursor: usize,
    open: bool,
    /// Backend buffer the arena contents get uploaded into at frame end.
    buffer: RawId,
}

/// Location of one uniform block write within the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaRange {
    pub byte_offset: usize,
    pub byte_count: usize,
}

impl UniformArena {
    pub fn new(capacity: usize, alignment: usize, buffer: RawId) -> Self {
        debug_assert!(alignment.is_power_of_two());
        Self {
            data: vec![0; capacity],
            alignment,
            cursor: 0,
            open: false,
            buffer,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn buffer(&self) -> RawId {
        self.buffer
    }

    /// Bytes consumed so far this frame.
    pub fn used(&self) -> usize {
        self.cursor
    }

    pub fn begin_frame(&mut self) {
        debug_assert!(!self.open, "frame already open");
        self.cursor = 0;
        self.open = true;
    }

    /// Copy `bytes` into the arena at the current cursor and advance the
    /// cursor past them, rounded up to the bind alignment. Overflow is a
    /// contract violation.
    pub fn write(&mut self, bytes: &[u8]) -> ArenaRange {
        debug_assert!(self.open, "arena written outside a frame");
        debug_assert!(
            self.cursor + bytes.len() <= self.data.len(),
            "uniform arena overflow: {} + {} > {}",
            self.cursor,
            bytes.len(),
            self.data.len(),
        );
        let byte_offset = self.cursor;
        self.data[byte_offset..byte_offset + bytes.len()].copy_from_slice(bytes);
        self.cursor = align_up(byte_offset + bytes.len(), self.alignment);
        ArenaRange {
            byte_offset,
            byte_count: bytes.len(),
        }
    }

    /// Close the frame and return the used prefix for upload.
    pub fn end_frame(&mut self) -> &[u8] {
        debug_assert!(self.open, "no frame open");
        self.open = false;
        &self.data[..self.cursor]
    }
}
