use crate::constants::MTU_SIZE_BYTES;

pub trait ByteWrite {
    fn write_byte(&mut self, byte: u8);
    fn write_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.write_byte(*byte);
        }
    }
}

/// Position of a [`ByteWriter`] that it can later be rolled back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteMark {
    length: usize,
    overflowed: bool,
}

impl WriteMark {
    pub fn length(&self) -> usize {
        self.length
    }
}

/// A writer over a buffer of fixed capacity. Writing past the capacity does
/// not grow the buffer: the excess bytes are dropped and the writer reports
/// itself as overflowed until it is rolled back.
pub struct ByteWriter {
    buffer: Vec<u8>,
    capacity: usize,
    overflowed: bool,
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::with_capacity(MTU_SIZE_BYTES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            overflowed: false,
        }
    }

    /// Reuse an existing allocation, typically one claimed from a buffer pool
    pub fn from_vec(mut buffer: Vec<u8>, capacity: usize) -> Self {
        buffer.clear();
        Self {
            buffer,
            capacity,
            overflowed: false,
        }
    }

    pub fn to_bytes(self) -> Box<[u8]> {
        self.buffer.into_boxed_slice()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn bytes_free(&self) -> usize {
        self.capacity.saturating_sub(self.buffer.len())
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn mark(&self) -> WriteMark {
        WriteMark {
            length: self.buffer.len(),
            overflowed: self.overflowed,
        }
    }

    /// Discard everything written since `mark` was taken
    pub fn rollback(&mut self, mark: WriteMark) {
        self.buffer.truncate(mark.length);
        self.overflowed = mark.overflowed;
    }

    /// Empty the buffer for reuse, keeping its capacity
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.overflowed = false;
    }
}

impl ByteWrite for ByteWriter {
    fn write_byte(&mut self, byte: u8) {
        if self.overflowed || self.bytes_free() == 0 {
            self.overflowed = true;
            return;
        }
        self.buffer.push(byte);
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        if self.overflowed || bytes.len() > self.bytes_free() {
            self.overflowed = true;
            return;
        }
        self.buffer.extend_from_slice(bytes);
    }
}
