use crate::error::SerdeErr;

/// Reads values out of a borrowed byte buffer, front to back
pub struct ByteReader<'b> {
    buffer: &'b [u8],
    position: usize,
}

impl<'b> ByteReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        let Some(byte) = self.buffer.get(self.position) else {
            return Err(SerdeErr);
        };
        self.position += 1;
        Ok(*byte)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'b [u8], SerdeErr> {
        if count > self.bytes_remaining() {
            return Err(SerdeErr);
        }
        let start = self.position;
        self.position += count;
        Ok(&self.buffer[start..self.position])
    }

    /// Look at the next `count` bytes without consuming them
    pub fn peek_bytes(&self, count: usize) -> Option<&'b [u8]> {
        if count > self.bytes_remaining() {
            return None;
        }
        Some(&self.buffer[self.position..self.position + count])
    }

    /// Advance past `count` bytes, or to the end of the buffer if fewer remain.
    /// Returns the number of bytes actually skipped.
    pub fn skip(&mut self, count: usize) -> usize {
        let skipped = count.min(self.bytes_remaining());
        self.position += skipped;
        skipped
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Return to a position previously obtained from `position()`
    pub fn restore(&mut self, position: usize) {
        self.position = position.min(self.buffer.len());
    }

    pub fn bytes_remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.bytes_remaining() == 0
    }
}
