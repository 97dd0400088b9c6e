use std::mem;

use chanrep_serde::{ByteReader, ByteWrite, ByteWriter};
use crossbeam_channel::{unbounded, Receiver, Sender};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferPoolError {
    #[error("All {limit} buffers of the pool are claimed")]
    Exhausted { limit: usize },
}

/// A fixed number of payload buffers. A claimed buffer goes back to the pool
/// when its [`PooledBuffer`] is dropped, whichever way the holder exits.
pub struct BufferPool {
    free: Receiver<Vec<u8>>,
    returns: Sender<Vec<u8>>,
    buffer_capacity: usize,
    limit: usize,
    allocated: usize,
}

impl BufferPool {
    pub fn new(limit: usize, buffer_capacity: usize) -> Self {
        let (returns, free) = unbounded();
        Self {
            free,
            returns,
            buffer_capacity,
            limit,
            allocated: 0,
        }
    }

    pub fn claim(&mut self) -> Result<PooledBuffer, BufferPoolError> {
        let buffer = match self.free.try_recv() {
            Ok(buffer) => buffer,
            Err(_) if self.allocated < self.limit => {
                self.allocated += 1;
                Vec::with_capacity(self.buffer_capacity)
            }
            Err(_) => return Err(BufferPoolError::Exhausted { limit: self.limit }),
        };
        Ok(PooledBuffer {
            writer: ByteWriter::from_vec(buffer, self.buffer_capacity),
            returns: self.returns.clone(),
        })
    }

    /// Buffers currently claimed and not yet returned
    pub fn outstanding(&self) -> usize {
        self.allocated - self.free.len()
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }
}

pub struct PooledBuffer {
    writer: ByteWriter,
    returns: Sender<Vec<u8>>,
}

impl PooledBuffer {
    pub fn writer(&mut self) -> &mut ByteWriter {
        &mut self.writer
    }

    /// Replace the contents with received bytes, up to the buffer capacity.
    /// Returns false if `bytes` did not fit.
    pub fn fill(&mut self, bytes: &[u8]) -> bool {
        self.writer.reset();
        self.writer.write_bytes(bytes);
        if self.writer.overflowed() {
            self.writer.reset();
            return false;
        }
        true
    }

    pub fn reader(&self) -> ByteReader<'_> {
        ByteReader::new(self.writer.as_slice())
    }

    pub fn as_slice(&self) -> &[u8] {
        self.writer.as_slice()
    }

    pub fn len(&self) -> usize {
        self.writer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writer.is_empty()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let writer = mem::replace(&mut self.writer, ByteWriter::with_capacity(0));
        // the pool is gone if this fails, and the buffer with it
        let _ = self.returns.send(writer.into_vec());
    }
}
