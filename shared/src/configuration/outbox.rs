use std::mem;

use chanrep_serde::ByteWriter;

use crate::{configuration::ConfigMessage, error::ReplicationError, types::PeerId};

/// Who a buffer of configuration messages goes to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Recipient {
    /// Every connected peer
    Everyone,
    Peer(PeerId),
}

/// One filled buffer of configuration messages, ready for the transport
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingConfig {
    pub recipient: Recipient,
    pub bytes: Box<[u8]>,
}

/// Packs configuration messages into fixed-size buffers. A message that does
/// not fit closes the current buffer and goes into a fresh one.
pub struct ConfigOutbox {
    recipient: Recipient,
    capacity: usize,
    current: ByteWriter,
    ready: Vec<OutgoingConfig>,
    messages: usize,
}

impl ConfigOutbox {
    pub fn new(recipient: Recipient, capacity: usize) -> Self {
        Self {
            recipient,
            capacity,
            current: ByteWriter::with_capacity(capacity),
            ready: Vec::new(),
            messages: 0,
        }
    }

    pub fn push(&mut self, message: &ConfigMessage) -> Result<(), ReplicationError> {
        let mark = self.current.mark();
        message.write(&mut self.current);
        if !self.current.overflowed() {
            self.messages += 1;
            return Ok(());
        }
        self.current.rollback(mark);

        if self.current.is_empty() {
            return Err(ReplicationError::ConfigTooLarge {
                length: message.encoded_length(),
                capacity: self.capacity,
            });
        }
        self.flush();

        message.write(&mut self.current);
        if self.current.overflowed() {
            self.current.reset();
            return Err(ReplicationError::ConfigTooLarge {
                length: message.encoded_length(),
                capacity: self.capacity,
            });
        }
        self.messages += 1;
        Ok(())
    }

    /// Whether `message` fits into an empty buffer, so that `push` cannot
    /// fail for it
    pub fn fits(&self, message: &ConfigMessage) -> bool {
        message.encoded_length() <= self.capacity
    }

    /// Close the current buffer if it holds anything
    pub fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let full = mem::replace(&mut self.current, ByteWriter::with_capacity(self.capacity));
        self.ready.push(OutgoingConfig {
            recipient: self.recipient,
            bytes: full.to_bytes(),
        });
    }

    /// Number of messages pushed since the last `take`
    pub fn message_count(&self) -> usize {
        self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty() && self.current.is_empty()
    }

    /// Every buffer filled so far, the partially filled one included
    pub fn take(&mut self) -> Vec<OutgoingConfig> {
        self.flush();
        self.messages = 0;
        mem::take(&mut self.ready)
    }
}
