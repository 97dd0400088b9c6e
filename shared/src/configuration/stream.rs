use chanrep_serde::ByteReader;

use crate::configuration::{ConfigError, ConfigMessage, Decoded};

/// Reassembles configuration messages from a byte stream whose frames do not
/// line up with message boundaries. Complete messages are consumed, an
/// incomplete tail waits for the next frame.
#[derive(Default)]
pub struct ConfigStream {
    pending: Vec<u8>,
}

impl ConfigStream {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    pub fn push(&mut self, frame: &[u8]) {
        self.pending.extend_from_slice(frame);
    }

    pub fn pending_bytes(&self) -> usize {
        self.pending.len()
    }

    pub fn next_message(&mut self) -> Result<Decoded<ConfigMessage>, ConfigError> {
        self.consume_with(ConfigMessage::read)
    }

    /// Hand the buffered bytes to `decode` and drop whatever it consumed
    pub fn consume_with<T, E>(
        &mut self,
        decode: impl FnOnce(&mut ByteReader) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut reader = ByteReader::new(&self.pending);
        let result = decode(&mut reader);
        let consumed = reader.position();
        self.pending.drain(..consumed);
        result
    }
}
