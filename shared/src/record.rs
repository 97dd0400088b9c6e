use chanrep_serde::{ByteReader, ByteWrite, Serde, SerdeErr};

use crate::{
    constants::{CONFIG_MARKER, SPAN_FLAG},
    types::{WireChannelId, WireEntryId},
};

/// The fixed part in front of every data record:
/// `[u16 channel | span flag][u16 entry][u32 body length]`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordHeader {
    pub channel: WireChannelId,
    pub entry: WireEntryId,
    pub span_variant: bool,
    pub length: u32,
}

impl RecordHeader {
    pub fn ser(&self, writer: &mut dyn ByteWrite) {
        let mut channel_field = self.channel;
        if self.span_variant {
            channel_field |= SPAN_FLAG;
        }
        channel_field.ser(writer);
        self.entry.ser(writer);
        self.length.ser(writer);
    }

    pub fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let channel_field = u16::de(reader)?;
        if channel_field == CONFIG_MARKER {
            return Err(SerdeErr);
        }
        Ok(Self {
            channel: channel_field & !SPAN_FLAG,
            span_variant: channel_field & SPAN_FLAG != 0,
            entry: u16::de(reader)?,
            length: u32::de(reader)?,
        })
    }

    /// Bytes the tick part of the body takes
    pub fn tick_bytes(span_variant: bool) -> usize {
        if span_variant {
            8
        } else {
            4
        }
    }
}

/// Whether the next two bytes are the configuration marker
pub fn at_config_marker(reader: &ByteReader) -> bool {
    reader
        .peek_bytes(2)
        .map(|bytes| u16::from_be_bytes([bytes[0], bytes[1]]) == CONFIG_MARKER)
        .unwrap_or(false)
}
