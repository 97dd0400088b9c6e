use crate::types::WireChannelId;

/// Precedes every configuration message, and is never a valid data record
/// channel field
pub const CONFIG_MARKER: u16 = 0xFFFF;

/// Set on a data record's channel field when the record carries an explicit
/// start and end tick
pub const SPAN_FLAG: u16 = 0x8000;

/// Wire channel ids must stay below this, so that no channel id with the span
/// flag set can be mistaken for the configuration marker
pub const MAX_WIRE_CHANNEL_ID: WireChannelId = 0x7FFE;

/// Highest wire entry id a channel hands out
pub const MAX_WIRE_ENTRY_ID: u16 = u16::MAX;

/// Channel field + entry field + body length
pub const RECORD_HEADER_BYTES: usize = 2 + 2 + 4;
