use chanrep_serde::{ByteReader, ByteWrite, ConstByteLength, Serde, SerdeErr};

/// Network-wide identifier of a participating process
pub type PeerId = u16;
/// Identifier of a channel in the local channel subsystem
pub type ChannelId = u32;
/// Identifier of an entry in the local channel subsystem
pub type LocalEntryId = u32;
/// Identifier of a replicated channel, as transmitted
pub type WireChannelId = u16;
/// Identifier of a replicated entry within its channel, as transmitted
pub type WireEntryId = u16;
/// Provisional identifier a member gives an entry it proposes
pub type ProvisionalId = u16;
/// A value of a node's integer time base
pub type TimeTick = u32;

/// The coordinator always takes peer id 0
pub const COORDINATOR_PEER_ID: PeerId = 0;

/// Validity range of a data item, `start..=end` in ticks. Event data uses a
/// single tick, `start == end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeSpan {
    pub start: TimeTick,
    pub end: TimeTick,
}

impl TimeSpan {
    pub fn new(start: TimeTick, end: TimeTick) -> Self {
        Self { start, end }
    }

    pub fn tick(tick: TimeTick) -> Self {
        Self {
            start: tick,
            end: tick,
        }
    }

    pub fn is_tick(&self) -> bool {
        self.start == self.end
    }
}

/// One data item as stored in a channel entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelItem {
    pub span: TimeSpan,
    pub data: Box<[u8]>,
}

impl ChannelItem {
    pub fn new(span: TimeSpan, data: &[u8]) -> Self {
        Self {
            span,
            data: data.into(),
        }
    }
}

/// How an entry's data relates to time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeAspect {
    /// Stream data, valid over consecutive spans
    Continuous,
    /// Event data, tied to a single tick
    Event,
}

/// Whether an entry holds one data set or is one of many
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Arity {
    Single,
    Multiple,
}

/// How data is packed for transmission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PackingMode {
    Full,
    Differential,
}

/// Transport urgency requested by the writer of an entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportClass {
    Regular,
    HighPriority,
    Bulk,
}

// All four enums travel as a single index byte

macro_rules! impl_serde_for_index_enum {
    ($name:ident { $($index:literal => $variant:ident),* $(,)? }) => {
        impl Serde for $name {
            fn ser(&self, writer: &mut dyn ByteWrite) {
                let index: u8 = match self {
                    $($name::$variant => $index,)*
                };
                index.ser(writer);
            }

            fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
                match u8::de(reader)? {
                    $($index => Ok($name::$variant),)*
                    _ => Err(SerdeErr),
                }
            }

            fn byte_length(&self) -> u32 {
                1
            }
        }

        impl ConstByteLength for $name {
            fn const_byte_length() -> u32 {
                1
            }
        }
    };
}

impl_serde_for_index_enum!(TimeAspect { 0 => Continuous, 1 => Event });
impl_serde_for_index_enum!(Arity { 0 => Single, 1 => Multiple });
impl_serde_for_index_enum!(PackingMode { 0 => Full, 1 => Differential });
impl_serde_for_index_enum!(TransportClass { 0 => Regular, 1 => HighPriority, 2 => Bulk });
