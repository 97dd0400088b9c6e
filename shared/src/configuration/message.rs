use chanrep_serde::{ByteReader, ByteWrite, ByteWriter, Serde, SerdeErr};
use thiserror::Error;

use crate::{
    channels::EntrySpec,
    constants::CONFIG_MARKER,
    data_class::{DataClassRegistry, SchemaLink},
    types::{PeerId, ProvisionalId, WireChannelId, WireEntryId},
};

/// Marker, tag and body length in front of every configuration message
pub const CONFIG_HEADER_BYTES: usize = 7;

const TAG_ADD_CHANNEL: u8 = 0;
const TAG_ADD_ENTRY: u8 = 1;
const TAG_REMOVE_ENTRY: u8 = 2;

/// Result of decoding from a buffer that may not hold the whole value yet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decoded<T> {
    Message(T),
    /// More bytes are needed; the reader is where it was before the attempt
    Incomplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Expected configuration marker, found {found:#06x}")]
    MissingMarker { found: u16 },

    #[error("Unknown configuration message tag {tag}")]
    UnknownTag { tag: u8 },

    #[error("Body of configuration message with tag {tag} is malformed")]
    MalformedBody { tag: u8 },
}

/// Announces a replicated channel and the wire id it goes by
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddChannel {
    pub origin: PeerId,
    pub channel: WireChannelId,
    pub name: String,
}

/// Proposes (provisional id only) or confirms (wire id assigned) an entry.
/// A confirmation of a member's proposal echoes its provisional id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddEntry {
    pub origin: PeerId,
    pub channel: WireChannelId,
    pub provisional: Option<ProvisionalId>,
    pub entry: Option<WireEntryId>,
    pub spec: EntrySpec,
    /// The data class of `spec` and its ancestors, class first
    pub ancestry: Vec<SchemaLink>,
}

impl AddEntry {
    /// Build an announcement for `spec`, with the ancestry chain the local
    /// build knows for its data class. `None` if the class is not registered.
    pub fn announce(
        registry: &DataClassRegistry,
        origin: PeerId,
        channel: WireChannelId,
        provisional: Option<ProvisionalId>,
        entry: Option<WireEntryId>,
        spec: &EntrySpec,
    ) -> Option<Self> {
        let ancestry = registry.ancestry(&spec.data_class)?;
        Some(Self {
            origin,
            channel,
            provisional,
            entry,
            spec: spec.clone(),
            ancestry,
        })
    }

    /// The coordinator's answer to a proposal it will not import. It keeps
    /// the proposer's position in line without a wire id, and carries no
    /// label or ancestry so it stays small.
    pub fn refusal(
        origin: PeerId,
        channel: WireChannelId,
        provisional: ProvisionalId,
        spec: &EntrySpec,
    ) -> Self {
        let mut spec = spec.clone();
        spec.label.clear();
        Self {
            origin,
            channel,
            provisional: Some(provisional),
            entry: None,
            spec,
            ancestry: Vec::new(),
        }
    }

    pub fn is_refusal(&self) -> bool {
        self.provisional.is_some() && self.entry.is_none() && self.ancestry.is_empty()
    }

    /// Fingerprint of the announced class itself
    pub fn fingerprint(&self) -> u32 {
        self.ancestry.first().map_or(0, |link| link.fingerprint)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoveEntry {
    pub origin: PeerId,
    pub channel: WireChannelId,
    pub entry: WireEntryId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigMessage {
    AddChannel(AddChannel),
    AddEntry(AddEntry),
    RemoveEntry(RemoveEntry),
}

impl ConfigMessage {
    pub fn origin(&self) -> PeerId {
        match self {
            Self::AddChannel(message) => message.origin,
            Self::AddEntry(message) => message.origin,
            Self::RemoveEntry(message) => message.origin,
        }
    }

    fn tag(&self) -> u8 {
        match self {
            Self::AddChannel(_) => TAG_ADD_CHANNEL,
            Self::AddEntry(_) => TAG_ADD_ENTRY,
            Self::RemoveEntry(_) => TAG_REMOVE_ENTRY,
        }
    }

    fn body_length(&self) -> u32 {
        match self {
            Self::AddChannel(message) => message.byte_length(),
            Self::AddEntry(message) => message.byte_length(),
            Self::RemoveEntry(message) => message.byte_length(),
        }
    }

    pub fn encoded_length(&self) -> usize {
        CONFIG_HEADER_BYTES + self.body_length() as usize
    }

    pub fn write(&self, writer: &mut dyn ByteWrite) {
        CONFIG_MARKER.ser(writer);
        self.tag().ser(writer);
        self.body_length().ser(writer);
        match self {
            Self::AddChannel(message) => message.ser(writer),
            Self::AddEntry(message) => message.ser(writer),
            Self::RemoveEntry(message) => message.ser(writer),
        }
    }

    pub fn to_bytes(&self) -> Box<[u8]> {
        let mut writer = ByteWriter::with_capacity(self.encoded_length());
        self.write(&mut writer);
        writer.to_bytes()
    }

    /// Decode the message at the reader's position. When the buffer ends
    /// before the message does, the reader is restored and `Incomplete`
    /// returned, so the same call can be repeated once more bytes arrived.
    pub fn read(reader: &mut ByteReader) -> Result<Decoded<Self>, ConfigError> {
        let start = reader.position();
        let (Ok(marker), Ok(tag), Ok(length)) =
            (u16::de(reader), u8::de(reader), u32::de(reader))
        else {
            reader.restore(start);
            return Ok(Decoded::Incomplete);
        };
        if marker != CONFIG_MARKER {
            reader.restore(start);
            return Err(ConfigError::MissingMarker { found: marker });
        }
        let Ok(body) = reader.read_bytes(length as usize) else {
            reader.restore(start);
            return Ok(Decoded::Incomplete);
        };

        let mut body_reader = ByteReader::new(body);
        let message = match tag {
            TAG_ADD_CHANNEL => AddChannel::de(&mut body_reader).map(Self::AddChannel),
            TAG_ADD_ENTRY => AddEntry::de(&mut body_reader).map(Self::AddEntry),
            TAG_REMOVE_ENTRY => RemoveEntry::de(&mut body_reader).map(Self::RemoveEntry),
            _ => return Err(ConfigError::UnknownTag { tag }),
        };
        match message {
            Ok(message) if body_reader.is_empty() => Ok(Decoded::Message(message)),
            _ => Err(ConfigError::MalformedBody { tag }),
        }
    }
}

impl Serde for AddChannel {
    fn ser(&self, writer: &mut dyn ByteWrite) {
        self.origin.ser(writer);
        self.channel.ser(writer);
        self.name.ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            origin: PeerId::de(reader)?,
            channel: WireChannelId::de(reader)?,
            name: String::de(reader)?,
        })
    }

    fn byte_length(&self) -> u32 {
        4 + self.name.byte_length()
    }
}

impl Serde for AddEntry {
    fn ser(&self, writer: &mut dyn ByteWrite) {
        self.origin.ser(writer);
        self.channel.ser(writer);
        self.provisional.ser(writer);
        self.entry.ser(writer);
        self.spec.ser(writer);
        self.ancestry.ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            origin: PeerId::de(reader)?,
            channel: WireChannelId::de(reader)?,
            provisional: Option::<ProvisionalId>::de(reader)?,
            entry: Option::<WireEntryId>::de(reader)?,
            spec: EntrySpec::de(reader)?,
            ancestry: Vec::<SchemaLink>::de(reader)?,
        })
    }

    fn byte_length(&self) -> u32 {
        4 + self.provisional.byte_length()
            + self.entry.byte_length()
            + self.spec.byte_length()
            + self.ancestry.byte_length()
    }
}

impl Serde for RemoveEntry {
    fn ser(&self, writer: &mut dyn ByteWrite) {
        self.origin.ser(writer);
        self.channel.ser(writer);
        self.entry.ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            origin: PeerId::de(reader)?,
            channel: WireChannelId::de(reader)?,
            entry: WireEntryId::de(reader)?,
        })
    }

    fn byte_length(&self) -> u32 {
        6
    }
}
