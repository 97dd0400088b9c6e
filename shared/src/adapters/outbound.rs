use chanrep_serde::{ByteWrite, ByteWriter, Serde};
use log::warn;

use crate::{
    adapters::PackOutcome,
    channels::EntryReader,
    descriptor::EntryDescriptor,
    record::RecordHeader,
    types::{LocalEntryId, WireChannelId, WireEntryId},
};

/// Exports one local entry: reads its items and appends them as data records
/// to the outgoing payload. Sends nothing until a wire id is assigned.
pub struct OutboundEntry {
    descriptor: EntryDescriptor,
    reader: Box<dyn EntryReader>,
}

impl OutboundEntry {
    pub fn new(descriptor: EntryDescriptor, reader: Box<dyn EntryReader>) -> Self {
        Self { descriptor, reader }
    }

    pub fn descriptor(&self) -> &EntryDescriptor {
        &self.descriptor
    }

    pub fn local_entry(&self) -> LocalEntryId {
        self.descriptor.local_entry
    }

    pub fn wire_entry(&self) -> Option<WireEntryId> {
        self.descriptor.wire_entry
    }

    pub fn is_active(&self) -> bool {
        self.descriptor.wire_entry.is_some()
    }

    pub fn activate(&mut self, wire_entry: WireEntryId) {
        self.descriptor.wire_entry = Some(wire_entry);
    }

    /// Items written locally and not yet packed
    pub fn pending_items(&self) -> usize {
        self.reader.ready_count()
    }

    /// Append the oldest unsent item as one record. On overflow the writer is
    /// rolled back to where it was and the item stays unread.
    pub fn pack(&mut self, channel: WireChannelId, writer: &mut ByteWriter) -> PackOutcome {
        let Some(wire_entry) = self.descriptor.wire_entry else {
            return PackOutcome::Empty;
        };
        let span_variant = self.descriptor.sends_spans();
        let Some(item) = self.reader.peek() else {
            return PackOutcome::Empty;
        };

        let body_length = RecordHeader::tick_bytes(span_variant) + item.data.len();
        let Ok(length) = u32::try_from(body_length) else {
            warn!(
                "item of {} bytes in entry `{}` cannot be framed",
                item.data.len(),
                self.descriptor.label()
            );
            return PackOutcome::Deferred;
        };

        let mark = writer.mark();
        RecordHeader {
            channel,
            entry: wire_entry,
            span_variant,
            length,
        }
        .ser(writer);
        item.span.start.ser(writer);
        if span_variant {
            item.span.end.ser(writer);
        }
        writer.write_bytes(&item.data);

        if writer.overflowed() {
            writer.rollback(mark);
            if mark.length() == 0 {
                warn!(
                    "item of {} bytes in entry `{}` does not fit an empty payload of {} bytes",
                    item.data.len(),
                    self.descriptor.label(),
                    writer.capacity()
                );
            }
            return PackOutcome::Deferred;
        }

        let end = item.span.end;
        self.descriptor.last_tick = Some(end);
        self.reader.advance();
        PackOutcome::Written
    }
}
