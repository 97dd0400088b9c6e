use crate::{
    channels::EntrySpec,
    types::{LocalEntryId, TimeAspect, TimeTick, WireEntryId},
};

/// What both adapter kinds know about the entry they serve. The wire id is
/// negotiated with the coordinator and is the only id that is transmitted;
/// the local id never leaves this process.
#[derive(Clone, Debug, PartialEq)]
pub struct EntryDescriptor {
    pub local_entry: LocalEntryId,
    pub wire_entry: Option<WireEntryId>,
    pub spec: EntrySpec,
    pub fingerprint: u32,
    pub last_tick: Option<TimeTick>,
}

impl EntryDescriptor {
    pub fn new(local_entry: LocalEntryId, spec: EntrySpec, fingerprint: u32) -> Self {
        Self {
            local_entry,
            wire_entry: None,
            spec,
            fingerprint,
            last_tick: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.spec.label
    }

    pub fn data_class(&self) -> &str {
        &self.spec.data_class
    }

    /// Continuous entries send explicit spans, event entries a single tick
    pub fn sends_spans(&self) -> bool {
        self.spec.time_aspect == TimeAspect::Continuous
    }
}
