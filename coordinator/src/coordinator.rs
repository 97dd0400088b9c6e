use std::{collections::VecDeque, net::SocketAddr};

use log::{debug, info, warn};

use chanrep_shared::{
    at_config_marker, entry_notices, vetting_channel, verify_schema, AddChannel, AddEntry, Admission,
    AdmissionState, ByteReader, ByteWriter, ClockUpdate, ConfigMessage, ConfigOutbox,
    CoordinatorRole, CycleControl, CycleStats, Decoded, EntryDescriptor, EntryInfo, EntrySpec,
    InboundEntry,
    MirrorTable, OutboundEntry, OutgoingConfig, PeerId, PeerTable, ProvisionalId, Recipient,
    RemoveEntry, ReplicationContext, ReplicationError, ReplicatorRole, TimeTick, VettingAuthority,
    VettingChannel, WatchedChannel, WireChannelId, WireEntryId, COORDINATOR_PEER_ID,
};

use crate::CoordinatorConfig;

/// A member's proposed entry, answered in the order proposals arrived.
/// Without an adapter the proposal is refused when its turn comes.
struct Candidate {
    channel: WireChannelId,
    provisional: ProvisionalId,
    origin: PeerId,
    spec: EntrySpec,
    adapter: Option<InboundEntry>,
}

enum RetiredAdapter {
    Outbound(OutboundEntry),
    Inbound(InboundEntry),
}

/// An adapter whose removal still has to be announced
pub struct ObsoleteEntry {
    pub channel: WireChannelId,
    pub entry: WireEntryId,
    pub origin: PeerId,
    adapter: RetiredAdapter,
}

impl ObsoleteEntry {
    pub fn is_inbound(&self) -> bool {
        matches!(self.adapter, RetiredAdapter::Inbound(_))
    }

    pub fn label(&self) -> &str {
        match &self.adapter {
            RetiredAdapter::Outbound(adapter) => adapter.descriptor().label(),
            RetiredAdapter::Inbound(adapter) => adapter.descriptor().label(),
        }
    }
}

/// Owns the authoritative replication configuration. Exports the entries of
/// the watched channels, imports the entries members propose, and keeps
/// every member's view in step.
pub struct Coordinator {
    config: CoordinatorConfig,
    context: ReplicationContext,
    mirror: MirrorTable,
    peers: PeerTable,
    vetting: Option<VettingChannel>,
    vetting_authority: Option<VettingAuthority>,
    candidates: VecDeque<Candidate>,
    obsolete: Vec<ObsoleteEntry>,
    outbox: ConfigOutbox,
    control: CycleControl,
    stats: CycleStats,
}

impl Coordinator {
    /// Create a new Coordinator, watching every channel named in the config
    pub fn new(
        config: CoordinatorConfig,
        mut context: ReplicationContext,
    ) -> Result<Self, ReplicationError> {
        let mut mirror = MirrorTable::new();
        for (index, name) in config.channels.iter().enumerate() {
            let wire_channel = MirrorTable::wire_channel_id(index)?;
            let (notifier, notices) = entry_notices(config.replication.notice_queue_capacity);
            let channel = context.channels.watch(name, notifier)?;
            mirror.insert(WatchedChannel::new(channel, wire_channel, name, notices))?;
            info!("replicating channel `{}` as wire channel {}", name, wire_channel);
        }

        let (vetting, vetting_authority) = if config.require_vetting {
            let (channel, authority) = vetting_channel();
            (Some(channel), Some(authority))
        } else {
            (None, None)
        };

        let peers = PeerTable::new(config.replication.clock.clone());
        let outbox = ConfigOutbox::new(
            Recipient::Everyone,
            config.replication.config_buffer_capacity,
        );

        Ok(Self {
            config,
            context,
            mirror,
            peers,
            vetting,
            vetting_authority,
            candidates: VecDeque::new(),
            obsolete: Vec::new(),
            outbox,
            control: CycleControl::default(),
            stats: CycleStats::default(),
        })
    }

    /// The policy end of the vetting channel, if the config asked for vetting
    pub fn vetting_authority(&self) -> Option<VettingAuthority> {
        self.vetting_authority.clone()
    }

    pub fn channel(&self, channel: WireChannelId) -> Option<&WatchedChannel> {
        self.mirror.get(channel)
    }

    pub fn peer_admission(&self, peer: PeerId) -> Option<AdmissionState> {
        self.peers.get(peer).map(|peer| peer.admission())
    }

    /// Member proposals waiting for a wire id
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Adapters scheduled for removal, in the order their removal will be
    /// announced
    pub fn obsolete_entries(&self) -> &[ObsoleteEntry] {
        &self.obsolete
    }

    pub fn context(&self) -> &ReplicationContext {
        &self.context
    }

    // Cycle steps

    /// Export newly detected local entries, retire the ones that went away
    fn process_notices(&mut self) -> Result<(), ReplicationError> {
        for channel in self.mirror.channels_mut() {
            for info in channel.notices().drain_created() {
                if channel.is_imported(info.entry) {
                    debug!("entry {} was created for an import, not exporting it", info.entry);
                    continue;
                }
                export_entry(&mut self.context, &mut self.outbox, channel, &info)?;
            }

            for info in channel.notices().drain_removed() {
                if channel.forget_imported(info.entry) {
                    continue;
                }
                let Some(adapter) = channel.remove_outbound(info.entry) else {
                    debug!("removed entry {} was never exported", info.entry);
                    continue;
                };
                let Some(entry) = adapter.wire_entry() else {
                    continue;
                };
                self.obsolete.push(ObsoleteEntry {
                    channel: channel.wire_channel(),
                    entry,
                    origin: COORDINATOR_PEER_ID,
                    adapter: RetiredAdapter::Outbound(adapter),
                });
            }
        }
        Ok(())
    }

    /// Answer every queued member proposal, in arrival order: a wire id
    /// confirmed to all, or a refusal
    fn confirm_candidates(&mut self) -> Result<(), ReplicationError> {
        while let Some(Candidate {
            channel,
            provisional,
            origin,
            spec,
            adapter,
        }) = self.candidates.pop_front()
        {
            let imported = match adapter {
                Some(adapter) => self.import_candidate(channel, provisional, adapter)?,
                None => false,
            };
            if !imported {
                warn!(
                    "refusing entry `{}` proposed by peer {} (provisional id {})",
                    spec.label, origin, provisional
                );
                self.outbox.push(&ConfigMessage::AddEntry(AddEntry::refusal(
                    origin,
                    channel,
                    provisional,
                    &spec,
                )))?;
            }
        }
        Ok(())
    }

    /// Assign a wire id to a proposed entry and announce it. Returns false,
    /// with nothing announced, if the entry cannot be imported.
    fn import_candidate(
        &mut self,
        channel: WireChannelId,
        provisional: ProvisionalId,
        mut adapter: InboundEntry,
    ) -> Result<bool, ReplicationError> {
        let origin = adapter.origin();
        let Ok(watched) = self.mirror.get_mut(channel) else {
            return Ok(false);
        };
        let entry = match watched.allocate_wire_entry() {
            Ok(entry) => entry,
            Err(error) => {
                warn!("cannot import entry `{}`: {}", adapter.descriptor().label(), error);
                return Ok(false);
            }
        };
        let Some(announcement) = AddEntry::announce(
            &self.context.data_classes,
            origin,
            channel,
            Some(provisional),
            Some(entry),
            &adapter.descriptor().spec,
        ) else {
            return Ok(false);
        };
        let message = ConfigMessage::AddEntry(announcement);
        if !self.outbox.fits(&message) {
            warn!(
                "confirmation of entry `{}` takes {} bytes, more than a configuration buffer holds",
                adapter.descriptor().label(),
                message.encoded_length()
            );
            return Ok(false);
        }

        adapter.assign(entry);
        info!(
            "importing entry `{}` of peer {} as {}/{}",
            adapter.descriptor().label(),
            origin,
            channel,
            entry
        );
        if let Err(error) = watched.insert_inbound(adapter) {
            warn!("cannot import entry of peer {}: {}", origin, error);
            return Ok(false);
        }
        self.outbox.push(&message)?;
        Ok(true)
    }

    /// Announce every pending removal, then let the adapter go
    fn announce_obsolete(&mut self) -> Result<(), ReplicationError> {
        for obsolete in self.obsolete.drain(..) {
            self.outbox.push(&ConfigMessage::RemoveEntry(RemoveEntry {
                origin: obsolete.origin,
                channel: obsolete.channel,
                entry: obsolete.entry,
            }))?;
            info!(
                "removed entry `{}` ({}/{}) of peer {}",
                obsolete.label(),
                obsolete.channel,
                obsolete.entry,
                obsolete.origin
            );
        }
        Ok(())
    }

    fn apply(&mut self, message: ConfigMessage, peer: PeerId) -> Result<(), ReplicationError> {
        if message.origin() != peer {
            warn!(
                "peer {} sent a message claiming origin {}, treating it as its own",
                peer,
                message.origin()
            );
        }
        match message {
            ConfigMessage::AddChannel(message) => {
                warn!(
                    "peer {} tried to add channel `{}`, only the coordinator adds channels",
                    peer, message.name
                );
            }
            ConfigMessage::AddEntry(message) => self.receive_proposal(message, peer)?,
            ConfigMessage::RemoveEntry(message) => {
                let Ok(channel) = self.mirror.get_mut(message.channel) else {
                    warn!("peer {} removed an entry of unknown channel {}", peer, message.channel);
                    return Ok(());
                };
                match channel.inbound(message.entry) {
                    Some(adapter) if adapter.origin() == peer => {}
                    _ => {
                        warn!(
                            "peer {} removed entry {}/{} it does not own",
                            peer, message.channel, message.entry
                        );
                        return Ok(());
                    }
                }
                if let Some(adapter) = channel.remove_inbound(message.entry) {
                    self.obsolete.push(ObsoleteEntry {
                        channel: message.channel,
                        entry: message.entry,
                        origin: peer,
                        adapter: RetiredAdapter::Inbound(adapter),
                    });
                }
            }
        }
        Ok(())
    }

    /// Schema-check a member's proposed entry and open a local entry for it.
    /// The proposal is answered in the next cycle, in the order proposals
    /// arrived.
    fn receive_proposal(&mut self, message: AddEntry, peer: PeerId) -> Result<(), ReplicationError> {
        let Some(provisional) = message.provisional else {
            warn!("proposal of `{}` from peer {} has no provisional id", message.spec.label, peer);
            return Ok(());
        };
        let mut candidate = Candidate {
            channel: message.channel,
            provisional,
            origin: peer,
            spec: message.spec.clone(),
            adapter: None,
        };
        let Ok(channel) = self.mirror.get_mut(message.channel) else {
            warn!("peer {} proposed an entry for unknown channel {}", peer, message.channel);
            self.candidates.push_back(candidate);
            return Ok(());
        };

        verify_schema(
            &self.context.data_classes,
            &message.spec.data_class,
            &message.ancestry,
        )
        .map_err(|source| ReplicationError::Schema { peer, source }.logged(peer))?;

        match self.context.channels.open_write(channel.channel(), &message.spec) {
            Ok(writer) => {
                channel.mark_imported(writer.entry_id());
                let fingerprint = message.fingerprint();
                let descriptor = EntryDescriptor::new(writer.entry_id(), message.spec, fingerprint);
                candidate.adapter = Some(InboundEntry::new(descriptor, writer, peer));
            }
            Err(error) => warn!("cannot import entry `{}` of peer {}: {}", message.spec.label, peer, error),
        }
        self.candidates.push_back(candidate);
        Ok(())
    }
}

/// Open a read handle on a newly detected local entry, announce it and start
/// exporting it. An entry that cannot be announced is not exported.
fn export_entry(
    context: &mut ReplicationContext,
    outbox: &mut ConfigOutbox,
    channel: &mut WatchedChannel,
    info: &EntryInfo,
) -> Result<(), ReplicationError> {
    let reader = match context.channels.open_read(channel.channel(), info.entry) {
        Ok(reader) => reader,
        Err(error) => {
            warn!("cannot export entry `{}`: {}", info.spec.label, error);
            return Ok(());
        }
    };
    let entry = match channel.allocate_wire_entry() {
        Ok(entry) => entry,
        Err(error) => {
            warn!("cannot export entry `{}`: {}", info.spec.label, error);
            return Ok(());
        }
    };
    let Some(announcement) = AddEntry::announce(
        &context.data_classes,
        COORDINATOR_PEER_ID,
        channel.wire_channel(),
        None,
        Some(entry),
        &info.spec,
    ) else {
        warn!(
            "entry `{}` has unregistered data class `{}`, not exporting it",
            info.spec.label, info.spec.data_class
        );
        return Ok(());
    };
    let fingerprint = announcement.fingerprint();
    let message = ConfigMessage::AddEntry(announcement);
    if !outbox.fits(&message) {
        warn!(
            "announcement of entry `{}` takes {} bytes, more than a configuration buffer holds, not exporting it",
            info.spec.label,
            message.encoded_length()
        );
        return Ok(());
    }
    outbox.push(&message)?;

    let descriptor = EntryDescriptor::new(info.entry, info.spec.clone(), fingerprint);
    let mut adapter = OutboundEntry::new(descriptor, reader);
    adapter.activate(entry);
    channel.add_outbound(adapter);

    info!(
        "exporting entry `{}` of channel `{}` as {}/{}",
        info.spec.label,
        channel.name(),
        channel.wire_channel(),
        entry
    );
    Ok(())
}

impl ReplicatorRole for Coordinator {
    fn peer_joined(&mut self, peer: PeerId, address: SocketAddr) {
        info!("peer {} joining from {}", peer, address);
        self.peers.join(peer, address);
        if let Some(vetting) = &mut self.vetting {
            vetting.request(peer, address);
        }
    }

    fn peer_left(&mut self, peer: PeerId) {
        let mut migrated = 0;
        for channel in self.mirror.channels_mut() {
            let wire_channel = channel.wire_channel();
            for adapter in channel.take_inbound_from(peer) {
                let Some(entry) = adapter.wire_entry() else {
                    continue;
                };
                migrated += 1;
                self.obsolete.push(ObsoleteEntry {
                    channel: wire_channel,
                    entry,
                    origin: peer,
                    adapter: RetiredAdapter::Inbound(adapter),
                });
            }
        }
        self.candidates.retain(|candidate| candidate.origin != peer);

        self.peers.leave(peer);
        if let Some(vetting) = &mut self.vetting {
            vetting.forget(peer);
        }
        info!("peer {} left, {} of its entries retired", peer, migrated);
    }

    fn pack_payload(&mut self, writer: &mut ByteWriter) -> usize {
        let before = self.stats.records_written;
        self.mirror.pack(writer, &mut self.stats);
        self.stats.records_written - before
    }

    fn unpack_payload(
        &mut self,
        reader: &mut ByteReader,
        peer: PeerId,
        local_tick: TimeTick,
        remote_tick: TimeTick,
    ) -> Result<(), ReplicationError> {
        let (_, update) = self.peers.observe(peer, local_tick, remote_tick);
        if let ClockUpdate::BreakpointAdded(breakpoint) = update {
            debug!(
                "clock of peer {} moved, transition {} from remote tick {}",
                peer, breakpoint.transition, breakpoint.boundary
            );
        }

        while !reader.is_empty() {
            let Some(source) = self.peers.get(peer) else {
                break;
            };
            self.mirror
                .unpack(reader, peer, source.translator(), &mut self.stats)
                .map_err(|error| error.logged(peer))?;
            if reader.is_empty() {
                break;
            }
            let before = reader.position();
            self.decode_config(reader, peer)?;
            if reader.position() == before {
                warn!(
                    "incomplete configuration message in payload from peer {}, dropping {} bytes",
                    peer,
                    reader.bytes_remaining()
                );
                break;
            }
        }
        Ok(())
    }

    fn decode_config(&mut self, reader: &mut ByteReader, peer: PeerId) -> Result<usize, ReplicationError> {
        let mut applied = 0;
        while at_config_marker(reader) {
            let decoded = ConfigMessage::read(reader)
                .map_err(|source| ReplicationError::Config { peer, source }.logged(peer))?;
            let Decoded::Message(message) = decoded else {
                break;
            };
            self.stats.config_received += 1;
            self.apply(message, peer)?;
            applied += 1;
        }
        Ok(applied)
    }

    fn send_config(&mut self, tick: TimeTick) -> Result<Vec<OutgoingConfig>, ReplicationError> {
        self.process_notices()?;
        self.confirm_candidates()?;
        self.announce_obsolete()?;

        self.stats.config_sent += self.outbox.message_count();
        self.stats.log("coordinator", tick);
        Ok(self.outbox.take())
    }

    fn stop(&mut self, tick: TimeTick) {
        info!("coordinator stopping at tick {}", tick);
        self.control.stop(tick);
    }

    fn should_rearm(&self, next_tick: TimeTick) -> bool {
        self.control.should_rearm(next_tick)
    }

    fn stats(&self) -> &CycleStats {
        &self.stats
    }
}

impl CoordinatorRole for Coordinator {
    fn authorize_peer(&mut self, peer: PeerId) -> Admission {
        let Some(record) = self.peers.get_mut(peer) else {
            warn!("admission asked for unknown peer {}", peer);
            return Admission::Reject;
        };
        let admission = match &mut self.vetting {
            None => Admission::Accept,
            Some(vetting) => match vetting.verdict(peer) {
                Some(true) => Admission::Accept,
                Some(false) => Admission::Reject,
                None => Admission::Delay,
            },
        };
        match admission {
            Admission::Accept => {
                if record.admission() != AdmissionState::Accepted {
                    info!("peer {} accepted", peer);
                }
                record.set_admission(AdmissionState::Accepted);
            }
            Admission::Reject => {
                info!("peer {} rejected", peer);
                record.set_admission(AdmissionState::Rejected);
            }
            Admission::Delay => debug!("peer {} is still being vetted", peer),
        }
        admission
    }

    fn send_welcome_config(&mut self, peer: PeerId) -> Result<Vec<OutgoingConfig>, ReplicationError> {
        let mut outbox = ConfigOutbox::new(
            Recipient::Peer(peer),
            self.config.replication.config_buffer_capacity,
        );
        let registry = &self.context.data_classes;

        for channel in self.mirror.channels() {
            outbox.push(&ConfigMessage::AddChannel(AddChannel {
                origin: COORDINATOR_PEER_ID,
                channel: channel.wire_channel(),
                name: channel.name().to_string(),
            }))?;
        }
        for channel in self.mirror.channels() {
            let exported = channel
                .outbound()
                .iter()
                .filter_map(|adapter| Some((COORDINATOR_PEER_ID, adapter.wire_entry()?, adapter.descriptor())));
            let imported = channel
                .inbound_entries()
                .filter_map(|adapter| Some((adapter.origin(), adapter.wire_entry()?, adapter.descriptor())));

            for (origin, entry, descriptor) in exported.chain(imported) {
                let Some(announcement) = AddEntry::announce(
                    registry,
                    origin,
                    channel.wire_channel(),
                    None,
                    Some(entry),
                    &descriptor.spec,
                ) else {
                    continue;
                };
                outbox.push(&ConfigMessage::AddEntry(announcement))?;
            }
        }

        self.stats.config_sent += outbox.message_count();
        info!(
            "welcome configuration for peer {}: {} messages",
            peer,
            outbox.message_count()
        );
        Ok(outbox.take())
    }
}
