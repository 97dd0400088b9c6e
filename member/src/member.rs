use std::{collections::VecDeque, net::SocketAddr};

use log::{debug, info, warn};

use chanrep_shared::{
    at_config_marker, entry_notices, verify_schema, AddChannel, AddEntry, ByteReader, ByteWriter,
    ClockUpdate, ConfigMessage, ConfigOutbox, CycleControl, CycleStats, Decoded, EntryDescriptor,
    InboundEntry, LocalEntryId, MirrorTable, OutboundEntry, OutgoingConfig, PeerId, PeerTable,
    ProvisionalId, Recipient, RemoveEntry, ReplicationContext, ReplicationError, ReplicatorRole,
    TimeTick, WatchedChannel, WireChannelId, COORDINATOR_PEER_ID,
};

use crate::MemberConfig;

/// A local entry proposed to the coordinator, not yet given a wire id
struct Candidate {
    channel: WireChannelId,
    provisional: ProvisionalId,
    adapter: OutboundEntry,
}

/// Mirrors the coordinator's replication configuration. Starts out empty and
/// builds its mirror table only from the messages it receives; its own
/// entries are proposed and exported once the coordinator confirms them.
pub struct Member {
    config: MemberConfig,
    context: ReplicationContext,
    local_peer: PeerId,
    mirror: MirrorTable,
    peers: PeerTable,
    candidates: VecDeque<Candidate>,
    pending_removals: VecDeque<(WireChannelId, LocalEntryId)>,
    next_provisional: ProvisionalId,
    outbox: ConfigOutbox,
    control: CycleControl,
    stats: CycleStats,
}

impl Member {
    /// Create a new Member, known on the network as `local_peer`
    pub fn new(config: MemberConfig, context: ReplicationContext, local_peer: PeerId) -> Self {
        let peers = PeerTable::new(config.replication.clock.clone());
        let outbox = ConfigOutbox::new(
            Recipient::Peer(COORDINATOR_PEER_ID),
            config.replication.config_buffer_capacity,
        );
        Self {
            config,
            context,
            local_peer,
            mirror: MirrorTable::new(),
            peers,
            candidates: VecDeque::new(),
            pending_removals: VecDeque::new(),
            next_provisional: 0,
            outbox,
            control: CycleControl::default(),
            stats: CycleStats::default(),
        }
    }

    pub fn local_peer(&self) -> PeerId {
        self.local_peer
    }

    pub fn channel(&self, channel: WireChannelId) -> Option<&WatchedChannel> {
        self.mirror.get(channel)
    }

    pub fn channel_count(&self) -> usize {
        self.mirror.len()
    }

    /// Proposed entries still waiting for confirmation
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Local removals that cannot be announced yet
    pub fn postponed_removal_count(&self) -> usize {
        self.pending_removals.len()
    }

    pub fn context(&self) -> &ReplicationContext {
        &self.context
    }

    /// Propose newly detected local entries, queue the removal of vanished
    /// ones
    fn process_notices(&mut self) -> Result<(), ReplicationError> {
        for channel in self.mirror.channels_mut() {
            let wire_channel = channel.wire_channel();

            for info in channel.notices().drain_created() {
                if channel.is_imported(info.entry) {
                    continue;
                }
                let provisional = self.next_provisional;
                let Some(proposal) = AddEntry::announce(
                    &self.context.data_classes,
                    self.local_peer,
                    wire_channel,
                    Some(provisional),
                    None,
                    &info.spec,
                ) else {
                    warn!(
                        "entry `{}` has unregistered data class `{}`, not proposing it",
                        info.spec.label, info.spec.data_class
                    );
                    continue;
                };
                let fingerprint = proposal.fingerprint();
                let message = ConfigMessage::AddEntry(proposal);
                if !self.outbox.fits(&message) {
                    warn!(
                        "proposal of entry `{}` takes {} bytes, more than a configuration buffer holds, not proposing it",
                        info.spec.label,
                        message.encoded_length()
                    );
                    continue;
                }
                let reader = match self.context.channels.open_read(channel.channel(), info.entry) {
                    Ok(reader) => reader,
                    Err(error) => {
                        warn!("cannot export entry `{}`: {}", info.spec.label, error);
                        continue;
                    }
                };

                self.outbox.push(&message)?;
                debug!(
                    "proposing entry `{}` with provisional id {}",
                    info.spec.label, provisional
                );
                let descriptor = EntryDescriptor::new(info.entry, info.spec, fingerprint);
                self.candidates.push_back(Candidate {
                    channel: wire_channel,
                    provisional,
                    adapter: OutboundEntry::new(descriptor, reader),
                });
                self.next_provisional = self.next_provisional.wrapping_add(1);
            }

            for info in channel.notices().drain_removed() {
                if channel.forget_imported(info.entry) {
                    continue;
                }
                self.pending_removals.push_back((wire_channel, info.entry));
            }
        }
        self.resolve_removals()
    }

    /// Announce queued removals front to back. A removal of an entry still
    /// waiting for confirmation holds up the rest of the queue.
    fn resolve_removals(&mut self) -> Result<(), ReplicationError> {
        while let Some(&(channel, entry)) = self.pending_removals.front() {
            let unconfirmed = self
                .candidates
                .iter()
                .any(|candidate| candidate.channel == channel && candidate.adapter.local_entry() == entry);
            if unconfirmed {
                debug!("removal of entry {} postponed until it is confirmed", entry);
                break;
            }
            self.pending_removals.pop_front();

            let Ok(watched) = self.mirror.get_mut(channel) else {
                continue;
            };
            let Some(adapter) = watched.remove_outbound(entry) else {
                debug!("removed entry {} was never exported", entry);
                continue;
            };
            if let Some(wire_entry) = adapter.wire_entry() {
                info!(
                    "entry `{}` ({}/{}) removed locally",
                    adapter.descriptor().label(),
                    channel,
                    wire_entry
                );
                self.outbox.push(&ConfigMessage::RemoveEntry(RemoveEntry {
                    origin: self.local_peer,
                    channel,
                    entry: wire_entry,
                }))?;
            }
        }
        Ok(())
    }

    fn apply(&mut self, message: ConfigMessage) -> Result<(), ReplicationError> {
        match message {
            ConfigMessage::AddChannel(message) => self.add_channel(message),
            ConfigMessage::AddEntry(message) if message.origin == self.local_peer => {
                self.confirm(message)
            }
            ConfigMessage::AddEntry(message) => self.import(message),
            ConfigMessage::RemoveEntry(message) => {
                if message.origin == self.local_peer {
                    return Ok(());
                }
                let Ok(channel) = self.mirror.get_mut(message.channel) else {
                    return Ok(());
                };
                match channel.inbound(message.entry) {
                    Some(adapter) if adapter.origin() == message.origin => {}
                    _ => {
                        debug!(
                            "removal of unknown entry {}/{} ignored",
                            message.channel, message.entry
                        );
                        return Ok(());
                    }
                }
                if let Some(adapter) = channel.remove_inbound(message.entry) {
                    info!(
                        "stopped mirroring entry `{}` of peer {}",
                        adapter.descriptor().label(),
                        message.origin
                    );
                }
                Ok(())
            }
        }
    }

    fn add_channel(&mut self, message: AddChannel) -> Result<(), ReplicationError> {
        if self.mirror.contains(message.channel) {
            debug!("channel `{}` is already replicated", message.name);
            return Ok(());
        }
        let (notifier, notices) = entry_notices(self.config.replication.notice_queue_capacity);
        let channel = self.context.channels.watch(&message.name, notifier)?;
        self.mirror.insert(WatchedChannel::new(
            channel,
            message.channel,
            &message.name,
            notices,
        ))?;
        info!(
            "replicating channel `{}` as wire channel {}",
            message.name, message.channel
        );
        Ok(())
    }

    /// The coordinator answered one of our proposals. Answers come back in
    /// proposal order, so it belongs to the oldest candidate. An answer
    /// without a wire id is a refusal.
    fn confirm(&mut self, message: AddEntry) -> Result<(), ReplicationError> {
        let Some(Candidate {
            channel,
            provisional,
            mut adapter,
        }) = self.candidates.pop_front()
        else {
            warn!(
                "confirmation of provisional id {:?} without a pending proposal",
                message.provisional
            );
            return Ok(());
        };
        if channel != message.channel || Some(provisional) != message.provisional {
            warn!(
                "confirmation for {}/{:?} matched to proposal {}/{}",
                message.channel, message.provisional, channel, provisional
            );
        }

        let Some(wire_entry) = message.entry else {
            warn!(
                "coordinator refused entry `{}` (provisional id {}), not exporting it",
                adapter.descriptor().label(),
                provisional
            );
            return self.resolve_removals();
        };

        adapter.activate(wire_entry);
        info!(
            "exporting entry `{}` as {}/{}",
            adapter.descriptor().label(),
            channel,
            wire_entry
        );
        self.mirror.get_mut(channel)?.add_outbound(adapter);
        self.resolve_removals()
    }

    /// Start mirroring an entry of another peer, once its schema checks out
    fn import(&mut self, message: AddEntry) -> Result<(), ReplicationError> {
        let origin = message.origin;
        let Some(wire_entry) = message.entry else {
            if message.is_refusal() {
                debug!("proposal of peer {} was refused", origin);
            } else {
                warn!("entry `{}` announced without a wire id", message.spec.label);
            }
            return Ok(());
        };
        let Ok(channel) = self.mirror.get_mut(message.channel) else {
            warn!(
                "entry `{}` announced for unknown channel {}",
                message.spec.label, message.channel
            );
            return Ok(());
        };
        if channel.inbound(wire_entry).is_some() {
            debug!("entry {}/{} is already mirrored", message.channel, wire_entry);
            return Ok(());
        }

        verify_schema(
            &self.context.data_classes,
            &message.spec.data_class,
            &message.ancestry,
        )
        .map_err(|source| {
            ReplicationError::Schema {
                peer: COORDINATOR_PEER_ID,
                source,
            }
            .logged(COORDINATOR_PEER_ID)
        })?;

        let writer = self
            .context
            .channels
            .open_write(channel.channel(), &message.spec)?;
        channel.mark_imported(writer.entry_id());

        let fingerprint = message.fingerprint();
        let mut descriptor = EntryDescriptor::new(writer.entry_id(), message.spec, fingerprint);
        descriptor.wire_entry = Some(wire_entry);
        let adapter = InboundEntry::new(descriptor, writer, origin);
        info!(
            "mirroring entry `{}` of peer {} as {}/{}",
            adapter.descriptor().label(),
            origin,
            message.channel,
            wire_entry
        );
        channel.insert_inbound(adapter)?;
        Ok(())
    }

    /// The coordinator is gone: drop everything learned from it
    fn reset(&mut self) {
        self.mirror = MirrorTable::new();
        self.candidates.clear();
        self.pending_removals.clear();
        info!("coordinator left, replication state cleared");
    }
}

impl ReplicatorRole for Member {
    fn peer_joined(&mut self, peer: PeerId, address: SocketAddr) {
        if peer == COORDINATOR_PEER_ID && self.config.follow_coordinator_clock {
            info!("joined coordinator at {}, following its clock", address);
            self.peers.join_followed(peer, address);
        } else {
            info!("peer {} at {}", peer, address);
            self.peers.join(peer, address);
        }
    }

    fn peer_left(&mut self, peer: PeerId) {
        self.peers.leave(peer);
        if peer == COORDINATOR_PEER_ID {
            self.reset();
        }
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
        match update {
            ClockUpdate::Follow { target, correction } => match &mut self.context.clock {
                Some(clock) => clock.steer(target, correction),
                None => warn!("asked to follow the clock of peer {} without a clock to steer", peer),
            },
            ClockUpdate::BreakpointAdded(breakpoint) => debug!(
                "clock of peer {} moved, transition {} from remote tick {}",
                peer, breakpoint.transition, breakpoint.boundary
            ),
            ClockUpdate::Seeded | ClockUpdate::Tracked => {}
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
        if peer != COORDINATOR_PEER_ID && at_config_marker(reader) {
            warn!("configuration from peer {} ignored, only the coordinator configures", peer);
        }
        let mut applied = 0;
        while at_config_marker(reader) {
            let decoded = ConfigMessage::read(reader)
                .map_err(|source| ReplicationError::Config { peer, source }.logged(peer))?;
            let Decoded::Message(message) = decoded else {
                break;
            };
            self.stats.config_received += 1;
            if peer == COORDINATOR_PEER_ID {
                self.apply(message)?;
                applied += 1;
            }
        }
        Ok(applied)
    }

    fn send_config(&mut self, tick: TimeTick) -> Result<Vec<OutgoingConfig>, ReplicationError> {
        self.process_notices()?;

        self.stats.config_sent += self.outbox.message_count();
        self.stats.log("member", tick);
        Ok(self.outbox.take())
    }

    fn stop(&mut self, tick: TimeTick) {
        info!("member {} stopping at tick {}", self.local_peer, tick);
        self.control.stop(tick);
    }

    fn should_rearm(&self, next_tick: TimeTick) -> bool {
        self.control.should_rearm(next_tick)
    }

    fn stats(&self) -> &CycleStats {
        &self.stats
    }
}
