//! Runs one coordinator and any number of members in lockstep, moving
//! configuration buffers and data payloads between them in memory.

use std::net::SocketAddr;

use chanrep_coordinator::{Coordinator, CoordinatorConfig};
use chanrep_member::{Member, MemberConfig};
use chanrep_shared::{
    Admission, BufferPool, ClockSteering, ConfigMessage, ConfigStream, CoordinatorRole,
    DataClassRegistry, Decoded, OutgoingConfig, PeerId, Recipient, ReplicationConfig,
    ReplicationContext, ReplicationError, ReplicatorRole, TimeTick, COORDINATOR_PEER_ID,
};

use crate::{memory_channels::MemoryChannels, test_classes::data_classes};

/// Tick the coordinator's clock starts at, leaving room for members whose
/// clocks run behind
pub const START_TICK: TimeTick = 10_000;

fn peer_address(peer: PeerId) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 14190 + peer))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Membership {
    Pending,
    Accepted,
    Rejected,
}

pub struct MemberNode {
    pub id: PeerId,
    pub member: Member,
    pub channels: MemoryChannels,
    /// Added to the coordinator's tick to get this member's local tick
    pub clock_offset: i64,
    pub membership: Membership,
    from_coordinator: ConfigStream,
    to_coordinator: ConfigStream,
}

impl MemberNode {
    pub fn local_tick(&self, coordinator_tick: TimeTick) -> TimeTick {
        TimeTick::try_from(i64::from(coordinator_tick) + self.clock_offset)
            .expect("member clock offset keeps ticks in range")
    }
}

pub struct Loopback {
    pub coordinator: Coordinator,
    pub coordinator_channels: MemoryChannels,
    pub members: Vec<MemberNode>,
    replication: ReplicationConfig,
    pool: BufferPool,
    tick: TimeTick,
    frame_splitter: Option<fastrand::Rng>,
}

impl Loopback {
    pub fn new(
        channels: &[&str],
        replication: ReplicationConfig,
        require_vetting: bool,
    ) -> Result<Self, ReplicationError> {
        let coordinator_channels = MemoryChannels::new();
        Self::with_coordinator_channels(channels, replication, require_vetting, coordinator_channels)
    }

    /// Like `new`, for a coordinator whose channels already hold entries
    pub fn with_coordinator_channels(
        channels: &[&str],
        replication: ReplicationConfig,
        require_vetting: bool,
        coordinator_channels: MemoryChannels,
    ) -> Result<Self, ReplicationError> {
        let config = CoordinatorConfig {
            replication: replication.clone(),
            channels: channels.iter().map(|name| name.to_string()).collect(),
            require_vetting,
        };
        let context = ReplicationContext::new(Box::new(coordinator_channels.clone()), data_classes());
        let coordinator = Coordinator::new(config, context)?;
        let pool = BufferPool::new(4, replication.payload_capacity);

        Ok(Self {
            coordinator,
            coordinator_channels,
            members: Vec::new(),
            replication,
            pool,
            tick: START_TICK,
            frame_splitter: None,
        })
    }

    /// Deliver configuration buffers in randomly sized pieces
    pub fn split_frames(&mut self, seed: u64) {
        self.frame_splitter = Some(fastrand::Rng::with_seed(seed));
    }

    pub fn tick(&self) -> TimeTick {
        self.tick
    }

    pub fn add_member(&mut self, id: PeerId, clock_offset: i64) -> MemoryChannels {
        let config = MemberConfig {
            replication: self.replication.clone(),
            follow_coordinator_clock: false,
        };
        self.add_member_on(id, clock_offset, config, MemoryChannels::new(), data_classes(), None)
    }

    /// Add a member, handing it `channels` as its channel subsystem
    pub fn add_member_on(
        &mut self,
        id: PeerId,
        clock_offset: i64,
        config: MemberConfig,
        channels: MemoryChannels,
        data_classes: DataClassRegistry,
        clock: Option<Box<dyn ClockSteering>>,
    ) -> MemoryChannels {
        let mut context = ReplicationContext::new(Box::new(channels.clone()), data_classes);
        if let Some(clock) = clock {
            context = context.with_clock(clock);
        }
        self.add_member_node(id, clock_offset, config, context, channels)
    }

    fn add_member_node(
        &mut self,
        id: PeerId,
        clock_offset: i64,
        config: MemberConfig,
        context: ReplicationContext,
        channels: MemoryChannels,
    ) -> MemoryChannels {
        let mut member = Member::new(config, context, id);
        member.peer_joined(COORDINATOR_PEER_ID, peer_address(COORDINATOR_PEER_ID));
        self.coordinator.peer_joined(id, peer_address(id));

        self.members.push(MemberNode {
            id,
            member,
            channels: channels.clone(),
            clock_offset,
            membership: Membership::Pending,
            from_coordinator: ConfigStream::new(),
            to_coordinator: ConfigStream::new(),
        });
        channels
    }

    pub fn member(&self, id: PeerId) -> &MemberNode {
        self.members
            .iter()
            .find(|node| node.id == id)
            .expect("member exists")
    }

    /// The connection to member `id` drops
    pub fn disconnect(&mut self, id: PeerId) {
        self.coordinator.peer_left(id);
        self.members.retain(|node| node.id != id);
        for node in &mut self.members {
            node.member.peer_left(id);
        }
    }

    /// Payload buffers not yet returned to the pool
    pub fn pool_outstanding(&self) -> usize {
        self.pool.outstanding()
    }

    pub fn steps(&mut self, count: usize) -> Result<(), ReplicationError> {
        for _ in 0..count {
            self.step()?;
        }
        Ok(())
    }

    /// One cycle of every node: admission, configuration from the
    /// coordinator, configuration from members, then data all-to-all
    pub fn step(&mut self) -> Result<(), ReplicationError> {
        self.admit()?;

        let outgoing = self.coordinator.send_config(self.tick)?;
        for buffer in outgoing {
            self.deliver_to_members(&buffer)?;
        }

        for index in 0..self.members.len() {
            if self.members[index].membership != Membership::Accepted {
                continue;
            }
            let local_tick = self.members[index].local_tick(self.tick);
            let outgoing = self.members[index].member.send_config(local_tick)?;
            for buffer in outgoing {
                self.deliver_to_coordinator(index, &buffer)?;
            }
        }

        self.exchange_data()?;
        self.tick += 1;
        Ok(())
    }

    fn admit(&mut self) -> Result<(), ReplicationError> {
        for index in 0..self.members.len() {
            if self.members[index].membership != Membership::Pending {
                continue;
            }
            let id = self.members[index].id;
            match self.coordinator.authorize_peer(id) {
                Admission::Accept => {
                    self.members[index].membership = Membership::Accepted;
                    let welcome = self.coordinator.send_welcome_config(id)?;
                    for buffer in welcome {
                        self.deliver_to_members(&buffer)?;
                    }
                }
                Admission::Reject => {
                    self.members[index].membership = Membership::Rejected;
                    self.coordinator.peer_left(id);
                }
                Admission::Delay => {}
            }
        }
        Ok(())
    }

    fn deliver_to_members(&mut self, buffer: &OutgoingConfig) -> Result<(), ReplicationError> {
        let frames = split(&mut self.frame_splitter, &buffer.bytes);
        for node in &mut self.members {
            let addressed = match buffer.recipient {
                Recipient::Everyone => node.membership == Membership::Accepted,
                Recipient::Peer(peer) => peer == node.id,
            };
            if !addressed {
                continue;
            }
            for frame in &frames {
                node.from_coordinator.push(frame);
                let member = &mut node.member;
                node.from_coordinator
                    .consume_with(|reader| member.decode_config(reader, COORDINATOR_PEER_ID))?;
            }
        }
        Ok(())
    }

    fn deliver_to_coordinator(
        &mut self,
        index: usize,
        buffer: &OutgoingConfig,
    ) -> Result<(), ReplicationError> {
        let frames = split(&mut self.frame_splitter, &buffer.bytes);
        let node = &mut self.members[index];
        for frame in &frames {
            node.to_coordinator.push(frame);
            let coordinator = &mut self.coordinator;
            let peer = node.id;
            node.to_coordinator
                .consume_with(|reader| coordinator.decode_config(reader, peer))?;
        }
        Ok(())
    }

    fn exchange_data(&mut self) -> Result<(), ReplicationError> {
        let mut buffer = self.pool.claim()?;
        if self.coordinator.pack_payload(buffer.writer()) > 0 {
            for node in &mut self.members {
                if node.membership != Membership::Accepted {
                    continue;
                }
                let local_tick = node.local_tick(self.tick);
                node.member.unpack_payload(
                    &mut buffer.reader(),
                    COORDINATOR_PEER_ID,
                    local_tick,
                    self.tick,
                )?;
            }
        }
        drop(buffer);

        for sender in 0..self.members.len() {
            if self.members[sender].membership != Membership::Accepted {
                continue;
            }
            let mut buffer = self.pool.claim()?;
            if self.members[sender].member.pack_payload(buffer.writer()) == 0 {
                continue;
            }
            let sender_id = self.members[sender].id;
            let sender_tick = self.members[sender].local_tick(self.tick);

            self.coordinator
                .unpack_payload(&mut buffer.reader(), sender_id, self.tick, sender_tick)?;
            for receiver in 0..self.members.len() {
                if receiver == sender || self.members[receiver].membership != Membership::Accepted {
                    continue;
                }
                let local_tick = self.members[receiver].local_tick(self.tick);
                self.members[receiver].member.unpack_payload(
                    &mut buffer.reader(),
                    sender_id,
                    local_tick,
                    sender_tick,
                )?;
            }
        }
        Ok(())
    }
}

fn split(splitter: &mut Option<fastrand::Rng>, bytes: &[u8]) -> Vec<Vec<u8>> {
    let Some(rng) = splitter else {
        return vec![bytes.to_vec()];
    };
    let mut frames = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        let length = rng.usize(1..=rest.len());
        let (frame, tail) = rest.split_at(length);
        frames.push(frame.to_vec());
        rest = tail;
    }
    frames
}

/// Every configuration message in `outgoing`, in order
pub fn decode_all(outgoing: &[OutgoingConfig]) -> Vec<ConfigMessage> {
    let mut stream = ConfigStream::new();
    let mut messages = Vec::new();
    for buffer in outgoing {
        stream.push(&buffer.bytes);
        while let Decoded::Message(message) = stream.next_message().expect("well-formed configuration") {
            messages.push(message);
        }
    }
    assert_eq!(stream.pending_bytes(), 0, "trailing partial message");
    messages
}
