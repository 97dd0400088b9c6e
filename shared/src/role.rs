use std::net::SocketAddr;

use chanrep_serde::{ByteReader, ByteWriter};
use log::debug;

use crate::{
    configuration::OutgoingConfig,
    error::ReplicationError,
    peer::Admission,
    types::{PeerId, TimeTick},
};

/// The hooks a transport session drives, once per cycle and on connection
/// events. Implemented by both the coordinator and the member so the session
/// never needs to know which one it runs.
pub trait ReplicatorRole {
    fn peer_joined(&mut self, peer: PeerId, address: SocketAddr);

    fn peer_left(&mut self, peer: PeerId);

    /// Append ready data of every active exported entry. Items that do not
    /// fit wait for the next cycle. Returns the number of records written.
    fn pack_payload(&mut self, writer: &mut ByteWriter) -> usize;

    /// Apply a payload received from `peer`, stamped by it with
    /// `remote_tick` and received at `local_tick`. Configuration messages
    /// embedded between the data records are applied in order.
    fn unpack_payload(
        &mut self,
        reader: &mut ByteReader,
        peer: PeerId,
        local_tick: TimeTick,
        remote_tick: TimeTick,
    ) -> Result<(), ReplicationError>;

    /// Apply every complete configuration message at the front of `reader`.
    /// An incomplete message is left unread. Returns how many were applied.
    fn decode_config(&mut self, reader: &mut ByteReader, peer: PeerId) -> Result<usize, ReplicationError>;

    /// Run the configuration step of the cycle: drain entry notices and
    /// produce the messages they lead to
    fn send_config(&mut self, tick: TimeTick) -> Result<Vec<OutgoingConfig>, ReplicationError>;

    fn stop(&mut self, tick: TimeTick);

    fn should_rearm(&self, next_tick: TimeTick) -> bool;

    fn stats(&self) -> &CycleStats;
}

pub trait CoordinatorRole: ReplicatorRole {
    /// Non-blocking admission check for a joining peer
    fn authorize_peer(&mut self, peer: PeerId) -> Admission;

    /// The full current configuration, for a peer that was just accepted
    fn send_welcome_config(&mut self, peer: PeerId) -> Result<Vec<OutgoingConfig>, ReplicationError>;
}

/// Running counters of a role
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub records_written: usize,
    pub records_deferred: usize,
    pub records_received: usize,
    pub records_discarded: usize,
    pub records_skipped: usize,
    pub config_sent: usize,
    pub config_received: usize,
}

impl CycleStats {
    pub fn log(&self, role: &str, tick: TimeTick) {
        debug!(
            "{} at tick {}: records written {} deferred {} received {} discarded {} skipped {}, config sent {} received {}",
            role,
            tick,
            self.records_written,
            self.records_deferred,
            self.records_received,
            self.records_discarded,
            self.records_skipped,
            self.config_sent,
            self.config_received
        );
    }
}

/// Stop handling. Stopping lets the cycle in flight finish and only keeps
/// later cycles from being scheduled.
#[derive(Clone, Copy, Debug, Default)]
pub struct CycleControl {
    stop_tick: Option<TimeTick>,
}

impl CycleControl {
    pub fn stop(&mut self, tick: TimeTick) {
        self.stop_tick = Some(self.stop_tick.map_or(tick, |stop| stop.min(tick)));
    }

    pub fn is_stopping(&self) -> bool {
        self.stop_tick.is_some()
    }

    pub fn should_rearm(&self, next_tick: TimeTick) -> bool {
        self.stop_tick.map_or(true, |stop| next_tick < stop)
    }
}
