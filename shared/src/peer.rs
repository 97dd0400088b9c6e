use std::{collections::BTreeMap, net::SocketAddr};

use log::info;

use crate::{
    config::ClockConfig,
    time::{ClockTranslator, ClockUpdate},
    types::{PeerId, TimeTick},
};

/// Answer of the coordinator's admission check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Accept,
    Reject,
    /// No verdict yet, ask again next cycle
    Delay,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdmissionState {
    Vetting,
    Accepted,
    Rejected,
}

/// A remote process this role exchanges data with
pub struct Peer {
    id: PeerId,
    address: Option<SocketAddr>,
    admission: AdmissionState,
    translator: ClockTranslator,
}

impl Peer {
    pub fn new(id: PeerId, address: Option<SocketAddr>, clock: &ClockConfig) -> Self {
        Self {
            id,
            address,
            admission: AdmissionState::Vetting,
            translator: ClockTranslator::new(clock),
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn address(&self) -> Option<SocketAddr> {
        self.address
    }

    pub fn admission(&self) -> AdmissionState {
        self.admission
    }

    pub fn set_admission(&mut self, admission: AdmissionState) {
        self.admission = admission;
    }

    pub fn translator(&self) -> &ClockTranslator {
        &self.translator
    }
}

/// The peers a role has heard from, each with its own clock translator
pub struct PeerTable {
    clock: ClockConfig,
    peers: BTreeMap<PeerId, Peer>,
}

impl PeerTable {
    pub fn new(clock: ClockConfig) -> Self {
        Self {
            clock,
            peers: BTreeMap::new(),
        }
    }

    /// Register a peer the transport reported. An entry created earlier by
    /// first contact learns its address.
    pub fn join(&mut self, id: PeerId, address: SocketAddr) -> &mut Peer {
        let clock = &self.clock;
        let peer = self
            .peers
            .entry(id)
            .or_insert_with(|| Peer::new(id, Some(address), clock));
        peer.address = Some(address);
        peer
    }

    /// Like `join`, but the peer's translator follows its clock instead of
    /// tracking drift
    pub fn join_followed(&mut self, id: PeerId, address: SocketAddr) -> &mut Peer {
        let follow = ClockConfig {
            follow_remote: true,
            ..self.clock.clone()
        };
        let peer = self
            .peers
            .entry(id)
            .or_insert_with(|| Peer::new(id, Some(address), &follow));
        if !peer.translator.follows_remote() {
            peer.translator = ClockTranslator::new(&follow);
        }
        peer.address = Some(address);
        peer
    }

    pub fn leave(&mut self, id: PeerId) -> Option<Peer> {
        self.peers.remove(&id)
    }

    pub fn get(&self, id: PeerId) -> Option<&Peer> {
        self.peers.get(&id)
    }

    pub fn get_mut(&mut self, id: PeerId) -> Option<&mut Peer> {
        self.peers.get_mut(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.peers.keys().copied()
    }

    pub fn accepted(&self) -> impl Iterator<Item = &Peer> {
        self.peers
            .values()
            .filter(|peer| peer.admission == AdmissionState::Accepted)
    }

    /// Feed a timing sample into the peer's translator, creating the peer on
    /// first contact
    pub fn observe(&mut self, id: PeerId, local_tick: TimeTick, remote_tick: TimeTick) -> (&Peer, ClockUpdate) {
        let clock = &self.clock;
        let peer = self.peers.entry(id).or_insert_with(|| {
            info!("first contact with peer {}", id);
            Peer::new(id, None, clock)
        });
        let update = peer.translator.update(local_tick, remote_tick);
        (peer, update)
    }
}
