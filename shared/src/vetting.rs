//! Optional admission control. The coordinator publishes a request for every
//! joining peer and, without ever blocking, collects whatever verdicts an
//! external policy has sent back so far.

use std::{collections::HashMap, net::SocketAddr};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;

use crate::types::PeerId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeerVetRequest {
    pub peer: PeerId,
    pub address: SocketAddr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeerAcknowledge {
    pub peer: PeerId,
    pub accepted: bool,
}

pub fn vetting_channel() -> (VettingChannel, VettingAuthority) {
    let (request_sender, request_receiver) = unbounded();
    let (ack_sender, ack_receiver) = unbounded();
    (
        VettingChannel {
            requests: request_sender,
            acknowledgements: ack_receiver,
            verdicts: HashMap::new(),
        },
        VettingAuthority {
            requests: request_receiver,
            acknowledgements: ack_sender,
        },
    )
}

/// Coordinator side
pub struct VettingChannel {
    requests: Sender<PeerVetRequest>,
    acknowledgements: Receiver<PeerAcknowledge>,
    verdicts: HashMap<PeerId, bool>,
}

impl VettingChannel {
    pub fn request(&mut self, peer: PeerId, address: SocketAddr) {
        self.verdicts.remove(&peer);
        if self.requests.send(PeerVetRequest { peer, address }).is_err() {
            debug!("vetting authority is gone, peer {} stays undecided", peer);
        }
    }

    /// The verdict received for `peer`, if any
    pub fn verdict(&mut self, peer: PeerId) -> Option<bool> {
        for acknowledge in self.acknowledgements.try_iter() {
            self.verdicts.insert(acknowledge.peer, acknowledge.accepted);
        }
        self.verdicts.get(&peer).copied()
    }

    pub fn forget(&mut self, peer: PeerId) {
        self.verdicts.remove(&peer);
    }
}

/// Policy side, may live on any thread
#[derive(Clone)]
pub struct VettingAuthority {
    requests: Receiver<PeerVetRequest>,
    acknowledgements: Sender<PeerAcknowledge>,
}

impl VettingAuthority {
    pub fn pending_requests(&self) -> Vec<PeerVetRequest> {
        self.requests.try_iter().collect()
    }

    pub fn acknowledge(&self, peer: PeerId, accepted: bool) {
        if self
            .acknowledgements
            .send(PeerAcknowledge { peer, accepted })
            .is_err()
        {
            debug!("coordinator is gone, verdict for peer {} dropped", peer);
        }
    }
}
