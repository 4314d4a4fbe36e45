use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use crate::peer::{Peer, PeerSnapshot};
use crate::protocol::PeerProtocol;

/// Maps endpoints to peers.
///
/// Entries are created lazily on first contact and removed only en masse by
/// `clear` when the engine stops. Lookup and insert happen inside one short
/// critical section, so concurrent first contact with the same endpoint
/// yields exactly one peer; identical `(address, port)` pairs always resolve
/// to the same entry.
pub(crate) struct PeerRegistry<P: PeerProtocol> {
    peers: Mutex<HashMap<SocketAddr, Arc<Peer<P>>>>,
}

impl<P: PeerProtocol> PeerRegistry<P> {
    pub fn new() -> Self {
        Self {
            peers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the peer for `address`, creating it on first observation.
    pub fn find_or_create(&self, address: SocketAddr) -> Arc<Peer<P>> {
        let mut peers = self.peers.lock().unwrap();
        peers
            .entry(address)
            .or_insert_with(|| Arc::new(Peer::new(address)))
            .clone()
    }

    /// Returns the peer for `address` if it has been observed. Unlike
    /// `find_or_create` this never creates an entry.
    pub fn get(&self, address: SocketAddr) -> Option<Arc<Peer<P>>> {
        self.peers.lock().unwrap().get(&address).cloned()
    }

    /// Snapshots every known peer.
    pub fn snapshots(&self) -> Vec<PeerSnapshot> {
        let peers = self.peers.lock().unwrap();
        peers.values().map(|peer| peer.snapshot()).collect()
    }

    /// Removes every peer. Outstanding `Arc` references held by in-flight
    /// completions stay valid; the entries just stop being reachable.
    pub fn clear(&self) {
        self.peers.lock().unwrap().clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.peers.lock().unwrap().len()
    }
}
