use std::net::SocketAddr;
use std::sync::Mutex;

use crate::protocol::{PeerProtocol, ProtocolError};

/// State tracked for one remote endpoint.
///
/// A peer is created on first contact (first `queue`/`send` to, or first
/// datagram from, an unseen endpoint), owned exclusively by the registry, and
/// destroyed only when the registry is cleared on engine stop. Everything
/// mutable lives behind the peer's own lock: completions for the same peer
/// may run concurrently on different workers, and this lock is what
/// serializes their access to the protocol's accumulation and decode state.
pub struct Peer<P: PeerProtocol> {
    address: SocketAddr,
    state: Mutex<PeerState<P>>,
}

struct PeerState<P> {
    protocol: P,
    stats: PeerStats,
}

#[derive(Debug, Clone, Copy, Default)]
struct PeerStats {
    messages_queued: u64,
    datagrams_sent: u64,
    bytes_sent: u64,
    datagrams_received: u64,
    bytes_received: u64,
}

/// A point-in-time read view of one peer, returned by the registry
/// accessors. Holds no lock and does not keep the peer alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSnapshot {
    /// Last-known endpoint of the remote process.
    pub address: SocketAddr,
    /// Payloads accumulated via `queue` over the peer's lifetime.
    pub messages_queued: u64,
    /// Datagrams serialized and submitted for send.
    pub datagrams_sent: u64,
    /// Bytes serialized and submitted for send.
    pub bytes_sent: u64,
    /// Datagrams received and handed to the protocol for decode.
    pub datagrams_received: u64,
    /// Bytes received and handed to the protocol for decode.
    pub bytes_received: u64,
}

impl<P: PeerProtocol> Peer<P> {
    pub(crate) fn new(address: SocketAddr) -> Self {
        Self {
            address,
            state: Mutex::new(PeerState {
                protocol: P::default(),
                stats: PeerStats::default(),
            }),
        }
    }

    pub(crate) fn address(&self) -> SocketAddr {
        self.address
    }

    /// Accumulates an outbound payload into the protocol state.
    pub(crate) fn queue(&self, payload: P::Payload) {
        let mut state = self.state.lock().unwrap();
        state.protocol.queue(payload);
        state.stats.messages_queued += 1;
    }

    /// Serializes accumulated payload into `sink`, returning bytes written.
    pub(crate) fn serialize_into(&self, sink: &mut [u8]) -> Result<usize, ProtocolError> {
        let mut state = self.state.lock().unwrap();
        let written = state.protocol.serialize(sink)?;
        state.stats.datagrams_sent += 1;
        state.stats.bytes_sent += written as u64;
        Ok(written)
    }

    /// Decodes one received datagram, invoking `emit` per message.
    pub(crate) fn decode(
        &self,
        source: &[u8],
        emit: &mut dyn FnMut(P::Payload),
    ) -> Result<(), ProtocolError> {
        let mut state = self.state.lock().unwrap();
        state.stats.datagrams_received += 1;
        state.stats.bytes_received += source.len() as u64;
        state.protocol.decode(source, emit)
    }

    pub(crate) fn snapshot(&self) -> PeerSnapshot {
        let state = self.state.lock().unwrap();
        PeerSnapshot {
            address: self.address,
            messages_queued: state.stats.messages_queued,
            datagrams_sent: state.stats.datagrams_sent,
            bytes_sent: state.stats.bytes_sent,
            datagrams_received: state.stats.datagrams_received,
            bytes_received: state.stats.bytes_received,
        }
    }
}
