use thiserror::Error;

/// Errors that can occur inside a peer protocol implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The serialized datagram would not fit into the provided sink
    #[error("Serialized datagram of {required} bytes exceeds the {capacity} byte buffer")]
    SinkOverflow { required: usize, capacity: usize },

    /// A received datagram could not be interpreted
    #[error("Malformed datagram: {reason}")]
    Malformed { reason: &'static str },
}

/// The per-peer serialization capability consumed by the transport.
///
/// The transport owns socket I/O and buffering but treats payload layout as
/// opaque: every peer carries one `PeerProtocol` value holding its outbound
/// accumulation and inbound decode state, and the engine calls into it at the
/// three points below. A fresh value is created (via `Default`) the first
/// time an endpoint is seen.
///
/// All calls for one peer are made under that peer's lock, so implementations
/// need no internal synchronization, but they run on arbitrary worker
/// threads and must be `Send`.
pub trait PeerProtocol: Default + Send + 'static {
    /// The application-level message type carried by this protocol.
    type Payload: Send + 'static;

    /// Accumulates an outbound payload. No I/O happens here; accumulated
    /// payloads leave the process on the next `serialize` + send.
    fn queue(&mut self, payload: Self::Payload);

    /// Serializes everything accumulated so far into `sink`, returning the
    /// number of bytes written. Returning `Ok(0)` is valid and produces an
    /// empty datagram. Payloads that were serialized must not be emitted
    /// again by a later call.
    fn serialize(&mut self, sink: &mut [u8]) -> Result<usize, ProtocolError>;

    /// Decodes one received datagram, invoking `emit` once per reconstructed
    /// message. A single datagram may yield zero, one, or many messages.
    fn decode(
        &mut self,
        source: &[u8],
        emit: &mut dyn FnMut(Self::Payload),
    ) -> Result<(), ProtocolError>;
}
