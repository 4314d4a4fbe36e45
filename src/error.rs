use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::protocol::ProtocolError;
use crate::slot::SlotDirection;

/// Errors surfaced by the transport, either returned from its public API or
/// delivered to the installed error handler from a worker thread.
///
/// Only `io::ErrorKind` is kept from socket failures so that values stay
/// `Clone` and can be both handed to the error handler and asserted on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// A mutating call was issued while the transport is not running
    #[error("Transport is not running")]
    NotRunning,

    /// `start` was called on a transport that is already running
    #[error("Transport is already running")]
    AlreadyRunning,

    /// The UDP socket could not be bound at startup
    #[error("Failed to bind UDP socket on port {port}: {kind}")]
    Bind { port: u16, kind: io::ErrorKind },

    /// The worker runtime could not be built at startup
    #[error("Failed to start worker runtime with {worker_threads} threads: {kind}")]
    Runtime {
        worker_threads: usize,
        kind: io::ErrorKind,
    },

    /// An asynchronous socket send failed
    #[error("Socket send to {address} failed: {kind}")]
    Send {
        address: SocketAddr,
        kind: io::ErrorKind,
    },

    /// A socket receive operation failed
    #[error("Socket receive failed: {kind}")]
    Recv { kind: io::ErrorKind },

    /// A received datagram could not be decoded. The underlying cause is
    /// deliberately not carried: a malformed datagram from the network is
    /// reported generically and must never terminate a worker.
    #[error("Failed to decode datagram from {address}")]
    Decode { address: SocketAddr },

    /// The peer protocol failed to serialize accumulated payload into a slot
    #[error("Failed to serialize datagram for {address}: {source}")]
    Serialize {
        address: SocketAddr,
        source: ProtocolError,
    },

    /// Every buffer of a slot pool is leased to an in-flight operation
    #[error("All {depth} {direction} slots are checked out")]
    SlotsExhausted {
        direction: SlotDirection,
        depth: usize,
    },
}
