//! # Netplay Transport
//! A peer-to-peer, connectionless UDP transport for real-time
//! synchronization between remote processes. Sits directly above the socket
//! and below an application protocol: it owns socket I/O, per-peer
//! buffering, and datagram dispatch, while the [`PeerProtocol`] capability
//! gives payload bytes their meaning.
//!
//! Deliberately best-effort: no retransmission, no ordering guarantees, no
//! handshakes. What it does guarantee is that a malformed datagram never
//! stalls receiving, that a buffer is never reused while an operation is
//! still in flight, and that shutdown drains rather than corrupts.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

mod config;
mod error;
mod peer;
mod protocol;
mod registry;
mod slot;
mod transport;

pub use config::{RecvErrorPolicy, TransportConfig};
pub use error::TransportError;
pub use peer::PeerSnapshot;
pub use protocol::{PeerProtocol, ProtocolError};
pub use slot::SlotDirection;
pub use transport::Transport;
