/// Policy applied when the receive loop's socket operation itself fails.
///
/// Decode failures are unaffected: they are always reported through the error
/// handler and never interrupt receiving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvErrorPolicy {
    /// Report the error through the error handler and keep receiving.
    Continue,
    /// Report the error through the error handler and stop the receive loop.
    /// Outbound operations remain available until `stop()` is called.
    Halt,
}

/// Contains runtime configuration for the transport engine.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Number of worker threads driving socket completions and payload
    /// decode. Two completions for the same peer may run on different
    /// workers; peer state is guarded internally.
    pub worker_threads: usize,
    /// Size in bytes of every datagram buffer. Datagrams larger than this are
    /// truncated by the OS on receive, and serialization that would overflow
    /// it fails with a `ProtocolError`.
    pub buffer_size: usize,
    /// Number of reusable buffers in each of the send and receive pools.
    /// Must exceed the expected number of concurrently in-flight operations
    /// of one direction; checkout fails once all buffers are leased.
    pub pool_depth: usize,
    /// What to do when a socket receive operation fails.
    pub recv_error_policy: RecvErrorPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            worker_threads: 3,
            buffer_size: 512,
            pool_depth: 256,
            recv_error_policy: RecvErrorPolicy::Continue,
        }
    }
}
