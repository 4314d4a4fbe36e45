//! The asynchronous UDP transport engine.
//!
//! Owns the socket, the worker runtime, both slot pools, the peer registry
//! and the user-installed handlers. Drives the continuous receive cycle and
//! the per-call send cycle; payload meaning is delegated to the peer
//! protocol capability.

mod handlers;
mod lifecycle;

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::runtime::Runtime;

use crate::config::{RecvErrorPolicy, TransportConfig};
use crate::error::TransportError;
use crate::peer::PeerSnapshot;
use crate::protocol::PeerProtocol;
use crate::registry::PeerRegistry;
use crate::slot::{Slot, SlotDirection, SlotPool};

use self::handlers::Handlers;
use self::lifecycle::Lifecycle;

/// How long `stop` waits for workers to finish in-flight completions before
/// abandoning them.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Everything that only exists while the transport is running.
struct Io {
    runtime: Runtime,
    socket: Arc<UdpSocket>,
    send_slots: SlotPool,
    local_port: u16,
}

/// A connectionless UDP transport for real-time synchronization between
/// remote processes.
///
/// One logical instance per bound port. Generic over the [`PeerProtocol`]
/// capability that gives payload bytes their meaning; the engine itself only
/// moves opaque datagrams, keeps one peer per observed endpoint, and rotates
/// fixed-size reusable buffers through in-flight operations.
///
/// All methods take `&self`; the transport is `Send + Sync` and can be
/// shared across threads behind an `Arc`. `start`/`stop` serialize against
/// each other through an internal lifecycle state machine. Handlers run on
/// unspecified worker threads and may call `queue`/`send`, but must not call
/// `stop` (it joins the worker threads the handler runs on).
pub struct Transport<P: PeerProtocol> {
    config: TransportConfig,
    lifecycle: Arc<Lifecycle>,
    registry: Arc<PeerRegistry<P>>,
    handlers: Arc<Handlers<P::Payload>>,
    io: Mutex<Option<Io>>,
}

impl<P: PeerProtocol> Transport<P> {
    /// Creates a stopped transport. No socket is bound and no threads are
    /// spawned until [`start`](Self::start).
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            lifecycle: Arc::new(Lifecycle::new()),
            registry: Arc::new(PeerRegistry::new()),
            handlers: Arc::new(Handlers::new()),
            io: Mutex::new(None),
        }
    }

    /// Binds a UDP socket on the wildcard address at `port` (0 for an
    /// OS-assigned port), spawns the configured number of worker threads and
    /// arms the first receive.
    ///
    /// Fails with [`TransportError::AlreadyRunning`] if the transport is not
    /// stopped. A transport that has been stopped may be started again.
    pub fn start(&self, port: u16) -> Result<(), TransportError> {
        if !self.lifecycle.begin_start() {
            return Err(TransportError::AlreadyRunning);
        }

        let worker_threads = self.config.worker_threads;
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .thread_name("netplay-transport")
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(error) => {
                self.lifecycle.abort_start();
                return Err(TransportError::Runtime {
                    worker_threads,
                    kind: error.kind(),
                });
            }
        };

        let socket = match runtime.block_on(UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))) {
            Ok(socket) => socket,
            Err(error) => {
                self.lifecycle.abort_start();
                return Err(TransportError::Bind {
                    port,
                    kind: error.kind(),
                });
            }
        };
        let local_port = match socket.local_addr() {
            Ok(address) => address.port(),
            Err(error) => {
                self.lifecycle.abort_start();
                return Err(TransportError::Bind {
                    port,
                    kind: error.kind(),
                });
            }
        };

        let socket = Arc::new(socket);
        let send_slots = SlotPool::new(
            SlotDirection::Send,
            self.config.pool_depth,
            self.config.buffer_size,
        );
        let recv_slots = SlotPool::new(
            SlotDirection::Recv,
            self.config.pool_depth,
            self.config.buffer_size,
        );

        let handle = runtime.handle().clone();
        *self.io.lock().unwrap() = Some(Io {
            runtime,
            socket: socket.clone(),
            send_slots,
            local_port,
        });
        self.lifecycle.confirm_start();

        handle.spawn(receive_loop(
            socket,
            self.lifecycle.clone(),
            self.registry.clone(),
            self.handlers.clone(),
            recv_slots,
            self.config.recv_error_policy,
        ));

        log::info!(
            "Transport started on port {} with {} worker threads",
            local_port,
            worker_threads
        );
        Ok(())
    }

    /// Stops the transport: closes the socket (cancelling parked I/O), joins
    /// the worker threads and clears the peer registry. Completions still in
    /// flight when the flag flips are dropped, not dispatched.
    ///
    /// Idempotent; a no-op unless the transport is running. Must not be
    /// called from inside a handler.
    pub fn stop(&self) {
        if !self.lifecycle.begin_stop() {
            return;
        }
        log::info!("Transport stopping");

        let io = self.io.lock().unwrap().take();
        if let Some(io) = io {
            // Dropping the runtime closes the socket; the bounded timeout
            // lets completions already executing finish first.
            io.runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
        }
        self.registry.clear();

        self.lifecycle.confirm_stop();
        log::info!("Transport stopped");
    }

    /// Accumulates `payload` for `address`, creating the peer on first
    /// contact. Performs no network I/O; accumulated payloads leave the
    /// process on the next [`send`](Self::send) to the same endpoint.
    pub fn queue(&self, address: SocketAddr, payload: P::Payload) -> Result<(), TransportError> {
        if !self.lifecycle.is_running() {
            return Err(TransportError::NotRunning);
        }
        self.registry.find_or_create(address).queue(payload);
        Ok(())
    }

    /// Serializes everything accumulated for `address` into a send slot and
    /// submits one asynchronous UDP send. Returns the serialized length.
    ///
    /// The send completion is fire-and-forget on success; a send failure is
    /// reported through the error handler from a worker thread.
    pub fn send(&self, address: SocketAddr) -> Result<usize, TransportError> {
        if !self.lifecycle.is_running() {
            return Err(TransportError::NotRunning);
        }

        let (socket, handle, mut slot) = {
            let io = self.io.lock().unwrap();
            let Some(io) = io.as_ref() else {
                return Err(TransportError::NotRunning);
            };
            let slot = io
                .send_slots
                .checkout()
                .ok_or(TransportError::SlotsExhausted {
                    direction: io.send_slots.direction(),
                    depth: io.send_slots.depth(),
                })?;
            (io.socket.clone(), io.runtime.handle().clone(), slot)
        };

        let peer = self.registry.find_or_create(address);
        let written = peer
            .serialize_into(&mut slot)
            .map_err(|source| TransportError::Serialize { address, source })?;

        let lifecycle = self.lifecycle.clone();
        let handlers = self.handlers.clone();
        handle.spawn(async move {
            if let Err(error) = socket.send_to(&slot[..written], address).await {
                if lifecycle.is_running() {
                    handlers.dispatch_error(TransportError::Send {
                        address,
                        kind: error.kind(),
                    });
                }
            }
            // Slot returns to the pool here, after the completion.
        });

        log::trace!("Submitted {} byte datagram to {}", written, address);
        Ok(written)
    }

    /// Snapshots every peer observed since the last start. Empty once the
    /// transport has been stopped.
    pub fn peers(&self) -> Vec<PeerSnapshot> {
        self.registry.snapshots()
    }

    /// Snapshots the peer for `address`, if one has been observed. Never
    /// creates a peer; creation happens only through `queue`, `send`, or an
    /// inbound datagram.
    pub fn peer(&self, address: SocketAddr) -> Option<PeerSnapshot> {
        self.registry.get(address).map(|peer| peer.snapshot())
    }

    /// The port the socket is bound to, while running.
    pub fn port(&self) -> Option<u16> {
        self.io.lock().unwrap().as_ref().map(|io| io.local_port)
    }

    /// Installs or replaces the error handler. Invoked from arbitrary worker
    /// threads; without one, errors are logged at warn level.
    pub fn set_error_handler(&self, handler: impl Fn(TransportError) + Send + Sync + 'static) {
        self.handlers.set_error_handler(handler);
    }

    /// Installs or replaces the receive handler, invoked once per
    /// reconstructed inbound message from arbitrary worker threads. Without
    /// one, decoded messages are logged and dropped.
    pub fn set_receive_handler(
        &self,
        handler: impl Fn(SocketAddr, P::Payload) + Send + Sync + 'static,
    ) {
        self.handlers.set_receive_handler(handler);
    }
}

impl<P: PeerProtocol> Drop for Transport<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The continuous receive cycle: one receive outstanding at a time, re-armed
/// before the completed datagram is processed.
async fn receive_loop<P: PeerProtocol>(
    socket: Arc<UdpSocket>,
    lifecycle: Arc<Lifecycle>,
    registry: Arc<PeerRegistry<P>>,
    handlers: Arc<Handlers<P::Payload>>,
    recv_slots: SlotPool,
    policy: RecvErrorPolicy,
) {
    log::debug!("Receive loop armed");
    loop {
        if !lifecycle.is_running() {
            break;
        }

        let Some(mut slot) = recv_slots.checkout() else {
            handlers.dispatch_error(TransportError::SlotsExhausted {
                direction: recv_slots.direction(),
                depth: recv_slots.depth(),
            });
            tokio::task::yield_now().await;
            continue;
        };

        match socket.recv_from(&mut slot).await {
            Ok((length, address)) => {
                if !lifecycle.is_running() {
                    // Shutdown drain: the completion is dropped.
                    break;
                }
                // Hand the datagram to another worker and loop straight back
                // into recv_from, so decode latency never blocks inbound
                // throughput.
                let lifecycle = lifecycle.clone();
                let registry = registry.clone();
                let handlers = handlers.clone();
                tokio::spawn(async move {
                    process_datagram(slot, length, address, &lifecycle, &registry, &handlers);
                });
            }
            Err(error) => {
                if !lifecycle.is_running() {
                    break;
                }
                handlers.dispatch_error(TransportError::Recv { kind: error.kind() });
                if policy == RecvErrorPolicy::Halt {
                    log::warn!("Receive loop halted by policy after socket error");
                    break;
                }
            }
        }
    }
    log::debug!("Receive loop exited");
}

/// Decodes one completed datagram and dispatches its messages. Any decode
/// failure is collapsed to a generic error so a malformed datagram can
/// neither terminate a worker nor stall subsequent receives.
fn process_datagram<P: PeerProtocol>(
    slot: Slot,
    length: usize,
    address: SocketAddr,
    lifecycle: &Lifecycle,
    registry: &PeerRegistry<P>,
    handlers: &Handlers<P::Payload>,
) {
    if !lifecycle.is_running() {
        return;
    }

    let peer = registry.find_or_create(address);

    // Collect under the peer lock, dispatch after releasing it: handlers may
    // call back into the transport and must not run while holding peer state.
    let mut messages = Vec::new();
    let result = peer.decode(&slot[..length], &mut |payload| messages.push(payload));

    // Messages reconstructed before a mid-datagram failure are delivered.
    for payload in messages {
        handlers.dispatch_receive(address, payload);
    }
    if result.is_err() {
        handlers.dispatch_error(TransportError::Decode { address });
    }
    // Slot drops here: the buffer re-enters circulation only after its
    // completion has been fully processed.
    drop(slot);
}
