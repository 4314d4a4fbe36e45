use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use crate::error::TransportError;

/// Callback invoked with every transport or decode error.
pub type ErrorHandler = dyn Fn(TransportError) + Send + Sync;

/// Callback invoked once per reconstructed inbound message.
pub type ReceiveHandler<D> = dyn Fn(SocketAddr, D) + Send + Sync;

/// User-installed callbacks, shared with every worker.
///
/// Handlers run on whichever worker completes the operation; no thread
/// identity is guaranteed and two invocations may overlap. Dispatch clones
/// the handler out of the slot before calling it, so a handler may itself
/// call `queue`/`send` or replace handlers without deadlocking.
///
/// When no handler is installed the event is logged instead of silently
/// dropped.
pub(crate) struct Handlers<D> {
    on_error: Mutex<Option<Arc<ErrorHandler>>>,
    on_receive: Mutex<Option<Arc<ReceiveHandler<D>>>>,
}

impl<D> Handlers<D> {
    pub fn new() -> Self {
        Self {
            on_error: Mutex::new(None),
            on_receive: Mutex::new(None),
        }
    }

    pub fn set_error_handler(&self, handler: impl Fn(TransportError) + Send + Sync + 'static) {
        *self.on_error.lock().unwrap() = Some(Arc::new(handler));
    }

    pub fn set_receive_handler(&self, handler: impl Fn(SocketAddr, D) + Send + Sync + 'static) {
        *self.on_receive.lock().unwrap() = Some(Arc::new(handler));
    }

    pub fn dispatch_error(&self, error: TransportError) {
        let handler = self.on_error.lock().unwrap().clone();
        match handler {
            Some(handler) => handler(error),
            None => log::warn!("Transport error (no error handler installed): {}", error),
        }
    }

    pub fn dispatch_receive(&self, address: SocketAddr, payload: D) {
        let handler = self.on_receive.lock().unwrap().clone();
        match handler {
            Some(handler) => handler(address, payload),
            None => log::warn!(
                "Dropping decoded message from {}: no receive handler installed",
                address
            ),
        }
    }
}
