use std::sync::atomic::{AtomicU8, Ordering};

const STOPPED: u8 = 0;
const STARTING: u8 = 1;
const RUNNING: u8 = 2;
const STOPPING: u8 = 3;

/// Atomic lifecycle state shared by the public API and every worker.
///
/// Replaces a plain running flag with the full
/// Stopped → Starting → Running → Stopping → Stopped cycle so that
/// concurrent `start`/`stop` calls resolve by compare-and-swap instead of
/// racing, and so workers observe shutdown promptly: transitions publish
/// with release ordering, checks read with acquire ordering.
pub(crate) struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(STOPPED),
        }
    }

    /// True while the transport accepts data-plane work.
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }

    /// Claims the exclusive right to start. Fails if the transport is
    /// anywhere but Stopped.
    pub fn begin_start(&self) -> bool {
        self.state
            .compare_exchange(STOPPED, STARTING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Publishes a successful start.
    pub fn confirm_start(&self) {
        self.state.store(RUNNING, Ordering::Release);
    }

    /// Rolls a failed start back to Stopped.
    pub fn abort_start(&self) {
        self.state.store(STOPPED, Ordering::Release);
    }

    /// Claims the exclusive right to stop. Fails if the transport is not
    /// Running; from that moment on `is_running` reports false to all
    /// workers, which is what drains in-flight completions.
    pub fn begin_stop(&self) -> bool {
        self.state
            .compare_exchange(RUNNING, STOPPING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Publishes a completed stop.
    pub fn confirm_stop(&self) {
        self.state.store(STOPPED, Ordering::Release);
    }
}
