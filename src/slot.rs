use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

/// Which of the two pools a slot belongs to. Carried by exhaustion errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotDirection {
    Send,
    Recv,
}

impl fmt::Display for SlotDirection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SlotDirection::Send => write!(f, "send"),
            SlotDirection::Recv => write!(f, "recv"),
        }
    }
}

struct SlotPoolShared {
    free: Mutex<Vec<Box<[u8]>>>,
    direction: SlotDirection,
    depth: usize,
}

/// A fixed-depth pool of reusable, fixed-size datagram buffers.
///
/// Buffers are allocated once, up front. `checkout` leases one for exactly
/// one in-flight operation; dropping the returned [`Slot`] puts the buffer
/// back into circulation. A buffer therefore can never be handed to a new
/// operation while a previous one still references it — once all buffers are
/// leased, `checkout` reports exhaustion instead of reusing a live buffer.
#[derive(Clone)]
pub(crate) struct SlotPool {
    shared: Arc<SlotPoolShared>,
}

impl SlotPool {
    pub fn new(direction: SlotDirection, depth: usize, buffer_size: usize) -> Self {
        let free = (0..depth)
            .map(|_| vec![0u8; buffer_size].into_boxed_slice())
            .collect();
        Self {
            shared: Arc::new(SlotPoolShared {
                free: Mutex::new(free),
                direction,
                depth,
            }),
        }
    }

    /// Leases the next free buffer, or `None` if all are in flight.
    pub fn checkout(&self) -> Option<Slot> {
        let buffer = self.shared.free.lock().unwrap().pop()?;
        Some(Slot {
            buffer: Some(buffer),
            pool: self.shared.clone(),
        })
    }

    pub fn direction(&self) -> SlotDirection {
        self.shared.direction
    }

    pub fn depth(&self) -> usize {
        self.shared.depth
    }
}

/// An exclusive lease on one pool buffer, held for the duration of a single
/// send or receive operation. Returns the buffer to the pool on drop, which
/// is what makes reuse-while-in-flight impossible.
pub(crate) struct Slot {
    buffer: Option<Box<[u8]>>,
    pool: Arc<SlotPoolShared>,
}

impl Deref for Slot {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buffer.as_ref().unwrap()
    }
}

impl DerefMut for Slot {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buffer.as_mut().unwrap()
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.pool.free.lock().unwrap().push(buffer);
        }
    }
}
