use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use crate::{
    element::{Element, Float, Numeric},
    hazard::HazardState,
};

#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash)]
/// An id that identifies a buffer for its whole lifetime.
pub struct HandleId {
    value: u64,
}

static HANDLE_COUNT: AtomicU64 = AtomicU64::new(0);

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleId {
    /// Creates a new id.
    pub fn new() -> Self {
        let value = HANDLE_COUNT.fetch_add(1, Ordering::Relaxed);
        Self { value }
    }
}

/// A buffer of 32-bit words shared between the host and the workers.
///
/// Cloning a handle is cheap and refers to the same memory. The word accessors below are the
/// device side view used by kernels; the host goes through the
/// [client](crate::client::ComputeClient) so that hazards are tracked.
#[derive(Clone)]
pub struct Handle {
    id: HandleId,
    memory: Arc<DeviceMemory>,
}

struct DeviceMemory {
    words: Box<[AtomicU32]>,
    hazard: spin::Mutex<HazardState>,
}

impl core::fmt::Debug for Handle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("len_words", &self.len_words())
            .finish()
    }
}

impl Handle {
    pub(crate) fn from_words<I: IntoIterator<Item = u32>>(words: I) -> Self {
        let words = words.into_iter().map(AtomicU32::new).collect();
        Self {
            id: HandleId::new(),
            memory: Arc::new(DeviceMemory {
                words,
                hazard: spin::Mutex::new(HazardState::default()),
            }),
        }
    }

    pub(crate) fn hazard(&self) -> spin::MutexGuard<'_, HazardState> {
        self.memory.hazard.lock()
    }

    /// The id of the buffer.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// The size of the buffer in words.
    pub fn len_words(&self) -> usize {
        self.memory.words.len()
    }

    /// If both handles refer to the same buffer.
    pub fn is_same(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.memory, &other.memory)
    }

    /// The atomic word at `index`.
    pub fn word(&self, index: usize) -> &AtomicU32 {
        &self.memory.words[index]
    }

    /// Loads an element without ordering constraints.
    pub fn load<E: Element>(&self, index: usize) -> E {
        E::from_word(self.word(index).load(Ordering::Relaxed))
    }

    /// Stores an element without ordering constraints.
    pub fn store<E: Element>(&self, index: usize, value: E) {
        self.word(index).store(value.to_word(), Ordering::Relaxed)
    }

    /// Atomically adds a float to the element at `index`.
    pub fn atomic_add_float<F: Float>(&self, index: usize, value: F) {
        let word = self.word(index);
        let mut current = word.load(Ordering::Relaxed);
        loop {
            let next = F::from_word(current).accumulate(value).to_word();
            match word.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}
