use std::sync::atomic::{AtomicBool, Ordering};

use crate::Element;

/// A one-shot announced write: the slot (identified by its logical
/// position, since slots never move), the value assumed to be there, and
/// the value to install.
///
/// Everything except `completed` is frozen at construction and published
/// through the descriptor swap, so helpers on stale snapshots only ever
/// read immutable data. `completed` flips once, from `false` to `true`.
pub(crate) struct WriteDescriptor<T: Element> {
    pub(crate) pos: usize,
    pub(crate) old: T,
    pub(crate) new: T,
    completed: AtomicBool,
}

impl<T: Element> WriteDescriptor<T> {
    pub(crate) fn new(pos: usize, old: T, new: T) -> Self {
        Self {
            pos,
            old,
            new,
            completed: AtomicBool::new(false),
        }
    }

    /// Whether some thread has already settled this write. A `true` here
    /// means the announced transition is finished, not that the observer
    /// was the thread that performed it.
    #[inline]
    pub(crate) fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn mark_completed(&self) {
        self.completed.store(true, Ordering::Release);
    }
}

/// The vector's atomically-swapped state object.
///
/// `size` is the announced logical length, counting a pending write as
/// already applied. `counter` strictly increases along the succession of
/// installed descriptors, so two descriptors are never equal as values
/// even if an allocator were to reuse an address. `pending` is the write
/// the publishing operation announced; it must be settled before the next
/// state change is computed.
pub(crate) struct Descriptor<T: Element> {
    pub(crate) size: usize,
    pub(crate) counter: u64,
    pub(crate) pending: Option<WriteDescriptor<T>>,
}

impl<T: Element> Descriptor<T> {
    /// The state of a freshly constructed, empty vector.
    pub(crate) fn initial() -> Self {
        Self {
            size: 0,
            counter: 0,
            pending: None,
        }
    }

    /// The successor state: the new size, the next counter value, and the
    /// write that carries the transition.
    pub(crate) fn next(&self, size: usize, pending: WriteDescriptor<T>) -> Self {
        Self {
            size,
            counter: self.counter + 1,
            pending: Some(pending),
        }
    }
}
