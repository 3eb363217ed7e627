use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use crossbeam::atomic::AtomicCell;

use crate::Element;

mod buckets;
mod descriptor;
mod error;

pub mod prelude;

pub use buckets::{FIRST_BUCKET_SIZE, MAX_BUCKETS};
pub use error::Error;

use buckets::BucketArray;
use descriptor::{Descriptor, WriteDescriptor};

/// A lock-free, dynamically growable indexed sequence.
///
/// `LockFreeVector<T>` is a growable array designed for workloads where
/// multiple threads append, remove, and access elements concurrently and a
/// mutex around a `Vec<T>` becomes the bottleneck.
///
/// ---
///
/// ## Design Overview
///
/// - Storage is a fixed table of up to [`MAX_BUCKETS`] blocks whose sizes
///   double geometrically, starting at [`FIRST_BUCKET_SIZE`] slots. Blocks
///   are installed lazily and never move, so a logical index permanently
///   identifies one slot.
/// - The mutable state (current size, a monotone publication counter, and
///   at most one pending write) lives in a single immutable descriptor
///   behind an atomically swappable pointer.
/// - `push_back` and `pop_back` are retry loops: snapshot the descriptor,
///   cooperatively finish any write it still announces, then try to install
///   a successor descriptor by compare-and-swap. The successful CAS is the
///   linearization point.
/// - `read` and `write` at existing indexes bypass the descriptor entirely
///   and operate on the slot as an atomic cell.
///
/// ---
///
/// ## Key Properties
///
/// - **Lock-free**: in any bounded window of contention, at least one
///   thread completes its operation. A failed CAS always means another
///   thread's CAS succeeded.
/// - **Helping**: a thread that finds a half-announced write finishes it
///   before proceeding, so a preempted writer never wedges the structure.
/// - **Stable slots**: storage blocks are never reallocated or freed while
///   the vector is alive; growth never invalidates a concurrent access.
/// - **No reclamation leaks**: displaced descriptors are reference-counted
///   and freed exactly when the last snapshot holder lets go.
///
/// ---
///
/// ## Usage
///
/// ```
/// use slipstream::vector::prelude::*;
///
/// let vector = LockFreeVector::new();
///
/// for i in 0..100u64 {
///     vector.push_back(i)?;
/// }
/// assert_eq!(vector.size(), 100);
///
/// vector.write(10, 999);
/// assert_eq!(vector.read(10), 999);
///
/// assert_eq!(vector.pop_back()?, 99);
/// assert_eq!(vector.size(), 99);
/// # Ok::<(), Error>(())
/// ```
///
/// ---
///
/// ## The `read`/`write` Contract
///
/// Indexed access is deliberately unsynchronized: it does not contend on
/// the descriptor and does not coordinate with in-flight `push_back`/
/// `pop_back`. Two consequences callers must own:
///
/// - The index must satisfy `index < size()` at the time of the call.
///   Access to a slot whose covering block was never installed panics;
///   access to an allocated slot at or above the logical size returns an
///   unspecified (but never torn) value.
/// - A `write` racing a `pop_back` of the same slot, or a `push_back`
///   whose announced write targets it, has unspecified ordering: either
///   value may be observed afterwards. Restrict `write` to indexes no
///   concurrent push/pop can touch.
///
/// ---
///
/// ## Progress and Width
///
/// The structure is lock-free, not wait-free: a slow thread can in
/// principle retry forever while faster threads keep winning the CAS.
/// Lock-freedom also requires that the platform can compare-and-swap a
/// value of `T`'s width in one instruction; check
/// [`is_lock_free`](Self::is_lock_free): for wider types the slots fall
/// back to crossbeam's internal locking and the lock-free guarantee is
/// void.
pub struct LockFreeVector<T: Element> {
    descriptor: ArcSwap<Descriptor<T>>,
    buckets: BucketArray<T>,
}

impl<T: Element> LockFreeVector<T> {
    /// Creates an empty vector with its first storage block pre-installed.
    #[must_use = "New instances of LockFreeVector must serve a purpose!"]
    pub fn new() -> Self {
        let buckets = BucketArray::new();
        buckets.ensure_allocated(0);

        Self {
            descriptor: ArcSwap::from_pointee(Descriptor::initial()),
            buckets,
        }
    }

    /// Appends `value` to the back of the vector.
    ///
    /// Follows the publication protocol: snapshot the descriptor, help any
    /// pending write, make sure the target bucket exists, announce the
    /// append in a successor descriptor, and publish it by CAS. On CAS
    /// failure the successor is discarded and the whole operation retries
    /// against the fresh state.
    ///
    /// # Errors
    ///
    /// [`Error::CapacityExhausted`] when every bucket is in use. The error
    /// is returned before anything is published, so the vector is
    /// unchanged.
    pub fn push_back(&self, value: T) -> Result<(), Error> {
        loop {
            let current = self.descriptor.load();
            self.help_pending(&current);

            let target = current.size;
            let (bucket, _) = buckets::decompose(target);
            if bucket >= MAX_BUCKETS {
                return Err(Error::CapacityExhausted);
            }
            self.buckets.ensure_allocated(bucket);

            // The announced write assumes the slot still holds the default
            // sentinel the block was initialized with.
            let next = Arc::new(current.next(
                target + 1,
                WriteDescriptor::new(target, T::default(), value),
            ));

            if self.publish(&current, next) {
                return Ok(());
            }
        }
    }

    /// Removes and returns the last element.
    ///
    /// The value is taken from the slot the snapshot designates as last;
    /// the announced write resets that slot to the default sentinel so a
    /// later append finds it in the expected state.
    ///
    /// # Errors
    ///
    /// [`Error::Empty`] when the snapshot size is zero. The snapshot is
    /// re-read on every retry, so a pop racing concurrent pops may observe
    /// a transient empty state and fail even while a push is in flight.
    pub fn pop_back(&self) -> Result<T, Error> {
        loop {
            let current = self.descriptor.load();
            self.help_pending(&current);

            if current.size == 0 {
                return Err(Error::Empty);
            }

            let target = current.size - 1;
            let value = self.buckets.cell(target).load();

            let next = Arc::new(current.next(
                target,
                WriteDescriptor::new(target, value, T::default()),
            ));

            if self.publish(&current, next) {
                return Ok(value);
            }
        }
    }

    /// Reads the element at `index`.
    ///
    /// Unsynchronized: goes straight to the slot, bypassing the
    /// descriptor. See the type-level contract: `index` must be below
    /// [`size`](Self::size) at the time of the call.
    ///
    /// # Panics
    ///
    /// Panics if `index` addresses a bucket that was never installed.
    #[inline]
    pub fn read(&self, index: usize) -> T {
        self.buckets.cell(index).load()
    }

    /// Writes `value` to the element at `index`.
    ///
    /// Unsynchronized: goes straight to the slot, bypassing the
    /// descriptor. Racing a `push_back`/`pop_back` of the same slot leaves
    /// either value behind; see the type-level contract.
    ///
    /// # Panics
    ///
    /// Panics if `index` addresses a bucket that was never installed.
    #[inline]
    pub fn write(&self, index: usize, value: T) {
        self.buckets.cell(index).store(value);
    }

    /// The announced logical length.
    ///
    /// Includes the effect of a pending write that may not have reached
    /// the slot yet; callers must not assume the write's memory effect is
    /// globally visible without helping.
    #[inline]
    pub fn size(&self) -> usize {
        self.descriptor.load().size
    }

    /// Whether the vector is currently empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Number of slots currently backed by installed storage blocks.
    pub fn capacity(&self) -> usize {
        self.buckets.capacity()
    }

    /// Total number of slots addressable once every bucket is installed.
    pub fn max_capacity() -> usize {
        buckets::max_capacity()
    }

    /// Whether slots of `T` use native atomic instructions.
    ///
    /// When this is `false` the vector still works, but element accesses
    /// go through crossbeam's fallback locking and the lock-free progress
    /// guarantee no longer holds.
    pub fn is_lock_free() -> bool {
        AtomicCell::<T>::is_lock_free()
    }

    // Total number of successful state-changing publications so far.
    pub(crate) fn counter(&self) -> u64 {
        self.descriptor.load().counter
    }

    /// Cooperatively finishes the write `descriptor` announces, if any.
    ///
    /// Idempotent, and required before computing a successor state: no
    /// thread may install a new descriptor while the current one is still
    /// half-announced. A failed slot CAS means another helper settled the
    /// write first, or an unsynchronized `write` overwrote the assumed
    /// value; the announced transition is no longer pending either way, so
    /// the flag is set regardless of the CAS outcome.
    fn help_pending(&self, descriptor: &Descriptor<T>) {
        if let Some(write) = descriptor.pending.as_ref() {
            if write.is_completed() {
                return;
            }
            let _ = self
                .buckets
                .cell(write.pos)
                .compare_exchange(write.old, write.new);
            write.mark_completed();
        }
    }

    /// Tries to swing the descriptor pointer from `current` to `next`.
    ///
    /// On success, finishes the write `next` announces before returning;
    /// the successful swap is the operation's linearization point. On
    /// failure `next` is simply dropped; nothing of it was published.
    fn publish(&self, current: &Arc<Descriptor<T>>, next: Arc<Descriptor<T>>) -> bool {
        let previous = self.descriptor.compare_and_swap(current, Arc::clone(&next));
        let swapped = Arc::as_ptr(&*previous) == Arc::as_ptr(current);
        if swapped {
            self.help_pending(&next);
        }
        swapped
    }
}

impl<T: Element> Default for LockFreeVector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> fmt::Debug for LockFreeVector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let descriptor = self.descriptor.load();
        f.debug_struct("LockFreeVector")
            .field("size", &descriptor.size)
            .field("counter", &descriptor.counter)
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests;
