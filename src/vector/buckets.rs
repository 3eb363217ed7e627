use std::array;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use crossbeam::atomic::AtomicCell;

use crate::Element;

/// Maximum number of storage blocks the vector can ever install.
pub const MAX_BUCKETS: usize = 32;

/// Number of slots in bucket 0. Bucket `b` holds `FIRST_BUCKET_SIZE << b`
/// slots, so capacity doubles with every additional bucket.
pub const FIRST_BUCKET_SIZE: usize = 8;

// log2(FIRST_BUCKET_SIZE); exact because the size is a power of two.
const FIRST_BUCKET_BITS: u32 = FIRST_BUCKET_SIZE.trailing_zeros();

/// Maps a logical index to its `(bucket, offset)` pair.
///
/// Shifting the index by `FIRST_BUCKET_SIZE` makes the highest set bit of
/// the shifted position identify the bucket; clearing that bit leaves the
/// offset within the bucket.
#[inline(always)]
pub fn decompose(index: usize) -> (usize, usize) {
    let pos = index + FIRST_BUCKET_SIZE;
    let hi_bit = usize::BITS - 1 - pos.leading_zeros();
    let bucket = (hi_bit - FIRST_BUCKET_BITS) as usize;
    let offset = pos ^ (1usize << hi_bit);
    (bucket, offset)
}

/// Number of slots in bucket `bucket`.
#[inline(always)]
pub fn bucket_len(bucket: usize) -> usize {
    FIRST_BUCKET_SIZE << bucket
}

/// Total number of slots addressable once every bucket is installed.
pub fn max_capacity() -> usize {
    FIRST_BUCKET_SIZE
        .checked_shl(MAX_BUCKETS as u32)
        .map(|total| total - FIRST_BUCKET_SIZE)
        .unwrap_or(usize::MAX)
}

/// The backing store: a fixed table of lazily-installed storage blocks.
///
/// Each entry is an atomic pointer to a block of `FIRST_BUCKET_SIZE << b`
/// cells. A block is default-initialized before its pointer becomes
/// visible, is installed by a one-shot CAS (the losing allocator frees its
/// block), and once installed is never replaced or freed until the whole
/// array is dropped. Slots therefore never move, which is what allows the
/// rest of the vector to identify a slot by its logical index alone.
pub(crate) struct BucketArray<T: Element> {
    memory: [AtomicPtr<AtomicCell<T>>; MAX_BUCKETS],
}

// The raw block pointers are owned by this array and only ever hand out
// `&AtomicCell<T>`, which is Sync for T: Send.
unsafe impl<T: Element> Send for BucketArray<T> {}
unsafe impl<T: Element> Sync for BucketArray<T> {}

impl<T: Element> BucketArray<T> {
    pub(crate) fn new() -> Self {
        Self {
            memory: array::from_fn(|_| AtomicPtr::new(ptr::null_mut())),
        }
    }

    #[inline]
    pub(crate) fn is_allocated(&self, bucket: usize) -> bool {
        !self.memory[bucket].load(Ordering::Acquire).is_null()
    }

    /// Makes sure `bucket` has a block behind it. Racing callers are fine:
    /// exactly one block wins the install, the rest are freed.
    pub(crate) fn ensure_allocated(&self, bucket: usize) {
        if !self.is_allocated(bucket) {
            self.allocate(bucket);
        }
    }

    fn allocate(&self, bucket: usize) {
        let len = bucket_len(bucket);
        let mut cells = Vec::with_capacity(len);
        cells.resize_with(len, || AtomicCell::new(T::default()));
        let block = Box::into_raw(cells.into_boxed_slice()) as *mut AtomicCell<T>;

        if self.memory[bucket]
            .compare_exchange(ptr::null_mut(), block, Ordering::Release, Ordering::Acquire)
            .is_err()
        {
            // A concurrent caller installed its block first.
            unsafe { drop_block(block, len) };
        }
    }

    /// The cell behind logical index `index`.
    ///
    /// # Panics
    ///
    /// Panics if the covering bucket has not been installed, which can only
    /// happen when the caller violated the `index < size()` contract.
    #[inline]
    pub(crate) fn cell(&self, index: usize) -> &AtomicCell<T> {
        let (bucket, offset) = decompose(index);
        assert!(
            bucket < MAX_BUCKETS,
            "Index {} is beyond the addressable capacity!",
            index
        );
        let block = self.memory[bucket].load(Ordering::Acquire);
        assert!(
            !block.is_null(),
            "Index {} addresses an unallocated bucket; indexes must stay below size()!",
            index
        );
        unsafe { &*block.add(offset) }
    }

    /// Number of slots currently backed by installed blocks.
    ///
    /// Blocks are installed in order, so the installed prefix is contiguous.
    pub(crate) fn capacity(&self) -> usize {
        let mut total = 0;
        for bucket in 0..MAX_BUCKETS {
            if !self.is_allocated(bucket) {
                break;
            }
            total += bucket_len(bucket);
        }
        total
    }
}

impl<T: Element> Drop for BucketArray<T> {
    fn drop(&mut self) {
        for bucket in 0..MAX_BUCKETS {
            let block = *self.memory[bucket].get_mut();
            if !block.is_null() {
                unsafe { drop_block(block, bucket_len(bucket)) };
            }
        }
    }
}

unsafe fn drop_block<T: Element>(block: *mut AtomicCell<T>, len: usize) {
    drop(Box::from_raw(ptr::slice_from_raw_parts_mut(block, len)));
}
