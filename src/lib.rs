//! # slipstream
//!
//! A **lock-free, dynamically growable indexed sequence** for demanding
//! multi-threaded workloads.
//!
//! The centerpiece is [`vector::LockFreeVector`], a growable array that
//! supports concurrent `push_back`, `pop_back`, indexed `read`/`write`, and
//! `size` without a single mutex on the fast path. Writers coordinate
//! through an atomically swapped descriptor object; readers and writers of
//! existing slots go straight to the storage cells.
//!
//! ```
//! use slipstream::vector::prelude::*;
//!
//! let vector = LockFreeVector::new();
//!
//! vector.push_back(42u64)?;
//! assert_eq!(vector.size(), 1);
//! assert_eq!(vector.read(0), 42);
//! assert_eq!(vector.pop_back()?, 42);
//! # Ok::<(), Error>(())
//! ```

pub mod vector;

/// Marker trait for types that can live in a [`vector::LockFreeVector`].
///
/// An element must be:
///
/// - `Copy`: slots hand out values, never references; a torn half-written
///   value can therefore never escape.
/// - `Default`: freshly allocated storage blocks are default-initialized
///   before their pointer is published, and the default value doubles as the
///   sentinel an announced append expects to find in its target slot.
/// - `Eq`: the cooperative completion step is a compare-and-swap on the slot
///   and needs to compare the assumed prior value.
/// - `Send + Sync`: values cross thread boundaries by value and by shared
///   state.
///
/// The trait is implemented for every type meeting the bounds; there is
/// nothing to implement manually. Note that lock-freedom additionally
/// depends on the platform being able to CAS a value of this width in one
/// instruction; see [`vector::LockFreeVector::is_lock_free`].
pub trait Element: Copy + Default + Eq + Send + Sync {}

impl<T> Element for T where T: Copy + Default + Eq + Send + Sync {}
