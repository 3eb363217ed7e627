pub use {
    crate::vector::{Error, LockFreeVector, FIRST_BUCKET_SIZE, MAX_BUCKETS},
    crate::Element,
};
