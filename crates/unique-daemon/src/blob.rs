//! The canonical, immutable blob entity.

use std::os::fd::OwnedFd;

/// A single canonical, sealed blob, keyed by content digest elsewhere.
///
/// `Blob` never mutates after construction, so the number of outstanding
/// references is exactly `Arc::strong_count` of the [`Arc<Blob>`] wrapping
/// it; there is no separate refcount field to keep in sync. The fd closes
/// automatically when the last `Arc` is dropped.
///
/// [`Arc<Blob>`]: std::sync::Arc
pub struct Blob {
    pub digest: String,
    pub size: u64,
    pub fd: OwnedFd,
}

impl Blob {
    pub fn new(digest: String, size: u64, fd: OwnedFd) -> Self {
        Self { digest, size, fd }
    }
}
