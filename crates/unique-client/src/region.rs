//! The mapped, reference-counted view callers receive from `unique_sync`/
//! `unique_deferred`.

use std::cell::Cell;
use std::ops::Deref;
use std::os::fd::OwnedFd;
use std::rc::Rc;

use unique_core::mmap;

/// One live read-only mapping.
///
/// The client is single-threaded (see the crate's concurrency model), so
/// there is no `Send`/`Sync` story to maintain here: `Rc` for sharing,
/// interior mutability only around the one field a release notification
/// needs to touch. `addr`/`mapped_len` never change after construction,
/// which is what makes [`ByteView`]'s `Deref` sound without re-borrowing
/// through a cell.
///
/// The backing fd is never kept around past the `mmap` call that
/// establishes or remaps it: a `MAP_PRIVATE` mapping stays valid after its
/// originating fd is closed, so there's nothing left to hold onto.
pub struct MappedRegion {
    addr: *mut u8,
    len: usize,
    mapped_len: usize,
    /// The daemon-side handle this mapping was registered under, if any
    /// (`None` for a pure fallback copy the daemon never saw). Notified via
    /// `Forget` when the last `ByteView` over this region drops.
    handle: Cell<Option<u32>>,
}

impl MappedRegion {
    pub(crate) fn from_parts(addr: *mut u8, len: usize, fd: OwnedFd, handle: Option<u32>) -> Self {
        // `fd` drops (closes) here; the mapping it established is already
        // live and MAP_PRIVATE keeps it that way regardless.
        drop(fd);
        Self {
            addr,
            len,
            mapped_len: len.max(1),
            handle: Cell::new(handle),
        }
    }

    fn as_slice(&self) -> &[u8] {
        if self.len == 0 {
            return &[];
        }
        // Safety: `addr` is the base of a live `mapped_len`-byte mapping for
        // as long as `self` exists (unmapped only in `Drop`), and this
        // mapping is never written to, so aliasing a `&[u8]` over part of it
        // is sound regardless of how many `ByteView`s share this region.
        unsafe { std::slice::from_raw_parts(self.addr, self.len) }
    }

    pub(crate) fn remap(&self, fd: OwnedFd, len: usize) -> unique_core::Result<()> {
        assert_eq!(len, self.len, "deferred remap target changed size");
        // Safety: `addr`/`mapped_len` describe the live mapping created in
        // `from_parts` (or a previous `remap`), never unmapped before this
        // call.
        unsafe { mmap::remap_fixed_readonly_private(self.addr, self.mapped_len, &fd)? };
        // `fd` drops (closes) here; MAP_PRIVATE keeps the remapped pages
        // valid without it.
        drop(fd);
        Ok(())
    }

    pub(crate) fn set_handle(&self, handle: u32) {
        self.handle.set(Some(handle));
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        // Safety: `addr`/`mapped_len` describe exactly the mapping this
        // region owns, unmapped here and nowhere else.
        if let Err(e) = unsafe { mmap::unmap(self.addr, self.mapped_len) } {
            log::warn!("failed to unmap a region: {e}");
        }
        if let Some(handle) = self.handle.get() {
            crate::release::spawn_forget(handle);
        }
    }
}

/// A reference-counted, read-only view over a mapped, deduplicated blob.
///
/// Cheap to clone (bumps an `Rc`); every clone shares the same underlying
/// mapping, including across a later deferred remap — swapping the
/// daemon's canonical fd in is invisible to anyone already holding a
/// `ByteView` over the old one. When the last clone drops, the daemon is
/// notified via `Forget` so it can release its side of the handle promptly
/// instead of waiting for this peer to disappear from the bus entirely.
#[derive(Clone)]
pub struct ByteView {
    inner: Rc<MappedRegion>,
}

impl ByteView {
    pub(crate) fn new(region: MappedRegion) -> Self {
        Self {
            inner: Rc::new(region),
        }
    }

    pub(crate) fn remap(&self, fd: OwnedFd, len: usize) -> unique_core::Result<()> {
        self.inner.remap(fd, len)
    }

    pub(crate) fn set_handle(&self, handle: u32) {
        self.inner.set_handle(handle);
    }

    pub fn len(&self) -> usize {
        self.inner.len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Deref for ByteView {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.inner.as_slice()
    }
}
