//! The dedup engine: the digest-addressed blob table, the peer directory,
//! and the real/apparent size accounting.

use std::collections::HashMap;
use std::os::fd::OwnedFd;
use std::sync::{Arc, Weak};

use zbus::names::OwnedUniqueName;

use crate::blob::Blob;
use crate::error::{RequestError, Result};
use crate::peer::Peer;

/// Owns every live `Blob` and `Peer`. Single-writer: all mutation happens
/// to completion inside one method call, with no suspension point, which is
/// what lets this type get away with no internal locking of its own (the
/// `Mutex` wrapping it in `service.rs` exists only to satisfy zbus's
/// `Send + Sync` bound on interface objects, not for real contention).
pub struct Daemon {
    /// Non-owning: a `Blob` lives only as long as some `Peer` handle holds a
    /// strong `Arc` on it. Stale entries (`upgrade()` returning `None`) are
    /// swept lazily on lookup.
    blobs: HashMap<String, Weak<Blob>>,
    peers: HashMap<OwnedUniqueName, Peer>,
    real_size: u64,
    apparent_size: u64,
}

impl Daemon {
    pub fn new() -> Self {
        Self {
            blobs: HashMap::new(),
            peers: HashMap::new(),
            real_size: 0,
            apparent_size: 0,
        }
    }

    pub fn real_size(&self) -> u64 {
        self.real_size
    }

    pub fn apparent_size(&self) -> u64 {
        self.apparent_size
    }

    #[cfg(test)]
    pub fn peer_handle_count(&self, name: &OwnedUniqueName) -> usize {
        self.peers.get(name).map(Peer::handle_count).unwrap_or(0)
    }

    #[cfg(test)]
    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }

    fn lookup_live_blob(&mut self, digest: &str) -> Option<Arc<Blob>> {
        match self.blobs.get(digest).and_then(Weak::upgrade) {
            Some(blob) => Some(blob),
            None => {
                // Either never seen, or a stale tombstone from a blob whose
                // last handle was already dropped; clean it up either way.
                self.blobs.remove(digest);
                None
            }
        }
    }

    /// Registers (and dedupes) a sealed memfd on behalf of `sender`.
    ///
    /// Returns the fd of the canonical blob when one already existed (the
    /// caller must substitute it for its own), or `None` when `fd` was
    /// itself adopted as canonical; plus the new per-peer handle id.
    pub fn make_unique(&mut self, sender: &OwnedUniqueName, fd: OwnedFd) -> Result<(Option<OwnedFd>, u32)> {
        if !unique_core::memfd::is_regular_file(&fd)? {
            return Err(RequestError::InvalidArgs(
                "fd is not a regular (memfd-backed) file".into(),
            ));
        }
        unique_core::memfd::verify_sealed(&fd)?;

        let digest = unique_core::digest::sha256_hex_of_fd(&fd)?;
        let size = unique_core::memfd::fd_size(&fd)?;

        let (blob, response_fd) = match self.lookup_live_blob(&digest) {
            Some(blob) => {
                log::debug!("Reusing existing blob for {digest}");
                let dup = rustix::io::dup(&blob.fd)
                    .map_err(|e| RequestError::Failed(format!("failed to dup canonical fd: {e}")))?;
                (blob, Some(dup))
                // `fd` (the caller's submission) is simply dropped here,
                // closing it; the daemon already had canonical content.
            }
            None => {
                log::debug!("Created new blob for {digest} (size {size})");
                let blob = Arc::new(Blob::new(digest.clone(), size, fd));
                self.blobs.insert(digest, Arc::downgrade(&blob));
                self.real_size += size;
                (blob, None)
            }
        };

        let peer = self.peers.entry(sender.clone()).or_default();
        let handle = peer.add_handle(blob);
        self.apparent_size += size;

        log::debug!(
            "Total apparent memory size: {}, actual size: {}",
            self.apparent_size,
            self.real_size
        );

        Ok((response_fd, handle))
    }

    /// Releases `handle` for `sender`. Idempotent: unknown peers and
    /// unknown handles are both silently ignored.
    pub fn forget(&mut self, sender: &OwnedUniqueName, handle: u32) {
        let Some(peer) = self.peers.get_mut(sender) else {
            return;
        };
        let Some(blob) = peer.remove_handle(handle) else {
            return;
        };

        self.release_blob_ref(blob);

        log::debug!(
            "Total apparent memory size: {}, actual size: {}",
            self.apparent_size,
            self.real_size
        );
    }

    /// Removes `sender`'s `Peer` entirely, releasing every handle it held.
    /// The only cleanup path for clients that never call `forget`.
    pub fn remove_peer(&mut self, sender: &OwnedUniqueName) {
        let Some(mut peer) = self.peers.remove(sender) else {
            return;
        };

        let blobs: Vec<_> = peer.drain_handles().collect();
        for blob in blobs {
            self.release_blob_ref(blob);
        }

        log::debug!("Peer {sender} died");
        log::debug!(
            "Total apparent memory size: {}, actual size: {}",
            self.apparent_size,
            self.real_size
        );
    }

    /// Drops one handle's reference on `blob`. If this was the last
    /// outstanding reference, the blob is destroyed: removed from the
    /// digest table and its fd closed (via `Blob`'s own `Drop`).
    fn release_blob_ref(&mut self, blob: Arc<Blob>) {
        self.apparent_size -= blob.size;

        if Arc::strong_count(&blob) == 1 {
            log::debug!("Blob for {} destroyed", blob.digest);
            self.real_size -= blob.size;
            self.blobs.remove(&blob.digest);
        }
        // `blob` drops here; if it was the last reference the fd closes now.
    }
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}
