//! One connected bus name and the handles it holds.

use std::collections::HashMap;
use std::sync::Arc;

use crate::blob::Blob;

/// One connection identity on the bus. Created lazily on its first
/// `MakeUnique`, removed in one sweep on `NameOwnerChanged` disappearance.
pub struct Peer {
    next_handle: u32,
    handles: HashMap<u32, Arc<Blob>>,
}

impl Peer {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            handles: HashMap::new(),
        }
    }

    /// Inserts `blob` under a freshly allocated handle id and returns it.
    pub fn add_handle(&mut self, blob: Arc<Blob>) -> u32 {
        let id = self.next_handle;
        self.next_handle += 1;
        self.handles.insert(id, blob);
        id
    }

    /// Removes and returns the blob referenced by `handle`, if any.
    pub fn remove_handle(&mut self, handle: u32) -> Option<Arc<Blob>> {
        self.handles.remove(&handle)
    }

    /// Drains every handle this peer holds, in preparation for peer death.
    pub fn drain_handles(&mut self) -> impl Iterator<Item = Arc<Blob>> + '_ {
        self.handles.drain().map(|(_, blob)| blob)
    }

    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }
}

impl Default for Peer {
    fn default() -> Self {
        Self::new()
    }
}
