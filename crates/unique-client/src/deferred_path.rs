//! `unique_deferred`: return an immediately-usable private mapping, then
//! swap the daemon's canonical copy in behind the caller's back once (if)
//! the daemon responds.

use std::os::fd::{AsFd, OwnedFd};

use zbus::zvariant::Fd;

use unique_core::{fdutil, memfd, mmap};

use crate::region::{ByteView, MappedRegion};
use crate::{Error, Result};

/// Same contract as [`crate::unique_sync`] but never waits on the daemon:
/// the caller gets back a private mapping immediately, and the daemon's
/// canonical fd, if one already existed, is swapped in later via
/// `MAP_FIXED` — transparent to every clone of the returned [`ByteView`],
/// since `MAP_FIXED` preserves the mapped address. Existing pointers into
/// the old mapping stay valid and silently start reading the canonical
/// bytes.
///
/// Requires an active `tokio::task::LocalSet`: the background submission is
/// spawned with `spawn_local`, since the daemon connection is `!Send` by
/// this crate's single-threaded concurrency model.
pub fn unique_deferred(data: &[u8]) -> ByteView {
    let len = data.len();
    let fd = memfd::create_sealed_memfd(data).expect("failed to create a private memfd copy");
    let addr =
        mmap::map_readonly_private(&fd, len.max(1)).expect("failed to map a private memfd copy");

    let submit_fd = rustix::io::dup(&fd).ok();
    let view = ByteView::new(MappedRegion::from_parts(addr, len, fd, None));

    if let Some(submit_fd) = submit_fd {
        let background_view = view.clone();
        tokio::task::spawn_local(async move {
            if let Err(e) = swap_in_canonical(background_view, submit_fd, len).await {
                log::debug!("unique_deferred: background dedup did not complete: {e}");
            }
        });
    }

    view
}

async fn swap_in_canonical(view: ByteView, fd: OwnedFd, len: usize) -> Result<()> {
    let connection = unique_core::bus::session_bus().await?;
    let proxy = unique_proto::UniqueProxy::new(&connection).await?;
    let (handles, handle) = proxy.make_unique(Fd::from(fd.as_fd())).await?;
    view.set_handle(handle);

    if handles.is_empty() {
        // Our submission became canonical itself; the mapping already
        // points at it, nothing left to swap.
        return Ok(());
    }

    let owned: Vec<OwnedFd> = handles.into_iter().map(Into::into).collect();
    let canonical_fd = fdutil::take_one_close_rest(owned, 0)?;

    let canonical_len = memfd::fd_size(&canonical_fd)?;
    if canonical_len != len as u64 {
        return Err(Error::SizeMismatch {
            expected: len as u64,
            actual: canonical_len,
        });
    }

    view.remap(canonical_fd, len)?;
    Ok(())
}
