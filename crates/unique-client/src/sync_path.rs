//! `unique_sync`: submit a blob for dedup and wait briefly for the daemon
//! before returning an immediately-usable mapped view.

use std::os::fd::{AsFd, OwnedFd};
use std::time::Duration;

use zbus::zvariant::Fd;

use unique_core::{fdutil, memfd, mmap};

use crate::region::{ByteView, MappedRegion};
use crate::Result;

/// Upper bound on how long we wait for the daemon before giving up and
/// mapping a private, undeduplicated copy instead.
const SYNC_TIMEOUT: Duration = Duration::from_secs(3);

/// Submits `data` for dedup and returns a mapped view over the canonical
/// copy.
///
/// Never fails outright: if the daemon is unreachable, too slow, or rejects
/// the submission, this falls back to mapping the caller's own private
/// copy, so correctness never depends on the daemon being present.
pub async fn unique_sync(data: &[u8]) -> ByteView {
    let len = data.len();

    let fd = match memfd::create_sealed_memfd(data) {
        Ok(fd) => fd,
        Err(e) => {
            log::warn!("unique_sync: failed to create a sealed memfd, copying in-process: {e}");
            return fallback_private_copy(data);
        }
    };

    match tokio::time::timeout(SYNC_TIMEOUT, submit(&fd)).await {
        Ok(Ok((canonical, handle))) => match map_region(canonical.unwrap_or(fd), len, Some(handle)) {
            Ok(region) => return ByteView::new(region),
            Err(e) => {
                log::warn!("unique_sync: failed to map the daemon's response, copying in-process: {e}")
            }
        },
        Ok(Err(e)) => {
            log::debug!("unique_sync: daemon rejected the submission, using a private copy: {e}")
        }
        Err(_) => log::debug!(
            "unique_sync: daemon did not respond within {SYNC_TIMEOUT:?}, using a private copy"
        ),
    }

    fallback_private_copy(data)
}

async fn submit(fd: &OwnedFd) -> Result<(Option<OwnedFd>, u32)> {
    let connection = unique_core::bus::session_bus().await?;
    let proxy = unique_proto::UniqueProxy::new(&connection).await?;
    let (handles, handle) = proxy.make_unique(Fd::from(fd.as_fd())).await?;

    if handles.is_empty() {
        Ok((None, handle))
    } else {
        let owned: Vec<OwnedFd> = handles.into_iter().map(Into::into).collect();
        Ok((Some(fdutil::take_one_close_rest(owned, 0)?), handle))
    }
}

fn map_region(fd: OwnedFd, len: usize, handle: Option<u32>) -> unique_core::Result<MappedRegion> {
    let addr = mmap::map_readonly_private(&fd, len.max(1))?;
    Ok(MappedRegion::from_parts(addr, len, fd, handle))
}

fn fallback_private_copy(data: &[u8]) -> ByteView {
    let len = data.len();
    // Only unrecoverable failure path left: the local memfd primitives
    // themselves failed, independent of the daemon entirely.
    let fd = memfd::create_sealed_memfd(data).expect("failed to create a private memfd copy");
    let region = map_region(fd, len, None).expect("failed to map a private memfd copy");
    ByteView::new(region)
}
