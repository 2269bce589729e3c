//! Notifying the daemon when a mapped region's last reference drops.
//!
//! Grounded on `unique-bytes.c`'s `MappedData`, which calls the daemon's
//! `Forget` the moment its own refcount reaches zero rather than waiting
//! for the whole peer to disappear from the bus. Fire-and-forget there
//! too: the original doesn't wait on the call's reply either.

/// Best-effort `Forget(handle)`, dispatched without waiting on its result.
///
/// Requires an active `tokio::task::LocalSet`, per this crate's
/// single-threaded concurrency model (see [`crate::unique_deferred`]). If
/// none is active — this region was dropped outside the client's normal
/// runtime — the notification is simply skipped; the daemon's peer-death
/// reclamation (driven by `NameOwnerChanged`) still guarantees the handle
/// is eventually released once this process's bus connection closes.
pub(crate) fn spawn_forget(handle: u32) {
    if tokio::runtime::Handle::try_current().is_err() {
        log::debug!(
            "dropped a mapped region outside an async runtime; handle {handle} left for the daemon's peer-death cleanup"
        );
        return;
    }

    tokio::task::spawn_local(async move {
        if let Err(e) = notify(handle).await {
            log::debug!("failed to notify the daemon that handle {handle} was released: {e}");
        }
    });
}

async fn notify(handle: u32) -> crate::Result<()> {
    let connection = unique_core::bus::session_bus().await?;
    let proxy = unique_proto::UniqueProxy::new(&connection).await?;
    proxy.forget(handle).await?;
    Ok(())
}
