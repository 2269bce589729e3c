//! The `org.freedesktop.portal.Unique` D-Bus interface implementation.

use std::os::fd::OwnedFd as StdOwnedFd;
use std::sync::Mutex;

use zbus::fdo;
use zbus::message::Header;
use zbus::zvariant::OwnedFd;

use crate::daemon::Daemon;
use crate::error::RequestError;

/// Wraps [`Daemon`] behind a `Mutex` purely to satisfy zbus's `Send + Sync`
/// bound on interface objects; every lock is held for the duration of one
/// synchronous table mutation and never across an `.await`, so there is no
/// real contention to speak of (see [`Daemon`]'s docs).
pub struct UniqueService {
    daemon: Mutex<Daemon>,
}

impl UniqueService {
    pub fn new(daemon: Daemon) -> Self {
        Self {
            daemon: Mutex::new(daemon),
        }
    }

    /// Snapshot of the accounting counters, for logging/tests.
    pub fn sizes(&self) -> (u64, u64) {
        let daemon = self.daemon.lock().unwrap();
        (daemon.real_size(), daemon.apparent_size())
    }

    /// Reclaims every handle held by a peer that has disappeared from the
    /// bus. Called from the `NameOwnerChanged` watcher in `main.rs`.
    pub fn remove_peer(&self, name: &zbus::names::OwnedUniqueName) {
        self.daemon.lock().unwrap().remove_peer(name);
    }
}

fn sender_of(header: &Header<'_>) -> fdo::Result<zbus::names::OwnedUniqueName> {
    header
        .sender()
        .map(|n| n.to_owned())
        .ok_or_else(|| fdo::Error::Failed("request has no unique sender name".into()))
}

#[zbus::interface(name = "org.freedesktop.portal.Unique")]
impl UniqueService {
    #[zbus(name = "MakeUnique")]
    fn make_unique(
        &self,
        memfd: OwnedFd,
        #[zbus(header)] header: Header<'_>,
    ) -> fdo::Result<(Vec<OwnedFd>, u32)> {
        let sender = sender_of(&header)?;
        log::debug!("Got MakeUnique request from {sender}");

        let fd: StdOwnedFd = memfd.into();
        let mut daemon = self.daemon.lock().unwrap();

        match daemon.make_unique(&sender, fd) {
            Ok((None, handle)) => Ok((Vec::new(), handle)),
            Ok((Some(canonical_fd), handle)) => Ok((vec![OwnedFd::from(canonical_fd)], handle)),
            Err(RequestError::InvalidArgs(msg)) => Err(fdo::Error::InvalidArgs(msg)),
            Err(RequestError::Failed(msg)) => Err(fdo::Error::Failed(msg)),
        }
    }

    #[zbus(name = "Forget")]
    fn forget(&self, handle: u32, #[zbus(header)] header: Header<'_>) -> fdo::Result<()> {
        let sender = sender_of(&header)?;
        log::debug!("Got Forget request from {sender}");

        self.daemon.lock().unwrap().forget(&sender, handle);
        Ok(())
    }
}
