//! The `org.freedesktop.portal.Unique` D-Bus contract.
//!
//! This crate is the one place that names the service, the object path, the
//! interface, and the two methods on it. Both `unique-daemon` (which
//! implements the interface) and `unique-client` (which calls it through
//! the generated proxy) depend on this crate so the two sides can never
//! drift apart.

use zbus::zvariant::{Fd, OwnedFd};

/// Well-known bus name the daemon owns.
pub const SERVICE_NAME: &str = "org.freedesktop.portal.Unique";
/// Object path the interface is registered at.
pub const OBJECT_PATH: &str = "/org/freedesktop/portal/unique";
/// D-Bus interface name.
pub const INTERFACE_NAME: &str = "org.freedesktop.portal.Unique";

/// Client-facing proxy for the `Unique` interface.
///
/// `make_unique`'s `content` return is an `ah` (array of handles): empty
/// means "keep using the fd you sent", one element means "here is the
/// canonical fd instead". `forget` has no return value and is meant to be
/// dispatched without waiting on its result.
#[zbus::proxy(
    interface = "org.freedesktop.portal.Unique",
    default_service = "org.freedesktop.portal.Unique",
    default_path = "/org/freedesktop/portal/unique"
)]
pub trait Unique {
    /// Registers (and dedupes) a sealed memfd. Returns the canonical fd, if
    /// one already existed for this content, and a per-peer handle id.
    fn make_unique(&self, memfd: Fd<'_>) -> zbus::Result<(Vec<OwnedFd>, u32)>;

    /// Releases a previously returned handle. Idempotent for unknown ids.
    fn forget(&self, handle: u32) -> zbus::Result<()>;
}
