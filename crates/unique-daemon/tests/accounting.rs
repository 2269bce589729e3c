//! Accounting invariants and end-to-end scenarios, exercised directly
//! against `Daemon` (no real bus connection needed for any of this).

use zbus::names::OwnedUniqueName;

use unique_daemon::Daemon;

fn peer(name: &str) -> OwnedUniqueName {
    OwnedUniqueName::try_from(name).unwrap()
}

fn sealed(data: &[u8]) -> std::os::fd::OwnedFd {
    unique_core::memfd::create_sealed_memfd(data).unwrap()
}

#[test]
fn single_client_makes_the_same_blob_unique_twice() {
    let mut daemon = Daemon::new();
    let alice = peer(":1.1");

    let (canonical, h1) = daemon.make_unique(&alice, sealed(b"hello")).unwrap();
    assert!(canonical.is_none(), "first submission becomes canonical");

    let (canonical2, h2) = daemon.make_unique(&alice, sealed(b"hello")).unwrap();
    assert!(canonical2.is_some(), "second submission dedupes against the first");
    assert_ne!(h1, h2, "each MakeUnique call gets its own handle");

    assert_eq!(daemon.blob_count(), 1);
    assert_eq!(daemon.peer_handle_count(&alice), 2);
    assert_eq!(daemon.real_size(), 5);
    assert_eq!(daemon.apparent_size(), 10);
}

#[test]
fn two_independent_clients_share_one_blob_and_peer_crash_reclaims_it() {
    let mut daemon = Daemon::new();
    let alice = peer(":1.1");
    let bob = peer(":1.2");

    let (_, h_alice) = daemon.make_unique(&alice, sealed(b"shared payload")).unwrap();
    let (canonical, _h_bob) = daemon.make_unique(&bob, sealed(b"shared payload")).unwrap();
    assert!(canonical.is_some());

    assert_eq!(daemon.blob_count(), 1);
    assert_eq!(daemon.real_size(), 14);
    assert_eq!(daemon.apparent_size(), 28);

    // Bob's process disappears without ever calling Forget.
    daemon.remove_peer(&bob);
    assert_eq!(daemon.peer_handle_count(&bob), 0);
    assert_eq!(daemon.blob_count(), 1, "alice's handle keeps the blob alive");
    assert_eq!(daemon.real_size(), 14);
    assert_eq!(daemon.apparent_size(), 14);

    // Alice releases her last handle; the blob is now unreferenced.
    daemon.forget(&alice, h_alice);
    assert_eq!(daemon.blob_count(), 0);
    assert_eq!(daemon.real_size(), 0);
    assert_eq!(daemon.apparent_size(), 0);
}

#[test]
fn forget_is_idempotent_on_unknown_handles_and_peers() {
    let mut daemon = Daemon::new();
    let alice = peer(":1.1");

    let (_, handle) = daemon.make_unique(&alice, sealed(b"data")).unwrap();
    daemon.forget(&alice, handle);
    // Forgetting the same handle twice is a no-op, not an error.
    daemon.forget(&alice, handle);
    // Forgetting on a peer that was never seen is also a no-op.
    daemon.forget(&peer(":1.99"), 1);

    assert_eq!(daemon.blob_count(), 0);
    assert_eq!(daemon.real_size(), 0);
    assert_eq!(daemon.apparent_size(), 0);
}

#[test]
fn distinct_content_never_dedupes() {
    let mut daemon = Daemon::new();
    let alice = peer(":1.1");

    let (c1, _) = daemon.make_unique(&alice, sealed(b"one")).unwrap();
    let (c2, _) = daemon.make_unique(&alice, sealed(b"two")).unwrap();
    assert!(c1.is_none());
    assert!(c2.is_none());

    assert_eq!(daemon.blob_count(), 2);
    assert_eq!(daemon.real_size(), 6);
    assert_eq!(daemon.apparent_size(), 6);
}

#[test]
fn unsealed_fd_is_rejected_as_invalid_args() {
    use rustix::fs::MemfdFlags;
    use unique_daemon::error::RequestError;

    let mut daemon = Daemon::new();
    let alice = peer(":1.1");

    let fd = rustix::fs::memfd_create("not-sealed", MemfdFlags::CLOEXEC).unwrap();
    let err = daemon.make_unique(&alice, fd).unwrap_err();
    assert!(matches!(err, RequestError::InvalidArgs(_)));
    assert_eq!(daemon.blob_count(), 0);
}

#[test]
fn remove_peer_on_unknown_peer_is_a_no_op() {
    let mut daemon = Daemon::new();
    daemon.remove_peer(&peer(":1.42"));
    assert_eq!(daemon.real_size(), 0);
    assert_eq!(daemon.apparent_size(), 0);
}
