//! With no session bus reachable (the default in a CI sandbox), both entry
//! points must still produce a correct, private mapping rather than fail.

use unique_client::{unique_deferred, unique_sync};

fn local_rt() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[test]
fn unique_sync_falls_back_to_a_private_copy() {
    let rt = local_rt();
    let local = tokio::task::LocalSet::new();

    local.block_on(&rt, async {
        let view = unique_sync(b"hello, world").await;
        assert_eq!(&view[..], b"hello, world");
        assert_eq!(view.len(), 12);
        assert!(!view.is_empty());
    });
}

#[test]
fn unique_sync_handles_empty_input() {
    let rt = local_rt();
    let local = tokio::task::LocalSet::new();

    local.block_on(&rt, async {
        let view = unique_sync(b"").await;
        assert_eq!(&view[..], b"");
        assert!(view.is_empty());
    });
}

#[test]
fn unique_deferred_returns_usable_view_immediately() {
    let rt = local_rt();
    let local = tokio::task::LocalSet::new();

    local.block_on(&rt, async {
        let view = unique_deferred(b"deferred payload");
        assert_eq!(&view[..], b"deferred payload");

        // Give the background submission a chance to run and fail quietly
        // against the (absent) bus; the view must remain valid either way.
        tokio::task::yield_now().await;
        assert_eq!(&view[..], b"deferred payload");
    });
}

#[test]
fn byte_view_clones_share_the_same_backing_mapping() {
    let rt = local_rt();
    let local = tokio::task::LocalSet::new();

    local.block_on(&rt, async {
        let view = unique_sync(b"shared content").await;
        let clone = view.clone();
        assert_eq!(&view[..], &clone[..]);
        assert_eq!(view.as_ptr(), clone.as_ptr());
    });
}
