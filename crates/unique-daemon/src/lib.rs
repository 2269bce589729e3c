//! The `uniqued` dedup engine: blob/peer accounting plus the D-Bus
//! interface that exposes it. See `main.rs` for the binary entry point
//! (bus connection, name ownership, peer-death watcher).

pub mod blob;
pub mod daemon;
pub mod error;
pub mod peer;
pub mod service;

pub use daemon::Daemon;
pub use service::UniqueService;
