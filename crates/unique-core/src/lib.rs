//! Shared, transport-agnostic primitives used by both the `uniqued` daemon
//! and the client library: sealed memfd construction/verification, SHA-256
//! digesting, restartable fd I/O, and the lazily-initialized session bus
//! connection.

pub mod bus;
pub mod digest;
pub mod error;
pub mod fdutil;
pub mod memfd;
pub mod mmap;

pub use error::{Error, Result};
