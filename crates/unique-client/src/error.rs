//! Client-side errors.
//!
//! Both public entry points ([`crate::unique_sync`], [`crate::unique_deferred`])
//! never return a `Result`: per the dedup contract, any trouble reaching or
//! satisfying the daemon falls back to a private mapping rather than
//! propagating. This type only surfaces internally, on the paths that
//! decide whether to fall back.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] unique_core::Error),

    #[error("D-Bus error: {0}")]
    Bus(#[from] zbus::Error),

    #[error("daemon returned a canonical blob of {actual} bytes, expected {expected}")]
    SizeMismatch { expected: u64, actual: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;
