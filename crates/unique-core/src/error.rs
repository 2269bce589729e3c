use std::io;

/// Errors produced by the shared fd/memfd/digest primitives.
///
/// Daemon and client code map these onto their own, richer error types at
/// the boundary; this enum only ever talks about local syscall failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("memfd_create failed: {0}")]
    MemfdCreate(#[source] io::Error),

    #[error("failed to size memfd: {0}")]
    Truncate(#[source] io::Error),

    #[error("short or failed write to memfd: {0}")]
    Write(#[source] io::Error),

    #[error("failed to seal memfd: {0}")]
    Seal(#[source] io::Error),

    #[error("fd is not sealed with all of SEAL|SHRINK|GROW|WRITE")]
    NotSealed,

    #[error("failed to read seals: {0}")]
    GetSeals(#[source] io::Error),

    #[error("failed to read fd contents: {0}")]
    Read(#[source] io::Error),

    #[error("failed to stat fd: {0}")]
    Stat(#[source] io::Error),

    #[error("requested fd index {index} out of range (list has {len})")]
    FdIndexOutOfRange { index: usize, len: usize },

    #[error("mmap failed: {0}")]
    Mmap(#[source] io::Error),

    #[error("munmap failed: {0}")]
    Munmap(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
