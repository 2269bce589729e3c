//! Request-handling errors, distinguished by how they're reported on the bus.

/// Errors `Daemon::make_unique`/`Daemon::forget` can return.
///
/// These map directly onto `org.freedesktop.DBus.Error.InvalidArgs` and
/// `.Failed` at the interface boundary (see `service.rs`); nothing here is
/// fatal to the daemon process.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("{0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Failed(String),
}

impl From<unique_core::Error> for RequestError {
    fn from(e: unique_core::Error) -> Self {
        use unique_core::Error::*;
        match e {
            NotSealed | FdIndexOutOfRange { .. } => RequestError::InvalidArgs(e.to_string()),
            Read(_) | Stat(_) | GetSeals(_) => RequestError::InvalidArgs(e.to_string()),
            MemfdCreate(_) | Truncate(_) | Write(_) | Seal(_) | Mmap(_) | Munmap(_) => {
                RequestError::Failed(e.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, RequestError>;
