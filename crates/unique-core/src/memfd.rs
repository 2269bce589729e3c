//! Sealed anonymous-memory-file construction and verification.
//!
//! A "sealed memfd" is the unit of exchange between client and daemon: once
//! all four seals below are applied the kernel guarantees the content can
//! never change, which is what lets the daemon alias it across peers.

use std::os::fd::{AsFd, OwnedFd};
use std::sync::atomic::{AtomicU32, Ordering};

use rustix::fs::{FileType, MemfdFlags, SealFlags, Stat};

use crate::error::{Error, Result};
use crate::fdutil::write_all_restart;

/// The seal set a canonical blob fd must carry; anything less is rejected.
pub const ALL_SEALS: SealFlags = SealFlags::SEAL
    .union(SealFlags::SHRINK)
    .union(SealFlags::GROW)
    .union(SealFlags::WRITE);

static MEMFD_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Creates a memfd sized and filled with `data`, then applies [`ALL_SEALS`].
///
/// The name is purely cosmetic (visible in `/proc/<pid>/maps`); it carries
/// no protocol meaning and callers must not depend on its exact form.
pub fn create_sealed_memfd(data: &[u8]) -> Result<OwnedFd> {
    let count = MEMFD_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = format!("unique-{}-{count}", std::process::id());

    let fd = rustix::fs::memfd_create(&name, MemfdFlags::CLOEXEC | MemfdFlags::ALLOW_SEALING)
        .map_err(|e| Error::MemfdCreate(e.into()))?;

    rustix::fs::ftruncate(&fd, data.len() as u64).map_err(|e| Error::Truncate(e.into()))?;
    write_all_restart(&fd, data)?;
    rustix::fs::fcntl_add_seals(&fd, ALL_SEALS).map_err(|e| Error::Seal(e.into()))?;

    Ok(fd)
}

/// Verifies `fd` refers to a regular file carrying exactly (at least) [`ALL_SEALS`].
pub fn verify_sealed(fd: impl AsFd) -> Result<()> {
    let seals = rustix::fs::fcntl_get_seals(fd.as_fd()).map_err(|e| Error::GetSeals(e.into()))?;
    if !seals.contains(ALL_SEALS) {
        return Err(Error::NotSealed);
    }
    Ok(())
}

/// `fstat`s `fd` and returns its size in bytes.
pub fn fd_size(fd: impl AsFd) -> Result<u64> {
    let st: Stat = rustix::fs::fstat(fd.as_fd()).map_err(|e| Error::Stat(e.into()))?;
    Ok(st.st_size as u64)
}

/// Returns whether `fd` is a regular file, as required of anonymous memory
/// files passed across the wire (memfds report as regular files).
pub fn is_regular_file(fd: impl AsFd) -> Result<bool> {
    let st: Stat = rustix::fs::fstat(fd.as_fd()).map_err(|e| Error::Stat(e.into()))?;
    Ok(FileType::from_raw_mode(st.st_mode) == FileType::RegularFile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_create_and_verify() {
        let fd = create_sealed_memfd(b"Hello, World!\0").unwrap();
        verify_sealed(&fd).unwrap();
        assert!(is_regular_file(&fd).unwrap());
        assert_eq!(fd_size(&fd).unwrap(), 14);
    }

    #[test]
    fn unsealed_fd_is_rejected() {
        let fd = rustix::fs::memfd_create("unsealed", MemfdFlags::CLOEXEC).unwrap();
        assert!(matches!(verify_sealed(&fd), Err(Error::NotSealed)));
    }
}
