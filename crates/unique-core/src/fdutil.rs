//! Restartable writes and one-of-N fd extraction.
//!
//! These two primitives are the ones the wire protocol in [`uniqued`] and
//! the client library both lean on: writing a buffer into a freshly created
//! memfd, and plucking exactly one descriptor out of an attached fd list
//! while closing the rest so nothing leaks on a partial failure.
//!
//! [`uniqued`]: https://docs.rs/unique-daemon

use std::io;
use std::os::fd::{AsFd, OwnedFd};

use crate::error::{Error, Result};

/// Writes all of `data` to `fd`, looping on short writes and retrying on
/// `EINTR`. Any other error aborts the write.
pub fn write_all_restart(fd: impl AsFd, mut data: &[u8]) -> Result<()> {
    let fd = fd.as_fd();
    while !data.is_empty() {
        match rustix::io::write(fd, data) {
            Ok(0) => return Err(Error::Write(io::Error::from(io::ErrorKind::WriteZero))),
            Ok(n) => data = &data[n..],
            Err(rustix::io::Errno::INTR) => continue,
            Err(e) => return Err(Error::Write(e.into())),
        }
    }
    Ok(())
}

/// Given an owned list of fds and an index, returns the fd at that index
/// and closes (drops) every other one. Never leaks: on any error path the
/// whole `fds` vector is still consumed and dropped.
pub fn take_one_close_rest(mut fds: Vec<OwnedFd>, index: usize) -> Result<OwnedFd> {
    if index >= fds.len() {
        return Err(Error::FdIndexOutOfRange {
            index,
            len: fds.len(),
        });
    }
    // Swap-remove pulls the wanted fd out in O(1); the rest of `fds` is
    // dropped (closed) when this function returns.
    Ok(fds.swap_remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::{AsRawFd, IntoRawFd};

    #[test]
    fn write_all_restart_writes_everything() {
        let f = tempfile::tempfile().unwrap();
        write_all_restart(&f, b"the quick brown fox").unwrap();
        let size = crate::memfd::fd_size(&f).unwrap();
        assert_eq!(size, 19);
    }

    #[test]
    fn take_one_close_rest_picks_the_right_fd() {
        let a = tempfile::tempfile().unwrap();
        let b = tempfile::tempfile().unwrap();
        let a_raw = a.as_raw_fd();

        let fds: Vec<OwnedFd> = vec![a.into(), b.into()];
        let picked = take_one_close_rest(fds, 0).unwrap();
        assert_eq!(picked.into_raw_fd(), a_raw);
    }

    #[test]
    fn take_one_close_rest_rejects_out_of_range() {
        let a = tempfile::tempfile().unwrap();
        let fds: Vec<OwnedFd> = vec![a.into()];
        assert!(matches!(
            take_one_close_rest(fds, 5),
            Err(Error::FdIndexOutOfRange { index: 5, len: 1 })
        ));
    }
}
