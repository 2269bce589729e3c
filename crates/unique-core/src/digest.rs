//! SHA-256 digesting of sealed memfd contents.

use std::os::fd::AsFd;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Read `fd` start-to-end via positional reads and return the hex-encoded
/// SHA-256 digest of its contents.
///
/// Reads proceed in 64 KiB chunks starting at offset 0, advancing by
/// whatever `pread` returns. A short read is not an error; only a negative
/// return (surfaced here as an `io::Error`) is. The loop terminates on a
/// zero-byte read, i.e. EOF.
pub fn sha256_hex_of_fd(fd: impl AsFd) -> Result<String> {
    const CHUNK: usize = 64 * 1024;

    let fd = fd.as_fd();
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK];
    let mut offset: u64 = 0;

    loop {
        let n = rustix::io::pread(fd, &mut buf, offset).map_err(|e| Error::Read(e.into()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        offset += n as u64;
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn digest_matches_reference() {
        let mut f = tempfile::tempfile().unwrap();
        f.write_all(b"Hello, World!\0").unwrap();

        let digest = sha256_hex_of_fd(&f).unwrap();
        let expected = format!("{:x}", Sha256::digest(b"Hello, World!\0"));
        assert_eq!(digest, expected);
    }

    #[test]
    fn digest_of_empty_file_is_stable() {
        let f = tempfile::tempfile().unwrap();
        let digest = sha256_hex_of_fd(&f).unwrap();
        assert_eq!(digest, format!("{:x}", Sha256::digest(b"")));
    }
}
