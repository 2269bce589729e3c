//! Read-only, private memory mappings over a blob fd, including the
//! `MAP_FIXED` in-place replacement the deferred client path relies on.

use std::ffi::c_void;
use std::os::fd::AsFd;

use rustix::mm::{MapFlags, ProtFlags};

use crate::error::{Error, Result};

/// Maps `len` bytes of `fd` read-only and private at an address chosen by
/// the kernel. Returns the base address; the caller owns the mapping and
/// must [`unmap`] it exactly once.
pub fn map_readonly_private(fd: impl AsFd, len: usize) -> Result<*mut u8> {
    // Safety: no existing mapping is disturbed since we let the kernel pick
    // the address (no MAP_FIXED here).
    let addr = unsafe {
        rustix::mm::mmap(
            std::ptr::null_mut(),
            len,
            ProtFlags::READ,
            MapFlags::PRIVATE,
            fd.as_fd(),
            0,
        )
        .map_err(|e| Error::Mmap(e.into()))?
    };
    Ok(addr as *mut u8)
}

/// Replaces the mapping at `addr..addr+len` with a read-only, private
/// mapping of `fd`, at the exact same address. This is the operation that
/// makes the deferred path's dedup swap invisible to callers holding
/// pointers into the old mapping.
///
/// Returns an error if the kernel did not honor the fixed address (it is
/// documented to either comply or fail `mmap` outright, but we still check:
/// silently migrating a caller's pointer out from under them would be worse
/// than a panic).
///
/// # Safety
/// `addr` must be the base of a live mapping of exactly `len` bytes created
/// by a previous call to [`map_readonly_private`] (or this function) that
/// has not since been unmapped.
pub unsafe fn remap_fixed_readonly_private(
    addr: *mut u8,
    len: usize,
    fd: impl AsFd,
) -> Result<()> {
    // Safety: precondition on `addr`/`len` is forwarded to the caller of
    // this function; MAP_FIXED is exactly the operation we're documented
    // to perform.
    let new_addr = unsafe {
        rustix::mm::mmap(
            addr as *mut c_void,
            len,
            ProtFlags::READ,
            MapFlags::PRIVATE | MapFlags::FIXED,
            fd.as_fd(),
            0,
        )
        .map_err(|e| Error::Mmap(e.into()))?
    };

    assert_eq!(
        new_addr as *mut u8, addr,
        "MAP_FIXED returned a different address than requested; kernel contract violated"
    );

    Ok(())
}

/// Unmaps a mapping previously created by [`map_readonly_private`].
///
/// # Safety
/// `addr` must be the base of a live mapping of exactly `len` bytes that has
/// not already been unmapped, and no references into it may outlive this
/// call.
pub unsafe fn unmap(addr: *mut u8, len: usize) -> Result<()> {
    // Safety: forwarded from the caller's precondition.
    unsafe { rustix::mm::munmap(addr as *mut c_void, len).map_err(|e| Error::Munmap(e.into())) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memfd::create_sealed_memfd;

    #[test]
    fn map_then_unmap_roundtrips_contents() {
        let fd = create_sealed_memfd(b"Hello, World!\0").unwrap();
        let addr = map_readonly_private(&fd, 14).unwrap();
        let slice = unsafe { std::slice::from_raw_parts(addr, 14) };
        assert_eq!(slice, b"Hello, World!\0");
        unsafe { unmap(addr, 14).unwrap() };
    }

    #[test]
    fn remap_fixed_preserves_address_and_swaps_contents() {
        let fd_a = create_sealed_memfd(b"aaaaaaaaaaaaaa").unwrap();
        let fd_b = create_sealed_memfd(b"bbbbbbbbbbbbbb").unwrap();

        let addr = map_readonly_private(&fd_a, 14).unwrap();
        assert_eq!(unsafe { std::slice::from_raw_parts(addr, 14) }, b"aaaaaaaaaaaaaa");

        unsafe { remap_fixed_readonly_private(addr, 14, &fd_b).unwrap() };
        assert_eq!(unsafe { std::slice::from_raw_parts(addr, 14) }, b"bbbbbbbbbbbbbb");

        unsafe { unmap(addr, 14).unwrap() };
    }
}
