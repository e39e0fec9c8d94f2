//! Port-mapped register access
//!
//! The 128-byte family can expose its local configuration registers in I/O
//! space only. Access needs `ioperm` permission for the port range, which
//! is granted on creation and dropped again with the accessor.

use plxeeprom_core::programmer::RegisterAccess;

use crate::error::{PciError, Result};

/// Permission to access a range of I/O ports
#[cfg(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64")))]
pub struct PortIo {
    base: u16,
    size: u16,
}

#[cfg(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64")))]
impl PortIo {
    /// Request access to `size` ports starting at `base`
    pub fn new(base: u16, size: u16) -> Result<Self> {
        let rc = unsafe { libc::ioperm(base as libc::c_ulong, size as libc::c_ulong, 1) };
        if rc != 0 {
            log::debug!("ioperm: {}", std::io::Error::last_os_error());
            return Err(PciError::PortPermission { base, size });
        }
        log::debug!("I/O ports {:#x}+{:#x} enabled", base, size);
        Ok(Self { base, size })
    }

    fn port(&self, offset: usize) -> u16 {
        debug_assert!(offset < self.size as usize);
        self.base + offset as u16
    }
}

#[cfg(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64")))]
impl RegisterAccess for PortIo {
    #[inline]
    fn read32(&mut self, offset: usize) -> u32 {
        let port = self.port(offset);
        let value: u32;
        unsafe {
            core::arch::asm!(
                "in eax, dx",
                in("dx") port,
                out("eax") value,
                options(nomem, nostack, preserves_flags)
            );
        }
        value
    }

    #[inline]
    fn write32(&mut self, offset: usize, value: u32) {
        let port = self.port(offset);
        unsafe {
            core::arch::asm!(
                "out dx, eax",
                in("dx") port,
                in("eax") value,
                options(nomem, nostack, preserves_flags)
            );
        }
    }

    #[inline]
    fn read8(&mut self, offset: usize) -> u8 {
        let port = self.port(offset);
        let value: u8;
        unsafe {
            core::arch::asm!(
                "in al, dx",
                in("dx") port,
                out("al") value,
                options(nomem, nostack, preserves_flags)
            );
        }
        value
    }
}

#[cfg(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64")))]
impl Drop for PortIo {
    fn drop(&mut self) {
        unsafe {
            libc::ioperm(self.base as libc::c_ulong, self.size as libc::c_ulong, 0);
        }
    }
}

// Stub for platforms without port I/O
#[cfg(not(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64"))))]
pub struct PortIo {
    _private: (),
}

#[cfg(not(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64"))))]
impl PortIo {
    /// Always fails on this platform
    pub fn new(_base: u16, _size: u16) -> Result<Self> {
        Err(PciError::NotSupported("port I/O only supported on x86 Linux"))
    }
}

#[cfg(not(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64"))))]
impl RegisterAccess for PortIo {
    fn read32(&mut self, _offset: usize) -> u32 {
        0xFFFF_FFFF
    }
    fn write32(&mut self, _offset: usize, _value: u32) {}
    fn read8(&mut self, _offset: usize) -> u8 {
        0xFF
    }
}
