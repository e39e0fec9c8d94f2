//! Physical memory mapping for MMIO access
//!
//! Maps a memory BAR through /dev/mem so the bridge's local configuration
//! registers can be accessed directly.
//!
//! # Safety
//!
//! Accessing physical memory requires root privileges. The mapping rounds
//! the region out to whole pages; accesses stay within the requested size.

use plxeeprom_core::programmer::RegisterAccess;

use crate::error::{PciError, Result};

/// A mapped region of physical memory
#[cfg(target_os = "linux")]
pub struct PhysMap {
    /// Pointer to the first requested byte
    ptr: *mut u8,
    /// Requested size
    size: usize,
    /// Size of the page-aligned mapping
    map_size: usize,
    /// Physical address (for error reporting)
    phys_addr: u64,
}

#[cfg(target_os = "linux")]
fn page_size() -> usize {
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

#[cfg(target_os = "linux")]
impl PhysMap {
    /// Map `size` bytes of physical memory at `phys_addr` for MMIO access
    ///
    /// The caller must make sure the range is a device's register window
    /// and not RAM.
    pub fn new(phys_addr: u64, size: usize) -> Result<Self> {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;
        use std::os::unix::io::AsRawFd;

        let map_error = || PciError::MemoryMap {
            address: phys_addr,
            size,
        };

        // O_SYNC for uncached access
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open("/dev/mem")
            .map_err(|e| {
                log::debug!("/dev/mem: {}", e);
                map_error()
            })?;

        let page_mask = page_size() - 1;
        let offset = (phys_addr as usize) & page_mask;
        let aligned_addr = phys_addr & !(page_mask as u64);
        let map_size = (size + offset + page_mask) & !page_mask;

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                map_size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                aligned_addr as libc::off_t,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(map_error());
        }

        log::debug!("mapped {:#x} ({} bytes)", phys_addr, size);
        Ok(Self {
            ptr: unsafe { (ptr as *mut u8).add(offset) },
            size,
            map_size,
            phys_addr,
        })
    }
}

#[cfg(target_os = "linux")]
impl RegisterAccess for PhysMap {
    #[inline]
    fn read32(&mut self, offset: usize) -> u32 {
        debug_assert!(offset + 4 <= self.size);
        debug_assert!(offset & 3 == 0, "unaligned 32-bit read");
        unsafe { core::ptr::read_volatile(self.ptr.add(offset) as *const u32) }
    }

    #[inline]
    fn write32(&mut self, offset: usize, value: u32) {
        debug_assert!(offset + 4 <= self.size);
        debug_assert!(offset & 3 == 0, "unaligned 32-bit write");
        unsafe { core::ptr::write_volatile(self.ptr.add(offset) as *mut u32, value) }
    }

    #[inline]
    fn read8(&mut self, offset: usize) -> u8 {
        debug_assert!(offset < self.size);
        unsafe { core::ptr::read_volatile(self.ptr.add(offset)) }
    }
}

#[cfg(target_os = "linux")]
impl Drop for PhysMap {
    fn drop(&mut self) {
        let offset = (self.phys_addr as usize) & (page_size() - 1);
        unsafe {
            let original = self.ptr.sub(offset);
            libc::munmap(original as *mut libc::c_void, self.map_size);
        }
    }
}

// The mapping is owned exclusively and MMIO has no aliasing concerns
#[cfg(target_os = "linux")]
unsafe impl Send for PhysMap {}

// Stub for non-Linux platforms
#[cfg(not(target_os = "linux"))]
pub struct PhysMap {
    _private: (),
}

#[cfg(not(target_os = "linux"))]
impl PhysMap {
    /// Always fails on this platform
    pub fn new(_phys_addr: u64, _size: usize) -> Result<Self> {
        Err(PciError::NotSupported(
            "physical memory mapping only supported on Linux",
        ))
    }
}

#[cfg(not(target_os = "linux"))]
impl RegisterAccess for PhysMap {
    fn read32(&mut self, _offset: usize) -> u32 {
        0xFFFF_FFFF
    }
    fn write32(&mut self, _offset: usize, _value: u32) {}
    fn read8(&mut self, _offset: usize) -> u8 {
        0xFF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires root, /dev/mem and a PLX card; set PLX_BAR=<address>
    fn test_physmap_reads_cntrl() {
        let address = std::env::var("PLX_BAR").unwrap();
        let address = u64::from_str_radix(address.trim_start_matches("0x"), 16).unwrap();
        let mut map = PhysMap::new(address, 128).unwrap();
        let cntrl = map.read32(0x50);
        assert_ne!(cntrl, 0xFFFF_FFFF);
    }
}
