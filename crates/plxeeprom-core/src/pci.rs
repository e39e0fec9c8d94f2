//! PCI device model and the platform seam used for bring-up
//!
//! Detection only needs a handful of things from the platform: the list of
//! devices, configuration-space access, the decoded base address regions and
//! a way to map one of them. [`PciPlatform`] collects those so detection can
//! run against real hardware and the simulator alike.

use core::fmt;

use crate::error::{Error, Result};
use crate::programmer::RegisterAccess;

/// Offset of BAR0 in the configuration header
pub const PCI_BASE_ADDRESS_0: u16 = 0x10;
/// PCI9030 VPD control register (PVPDCNTL) in the configuration header
pub const PCI_VPD_CONTROL: u16 = 0x4C;
/// Header type of an ordinary (non-bridge) function
pub const PCI_HEADER_TYPE_NORMAL: u8 = 0;

const PCI_BASE_ADDRESS_SPACE_IO: u32 = 0x01;
const PCI_BASE_ADDRESS_MEM_MASK: u32 = !0x0F;
const PCI_BASE_ADDRESS_IO_MASK: u32 = !0x03;

/// Address space of a base address region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarKind {
    /// Memory space
    Memory,
    /// I/O port space
    Io,
}

impl fmt::Display for BarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "mem"),
            Self::Io => write!(f, "io"),
        }
    }
}

/// A decoded base address region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bar {
    /// BAR index (0-5)
    pub index: u8,
    /// Bus address of the region
    pub address: u64,
    /// Size in bytes
    pub size: u64,
    /// Address space
    pub kind: BarKind,
}

impl Bar {
    /// Returns true for a memory region of exactly `size` bytes
    pub fn is_memory_of(&self, size: u64) -> bool {
        self.kind == BarKind::Memory && self.size == size
    }

    /// Returns true for an I/O region of exactly `size` bytes
    pub fn is_io_of(&self, size: u64) -> bool {
        self.kind == BarKind::Io && self.size == size
    }
}

impl fmt::Display for Bar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BAR{} {} {:#x} ({} bytes)",
            self.index, self.kind, self.address, self.size
        )
    }
}

/// PCI function as found during enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PciDevice {
    /// PCI domain (usually 0)
    pub domain: u16,
    /// PCI bus number
    pub bus: u8,
    /// PCI device (slot) number
    pub device: u8,
    /// PCI function number
    pub function: u8,
    /// Vendor ID
    pub vendor_id: u16,
    /// Device ID
    pub device_id: u16,
    /// Subsystem vendor ID
    pub subsystem_vendor_id: u16,
    /// Subsystem device ID
    pub subsystem_device_id: u16,
    /// Revision ID
    pub revision_id: u8,
    /// Header type, without the multi-function bit
    pub header_type: u8,
    /// Class code (upper 24 bits)
    pub class: u32,
}

impl PciDevice {
    /// Get the BDF (Bus:Device.Function) string
    pub fn bdf(&self) -> String {
        format!("{:02x}:{:02x}.{:x}", self.bus, self.device, self.function)
    }
}

/// PCI configuration space of one function
pub trait ConfigSpace {
    /// Read a byte
    fn read_config8(&mut self, offset: u16) -> Result<u8>;

    /// Read a dword
    fn read_config32(&mut self, offset: u16) -> Result<u32>;

    /// Write a dword
    fn write_config32(&mut self, offset: u16, value: u32) -> Result<()>;
}

/// Size a base address register by writing all ones to it
///
/// The original value is restored before returning. The caller must make
/// sure nothing else uses the device's configuration space meanwhile.
/// Returns `None` for an unimplemented BAR.
pub fn probe_bar<C: ConfigSpace + ?Sized>(config: &mut C, index: u8) -> Result<Option<Bar>> {
    let offset = PCI_BASE_ADDRESS_0 + 4 * index as u16;

    let mut current = config.read_config32(offset)?;
    config.write_config32(offset, !0)?;
    let mask = config.read_config32(offset);
    // Restore even if reading the mask failed
    config.write_config32(offset, current)?;
    let mut mask = mask?;

    if mask == 0 || mask == 0xFFFF_FFFF {
        return Ok(None);
    }
    if current == 0xFFFF_FFFF {
        current = 0;
    }

    let (kind, address) = if current & PCI_BASE_ADDRESS_SPACE_IO != 0 {
        mask &= PCI_BASE_ADDRESS_IO_MASK & 0xFFFF;
        (BarKind::Io, current & PCI_BASE_ADDRESS_IO_MASK)
    } else {
        mask &= PCI_BASE_ADDRESS_MEM_MASK;
        (BarKind::Memory, current & PCI_BASE_ADDRESS_MEM_MASK)
    };
    if mask == 0 {
        return Ok(None);
    }

    // Lowest writable address bit
    let size = mask & !(mask - 1);
    log::trace!("BAR{}: {:#010x} mask {:#010x} size {}", index, current, mask, size);
    Ok(Some(Bar {
        index,
        address: address as u64,
        size: size as u64,
        kind,
    }))
}

/// Platform services needed to bring up a device
///
/// Implemented by the Linux backend and by the simulator.
pub trait PciPlatform {
    /// Configuration space accessor
    type Config: ConfigSpace;
    /// Register accessor for a mapped region
    type Access: RegisterAccess;
    /// Platform error
    type Error: From<Error>;

    /// Enumerate all PCI functions
    fn scan(&mut self) -> core::result::Result<Vec<PciDevice>, Self::Error>;

    /// Open the configuration space of a device
    fn config(&mut self, device: &PciDevice) -> core::result::Result<Self::Config, Self::Error>;

    /// Decode one base address region
    ///
    /// The default sizes the BAR with [`probe_bar`].
    fn region(
        &mut self,
        _device: &PciDevice,
        config: &mut Self::Config,
        index: u8,
    ) -> core::result::Result<Option<Bar>, Self::Error> {
        Ok(probe_bar(config, index)?)
    }

    /// Enable decoding of the device's regions
    fn enable(&mut self, _device: &PciDevice) -> core::result::Result<(), Self::Error> {
        Ok(())
    }

    /// Map a region for register access
    fn map(
        &mut self,
        device: &PciDevice,
        region: &Bar,
    ) -> core::result::Result<Self::Access, Self::Error>;
}
