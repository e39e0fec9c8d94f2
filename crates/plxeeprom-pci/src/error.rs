//! Error types for the Linux PCI backend

use std::io;

/// Error type for the Linux PCI backend
#[derive(Debug, thiserror::Error)]
pub enum PciError {
    /// The sysfs PCI tree is missing
    #[error("PCI sysfs not available at {0}")]
    SysfsUnavailable(&'static str),
    /// Enumerating the PCI bus failed
    #[error("failed to scan PCI bus: {0}")]
    Scan(#[source] io::Error),
    /// A device's configuration space could not be opened
    #[error("failed to open PCI config of {bdf}: {source}")]
    ConfigOpen {
        /// Device address
        bdf: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },
    /// Writing the sysfs `enable` attribute failed
    #[error("failed to enable {bdf}: {source}")]
    Enable {
        /// Device address
        bdf: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },
    /// Mapping physical memory failed
    #[error("failed to map memory at {address:#x} (size {size})")]
    MemoryMap {
        /// Physical address
        address: u64,
        /// Size in bytes
        size: usize,
    },
    /// I/O port permission was refused
    #[error("no access to I/O ports {base:#x}+{size:#x} (are you root?)")]
    PortPermission {
        /// First port
        base: u16,
        /// Number of ports
        size: u16,
    },
    /// Operation not available on this platform
    #[error("not supported: {0}")]
    NotSupported(&'static str),
    /// Detection or EEPROM error
    #[error(transparent)]
    Core(#[from] plxeeprom_core::Error),
}

/// Result type for the Linux PCI backend
pub type Result<T> = core::result::Result<T, PciError>;
