//! plxeeprom-pci - Linux platform services for PLX bridges
//!
//! Implements [`PciPlatform`] for the host's PCI bus:
//!
//! - enumeration and configuration space through sysfs
//!   (/sys/bus/pci/devices)
//! - region decoding from the sysfs `resource` file, falling back to sizing
//!   the BAR through configuration space
//! - memory-mapped register access through /dev/mem
//! - port-mapped register access through `ioperm` (x86 only)
//!
//! All of it requires root.
//!
//! # Example
//!
//! ```ignore
//! use plxeeprom_core::detect::DetectOptions;
//!
//! let options = DetectOptions::new().with_plx(0x9054);
//! let (handle, detection) = plxeeprom_pci::open_pci_device(&options)?;
//! println!("{} at {}", detection.chip, detection.device.bdf());
//! ```
//!
//! [`PciPlatform`]: plxeeprom_core::pci::PciPlatform

#![warn(missing_docs)]

pub mod error;
pub mod physmap;
mod platform;
pub mod portio;
#[cfg(target_os = "linux")]
pub mod sysfs;

pub use error::{PciError, Result};
pub use physmap::PhysMap;
pub use platform::{open_pci_device, LinuxPci, Registers};
pub use portio::PortIo;
