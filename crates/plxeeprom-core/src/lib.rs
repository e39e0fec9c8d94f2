//! plxeeprom-core - Serial EEPROM access for PLX PCI bridge chips
//!
//! The PLX PCI9030/9050/9052/9054/9056/9060/9080/9656 bridges load their
//! configuration from a 93CS46/56/66 Microwire EEPROM whose pins are exposed
//! as bits of a local configuration register. This crate detects the chip,
//! bit-bangs the EEPROM protocol through that register and presents the
//! EEPROM as a byte stream.
//!
//! Requests flow through these layers:
//!
//! ```text
//! DeviceHandle / Session   byte stream, locking, cursor
//! stream                   bytes <-> 16-bit words
//! protocol                 READ / WRITE / EWEN / EWDS
//! programmer               pin-level bit engine
//! RegisterAccess           memory-mapped or port I/O backend
//! ```
//!
//! # Example
//!
//! ```ignore
//! use plxeeprom_core::{detect, DetectOptions};
//!
//! fn dump<P: plxeeprom_core::pci::PciPlatform>(platform: &mut P) -> Result<Vec<u8>, P::Error>
//! where
//!     P::Error: std::fmt::Display,
//! {
//!     let (handle, detection) = detect::bring_up(platform, &DetectOptions::new())?;
//!     println!("Found {} with a {}", detection.chip, detection.geometry.eeprom());
//!     let mut data = vec![0; handle.capacity()];
//!     let n = handle.read_at(0, &mut data)?;
//!     data.truncate(n);
//!     Ok(data)
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod chip;
pub mod detect;
pub mod device;
pub mod error;
pub mod pci;
pub mod programmer;
pub mod protocol;
pub mod stream;

pub use chip::{DeviceGeometry, EepromType, PlxModel};
pub use detect::{DetectOptions, DetectedChip, Detection};
pub use device::{DeviceHandle, Interrupter, Session};
pub use error::{Error, Result};
