//! plxeeprom-dummy - Simulated PLX bridges for testing
//!
//! This crate simulates a PLX PCI bridge down to the EEPROM pins: a PCI
//! configuration header with sizable BARs, the local configuration register
//! block with PCIHIDR/PCIHREV, and a 93CS46/56/66 EEPROM clocked through the
//! CNTRL register. It's useful for testing and development without real
//! hardware.
//!
//! # Example
//!
//! ```ignore
//! use plxeeprom_core::{detect, DetectOptions, PlxModel};
//! use plxeeprom_dummy::{DummyConfig, DummyPlatform};
//!
//! let mut platform = DummyPlatform::with_card(DummyConfig::new(PlxModel::Pci9054));
//! let options = DetectOptions::new().with_plx(0x9054);
//! let (handle, detection) = detect::bring_up(&mut platform, &options)?;
//! assert_eq!(detection.chip.marking, "PCI9054");
//! handle.write_at(0, &[0x10, 0xB5])?;
//! ```

#![warn(missing_docs)]

pub mod eeprom;
mod platform;
mod registers;

pub use eeprom::{Command, Fault, MicrowireEeprom};
pub use platform::{DummyConfig, DummyConfigSpace, DummyPlatform};
pub use registers::DummyPlx;
