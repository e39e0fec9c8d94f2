//! Backend registry for PLX EEPROM access
//!
//! The CLI opens devices through this crate by programmer string and never
//! names a platform or accessor type.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CLI (bin/plxeeprom)                     │
//! │  - Only imports plxeeprom-device and plxeeprom-core          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  plxeeprom-device (this crate)               │
//! │  - EepromHandle: DeviceHandle over a boxed accessor          │
//! │  - open_device: opens backends by name                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │    plxeeprom-core        │   │  Backend crates          │
//! │  - detection             │   │  - pci (Linux sysfs)     │
//! │  - bit engine, protocol  │   │  - dummy (simulator)     │
//! │  - DeviceHandle          │   │  - Implement PciPlatform │
//! └──────────────────────────┘   └──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use plxeeprom_core::detect::DetectOptions;
//! use plxeeprom_device::open_device;
//!
//! let (handle, info) = open_device("dummy:model=9054", &DetectOptions::new())?;
//! let mut image = vec![0u8; handle.capacity()];
//! handle.read_at(0, &mut image)?;
//! ```

mod handle;
mod registry;

pub use handle::{DeviceInfo, EepromHandle};
pub use registry::{
    available_programmers, open_device, parse_programmer_params, programmer_names_short,
    ProgrammerInfo, ProgrammerParams,
};

// Re-export core types that the CLI needs
pub use plxeeprom_core::detect::DetectOptions;
pub use plxeeprom_core::{EepromType, Error, PlxModel};
