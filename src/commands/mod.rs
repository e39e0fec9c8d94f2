//! CLI command implementations
//!
//! All commands work on an `EepromHandle`, so they behave the same for the
//! host PCI backend and the simulator.

pub mod eeprom;
mod list;
mod probe;

pub use list::{list_chips, list_programmers};
pub use probe::{print_info, print_probe};
