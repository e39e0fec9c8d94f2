//! EEPROM command protocols

pub mod microwire;

pub use microwire::{EepromProtocol, WRITE_CYCLE_TIMEOUT};
