//! Register access and the bit-banged serial engine
//!
//! [`RegisterAccess`] is the seam between the protocol code and whatever
//! maps the chip's local configuration registers. [`SerialBitEngine`]
//! drives the EEPROM pins through it.

mod access;
pub mod bitbang;

pub use access::{busy_wait, RegisterAccess};
pub use bitbang::{CommandFrame, SerialBitEngine};
