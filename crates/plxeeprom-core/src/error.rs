//! Error types for plxeeprom-core
//!
//! Detection errors abort device bring-up; everything else is reported per
//! request and leaves the device usable.

use thiserror::Error;

use crate::chip::PlxModel;

/// Core error type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    // Detection errors
    /// No PCI device matched the bus/slot or ID filters
    #[error("could not find PCI device")]
    NoMatchingDevice,
    /// The device does not look like a supported PLX bridge
    #[error("not a supported PLX chip: {0}")]
    UnsupportedChip(&'static str),
    /// The detected chip disagrees with the requested model
    #[error("detected {detected} but PLX model {requested:#x} was requested")]
    ModelMismatch {
        /// Model found on the bus
        detected: PlxModel,
        /// Model number supplied by the caller
        requested: u32,
    },
    /// The chip revision is not supported
    #[error("{model} revision {revision:#04x} is not supported")]
    RevisionUnsupported {
        /// Detected model
        model: PlxModel,
        /// Revision read from the chip
        revision: u8,
    },
    /// The model has no default EEPROM type and none was given
    #[error("must specify EEPROM type for {0}")]
    EepromTypeRequired(PlxModel),
    /// The requested EEPROM type is not valid for the model
    #[error("invalid EEPROM type {requested} for {model}")]
    EepromTypeInvalid {
        /// Detected model
        model: PlxModel,
        /// EEPROM type number supplied by the caller
        requested: u32,
    },
    /// Reading or writing PCI configuration space failed
    #[error("PCI configuration access failed at offset {offset:#x}")]
    ConfigAccess {
        /// Configuration space offset
        offset: u16,
    },

    // Per-request errors
    /// Word address beyond the end of the EEPROM
    #[error("EEPROM word address {address:#x} out of range ({words} words)")]
    AddressOutOfRange {
        /// Requested word address
        address: u32,
        /// Number of words in the EEPROM
        words: u32,
    },
    /// The dummy bit before read data was not zero
    #[error("EEPROM protocol framing error reading word {address:#x}")]
    ProtocolFraming {
        /// Word address being read
        address: u32,
    },
    /// The EEPROM never signalled completion of a programming cycle
    #[error("timed out waiting for EEPROM write cycle")]
    WriteTimeout,
    /// Waiting for the device lock was interrupted; nothing was touched
    #[error("interrupted while waiting for device")]
    Interrupted,
    /// Write starts at or beyond the end of the EEPROM
    #[error("no space left on EEPROM")]
    NoSpace,
    /// Seek target outside `[0, capacity]`
    #[error("invalid seek position")]
    InvalidSeek,

    // Configuration errors
    /// A detection option could not be parsed
    #[error("invalid option: {0}")]
    InvalidOption(&'static str),
}

impl Error {
    /// Returns true for errors that can only happen during bring-up
    pub fn is_detection_error(&self) -> bool {
        matches!(
            self,
            Self::NoMatchingDevice
                | Self::UnsupportedChip(_)
                | Self::ModelMismatch { .. }
                | Self::RevisionUnsupported { .. }
                | Self::EepromTypeRequired(_)
                | Self::EepromTypeInvalid { .. }
                | Self::ConfigAccess { .. }
        )
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        use std::io::ErrorKind;

        let kind = match err {
            Error::Interrupted => ErrorKind::Interrupted,
            Error::InvalidSeek | Error::InvalidOption(_) => ErrorKind::InvalidInput,
            Error::WriteTimeout => ErrorKind::TimedOut,
            Error::NoSpace => ErrorKind::WriteZero,
            _ => ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
