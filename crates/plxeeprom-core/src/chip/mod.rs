//! Chip model and EEPROM geometry definitions

mod database;
mod types;

pub use database::{
    enumeration_device_id, find_by_signature, model_info, ModelInfo, RevisionRule, MODELS,
    PLX9050_CNTRL, PLX9054_CNTRL, PLX9054_PCIHIDR, PLX9054_PCIHREV, PLX_VENDOR_ID,
};
pub use types::{ControlBits, DeviceGeometry, EepromType, PlxModel};
