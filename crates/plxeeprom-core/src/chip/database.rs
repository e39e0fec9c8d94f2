//! Static per-model geometry table

use super::types::{ControlBits, DeviceGeometry, EepromType, PlxModel};

/// PLX Technology PCI vendor ID
pub const PLX_VENDOR_ID: u16 = 0x10B5;

/// CNTRL register offset on PCI9030/9050/9052
pub const PLX9050_CNTRL: usize = 0x50;
/// CNTRL register offset on PCI9054 and later
pub const PLX9054_CNTRL: usize = 0x6C;

/// Header identification register (PCIHIDR) in the local configuration BAR
pub const PLX9054_PCIHIDR: usize = 0x70;
/// Header revision register (PCIHREV) in the local configuration BAR
pub const PLX9054_PCIHREV: usize = 0x74;

/// How the chip revision is validated during detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionRule {
    /// Any revision is accepted
    Any,
    /// Revision must be at least this value
    AtLeast(u8),
    /// Never accepted when identified through PCIHIDR; only the explicit
    /// override path for a blank PCIHIDR accepts the chip
    OverrideOnly,
}

impl RevisionRule {
    /// Check a revision against this rule
    pub fn accepts(self, revision: u8) -> bool {
        match self {
            Self::Any => true,
            Self::AtLeast(min) => revision >= min,
            Self::OverrideOnly => false,
        }
    }
}

/// Static description of one chip model
#[derive(Debug, Clone, Copy)]
pub struct ModelInfo {
    /// Model
    pub model: PlxModel,
    /// PCI device ID used for enumeration
    pub device_id: u16,
    /// PCIHIDR signatures that identify this model, with the marking each
    /// one corresponds to (empty for the 128-byte BAR family)
    pub signatures: &'static [(u32, &'static str)],
    /// Offset of the CNTRL register
    pub cntrl_offset: usize,
    /// Control lines wired to the EEPROM
    pub wired: ControlBits,
    /// EEPROM types the model can be fitted with
    pub eeproms: &'static [EepromType],
    /// EEPROM type assumed when none is specified
    pub default_eeprom: Option<EepromType>,
    /// Revision acceptance rule
    pub revision: RevisionRule,
}

impl ModelInfo {
    /// Build the geometry for this model with a given EEPROM type
    ///
    /// Returns `None` if the model cannot be fitted with that EEPROM.
    pub fn geometry(&self, eeprom: EepromType) -> Option<DeviceGeometry> {
        self.eeproms.contains(&eeprom).then(|| {
            DeviceGeometry::new(self.model, self.cntrl_offset, self.wired, eeprom)
        })
    }

    /// Geometry with the default EEPROM type, if the model has one
    pub fn default_geometry(&self) -> Option<DeviceGeometry> {
        self.default_eeprom.and_then(|t| self.geometry(t))
    }
}

const SMALL_EEPROMS: &[EepromType] = &[EepromType::Cs46];
const LARGE_EEPROMS: &[EepromType] = &[EepromType::Cs56, EepromType::Cs66];
const EITHER_EEPROMS: &[EepromType] = &[EepromType::Cs46, EepromType::Cs56];

/// All supported models
///
/// Ordered like [`PlxModel::ALL`].
pub static MODELS: &[ModelInfo] = &[
    ModelInfo {
        model: PlxModel::Pci9030,
        device_id: 0x9030,
        signatures: &[],
        cntrl_offset: PLX9050_CNTRL,
        wired: ControlBits::PLX9050_MASK,
        eeproms: LARGE_EEPROMS,
        default_eeprom: Some(EepromType::Cs56),
        revision: RevisionRule::Any,
    },
    ModelInfo {
        model: PlxModel::Pci9050,
        device_id: 0x9050,
        signatures: &[],
        cntrl_offset: PLX9050_CNTRL,
        wired: ControlBits::PLX9050_MASK,
        eeproms: SMALL_EEPROMS,
        default_eeprom: Some(EepromType::Cs46),
        revision: RevisionRule::Any,
    },
    ModelInfo {
        model: PlxModel::Pci9054,
        device_id: 0x9054,
        signatures: &[(0x9054_10B5, "PCI9054")],
        cntrl_offset: PLX9054_CNTRL,
        wired: ControlBits::PLX9050_MASK,
        eeproms: LARGE_EEPROMS,
        default_eeprom: Some(EepromType::Cs56),
        revision: RevisionRule::AtLeast(0x0A),
    },
    ModelInfo {
        model: PlxModel::Pci9056,
        device_id: 0x9056,
        signatures: &[(0x9056_10B5, "PCI9056")],
        cntrl_offset: PLX9054_CNTRL,
        wired: ControlBits::PLX9056_MASK,
        eeproms: LARGE_EEPROMS,
        default_eeprom: Some(EepromType::Cs56),
        revision: RevisionRule::Any,
    },
    // Shipped with either a 93CS46 or a 93CS56, so there is no safe default.
    ModelInfo {
        model: PlxModel::Pci9060,
        device_id: 0x9060,
        signatures: &[
            (0x9060_10B5, "PCI9060"),
            (0x906D_10B5, "PCI9060SD"),
            (0x906E_10B5, "PCI9060ES"),
        ],
        cntrl_offset: PLX9054_CNTRL,
        wired: ControlBits::PLX9050_MASK,
        eeproms: EITHER_EEPROMS,
        default_eeprom: None,
        revision: RevisionRule::OverrideOnly,
    },
    ModelInfo {
        model: PlxModel::Pci9080,
        device_id: 0x9080,
        signatures: &[(0x9080_10B5, "PCI9080")],
        cntrl_offset: PLX9054_CNTRL,
        wired: ControlBits::PLX9050_MASK,
        eeproms: EITHER_EEPROMS,
        default_eeprom: None,
        revision: RevisionRule::Any,
    },
    ModelInfo {
        model: PlxModel::Pci9656,
        device_id: 0x9656,
        signatures: &[(0x9656_10B5, "PCI9656")],
        cntrl_offset: PLX9054_CNTRL,
        wired: ControlBits::PLX9056_MASK,
        eeproms: LARGE_EEPROMS,
        default_eeprom: Some(EepromType::Cs56),
        revision: RevisionRule::AtLeast(0xAA),
    },
];

/// Look up the table entry for a model
pub fn model_info(model: PlxModel) -> &'static ModelInfo {
    // MODELS is ordered like PlxModel::ALL
    &MODELS[model as usize]
}

/// Find the model and marking for a PCIHIDR value
pub fn find_by_signature(hidr: u32) -> Option<(&'static ModelInfo, &'static str)> {
    MODELS.iter().find_map(|info| {
        info.signatures
            .iter()
            .find(|(sig, _)| *sig == hidr)
            .map(|(_, marking)| (info, *marking))
    })
}

/// PCI device ID to enumerate for an optional model override
///
/// Defaults to the PCI9050 ID, which PCI9052 shares.
pub fn enumeration_device_id(model: Option<PlxModel>) -> u16 {
    model_info(model.unwrap_or(PlxModel::Pci9050)).device_id
}
