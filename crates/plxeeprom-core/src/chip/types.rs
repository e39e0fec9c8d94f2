//! Chip and EEPROM type definitions

use core::fmt;

use bitflags::bitflags;

bitflags! {
    /// Serial EEPROM lines in the PLX CNTRL register
    ///
    /// DI and DO are named from the EEPROM's point of view: DI is driven by
    /// the bridge, DO is sampled by it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControlBits: u32 {
        /// Serial clock (SK)
        const CLOCK = 0x0100_0000;
        /// Chip select (CS)
        const CHIP_SELECT = 0x0200_0000;
        /// Data into the EEPROM (DI)
        const DATA_IN = 0x0400_0000;
        /// Data out of the EEPROM (DO)
        const DATA_OUT = 0x0800_0000;
        /// DI output enable (PCI9056/9656 only)
        const OUTPUT_ENABLE = 0x8000_0000;

        /// Lines wired on PCI9030/9050/9052/9054/9060/9080
        const PLX9050_MASK = Self::CLOCK.bits()
            | Self::CHIP_SELECT.bits()
            | Self::DATA_IN.bits()
            | Self::DATA_OUT.bits();
        /// Lines wired on PCI9056/9656
        const PLX9056_MASK = Self::PLX9050_MASK.bits() | Self::OUTPUT_ENABLE.bits();
    }
}

/// PLX bridge chip model
///
/// PCI9052 is programmed exactly like PCI9050 and shares its variant; the
/// distinction is kept in [`DetectedChip::marking`](crate::detect::DetectedChip).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlxModel {
    /// PCI9030 (SMARTarget I/O accelerator)
    Pci9030,
    /// PCI9050 / PCI9052
    Pci9050,
    /// PCI9054 (revision AA or later)
    Pci9054,
    /// PCI9056
    Pci9056,
    /// PCI9060 / PCI9060SD / PCI9060ES
    Pci9060,
    /// PCI9080
    Pci9080,
    /// PCI9656 (revision AA or later)
    Pci9656,
}

impl PlxModel {
    /// All supported models in table order
    pub const ALL: [PlxModel; 7] = [
        Self::Pci9030,
        Self::Pci9050,
        Self::Pci9054,
        Self::Pci9056,
        Self::Pci9060,
        Self::Pci9080,
        Self::Pci9656,
    ];

    /// Parse a user-supplied model number
    ///
    /// Both the decimal spelling (9054) and the hex spelling (0x9054) are
    /// accepted, and 9052 is treated as 9050.
    pub fn from_number(number: u32) -> Option<Self> {
        match number {
            9030 | 0x9030 => Some(Self::Pci9030),
            9050 | 0x9050 | 9052 | 0x9052 => Some(Self::Pci9050),
            9054 | 0x9054 => Some(Self::Pci9054),
            9056 | 0x9056 => Some(Self::Pci9056),
            9060 | 0x9060 => Some(Self::Pci9060),
            9080 | 0x9080 => Some(Self::Pci9080),
            9656 | 0x9656 => Some(Self::Pci9656),
            _ => None,
        }
    }

    /// Model number as printed on the part, e.g. `0x9054`
    pub fn number(self) -> u16 {
        match self {
            Self::Pci9030 => 0x9030,
            Self::Pci9050 => 0x9050,
            Self::Pci9054 => 0x9054,
            Self::Pci9056 => 0x9056,
            Self::Pci9060 => 0x9060,
            Self::Pci9080 => 0x9080,
            Self::Pci9656 => 0x9656,
        }
    }

    /// Returns true if the chip uses the 128-byte local configuration BAR
    pub fn is_small_bar(self) -> bool {
        matches!(self, Self::Pci9030 | Self::Pci9050)
    }
}

impl fmt::Display for PlxModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PCI{:04X}", self.number())
    }
}

/// Serial EEPROM part type (93Cx6 family, 16-bit organisation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EepromType {
    /// 93CS46: 1024 bits, 64 words
    Cs46,
    /// 93CS56: 2048 bits, 128 words
    Cs56,
    /// 93CS66: 4096 bits, 256 words
    Cs66,
}

impl EepromType {
    /// All EEPROM types
    pub const ALL: [EepromType; 3] = [Self::Cs46, Self::Cs56, Self::Cs66];

    /// Parse a user-supplied EEPROM type number
    ///
    /// Each part can be named by its type suffix, its size in bytes or its
    /// size in bits: 46/128/1024, 56/256/2048 or 66/512/4096.
    pub fn from_number(number: u32) -> Option<Self> {
        match number {
            46 | 128 | 1024 => Some(Self::Cs46),
            56 | 256 | 2048 => Some(Self::Cs56),
            66 | 512 | 4096 => Some(Self::Cs66),
            _ => None,
        }
    }

    /// Capacity in bytes
    pub fn size(self) -> usize {
        match self {
            Self::Cs46 => 128,
            Self::Cs56 => 256,
            Self::Cs66 => 512,
        }
    }

    /// Number of address bits clocked out with each command
    ///
    /// The 93CS56 takes the same 8 address bits as the 93CS66 and ignores
    /// the most significant one.
    pub fn address_width(self) -> u32 {
        match self {
            Self::Cs46 => 6,
            Self::Cs56 | Self::Cs66 => 8,
        }
    }

    /// Number of 16-bit words
    pub fn words(self) -> u32 {
        (self.size() / 2) as u32
    }
}

impl fmt::Display for EepromType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cs46 => write!(f, "93CS46"),
            Self::Cs56 => write!(f, "93CS56"),
            Self::Cs66 => write!(f, "93CS66"),
        }
    }
}

/// Fixed register and EEPROM geometry of a detected device
///
/// Only constructed from a model table entry and one of the EEPROM types
/// that entry supports, so the capacity and address width always belong
/// together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceGeometry {
    model: PlxModel,
    cntrl_offset: usize,
    wired: ControlBits,
    eeprom: EepromType,
}

impl DeviceGeometry {
    pub(crate) fn new(
        model: PlxModel,
        cntrl_offset: usize,
        wired: ControlBits,
        eeprom: EepromType,
    ) -> Self {
        Self {
            model,
            cntrl_offset,
            wired,
            eeprom,
        }
    }

    /// Chip model
    pub fn model(&self) -> PlxModel {
        self.model
    }

    /// Byte offset of the CNTRL register in the local configuration BAR
    pub fn cntrl_offset(&self) -> usize {
        self.cntrl_offset
    }

    /// Control lines wired on this model
    pub fn wired(&self) -> ControlBits {
        self.wired
    }

    /// EEPROM part type
    pub fn eeprom(&self) -> EepromType {
        self.eeprom
    }

    /// EEPROM capacity in bytes
    pub fn capacity(&self) -> usize {
        self.eeprom.size()
    }

    /// EEPROM address width in bits
    pub fn address_width(&self) -> u32 {
        self.eeprom.address_width()
    }

    /// Number of 16-bit words in the EEPROM
    pub fn words(&self) -> u32 {
        self.eeprom.words()
    }
}

impl fmt::Display for DeviceGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} CNTRL@{:#04x}, {} ({} bytes, {} address bits)",
            self.model,
            self.cntrl_offset,
            self.eeprom,
            self.capacity(),
            self.address_width()
        )
    }
}
