//! Simulated PCI bus with PLX cards on it

use plxeeprom_core::chip::{model_info, PLX_VENDOR_ID};
use plxeeprom_core::error::{Error, Result};
use plxeeprom_core::pci::{
    Bar, ConfigSpace, PciDevice, PciPlatform, PCI_BASE_ADDRESS_0, PCI_VPD_CONTROL,
};
use plxeeprom_core::{EepromType, PlxModel};

use crate::eeprom::{Fault, MicrowireEeprom};
use crate::registers::DummyPlx;

const PCI_VENDOR_ID: u16 = 0x00;
const PCI_REVISION_ID: u16 = 0x08;
const PCI_HEADER_TYPE: u16 = 0x0E;
const PCI_SUBSYSTEM_VENDOR_ID: u16 = 0x2C;

/// Description of one simulated card
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Bridge model
    pub model: PlxModel,
    /// Fitted EEPROM
    pub eeprom: EepromType,
    /// PCI revision ID, and PCIHREV on chips that have it
    pub revision: u8,
    /// PCIHIDR value (ignored by the 128-byte family)
    pub hidr: u32,
    /// PCI device ID
    pub device_id: u16,
    /// PCI subsystem vendor ID
    pub subsystem_vendor_id: u16,
    /// PCI subsystem device ID
    pub subsystem_device_id: u16,
    /// PCI bus number
    pub bus: u8,
    /// PCI slot number
    pub slot: u8,
    /// Only expose the registers through the I/O BAR (128-byte family)
    pub io_only: bool,
    /// Initial EEPROM contents for every byte
    pub fill: u8,
    /// Ready polls per programming cycle
    pub busy_polls: u32,
    /// Injected fault
    pub fault: Fault,
}

impl DummyConfig {
    /// A healthy card of the given model with its default EEPROM
    pub fn new(model: PlxModel) -> Self {
        let info = model_info(model);
        let revision = match model {
            PlxModel::Pci9054 => 0x0B,
            PlxModel::Pci9656 => 0xAA,
            PlxModel::Pci9030 | PlxModel::Pci9050 => 0x01,
            _ => 0x02,
        };
        Self {
            model,
            eeprom: info.default_eeprom.unwrap_or(info.eeproms[0]),
            revision,
            hidr: info.signatures.first().map_or(0, |(sig, _)| *sig),
            device_id: info.device_id,
            subsystem_vendor_id: PLX_VENDOR_ID,
            subsystem_device_id: info.device_id,
            bus: 1,
            slot: 0,
            io_only: false,
            fill: 0xFF,
            busy_polls: 3,
            fault: Fault::None,
        }
    }

    /// Fit a different EEPROM
    pub fn with_eeprom(mut self, eeprom: EepromType) -> Self {
        self.eeprom = eeprom;
        self
    }

    /// Set the revision
    pub fn with_revision(mut self, revision: u8) -> Self {
        self.revision = revision;
        self
    }

    /// Set the PCIHIDR value
    pub fn with_hidr(mut self, hidr: u32) -> Self {
        self.hidr = hidr;
        self
    }

    /// Place the card at a bus and slot
    pub fn at(mut self, bus: u8, slot: u8) -> Self {
        self.bus = bus;
        self.slot = slot;
        self
    }

    /// Set the subsystem IDs
    pub fn with_subsystem(mut self, vendor: u16, device: u16) -> Self {
        self.subsystem_vendor_id = vendor;
        self.subsystem_device_id = device;
        self
    }

    /// Only expose the I/O BAR
    pub fn io_only(mut self) -> Self {
        self.io_only = true;
        self
    }

    /// Initial EEPROM contents
    pub fn with_fill(mut self, fill: u8) -> Self {
        self.fill = fill;
        self
    }

    /// Inject a fault
    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = fault;
        self
    }

    /// Parse options from key-value pairs (from CLI)
    ///
    /// Supported options:
    /// - model=9030|9050|9052|9054|9056|9060|9080|9656
    /// - eeprom=46|56|66 (or size in bytes or bits)
    /// - revision=N
    /// - hidr=N
    /// - fill=N
    /// - fault=none|stuck|never-ready
    pub fn from_options(options: &[(&str, &str)]) -> Result<Self> {
        use plxeeprom_core::detect::parse_number;

        let number = |value: &str, msg: &'static str| {
            parse_number(value).ok_or(Error::InvalidOption(msg))
        };

        let mut model = PlxModel::Pci9050;
        for (key, value) in options {
            if matches!(*key, "model" | "plx") {
                model = PlxModel::from_number(number(*value, "invalid dummy model")?)
                    .ok_or(Error::InvalidOption("unknown dummy model"))?;
            }
        }
        let mut config = Self::new(model);

        for (key, value) in options {
            match *key {
                "model" | "plx" => {}
                "eeprom" => {
                    config.eeprom = EepromType::from_number(number(*value, "invalid EEPROM type")?)
                        .ok_or(Error::InvalidOption("unknown EEPROM type"))?;
                }
                "revision" | "rev" => {
                    config.revision = u8::try_from(number(*value, "invalid revision")?)
                        .map_err(|_| Error::InvalidOption("revision must be 0-255"))?;
                }
                "hidr" => config.hidr = number(*value, "invalid PCIHIDR value")?,
                "fill" => {
                    config.fill = u8::try_from(number(*value, "invalid fill byte")?)
                        .map_err(|_| Error::InvalidOption("fill must be 0-255"))?;
                }
                "fault" => {
                    config.fault = match *value {
                        "none" => Fault::None,
                        "stuck" | "stuck-do" => Fault::StuckDataOut,
                        "never-ready" | "busy" => Fault::NeverReady,
                        _ => return Err(Error::InvalidOption("unknown fault")),
                    };
                }
                _ => {
                    log::warn!("Unknown dummy option: {}={}", key, value);
                }
            }
        }

        Ok(config)
    }

    /// Size of the local configuration register block
    fn register_block_size(&self) -> u32 {
        match self.model {
            PlxModel::Pci9030 | PlxModel::Pci9050 => 128,
            PlxModel::Pci9056 | PlxModel::Pci9656 => 512,
            _ => 256,
        }
    }

    /// The card's PCI identity
    pub fn pci_device(&self) -> PciDevice {
        PciDevice {
            domain: 0,
            bus: self.bus,
            device: self.slot,
            function: 0,
            vendor_id: PLX_VENDOR_ID,
            device_id: self.device_id,
            subsystem_vendor_id: self.subsystem_vendor_id,
            subsystem_device_id: self.subsystem_device_id,
            revision_id: self.revision,
            header_type: 0,
            class: 0x068000,
        }
    }

    /// Build the card's configuration header
    pub fn config_space(&self) -> DummyConfigSpace {
        let mut config = DummyConfigSpace::default();
        config.store16(PCI_VENDOR_ID, PLX_VENDOR_ID);
        config.store16(PCI_VENDOR_ID + 2, self.device_id);
        config.bytes[PCI_REVISION_ID as usize] = self.revision;
        config.bytes[PCI_HEADER_TYPE as usize] = 0;
        config.store16(PCI_SUBSYSTEM_VENDOR_ID, self.subsystem_vendor_id);
        config.store16(PCI_SUBSYSTEM_VENDOR_ID + 2, self.subsystem_device_id);
        if self.model == PlxModel::Pci9030 {
            config.bytes[PCI_VPD_CONTROL as usize] = 0x03;
        }

        let size = self.register_block_size();
        if !self.io_only || !self.model.is_small_bar() {
            config.bars[0] = Some(BarRegister::memory(0xFEBF_0000, size));
        }
        if self.model.is_small_bar() {
            config.bars[1] = Some(BarRegister::io(0xE000, size));
        }
        config
    }

    /// Build the card's register block and EEPROM
    pub fn registers(&self) -> DummyPlx {
        let eeprom = MicrowireEeprom::new(self.eeprom, self.fill)
            .with_busy_polls(self.busy_polls)
            .with_fault(self.fault);
        DummyPlx::new(
            self.model,
            self.register_block_size() as usize,
            self.hidr,
            self.revision,
            eeprom,
        )
    }
}

/// A base address register with hardware sizing behaviour
#[derive(Debug, Clone, Copy)]
struct BarRegister {
    value: u32,
    size_mask: u32,
    flags: u32,
}

impl BarRegister {
    fn memory(address: u32, size: u32) -> Self {
        Self {
            value: address,
            size_mask: !(size - 1),
            flags: 0,
        }
    }

    fn io(address: u32, size: u32) -> Self {
        Self {
            value: address | 1,
            size_mask: !(size - 1),
            flags: 1,
        }
    }
}

/// Simulated 256-byte configuration header
#[derive(Debug, Clone)]
pub struct DummyConfigSpace {
    bytes: [u8; 256],
    bars: [Option<BarRegister>; 6],
}

impl Default for DummyConfigSpace {
    fn default() -> Self {
        Self {
            bytes: [0; 256],
            bars: [None; 6],
        }
    }
}

impl DummyConfigSpace {
    fn store16(&mut self, offset: u16, value: u16) {
        let offset = offset as usize;
        self.bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn bar_index(offset: u16) -> Option<usize> {
        let index = offset.checked_sub(PCI_BASE_ADDRESS_0)? / 4;
        (index < 6 && offset % 4 == 0).then_some(index as usize)
    }
}

impl ConfigSpace for DummyConfigSpace {
    fn read_config8(&mut self, offset: u16) -> Result<u8> {
        self.bytes
            .get(offset as usize)
            .copied()
            .ok_or(Error::ConfigAccess { offset })
    }

    fn read_config32(&mut self, offset: u16) -> Result<u32> {
        if let Some(index) = Self::bar_index(offset) {
            return Ok(self.bars[index].map_or(0, |bar| bar.value));
        }
        let start = offset as usize;
        self.bytes
            .get(start..start + 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .ok_or(Error::ConfigAccess { offset })
    }

    fn write_config32(&mut self, offset: u16, value: u32) -> Result<()> {
        if let Some(index) = Self::bar_index(offset) {
            if let Some(bar) = &mut self.bars[index] {
                bar.value = (value & bar.size_mask) | bar.flags;
            }
            return Ok(());
        }
        // The rest of the header is read-only here
        if (offset as usize) + 4 > self.bytes.len() {
            return Err(Error::ConfigAccess { offset });
        }
        Ok(())
    }
}

/// A simulated PCI bus
///
/// Mapping a region hands out a fresh register block built from the card
/// description, so every bring-up sees the card as configured.
#[derive(Debug, Clone, Default)]
pub struct DummyPlatform {
    cards: Vec<DummyConfig>,
    /// Foreign devices that enumeration must skip
    others: Vec<PciDevice>,
}

impl DummyPlatform {
    /// An empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus with a single card
    pub fn with_card(config: DummyConfig) -> Self {
        let mut platform = Self::new();
        platform.add_card(config);
        platform
    }

    /// Plug in a card
    pub fn add_card(&mut self, config: DummyConfig) {
        self.cards.push(config);
    }

    /// Plug in a non-PLX device
    pub fn add_device(&mut self, device: PciDevice) {
        self.others.push(device);
    }

    fn card(&self, device: &PciDevice) -> Result<&DummyConfig> {
        self.cards
            .iter()
            .find(|c| c.bus == device.bus && c.slot == device.device)
            .ok_or(Error::NoMatchingDevice)
    }
}

impl PciPlatform for DummyPlatform {
    type Config = DummyConfigSpace;
    type Access = DummyPlx;
    type Error = Error;

    fn scan(&mut self) -> Result<Vec<PciDevice>> {
        let mut devices: Vec<PciDevice> = self
            .cards
            .iter()
            .map(DummyConfig::pci_device)
            .chain(self.others.iter().cloned())
            .collect();
        devices.sort_by_key(|d| (d.domain, d.bus, d.device, d.function));
        Ok(devices)
    }

    fn config(&mut self, device: &PciDevice) -> Result<DummyConfigSpace> {
        Ok(self.card(device)?.config_space())
    }

    fn map(&mut self, device: &PciDevice, region: &Bar) -> Result<DummyPlx> {
        let card = self.card(device)?;
        log::debug!("dummy: mapping {} of {}", region, device.bdf());
        Ok(card.registers())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plxeeprom_core::pci::{probe_bar, BarKind};

    #[test]
    fn test_bar_sizing() {
        let mut config = DummyConfig::new(PlxModel::Pci9050).config_space();
        let bar0 = probe_bar(&mut config, 0).unwrap().unwrap();
        let bar1 = probe_bar(&mut config, 1).unwrap().unwrap();
        assert_eq!((bar0.kind, bar0.size), (BarKind::Memory, 128));
        assert_eq!((bar1.kind, bar1.size, bar1.address), (BarKind::Io, 128, 0xE000));
        assert_eq!(probe_bar(&mut config, 2).unwrap(), None);
        // Probing restored the original values
        assert_eq!(config.read_config32(PCI_BASE_ADDRESS_0).unwrap(), 0xFEBF_0000);
    }

    #[test]
    fn test_large_card_has_single_memory_bar() {
        let mut config = DummyConfig::new(PlxModel::Pci9656).config_space();
        let bar0 = probe_bar(&mut config, 0).unwrap().unwrap();
        assert_eq!(bar0.size, 512);
        assert_eq!(probe_bar(&mut config, 1).unwrap(), None);
    }

    #[test]
    fn test_from_options() {
        let config = DummyConfig::from_options(&[
            ("eeprom", "66"),
            ("model", "0x9054"),
            ("fill", "0"),
            ("fault", "never-ready"),
        ])
        .unwrap();
        assert_eq!(config.model, PlxModel::Pci9054);
        assert_eq!(config.eeprom, EepromType::Cs66);
        assert_eq!(config.fill, 0);
        assert_eq!(config.fault, Fault::NeverReady);
        assert!(DummyConfig::from_options(&[("model", "9999")]).is_err());
        assert!(DummyConfig::from_options(&[("fault", "melted")]).is_err());
    }

    #[test]
    fn test_scan_is_sorted() {
        let mut platform = DummyPlatform::with_card(DummyConfig::new(PlxModel::Pci9054).at(3, 0));
        platform.add_card(DummyConfig::new(PlxModel::Pci9050).at(2, 5));
        let devices = platform.scan().unwrap();
        assert_eq!(devices[0].bus, 2);
        assert_eq!(devices[1].device_id, 0x9054);
    }
}
