//! Bring-up on a Linux host

use plxeeprom_core::detect::{DetectOptions, Detection};
use plxeeprom_core::pci::{Bar, BarKind};
use plxeeprom_core::programmer::RegisterAccess;
use plxeeprom_core::DeviceHandle;

use crate::error::{PciError, Result};
use crate::physmap::PhysMap;
use crate::portio::PortIo;
#[cfg(target_os = "linux")]
use crate::sysfs::{self, SysfsConfig};
#[cfg(target_os = "linux")]
use plxeeprom_core::{
    detect::bring_up,
    pci::{probe_bar, PciDevice, PciPlatform},
};

/// Register access through whichever space the region lives in
///
/// Chosen once at bring-up from the region type.
pub enum Registers {
    /// Memory-mapped registers
    Memory(PhysMap),
    /// Port-mapped registers
    Port(PortIo),
}

impl RegisterAccess for Registers {
    fn read32(&mut self, offset: usize) -> u32 {
        match self {
            Self::Memory(map) => map.read32(offset),
            Self::Port(io) => io.read32(offset),
        }
    }

    fn write32(&mut self, offset: usize, value: u32) {
        match self {
            Self::Memory(map) => map.write32(offset, value),
            Self::Port(io) => io.write32(offset, value),
        }
    }

    fn read8(&mut self, offset: usize) -> u8 {
        match self {
            Self::Memory(map) => map.read8(offset),
            Self::Port(io) => io.read8(offset),
        }
    }
}

impl Registers {
    /// Map a region for register access
    pub fn map(region: &Bar) -> Result<Self> {
        match region.kind {
            BarKind::Memory => Ok(Self::Memory(PhysMap::new(
                region.address,
                region.size as usize,
            )?)),
            BarKind::Io => {
                let base = u16::try_from(region.address)
                    .map_err(|_| PciError::NotSupported("I/O region above 64K"))?;
                Ok(Self::Port(PortIo::new(base, region.size as u16)?))
            }
        }
    }
}

/// The host's PCI bus, through sysfs
#[derive(Debug, Default)]
pub struct LinuxPci {
    _private: (),
}

impl LinuxPci {
    /// Access the host's PCI bus
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(target_os = "linux")]
impl PciPlatform for LinuxPci {
    type Config = SysfsConfig;
    type Access = Registers;
    type Error = PciError;

    fn scan(&mut self) -> Result<Vec<PciDevice>> {
        sysfs::scan_pci_bus()
    }

    fn config(&mut self, device: &PciDevice) -> Result<SysfsConfig> {
        SysfsConfig::open(device)
    }

    fn region(
        &mut self,
        device: &PciDevice,
        config: &mut SysfsConfig,
        index: u8,
    ) -> Result<Option<Bar>> {
        match sysfs::read_resource(device, index) {
            Some(region) => Ok(region),
            None if !config.is_writable() => {
                log::warn!(
                    "no sysfs resource for {} and configuration space is read-only, \
                     cannot size BAR{}",
                    device.bdf(),
                    index
                );
                Ok(None)
            }
            None => {
                log::debug!("no sysfs resource for {}, sizing BAR{}", device.bdf(), index);
                Ok(probe_bar(config, index)?)
            }
        }
    }

    fn enable(&mut self, device: &PciDevice) -> Result<()> {
        sysfs::enable_device(device)
    }

    fn map(&mut self, _device: &PciDevice, region: &Bar) -> Result<Registers> {
        Registers::map(region)
    }
}

/// Find, identify and open a PLX device on this host
#[cfg(target_os = "linux")]
pub fn open_pci_device(options: &DetectOptions) -> Result<(DeviceHandle<Registers>, Detection)> {
    bring_up(&mut LinuxPci::new(), options)
}

/// Always fails on this platform
#[cfg(not(target_os = "linux"))]
pub fn open_pci_device(_options: &DetectOptions) -> Result<(DeviceHandle<Registers>, Detection)> {
    Err(PciError::NotSupported("PCI access only supported on Linux"))
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    fn missing_device() -> PciDevice {
        PciDevice {
            domain: 0xffff,
            bus: 0xff,
            device: 0x1f,
            function: 7,
            vendor_id: 0x10b5,
            device_id: 0x9050,
            subsystem_vendor_id: 0x10b5,
            subsystem_device_id: 0x9050,
            revision_id: 1,
            header_type: 0,
            class: 0x068000,
        }
    }

    #[test]
    fn test_read_only_config_is_not_sized() {
        let path = std::env::temp_dir().join(format!("plxeeprom-config-{}", std::process::id()));
        let mut header = vec![0u8; 256];
        header[0x10..0x14].copy_from_slice(&0xFEBF_F000u32.to_le_bytes());
        std::fs::write(&path, &header).unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let mut config = SysfsConfig::from_file(file, false);
        let region = LinuxPci::new().region(&missing_device(), &mut config, 0);
        assert!(matches!(region, Ok(None)));

        // Nothing was written back
        assert_eq!(std::fs::read(&path).unwrap(), header);
        std::fs::remove_file(path).ok();
    }

    #[test]
    #[ignore] // Requires root and a PLX card
    fn test_open_pci_device() {
        let (handle, detection) = open_pci_device(&DetectOptions::new()).unwrap();
        assert_eq!(handle.capacity(), detection.geometry.capacity());
        let mut word = [0u8; 2];
        assert_eq!(handle.read_at(0, &mut word).unwrap(), 2);
    }
}
