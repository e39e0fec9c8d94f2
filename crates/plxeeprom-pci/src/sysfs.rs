//! PCI device scanning and access
//!
//! This module uses the Linux sysfs interface (/sys/bus/pci/devices) for
//! enumeration, configuration space, region decoding and enabling.

use std::fs;
use std::path::{Path, PathBuf};

use plxeeprom_core::pci::{Bar, BarKind, ConfigSpace, PciDevice};

use crate::error::{PciError, Result};

const SYSFS_PCI_DEVICES: &str = "/sys/bus/pci/devices";

const PCI_HEADER_TYPE: u16 = 0x0E;
const PCI_HEADER_TYPE_MASK: u8 = 0x7F;

/// Resource flags from include/linux/ioport.h
const IORESOURCE_IO: u64 = 0x100;
const IORESOURCE_MEM: u64 = 0x200;

/// sysfs directory of a device
pub fn device_path(device: &PciDevice) -> PathBuf {
    Path::new(SYSFS_PCI_DEVICES).join(format!(
        "{:04x}:{:02x}:{:02x}.{:x}",
        device.domain, device.bus, device.device, device.function
    ))
}

/// Scan the PCI bus for devices
///
/// Devices are returned in bus order so instance numbers are stable.
pub fn scan_pci_bus() -> Result<Vec<PciDevice>> {
    let pci_path = Path::new(SYSFS_PCI_DEVICES);
    if !pci_path.exists() {
        return Err(PciError::SysfsUnavailable(SYSFS_PCI_DEVICES));
    }

    let mut devices = Vec::new();
    for entry in fs::read_dir(pci_path).map_err(PciError::Scan)? {
        let entry = entry.map_err(PciError::Scan)?;
        let name = entry.file_name();
        if let Some(dev) = parse_pci_device(&entry.path(), &name.to_string_lossy()) {
            devices.push(dev);
        }
    }

    devices.sort_by_key(|d| (d.domain, d.bus, d.device, d.function));
    log::debug!("found {} PCI functions", devices.len());
    Ok(devices)
}

/// Split a sysfs device name ("0000:00:1f.0") into domain, bus, device and
/// function
fn parse_bdf(name: &str) -> Option<(u16, u8, u8, u8)> {
    let mut parts = name.split(':');
    let domain = u16::from_str_radix(parts.next()?, 16).ok()?;
    let bus = u8::from_str_radix(parts.next()?, 16).ok()?;
    let (device, function) = parts.next()?.split_once('.')?;
    if parts.next().is_some() {
        return None;
    }
    Some((
        domain,
        bus,
        u8::from_str_radix(device, 16).ok()?,
        u8::from_str_radix(function, 16).ok()?,
    ))
}

/// Parse a PCI device from sysfs
fn parse_pci_device(path: &Path, name: &str) -> Option<PciDevice> {
    let (domain, bus, device, function) = parse_bdf(name)?;

    let vendor_id = read_sysfs_hex(&path.join("vendor"))? as u16;
    let device_id = read_sysfs_hex(&path.join("device"))? as u16;
    let subsystem_vendor_id = read_sysfs_hex(&path.join("subsystem_vendor")).unwrap_or(0) as u16;
    let subsystem_device_id = read_sysfs_hex(&path.join("subsystem_device")).unwrap_or(0) as u16;
    let revision_id = read_sysfs_hex(&path.join("revision")).unwrap_or(0) as u8;
    let class = read_sysfs_hex(&path.join("class")).unwrap_or(0) as u32;

    // The first 64 bytes of config space are readable without privileges
    let header_type = fs::read(path.join("config"))
        .ok()
        .and_then(|config| config.get(PCI_HEADER_TYPE as usize).copied())
        .map_or(0, |h| h & PCI_HEADER_TYPE_MASK);

    Some(PciDevice {
        domain,
        bus,
        device,
        function,
        vendor_id,
        device_id,
        subsystem_vendor_id,
        subsystem_device_id,
        revision_id,
        header_type,
        class,
    })
}

/// Read a hex value from a sysfs attribute
fn read_sysfs_hex(path: &Path) -> Option<u64> {
    let content = fs::read_to_string(path).ok()?;
    parse_hex(content.trim())
}

fn parse_hex(s: &str) -> Option<u64> {
    u64::from_str_radix(s.strip_prefix("0x").unwrap_or(s), 16).ok()
}

/// Decode one line of a sysfs `resource` file
///
/// Each line holds start, end and flags. Returns `None` for an unused
/// region or a type other than memory or I/O.
fn parse_resource_line(index: u8, line: &str) -> Option<Bar> {
    let mut fields = line.split_whitespace().map(parse_hex);
    let start = fields.next()??;
    let end = fields.next()??;
    let flags = fields.next()??;

    if start == 0 && end == 0 {
        return None;
    }
    let kind = if flags & IORESOURCE_IO != 0 {
        BarKind::Io
    } else if flags & IORESOURCE_MEM != 0 {
        BarKind::Memory
    } else {
        return None;
    };
    Some(Bar {
        index,
        address: start,
        size: end.checked_sub(start)? + 1,
        kind,
    })
}

/// Decode a base address region from the sysfs `resource` file
///
/// The outer `None` means the file could not be read, in which case the
/// caller falls back to sizing the BAR through configuration space.
pub fn read_resource(device: &PciDevice, index: u8) -> Option<Option<Bar>> {
    let content = fs::read_to_string(device_path(device).join("resource")).ok()?;
    let line = content.lines().nth(index as usize)?;
    Some(parse_resource_line(index, line))
}

/// Enable the device's regions through the sysfs `enable` attribute
pub fn enable_device(device: &PciDevice) -> Result<()> {
    fs::write(device_path(device).join("enable"), "1").map_err(|source| PciError::Enable {
        bdf: device.bdf(),
        source,
    })
}

/// Configuration space of one device, through its sysfs `config` file
pub struct SysfsConfig {
    file: fs::File,
    writable: bool,
}

impl SysfsConfig {
    /// Open a device's configuration space
    ///
    /// Falls back to read-only access when write access is refused.
    pub fn open(device: &PciDevice) -> Result<Self> {
        let path = device_path(device).join("config");
        let config_open = |source| PciError::ConfigOpen {
            bdf: device.bdf(),
            source,
        };

        match fs::OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => Ok(Self {
                file,
                writable: true,
            }),
            Err(e) => {
                log::debug!("{}: {}, opening read-only", path.display(), e);
                let file = fs::File::open(&path).map_err(config_open)?;
                Ok(Self {
                    file,
                    writable: false,
                })
            }
        }
    }

    /// Whether configuration writes are possible
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    #[cfg(test)]
    pub(crate) fn from_file(file: fs::File, writable: bool) -> Self {
        Self { file, writable }
    }

    fn read_at(&self, offset: u16, buf: &mut [u8]) -> plxeeprom_core::Result<()> {
        use std::os::unix::fs::FileExt;

        self.file.read_exact_at(buf, offset as u64).map_err(|e| {
            log::debug!("config read at {:#x} failed: {}", offset, e);
            plxeeprom_core::Error::ConfigAccess { offset }
        })
    }
}

impl ConfigSpace for SysfsConfig {
    fn read_config8(&mut self, offset: u16) -> plxeeprom_core::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_at(offset, &mut buf)?;
        Ok(buf[0])
    }

    fn read_config32(&mut self, offset: u16) -> plxeeprom_core::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_at(offset, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn write_config32(&mut self, offset: u16, value: u32) -> plxeeprom_core::Result<()> {
        use std::os::unix::fs::FileExt;

        if !self.writable {
            return Err(plxeeprom_core::Error::ConfigAccess { offset });
        }
        self.file
            .write_all_at(&value.to_le_bytes(), offset as u64)
            .map_err(|e| {
                log::debug!("config write at {:#x} failed: {}", offset, e);
                plxeeprom_core::Error::ConfigAccess { offset }
            })
    }
}
