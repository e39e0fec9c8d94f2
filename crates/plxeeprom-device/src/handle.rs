//! EepromHandle - a detected device behind a type-erased accessor

use plxeeprom_core::detect::Detection;
use plxeeprom_core::pci::BarKind;
use plxeeprom_core::programmer::RegisterAccess;
use plxeeprom_core::{DeviceHandle, EepromType, PlxModel};

/// Device handle over whichever backend opened it
pub type EepromHandle = DeviceHandle<Box<dyn RegisterAccess + Send>>;

/// Erase the accessor type of a handle
pub(crate) fn boxed<A>(handle: DeviceHandle<A>) -> Result<EepromHandle, Box<dyn std::error::Error>>
where
    A: RegisterAccess + Send + 'static,
{
    let geometry = *handle.geometry();
    let access = handle
        .into_inner()
        .ok_or("device was released during bring-up")?;
    Ok(DeviceHandle::new(
        Box::new(access) as Box<dyn RegisterAccess + Send>,
        geometry,
    ))
}

/// What bring-up found, in a form the CLI can print
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Backend that opened the device
    pub programmer: String,
    /// Bus:Device.Function
    pub bdf: String,
    /// Vendor ID
    pub vendor_id: u16,
    /// Device ID
    pub device_id: u16,
    /// Subsystem vendor ID
    pub subsystem_vendor_id: u16,
    /// Subsystem device ID
    pub subsystem_device_id: u16,
    /// Index among the devices matching the filters
    pub instance: u32,
    /// Part marking (e.g. "PCI9060SD")
    pub marking: &'static str,
    /// Bridge model
    pub model: PlxModel,
    /// Chip revision
    pub revision: u8,
    /// Register window address
    pub region_address: u64,
    /// Register window size
    pub region_size: u64,
    /// Whether the registers are port-mapped
    pub port_mapped: bool,
    /// Control register offset
    pub cntrl_offset: usize,
    /// EEPROM type
    pub eeprom: EepromType,
    /// EEPROM capacity in bytes
    pub capacity: usize,
    /// EEPROM address bits
    pub address_width: u32,
}

impl DeviceInfo {
    pub(crate) fn new(programmer: &str, detection: &Detection) -> Self {
        let device = &detection.device;
        let geometry = &detection.geometry;
        Self {
            programmer: programmer.to_string(),
            bdf: device.bdf(),
            vendor_id: device.vendor_id,
            device_id: device.device_id,
            subsystem_vendor_id: device.subsystem_vendor_id,
            subsystem_device_id: device.subsystem_device_id,
            instance: detection.instance,
            marking: detection.chip.marking,
            model: detection.chip.model,
            revision: detection.chip.revision,
            region_address: detection.region.address,
            region_size: detection.region.size,
            port_mapped: detection.region.kind == BarKind::Io,
            cntrl_offset: geometry.cntrl_offset(),
            eeprom: geometry.eeprom(),
            capacity: geometry.capacity(),
            address_width: geometry.address_width(),
        }
    }

    /// Chip as the driver reports it, e.g. "PCI9052 rev 01"
    pub fn chip_name(&self) -> String {
        format!("{} rev {:02X}", self.marking, self.revision)
    }
}
