//! Chip detection
//!
//! Detection runs once per device and fixes its geometry:
//!
//! 1. Pick a PCI function by bus/slot or by ID filters and instance.
//! 2. Pick the region holding the local configuration registers from the
//!    sizes and types of BAR0 and BAR1.
//! 3. Identify the model. The 128-byte family is told apart by the PCI9030
//!    VPD control register and the PCI revision; the larger chips carry an
//!    identification register (PCIHIDR) and a revision register (PCIHREV).
//! 4. Check the model against the caller's override, if any.
//! 5. Resolve the EEPROM type, applying the model default when there is one.

use core::fmt;

use crate::chip::{
    enumeration_device_id, find_by_signature, model_info, DeviceGeometry, EepromType, PlxModel,
    PLX9054_PCIHIDR, PLX9054_PCIHREV, PLX_VENDOR_ID,
};
use crate::device::DeviceHandle;
use crate::error::{Error, Result};
use crate::pci::{
    Bar, BarKind, ConfigSpace, PciDevice, PciPlatform, PCI_HEADER_TYPE_NORMAL, PCI_VPD_CONTROL,
};
use crate::programmer::RegisterAccess;

/// PVPDCNTL reset value that identifies a PCI9030
const PLX9030_VPD_CONTROL_VALUE: u8 = 0x03;

/// Parse a number given in decimal or with a `0x` prefix in hex
pub fn parse_number(s: &str) -> Option<u32> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

/// Device selection and model overrides
///
/// Every field is optional. Without bus/slot or IDs, the first PLX device
/// with the device ID of the requested model (PCI9050 by default) is used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectOptions {
    /// PCI bus number
    pub bus: Option<u8>,
    /// PCI slot (device) number
    pub slot: Option<u8>,
    /// PCI vendor ID
    pub vendor: Option<u16>,
    /// PCI device ID
    pub device: Option<u16>,
    /// PCI subsystem vendor ID
    pub subvendor: Option<u16>,
    /// PCI subsystem device ID
    pub subdevice: Option<u16>,
    /// Which of several matching devices to use, counting from 0
    pub instance: u32,
    /// Expected PLX model number, e.g. `0x9054` or `9054`
    pub plx: Option<u32>,
    /// EEPROM type number, e.g. `56`, `256` or `2048`
    pub eeprom: Option<u32>,
}

impl DetectOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the device on this bus
    pub fn with_bus(mut self, bus: u8) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Select the device in this slot
    pub fn with_slot(mut self, slot: u8) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Filter on vendor ID
    pub fn with_vendor(mut self, vendor: u16) -> Self {
        self.vendor = Some(vendor);
        self
    }

    /// Filter on device ID
    pub fn with_device(mut self, device: u16) -> Self {
        self.device = Some(device);
        self
    }

    /// Filter on subsystem vendor ID
    pub fn with_subvendor(mut self, subvendor: u16) -> Self {
        self.subvendor = Some(subvendor);
        self
    }

    /// Filter on subsystem device ID
    pub fn with_subdevice(mut self, subdevice: u16) -> Self {
        self.subdevice = Some(subdevice);
        self
    }

    /// Use the n-th matching device
    pub fn with_instance(mut self, instance: u32) -> Self {
        self.instance = instance;
        self
    }

    /// Require this PLX model
    pub fn with_plx(mut self, plx: u32) -> Self {
        self.plx = Some(plx);
        self
    }

    /// Use this EEPROM type
    pub fn with_eeprom(mut self, eeprom: u32) -> Self {
        self.eeprom = Some(eeprom);
        self
    }

    /// Parse options from key-value pairs (from CLI)
    ///
    /// Supported options: bus, slot, vendor, device, subvendor, subdevice,
    /// instance, plx, eeprom. Values are decimal or `0x` hex. Unknown keys
    /// are ignored with a warning.
    pub fn from_options(options: &[(&str, &str)]) -> Result<Self> {
        let mut opts = Self::default();

        for (key, value) in options {
            let number = || parse_number(value);
            match *key {
                "bus" => {
                    opts.bus = Some(narrow(number(), "invalid bus")?);
                }
                "slot" => {
                    opts.slot = Some(narrow(number(), "invalid slot")?);
                }
                "vendor" => {
                    opts.vendor = Some(narrow(number(), "invalid vendor ID")?);
                }
                "device" => {
                    opts.device = Some(narrow(number(), "invalid device ID")?);
                }
                "subvendor" => {
                    opts.subvendor = Some(narrow(number(), "invalid subsystem vendor ID")?);
                }
                "subdevice" => {
                    opts.subdevice = Some(narrow(number(), "invalid subsystem device ID")?);
                }
                "instance" => {
                    opts.instance = number().ok_or(Error::InvalidOption("invalid instance"))?;
                }
                "plx" | "model" => {
                    opts.plx = Some(number().ok_or(Error::InvalidOption("invalid PLX model"))?);
                }
                "eeprom" => {
                    opts.eeprom =
                        Some(number().ok_or(Error::InvalidOption("invalid EEPROM type"))?);
                }
                _ => {
                    log::warn!("Unknown device option: {}={}", key, value);
                }
            }
        }

        Ok(opts)
    }

    /// The requested model, if the override names a known one
    pub fn requested_model(&self) -> Option<PlxModel> {
        self.plx.and_then(PlxModel::from_number)
    }

    /// Vendor and device ID filters after applying the PLX defaults
    pub fn id_filter(&self) -> (Option<u16>, Option<u16>) {
        let located = self.bus.is_some() || self.slot.is_some();
        if !located && self.vendor.is_none() && self.device.is_none() {
            (
                Some(PLX_VENDOR_ID),
                Some(enumeration_device_id(self.requested_model())),
            )
        } else {
            (self.vendor, self.device)
        }
    }
}

fn narrow<T: TryFrom<u32>>(value: Option<u32>, msg: &'static str) -> Result<T> {
    value
        .and_then(|v| T::try_from(v).ok())
        .ok_or(Error::InvalidOption(msg))
}

/// The identified chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedChip {
    /// Model
    pub model: PlxModel,
    /// Part marking, e.g. `PCI9052` or `PCI9060SD`
    pub marking: &'static str,
    /// Chip revision as reported by the part
    pub revision: u8,
}

impl fmt::Display for DetectedChip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rev {:02X}", self.marking, self.revision)
    }
}

/// Everything learned while bringing up a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// The selected PCI function
    pub device: PciDevice,
    /// Index among the devices matching the filters
    pub instance: u32,
    /// Region holding the local configuration registers
    pub region: Bar,
    /// Identified chip
    pub chip: DetectedChip,
    /// Resulting geometry
    pub geometry: DeviceGeometry,
}

/// Select the PCI function to use
///
/// Functions with a bridge or other non-normal header are skipped. When a
/// bus or slot is given the first match is used and `instance` is ignored.
/// Returns the device and its index among the matches.
pub fn select_device<'a>(
    devices: &'a [PciDevice],
    options: &DetectOptions,
) -> Result<(&'a PciDevice, u32)> {
    let (vendor, device) = options.id_filter();
    let located = options.bus.is_some() || options.slot.is_some();
    let matches = |want: Option<u16>, have: u16| want.map_or(true, |w| w == have);

    let mut candidates = devices.iter().filter(|dev| {
        matches(vendor, dev.vendor_id)
            && matches(device, dev.device_id)
            && matches(options.subvendor, dev.subsystem_vendor_id)
            && matches(options.subdevice, dev.subsystem_device_id)
            && options.bus.map_or(true, |b| b == dev.bus)
            && options.slot.map_or(true, |s| s == dev.device)
            && dev.header_type == PCI_HEADER_TYPE_NORMAL
    });

    let instance = if located { 0 } else { options.instance };
    let dev = candidates
        .nth(instance as usize)
        .ok_or(Error::NoMatchingDevice)?;
    Ok((dev, instance))
}

/// Pick the region holding the local configuration registers
///
/// * 512-byte memory BAR0: PCI9056/9656
/// * 256-byte memory BAR0: PCI9054/9060/9080
/// * 128-byte memory BAR0 and/or 128-byte I/O BAR1: PCI9030/9050/9052,
///   preferring the memory mapping
pub fn choose_region(bar0: Option<Bar>, bar1: Option<Bar>) -> Result<Bar> {
    if let Some(bar) = bar0.filter(|b| b.is_memory_of(512) || b.is_memory_of(256)) {
        return Ok(bar);
    }

    let bar0_ok = bar0.map_or(true, |b| b.is_memory_of(128));
    let bar1_ok = bar1.map_or(true, |b| b.is_io_of(128));
    if bar0_ok && bar1_ok {
        if let Some(bar) = bar0.or(bar1) {
            return Ok(bar);
        }
    }

    log::debug!("unrecognised regions: BAR0 {:?}, BAR1 {:?}", bar0, bar1);
    Err(Error::UnsupportedChip("no PLX local configuration region"))
}

/// Identify the chip behind a chosen region and resolve its geometry
///
/// `registers` must map `region`. Only configuration-space and register
/// reads are issued.
pub fn identify<C, A>(
    device: &PciDevice,
    region: &Bar,
    config: &mut C,
    registers: &mut A,
    options: &DetectOptions,
) -> Result<(DetectedChip, DeviceGeometry)>
where
    C: ConfigSpace + ?Sized,
    A: RegisterAccess + ?Sized,
{
    let chip = if region.size == 128 {
        identify_small(device, region, config)?
    } else {
        identify_large(registers, options)?
    };
    log::info!("{}", chip);

    check_model(chip.model, options.plx)?;
    let geometry = resolve_eeprom(chip.model, options.eeprom)?;
    log::info!("{}", geometry);
    Ok((chip, geometry))
}

/// PCI9030, PCI9050 or PCI9052
fn identify_small<C: ConfigSpace + ?Sized>(
    device: &PciDevice,
    region: &Bar,
    config: &mut C,
) -> Result<DetectedChip> {
    let vpd_control = config.read_config8(PCI_VPD_CONTROL)?;
    let revision = device.revision_id;

    // Only the PCI9030 has PVPDCNTL, and it only maps BAR0 as memory
    if region.kind == BarKind::Memory && vpd_control == PLX9030_VPD_CONTROL_VALUE {
        return Ok(DetectedChip {
            model: PlxModel::Pci9030,
            marking: "PCI9030",
            revision,
        });
    }

    match revision {
        0 | 1 => Ok(DetectedChip {
            model: PlxModel::Pci9050,
            marking: "PCI9050",
            revision,
        }),
        // PCI9052 is revision 2 of the PCI9050 and calls itself rev 1
        2 => Ok(DetectedChip {
            model: PlxModel::Pci9050,
            marking: "PCI9052",
            revision: 1,
        }),
        _ => Err(Error::RevisionUnsupported {
            model: PlxModel::Pci9050,
            revision,
        }),
    }
}

/// PCI9054, PCI9056, PCI9060, PCI9080 or PCI9656
fn identify_large<A: RegisterAccess + ?Sized>(
    registers: &mut A,
    options: &DetectOptions,
) -> Result<DetectedChip> {
    let hidr = registers.read32(PLX9054_PCIHIDR);
    let revision = registers.read8(PLX9054_PCIHREV);

    if let Some((info, marking)) = find_by_signature(hidr) {
        let chip = DetectedChip {
            model: info.model,
            marking,
            revision,
        };
        if !info.revision.accepts(revision) {
            log::info!("{}", chip);
            return Err(Error::RevisionUnsupported {
                model: info.model,
                revision,
            });
        }
        return Ok(chip);
    }

    // Some PCI9060 parts leave PCIHIDR blank; only trust an explicit override
    if hidr == 0 && options.requested_model() == Some(PlxModel::Pci9060) {
        log::debug!("PCIHIDR reads 0, assuming PCI9060 as requested");
        return Ok(DetectedChip {
            model: PlxModel::Pci9060,
            marking: "PCI9060",
            revision,
        });
    }

    log::debug!("unrecognised PCIHIDR {:#010x}", hidr);
    Err(Error::UnsupportedChip("unknown PCIHIDR signature"))
}

/// Check the detected model against an override
///
/// A zero override means none was given.
pub fn check_model(detected: PlxModel, requested: Option<u32>) -> Result<()> {
    match requested.filter(|&n| n != 0) {
        Some(n) if PlxModel::from_number(n) != Some(detected) => Err(Error::ModelMismatch {
            detected,
            requested: n,
        }),
        _ => Ok(()),
    }
}

/// Resolve the EEPROM geometry for a model
///
/// A zero type number means none was given.
pub fn resolve_eeprom(model: PlxModel, requested: Option<u32>) -> Result<DeviceGeometry> {
    let info = model_info(model);
    match requested.filter(|&n| n != 0) {
        None => info
            .default_geometry()
            .ok_or(Error::EepromTypeRequired(model)),
        Some(n) => EepromType::from_number(n)
            .and_then(|t| info.geometry(t))
            .ok_or(Error::EepromTypeInvalid {
                model,
                requested: n,
            }),
    }
}

/// Find, identify and open a device
///
/// Detection errors abort bring-up; no handle exists unless every step
/// succeeded. Failing to enable the device is only a warning, since it is
/// usually already enabled by firmware.
pub fn bring_up<P: PciPlatform>(
    platform: &mut P,
    options: &DetectOptions,
) -> core::result::Result<(DeviceHandle<P::Access>, Detection), P::Error>
where
    P::Error: fmt::Display,
{
    let devices = platform.scan()?;
    let (device, instance) = select_device(&devices, options)?;
    let device = device.clone();
    log::info!(
        "{} {:04x}:{:04x} ({:04x}:{:04x}) ({})",
        device.bdf(),
        device.vendor_id,
        device.device_id,
        device.subsystem_vendor_id,
        device.subsystem_device_id,
        instance
    );

    if let Err(e) = platform.enable(&device) {
        log::warn!("Could not enable {}: {}", device.bdf(), e);
    }

    let mut config = platform.config(&device)?;
    let bar0 = platform.region(&device, &mut config, 0)?;
    let bar1 = platform.region(&device, &mut config, 1)?;
    let region = choose_region(bar0, bar1)?;
    log::debug!("local configuration registers in {}", region);

    let mut access = platform.map(&device, &region)?;
    let (chip, geometry) = identify(&device, &region, &mut config, &mut access, options)?;

    let detection = Detection {
        device,
        instance,
        region,
        chip,
        geometry,
    };
    Ok((DeviceHandle::new(access, geometry), detection))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(bus: u8, slot: u8, vendor: u16, device: u16) -> PciDevice {
        PciDevice {
            domain: 0,
            bus,
            device: slot,
            function: 0,
            vendor_id: vendor,
            device_id: device,
            subsystem_vendor_id: 0x1234,
            subsystem_device_id: 0x0001,
            revision_id: 1,
            header_type: PCI_HEADER_TYPE_NORMAL,
            class: 0x068000,
        }
    }

    fn bar(index: u8, size: u64, kind: BarKind) -> Option<Bar> {
        Some(Bar {
            index,
            address: 0xF000_0000,
            size,
            kind,
        })
    }

    struct Vpd(u8);

    impl ConfigSpace for Vpd {
        fn read_config8(&mut self, offset: u16) -> Result<u8> {
            assert_eq!(offset, PCI_VPD_CONTROL);
            Ok(self.0)
        }

        fn read_config32(&mut self, _offset: u16) -> Result<u32> {
            Ok(0)
        }

        fn write_config32(&mut self, _offset: u16, _value: u32) -> Result<()> {
            Ok(())
        }
    }

    struct Header {
        hidr: u32,
        hrev: u8,
    }

    impl RegisterAccess for Header {
        fn read32(&mut self, offset: usize) -> u32 {
            assert_eq!(offset, PLX9054_PCIHIDR);
            self.hidr
        }

        fn write32(&mut self, _offset: usize, _value: u32) {
            panic!("detection must not write registers");
        }

        fn read8(&mut self, offset: usize) -> u8 {
            assert_eq!(offset, PLX9054_PCIHREV);
            self.hrev
        }
    }

    fn identify_large_chip(
        hidr: u32,
        hrev: u8,
        options: &DetectOptions,
    ) -> Result<(DetectedChip, DeviceGeometry)> {
        let device = dev(1, 2, PLX_VENDOR_ID, 0x9054);
        let region = bar(0, 256, BarKind::Memory).unwrap();
        identify(
            &device,
            &region,
            &mut Vpd(0),
            &mut Header { hidr, hrev },
            options,
        )
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("0x9054"), Some(0x9054));
        assert_eq!(parse_number("9054"), Some(9054));
        assert_eq!(parse_number(" 56 "), Some(56));
        assert_eq!(parse_number("0xZZ"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_from_options() {
        let opts = DetectOptions::from_options(&[
            ("bus", "0x3"),
            ("slot", "4"),
            ("plx", "0x9056"),
            ("eeprom", "66"),
            ("bogus", "1"),
        ])
        .unwrap();
        assert_eq!(
            opts,
            DetectOptions::new()
                .with_bus(3)
                .with_slot(4)
                .with_plx(0x9056)
                .with_eeprom(66)
        );
        assert!(DetectOptions::from_options(&[("bus", "256")]).is_err());
        assert!(DetectOptions::from_options(&[("vendor", "nope")]).is_err());
    }

    #[test]
    fn test_default_filter_uses_plx_ids() {
        assert_eq!(
            DetectOptions::new().id_filter(),
            (Some(0x10B5), Some(0x9050))
        );
        assert_eq!(
            DetectOptions::new().with_plx(9052).id_filter(),
            (Some(0x10B5), Some(0x9050))
        );
        assert_eq!(
            DetectOptions::new().with_plx(0x9656).id_filter(),
            (Some(0x10B5), Some(0x9656))
        );
        // Unknown override numbers fall back to the PCI9050 ID
        assert_eq!(
            DetectOptions::new().with_plx(1234).id_filter(),
            (Some(0x10B5), Some(0x9050))
        );
        assert_eq!(DetectOptions::new().with_bus(0).id_filter(), (None, None));
        assert_eq!(
            DetectOptions::new().with_device(0x1234).id_filter(),
            (None, Some(0x1234))
        );
    }

    #[test]
    fn test_select_instance() {
        let devices = vec![
            dev(0, 1, 0x8086, 0x1234),
            dev(1, 2, PLX_VENDOR_ID, 0x9050),
            dev(1, 3, PLX_VENDOR_ID, 0x9050),
        ];
        let (d, i) = select_device(&devices, &DetectOptions::new()).unwrap();
        assert_eq!((d.device, i), (2, 0));
        let (d, i) = select_device(&devices, &DetectOptions::new().with_instance(1)).unwrap();
        assert_eq!((d.device, i), (3, 1));
        assert_eq!(
            select_device(&devices, &DetectOptions::new().with_instance(2)),
            Err(Error::NoMatchingDevice)
        );
    }

    #[test]
    fn test_select_by_location_ignores_instance() {
        let devices = vec![
            dev(1, 2, PLX_VENDOR_ID, 0x9050),
            dev(1, 3, PLX_VENDOR_ID, 0x9054),
        ];
        let opts = DetectOptions::new().with_bus(1).with_slot(3).with_instance(5);
        let (d, i) = select_device(&devices, &opts).unwrap();
        assert_eq!((d.device_id, i), (0x9054, 0));
    }

    #[test]
    fn test_select_skips_non_normal_headers() {
        let mut bridge = dev(1, 2, PLX_VENDOR_ID, 0x9050);
        bridge.header_type = 1;
        let devices = vec![bridge, dev(1, 3, PLX_VENDOR_ID, 0x9050)];
        let (d, _) = select_device(&devices, &DetectOptions::new()).unwrap();
        assert_eq!(d.device, 3);
    }

    #[test]
    fn test_select_subsystem_filter() {
        let devices = vec![dev(1, 2, PLX_VENDOR_ID, 0x9050)];
        let opts = DetectOptions::new().with_subvendor(0x4321);
        assert_eq!(
            select_device(&devices, &opts),
            Err(Error::NoMatchingDevice)
        );
    }

    #[test]
    fn test_choose_region() {
        use BarKind::*;
        assert_eq!(
            choose_region(bar(0, 512, Memory), bar(1, 256, Io)).unwrap().size,
            512
        );
        assert_eq!(choose_region(bar(0, 256, Memory), None).unwrap().size, 256);
        assert_eq!(
            choose_region(bar(0, 128, Memory), bar(1, 128, Io)).unwrap().kind,
            Memory
        );
        assert_eq!(choose_region(None, bar(1, 128, Io)).unwrap().kind, Io);
        assert!(choose_region(None, None).is_err());
        assert!(choose_region(bar(0, 256, Io), None).is_err());
        assert!(choose_region(bar(0, 128, Memory), bar(1, 256, Io)).is_err());
        assert!(choose_region(bar(0, 4096, Memory), None).is_err());
    }

    fn identify_small_chip(
        device: &PciDevice,
        region: Option<Bar>,
        vpd: u8,
    ) -> Result<(DetectedChip, DeviceGeometry)> {
        let mut header = Header { hidr: 0, hrev: 0 };
        identify(
            device,
            &region.unwrap(),
            &mut Vpd(vpd),
            &mut header,
            &DetectOptions::new(),
        )
    }

    #[test]
    fn test_identify_small_family() {
        let device = dev(1, 2, PLX_VENDOR_ID, 0x9050);
        let mem = bar(0, 128, BarKind::Memory);
        let io = bar(1, 128, BarKind::Io);

        let (chip, geom) = identify_small_chip(&device, mem, 0x03).unwrap();
        assert_eq!(chip.model, PlxModel::Pci9030);
        assert_eq!(geom.eeprom(), EepromType::Cs56);

        // PVPDCNTL is meaningless through the I/O mapping
        let (chip, geom) = identify_small_chip(&device, io, 0x03).unwrap();
        assert_eq!(chip.marking, "PCI9050");
        assert_eq!(geom.eeprom(), EepromType::Cs46);
        assert_eq!(geom.cntrl_offset(), 0x50);

        let mut rev2 = device.clone();
        rev2.revision_id = 2;
        let (chip, _) = identify_small_chip(&rev2, mem, 0).unwrap();
        assert_eq!(chip.to_string(), "PCI9052 rev 01");

        let mut rev3 = device;
        rev3.revision_id = 3;
        assert_eq!(
            identify_small_chip(&rev3, mem, 0),
            Err(Error::RevisionUnsupported {
                model: PlxModel::Pci9050,
                revision: 3
            })
        );
    }

    #[test]
    fn test_identify_large_signatures() {
        let opts = DetectOptions::new();
        let (chip, geom) = identify_large_chip(0x9054_10B5, 0x0B, &opts).unwrap();
        assert_eq!(chip.model, PlxModel::Pci9054);
        assert_eq!(geom.cntrl_offset(), 0x6C);
        assert_eq!(geom.eeprom(), EepromType::Cs56);

        let (chip, _) = identify_large_chip(0x9656_10B5, 0xAA, &opts).unwrap();
        assert_eq!(chip.model, PlxModel::Pci9656);

        assert_eq!(
            identify_large_chip(0x9054_10B5, 0x09, &opts),
            Err(Error::RevisionUnsupported {
                model: PlxModel::Pci9054,
                revision: 0x09
            })
        );
        assert!(matches!(
            identify_large_chip(0x1234_5678, 0x01, &opts),
            Err(Error::UnsupportedChip(_))
        ));
    }

    #[test]
    fn test_identify_9060_paths() {
        // Identified through PCIHIDR, always rejected
        assert_eq!(
            identify_large_chip(0x906D_10B5, 0x03, &DetectOptions::new().with_eeprom(46)),
            Err(Error::RevisionUnsupported {
                model: PlxModel::Pci9060,
                revision: 0x03
            })
        );

        // Blank PCIHIDR needs the override
        assert!(matches!(
            identify_large_chip(0, 0x01, &DetectOptions::new()),
            Err(Error::UnsupportedChip(_))
        ));
        let opts = DetectOptions::new().with_plx(9060).with_eeprom(56);
        let (chip, geom) = identify_large_chip(0, 0x01, &opts).unwrap();
        assert_eq!(chip.model, PlxModel::Pci9060);
        assert_eq!(geom.eeprom(), EepromType::Cs56);

        // And an EEPROM type, since the PCI9060 has no default
        assert_eq!(
            identify_large_chip(0, 0x01, &DetectOptions::new().with_plx(0x9060)),
            Err(Error::EepromTypeRequired(PlxModel::Pci9060))
        );
    }

    #[test]
    fn test_model_override() {
        assert!(check_model(PlxModel::Pci9050, Some(9052)).is_ok());
        assert!(check_model(PlxModel::Pci9050, Some(0x9052)).is_ok());
        assert!(check_model(PlxModel::Pci9054, None).is_ok());
        assert!(check_model(PlxModel::Pci9054, Some(0)).is_ok());
        assert_eq!(
            check_model(PlxModel::Pci9054, Some(0x9056)),
            Err(Error::ModelMismatch {
                detected: PlxModel::Pci9054,
                requested: 0x9056
            })
        );
        assert_eq!(
            identify_large_chip(0x9080_10B5, 0x02, &DetectOptions::new().with_plx(9054)),
            Err(Error::ModelMismatch {
                detected: PlxModel::Pci9080,
                requested: 9054
            })
        );
    }

    #[test]
    fn test_resolve_eeprom() {
        assert_eq!(
            resolve_eeprom(PlxModel::Pci9056, Some(4096)).unwrap().capacity(),
            512
        );
        assert_eq!(
            resolve_eeprom(PlxModel::Pci9050, Some(56)),
            Err(Error::EepromTypeInvalid {
                model: PlxModel::Pci9050,
                requested: 56
            })
        );
        assert_eq!(
            resolve_eeprom(PlxModel::Pci9080, None),
            Err(Error::EepromTypeRequired(PlxModel::Pci9080))
        );
        assert_eq!(
            resolve_eeprom(PlxModel::Pci9080, Some(128)).unwrap().address_width(),
            6
        );
        assert_eq!(
            resolve_eeprom(PlxModel::Pci9080, Some(66)),
            Err(Error::EepromTypeInvalid {
                model: PlxModel::Pci9080,
                requested: 66
            })
        );
        assert!(resolve_eeprom(PlxModel::Pci9054, Some(12)).is_err());
    }
}
