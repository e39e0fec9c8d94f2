//! Backend registry and initialization
//!
//! This module opens backends by name and turns them into EepromHandles.
//! Platform and accessor types stay behind the public API.

use std::collections::HashMap;

use plxeeprom_core::detect::DetectOptions;

use crate::handle::{DeviceInfo, EepromHandle};

/// Parsed programmer parameters
pub struct ProgrammerParams {
    /// Programmer name (canonical)
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

impl ProgrammerParams {
    /// Parameters as borrowed pairs, in a stable order
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        pairs.sort_unstable();
        pairs
    }
}

/// Parse a programmer string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
///
/// # Example
/// ```ignore
/// let params = parse_programmer_params("dummy:model=9054")?;
/// assert_eq!(params.name, "dummy");
/// assert_eq!(params.params.get("model"), Some(&"9054".to_string()));
/// ```
pub fn parse_programmer_params(s: &str) -> Result<ProgrammerParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(ProgrammerParams {
        name: name.to_string(),
        params,
    })
}

/// Options given in the programmer string take precedence
#[allow(dead_code)] // Unused when no backend is enabled
fn overlay(base: &DetectOptions, over: DetectOptions) -> DetectOptions {
    DetectOptions {
        bus: over.bus.or(base.bus),
        slot: over.slot.or(base.slot),
        vendor: over.vendor.or(base.vendor),
        device: over.device.or(base.device),
        subvendor: over.subvendor.or(base.subvendor),
        subdevice: over.subdevice.or(base.subdevice),
        instance: if over.instance != 0 {
            over.instance
        } else {
            base.instance
        },
        plx: over.plx.or(base.plx),
        eeprom: over.eeprom.or(base.eeprom),
    }
}

/// Open a backend, detect the chip and create an EepromHandle
///
/// This is the main entry point for the CLI. It handles:
/// 1. Parsing the programmer string
/// 2. Bringing up the backend's device with `options`
/// 3. Erasing the accessor type
///
/// # Arguments
/// * `programmer` - Programmer specification (e.g., "pci" or "dummy:model=9054")
/// * `options` - Device selection and overrides
#[allow(unused_variables)] // options is unused when no backend is enabled
pub fn open_device(
    programmer: &str,
    options: &DetectOptions,
) -> Result<(EepromHandle, DeviceInfo), Box<dyn std::error::Error>> {
    let params = parse_programmer_params(programmer)?;

    match params.name.as_str() {
        #[cfg(feature = "pci")]
        "pci" | "plx" => open_pci(&params, options),

        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&params, options),

        _ => Err(format!("Unknown programmer: {}", params.name).into()),
    }
}

#[cfg(feature = "pci")]
fn open_pci(
    params: &ProgrammerParams,
    options: &DetectOptions,
) -> Result<(EepromHandle, DeviceInfo), Box<dyn std::error::Error>> {
    log::info!("Opening PLX device on the PCI bus...");

    let given = DetectOptions::from_options(&params.pairs())
        .map_err(|e| format!("Invalid pci programmer options: {}", e))?;
    let options = overlay(options, given);

    let (handle, detection) = plxeeprom_pci::open_pci_device(&options).map_err(|e| {
        format!(
            "Failed to open PLX device: {}\n\
             Make sure you have root privileges. Use --bus/--slot or --plx to \
             select a card other than the first PCI9050/9052.",
            e
        )
    })?;

    let info = DeviceInfo::new(&params.name, &detection);
    Ok((crate::handle::boxed(handle)?, info))
}

#[cfg(feature = "dummy")]
fn open_dummy(
    params: &ProgrammerParams,
    options: &DetectOptions,
) -> Result<(EepromHandle, DeviceInfo), Box<dyn std::error::Error>> {
    use plxeeprom_core::detect::bring_up;
    use plxeeprom_dummy::{DummyConfig, DummyPlatform};

    let config = DummyConfig::from_options(&params.pairs())
        .map_err(|e| format!("Invalid dummy programmer options: {}", e))?;
    log::info!(
        "Opening simulated {} with a {}...",
        config.model,
        config.eeprom
    );

    // Find the simulated card unless told otherwise
    let mut options = options.clone();
    if options.plx.is_none() && options.device.is_none() {
        options.plx = Some(config.model.number() as u32);
    }
    if options.eeprom.is_none() {
        options.eeprom = Some(config.eeprom.size() as u32);
    }

    let mut platform = DummyPlatform::with_card(config);
    let (handle, detection) = bring_up(&mut platform, &options)?;

    let info = DeviceInfo::new(&params.name, &detection);
    Ok((crate::handle::boxed(handle)?, info))
}

// Programmer information and listing
/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "pci")]
    programmers.push(ProgrammerInfo {
        name: "pci",
        aliases: &["plx"],
        description: "PLX bridge on the host PCI bus (bus=,slot=,plx=,eeprom=,...)",
    });

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "Simulated PLX bridge and EEPROM (model=,eeprom=,fill=,fault=)",
    });

    programmers
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    if programmers.is_empty() {
        return "none (recompile with features)".to_string();
    }
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_programmer_params() {
        let params = parse_programmer_params("dummy:model=9054,eeprom=66").unwrap();
        assert_eq!(params.name, "dummy");
        assert_eq!(params.pairs(), vec![("eeprom", "66"), ("model", "9054")]);

        let params = parse_programmer_params("pci").unwrap();
        assert_eq!(params.name, "pci");
        assert!(params.params.is_empty());

        assert!(parse_programmer_params("pci:bus").is_err());
    }

    #[test]
    fn test_overlay_prefers_programmer_string() {
        let base = DetectOptions::new().with_bus(1).with_plx(0x9054);
        let over = DetectOptions::new().with_bus(2).with_instance(3);
        let merged = overlay(&base, over);
        assert_eq!(merged.bus, Some(2));
        assert_eq!(merged.plx, Some(0x9054));
        assert_eq!(merged.instance, 3);
    }

    #[test]
    fn test_unknown_programmer() {
        let err = open_device("ch341a", &DetectOptions::new()).err().unwrap();
        assert!(err.to_string().contains("Unknown programmer"));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy() {
        let (handle, info) =
            open_device("dummy:model=9054,fill=0", &DetectOptions::new()).unwrap();
        assert_eq!(info.model, plxeeprom_core::PlxModel::Pci9054);
        assert_eq!(info.chip_name(), "PCI9054 rev 0B");
        assert_eq!(info.capacity, 256);

        assert_eq!(handle.write_at(2, &[0xAB]).unwrap(), 1);
        let mut buf = [0xFFu8; 4];
        handle.read_at(0, &mut buf).unwrap();
        assert_eq!(buf, [0, 0, 0xAB, 0]);
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy_without_default_eeprom() {
        let options = DetectOptions::new().with_plx(0x9080);
        let (_, info) = open_device("dummy:model=9080,eeprom=56", &options).unwrap();
        assert_eq!(info.eeprom, plxeeprom_core::EepromType::Cs56);
    }
}
