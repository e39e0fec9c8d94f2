//! List commands implementation

use plxeeprom_core::chip::{RevisionRule, MODELS};

/// List all programmers compiled into this binary
pub fn list_programmers() {
    println!("Supported programmers:");
    println!();
    for programmer in plxeeprom_device::available_programmers() {
        let name = if programmer.aliases.is_empty() {
            programmer.name.to_string()
        } else {
            format!("{} ({})", programmer.name, programmer.aliases.join(", "))
        };
        println!("  {:<12} - {}", name, programmer.description);
    }
}

/// List all supported bridges
pub fn list_chips() {
    println!("Supported PLX bridges:");
    println!();
    println!(
        "{:<10} {:>8} {:>7} {:<16} {:<9} {}",
        "Model", "DeviceID", "CNTRL", "EEPROM", "Default", "Revision"
    );
    println!("{}", "-".repeat(64));

    for info in MODELS {
        let eeproms: Vec<String> = info.eeproms.iter().map(|e| e.to_string()).collect();
        let default = info
            .default_eeprom
            .map(|e| e.to_string())
            .unwrap_or_else(|| "-".to_string());
        let revision = match info.revision {
            RevisionRule::Any => "any".to_string(),
            RevisionRule::AtLeast(min) => format!(">= {:02X}", min),
            RevisionRule::OverrideOnly => "override".to_string(),
        };

        println!(
            "{:<10} {:>8} {:>7} {:<16} {:<9} {}",
            info.model.to_string(),
            format!("{:04x}", info.device_id),
            format!("{:#04x}", info.cntrl_offset),
            eeproms.join("/"),
            default,
            revision
        );
    }
}
