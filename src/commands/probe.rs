//! Probe and info output

use plxeeprom_device::DeviceInfo;

/// One-line summary of what was found
pub fn print_probe(info: &DeviceInfo) {
    println!(
        "Found {} at {} with a {} ({} bytes)",
        info.chip_name(),
        info.bdf,
        info.eeprom,
        info.capacity
    );
}

/// Everything bring-up learned about the device
pub fn print_info(info: &DeviceInfo) {
    println!("Programmer:     {}", info.programmer);
    println!("PCI device:     {} (instance {})", info.bdf, info.instance);
    println!(
        "PCI IDs:        {:04x}:{:04x} subsystem {:04x}:{:04x}",
        info.vendor_id, info.device_id, info.subsystem_vendor_id, info.subsystem_device_id
    );
    println!("Chip:           {} ({})", info.chip_name(), info.model);
    println!(
        "Registers:      {} {:#x}, {:#x} bytes",
        if info.port_mapped { "I/O" } else { "memory" },
        info.region_address,
        info.region_size
    );
    println!("CNTRL offset:   {:#04x}", info.cntrl_offset);
    println!(
        "EEPROM:         {}, {} bytes, {} address bits",
        info.eeprom, info.capacity, info.address_width
    );
}
