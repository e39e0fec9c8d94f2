//! Simulated local configuration registers

use plxeeprom_core::chip::{model_info, ControlBits, PLX9054_PCIHIDR, PLX9054_PCIHREV};
use plxeeprom_core::programmer::RegisterAccess;
use plxeeprom_core::PlxModel;

use crate::eeprom::MicrowireEeprom;

/// Local configuration register block of a simulated PLX bridge
///
/// Writes to CNTRL drive the attached [`MicrowireEeprom`]; reads of CNTRL
/// return its DO level. Every other register is plain storage.
#[derive(Debug, Clone)]
pub struct DummyPlx {
    regs: Vec<u8>,
    cntrl_offset: usize,
    wired: ControlBits,
    cntrl: u32,
    eeprom: MicrowireEeprom,
    accesses: usize,
}

impl DummyPlx {
    /// Create the register block of `model` with `size` bytes of registers
    ///
    /// `hidr` and `hrev` are placed in PCIHIDR/PCIHREV when the block is
    /// large enough to have them.
    pub fn new(model: PlxModel, size: usize, hidr: u32, hrev: u8, eeprom: MicrowireEeprom) -> Self {
        let info = model_info(model);
        let mut plx = Self {
            regs: vec![0; size],
            cntrl_offset: info.cntrl_offset,
            wired: info.wired,
            cntrl: 0,
            eeprom,
            accesses: 0,
        };
        if size > PLX9054_PCIHREV {
            plx.store32(PLX9054_PCIHIDR, hidr);
            plx.regs[PLX9054_PCIHREV] = hrev;
        }
        plx
    }

    /// The attached EEPROM
    pub fn eeprom(&self) -> &MicrowireEeprom {
        &self.eeprom
    }

    /// The attached EEPROM, mutably
    pub fn eeprom_mut(&mut self) -> &mut MicrowireEeprom {
        &mut self.eeprom
    }

    /// Number of register reads and writes so far
    pub fn accesses(&self) -> usize {
        self.accesses
    }

    /// Last value written to CNTRL
    pub fn cntrl(&self) -> u32 {
        self.cntrl
    }

    fn store32(&mut self, offset: usize, value: u32) {
        if let Some(reg) = self.regs.get_mut(offset..offset + 4) {
            reg.copy_from_slice(&value.to_le_bytes());
        }
    }

    fn load32(&self, offset: usize) -> u32 {
        self.regs
            .get(offset..offset + 4)
            .map(|reg| u32::from_le_bytes([reg[0], reg[1], reg[2], reg[3]]))
            .unwrap_or(0xFFFF_FFFF)
    }

    fn drive_eeprom(&mut self, value: u32) {
        let line = |v: u32, bit: ControlBits| (self.wired & bit).bits() & v != 0;
        let cs_was = line(self.cntrl, ControlBits::CHIP_SELECT);
        let sk_was = line(self.cntrl, ControlBits::CLOCK);
        let cs = line(value, ControlBits::CHIP_SELECT);
        let sk = line(value, ControlBits::CLOCK);
        let di = line(value, ControlBits::DATA_IN);

        // DI is only driven onto the bus when its output enable is set
        let di = if self.wired.contains(ControlBits::OUTPUT_ENABLE) {
            di && value & ControlBits::OUTPUT_ENABLE.bits() != 0
        } else {
            di
        };

        if !cs_was && cs {
            self.eeprom.select();
        } else if cs_was && !cs {
            self.eeprom.deselect();
        }
        if cs && !sk_was && sk {
            self.eeprom.clock(di);
        }
    }
}

impl RegisterAccess for DummyPlx {
    fn read32(&mut self, offset: usize) -> u32 {
        self.accesses += 1;
        if offset == self.cntrl_offset {
            let data_out = ControlBits::DATA_OUT.bits();
            let cntrl = self.cntrl & !data_out;
            if self.eeprom.data_out() {
                cntrl | data_out
            } else {
                cntrl
            }
        } else {
            self.load32(offset)
        }
    }

    fn write32(&mut self, offset: usize, value: u32) {
        self.accesses += 1;
        if offset == self.cntrl_offset {
            self.drive_eeprom(value);
            self.cntrl = value;
        } else {
            self.store32(offset, value);
        }
    }

    fn read8(&mut self, offset: usize) -> u8 {
        self.accesses += 1;
        self.regs.get(offset).copied().unwrap_or(0xFF)
    }

    fn delay_us(&mut self, _us: u32) {
        // No delay needed for simulated lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plxeeprom_core::EepromType;

    #[test]
    fn test_identification_registers() {
        let eeprom = MicrowireEeprom::new(EepromType::Cs56, 0xFF);
        let mut plx = DummyPlx::new(PlxModel::Pci9054, 256, 0x9054_10B5, 0x0B, eeprom);
        assert_eq!(plx.read32(PLX9054_PCIHIDR), 0x9054_10B5);
        assert_eq!(plx.read8(PLX9054_PCIHREV), 0x0B);
        assert_eq!(plx.accesses(), 2);
    }

    #[test]
    fn test_small_block_has_no_identification() {
        let eeprom = MicrowireEeprom::new(EepromType::Cs46, 0xFF);
        let mut plx = DummyPlx::new(PlxModel::Pci9050, 128, 0x9054_10B5, 0x0B, eeprom);
        assert_eq!(plx.read8(PLX9054_PCIHREV), 0xFF);
    }

    #[test]
    fn test_idle_data_out_is_high() {
        let eeprom = MicrowireEeprom::new(EepromType::Cs46, 0xFF);
        let mut plx = DummyPlx::new(PlxModel::Pci9050, 128, 0, 0, eeprom);
        let cntrl = plx.read32(0x50);
        assert_ne!(cntrl & ControlBits::DATA_OUT.bits(), 0);
    }
}
