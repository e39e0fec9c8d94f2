//! Microwire command set of the 93CS46/56/66 EEPROMs
//!
//! Every command is a start bit, a 2-bit opcode and an address field whose
//! width depends on the part:
//!
//! | Command | Opcode | Address field              | Data          |
//! |---------|--------|----------------------------|---------------|
//! | READ    | `10`   | word address               | 16 bits out   |
//! | WRITE   | `01`   | word address               | 16 bits in    |
//! | EWEN    | `00`   | `11` then zero padding     | none          |
//! | EWDS    | `00`   | `00` then zero padding     | none          |
//!
//! READ returns a dummy zero bit before the data. After WRITE the part
//! signals its programming cycle on DO: low while busy, high when done.

use std::time::Duration;

use crate::chip::DeviceGeometry;
use crate::error::{Error, Result};
use crate::programmer::bitbang::DUMMY_BIT_US;
use crate::programmer::{RegisterAccess, SerialBitEngine};

/// Upper bound on one programming cycle
///
/// Parts finish within 10 ms. The 50 ms bound has one extra millisecond so
/// a poll that starts just before a clock tick still gets the full budget.
pub const WRITE_CYCLE_TIMEOUT: Duration = Duration::from_millis(51);

const OP_READ: u32 = 0b10;
const OP_WRITE: u32 = 0b01;
/// EWEN: `00` opcode followed by `11` in the top address bits
const OP_EWEN: u32 = 0b0011;

/// Word-level EEPROM commands for one device
pub struct EepromProtocol<A> {
    engine: SerialBitEngine<A>,
    geometry: DeviceGeometry,
}

impl<A: RegisterAccess> EepromProtocol<A> {
    /// Create the protocol layer for a detected device
    pub fn new(access: A, geometry: DeviceGeometry) -> Self {
        Self {
            engine: SerialBitEngine::new(access, &geometry),
            geometry,
        }
    }

    /// Device geometry
    pub fn geometry(&self) -> &DeviceGeometry {
        &self.geometry
    }

    /// Borrow the bit engine
    pub fn engine(&self) -> &SerialBitEngine<A> {
        &self.engine
    }

    /// Mutably borrow the bit engine
    pub fn engine_mut(&mut self) -> &mut SerialBitEngine<A> {
        &mut self.engine
    }

    /// Consume the protocol layer and return the register access
    pub fn into_inner(self) -> A {
        self.engine.into_inner()
    }

    /// Put the EEPROM interface into a known idle state
    pub fn reset(&mut self) {
        self.engine.reset();
    }

    fn check_address(&self, address: u32) -> Result<()> {
        let words = self.geometry.words();
        if address >= words {
            return Err(Error::AddressOutOfRange { address, words });
        }
        Ok(())
    }

    /// Read one 16-bit word
    pub fn read_word(&mut self, address: u32) -> Result<u16> {
        self.check_address(address)?;
        let width = self.geometry.address_width();

        let mut frame = self.engine.start();
        frame.put_bits(OP_READ, 2);
        frame.put_bits(address, width);
        frame.hold(DUMMY_BIT_US);

        // The part drives a zero before the first data bit
        if frame.sample_data_out() {
            log::debug!("read {:#x}: dummy bit is high", address);
            return Err(Error::ProtocolFraming { address });
        }

        let value = frame.get_bits(16) as u16;
        frame.end();
        Ok(value)
    }

    /// Write one 16-bit word and wait for the programming cycle
    ///
    /// Writes are only accepted by the part between [`write_enable`] and
    /// [`write_disable`].
    ///
    /// [`write_enable`]: Self::write_enable
    /// [`write_disable`]: Self::write_disable
    pub fn write_word(&mut self, address: u32, value: u16) -> Result<()> {
        self.check_address(address)?;
        let width = self.geometry.address_width();

        let mut frame = self.engine.start();
        frame.put_bits(OP_WRITE, 2);
        frame.put_bits(address, width);
        frame.put_bits(value as u32, 16);
        frame.end();

        self.wait_for_write_completion()
    }

    /// Enable erase and write operations (EWEN)
    pub fn write_enable(&mut self) {
        let width = self.geometry.address_width();
        let mut frame = self.engine.start();
        frame.put_bits(OP_EWEN, 4);
        frame.put_bits(0, width - 2);
        frame.end();
    }

    /// Disable erase and write operations (EWDS)
    pub fn write_disable(&mut self) {
        let width = self.geometry.address_width();
        let mut frame = self.engine.start();
        frame.put_bits(0, width + 2);
        frame.end();
    }

    /// Poll DO until the current programming cycle finishes
    ///
    /// Fails with [`Error::WriteTimeout`] after [`WRITE_CYCLE_TIMEOUT`].
    pub fn wait_for_write_completion(&mut self) -> Result<()> {
        if self.engine.wait_ready(WRITE_CYCLE_TIMEOUT) {
            Ok(())
        } else {
            log::debug!("EEPROM still busy after {:?}", WRITE_CYCLE_TIMEOUT);
            Err(Error::WriteTimeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::{model_info, ControlBits, EepromType, PlxModel};
    use std::time::Instant;

    /// Counts accesses; DO reads as a fixed level
    struct FixedLevel {
        cntrl: u32,
        data_out: bool,
        accesses: usize,
        writes: Vec<u32>,
    }

    impl FixedLevel {
        fn new(data_out: bool) -> Self {
            Self {
                cntrl: 0,
                data_out,
                accesses: 0,
                writes: Vec::new(),
            }
        }
    }

    impl RegisterAccess for FixedLevel {
        fn read32(&mut self, _offset: usize) -> u32 {
            self.accesses += 1;
            if self.data_out {
                self.cntrl | ControlBits::DATA_OUT.bits()
            } else {
                self.cntrl
            }
        }

        fn write32(&mut self, _offset: usize, value: u32) {
            self.accesses += 1;
            self.cntrl = value & !ControlBits::DATA_OUT.bits();
            self.writes.push(value);
        }

        fn read8(&mut self, _offset: usize) -> u8 {
            self.accesses += 1;
            0
        }

        fn delay_us(&mut self, _us: u32) {}

        fn yield_now(&mut self) {}
    }

    fn protocol(
        model: PlxModel,
        eeprom: EepromType,
        data_out: bool,
    ) -> EepromProtocol<FixedLevel> {
        let geometry = model_info(model).geometry(eeprom).unwrap();
        EepromProtocol::new(FixedLevel::new(data_out), geometry)
    }

    /// Decode the DI level at each rising clock edge
    fn clocked_bits(writes: &[u32]) -> Vec<u8> {
        let sk = ControlBits::CLOCK.bits();
        let di = ControlBits::DATA_IN.bits();
        let mut bits = Vec::new();
        let mut prev = 0;
        for &w in writes {
            if prev & sk == 0 && w & sk != 0 {
                bits.push((w & di != 0) as u8);
            }
            prev = w;
        }
        bits
    }

    #[test]
    fn test_out_of_range_touches_nothing() {
        let mut p = protocol(PlxModel::Pci9050, EepromType::Cs46, true);
        assert_eq!(
            p.read_word(64),
            Err(Error::AddressOutOfRange {
                address: 64,
                words: 64
            })
        );
        assert!(p.write_word(64, 0x1234).is_err());
        assert_eq!(p.engine().access().accesses, 0);
    }

    #[test]
    fn test_framing_error_when_dummy_bit_high() {
        let mut p = protocol(PlxModel::Pci9054, EepromType::Cs56, true);
        assert_eq!(p.read_word(3), Err(Error::ProtocolFraming { address: 3 }));
        let last = *p.engine().access().writes.last().unwrap();
        assert_eq!(last & ControlBits::CHIP_SELECT.bits(), 0);
        // start bit, opcode and address only
        assert_eq!(clocked_bits(&p.engine().access().writes).len(), 1 + 2 + 8);
    }

    #[test]
    fn test_read_command_bits() {
        let mut p = protocol(PlxModel::Pci9050, EepromType::Cs46, false);
        assert_eq!(p.read_word(0b10_1101), Ok(0));
        let bits = clocked_bits(&p.engine().access().writes);
        assert_eq!(&bits[..9], &[1, 1, 0, 1, 0, 1, 1, 0, 1]);
        // 16 read clocks follow with DI held high
        assert_eq!(bits.len(), 9 + 16);
        assert!(bits[9..].iter().all(|&b| b == 1));
    }

    #[test]
    fn test_write_enable_disable_framing() {
        let mut p = protocol(PlxModel::Pci9050, EepromType::Cs46, true);
        p.write_enable();
        assert_eq!(
            clocked_bits(&p.engine().access().writes),
            vec![1, 0, 0, 1, 1, 0, 0, 0, 0]
        );

        let mut p = protocol(PlxModel::Pci9656, EepromType::Cs66, true);
        p.write_disable();
        let bits = clocked_bits(&p.engine().access().writes);
        assert_eq!(bits.len(), 11);
        assert_eq!(bits[0], 1);
        assert!(bits[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_command_bits() {
        let mut p = protocol(PlxModel::Pci9050, EepromType::Cs46, true);
        p.write_word(1, 0xA55A).unwrap();
        let bits = clocked_bits(&p.engine().access().writes);
        let mut expected = vec![1, 0, 1, 0, 0, 0, 0, 0, 1];
        for i in (0..16).rev() {
            expected.push(((0xA55Au16 >> i) & 1) as u8);
        }
        assert_eq!(&bits[..25], &expected[..]);
    }

    #[test]
    fn test_write_timeout() {
        let mut p = protocol(PlxModel::Pci9050, EepromType::Cs46, false);
        let start = Instant::now();
        assert_eq!(p.write_word(0, 0xFFFF), Err(Error::WriteTimeout));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(500));
        let last = *p.engine().access().writes.last().unwrap();
        assert_eq!(last & ControlBits::CHIP_SELECT.bits(), 0);
    }
}
