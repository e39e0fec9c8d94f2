//! Bit-banged serial EEPROM engine
//!
//! The PLX bridges expose the EEPROM's SK, CS, DI and DO pins (and on
//! PCI9056/9656 a DI output enable) as bits of the CNTRL register. This
//! module clocks bits through those pins.
//!
//! A command is framed by [`SerialBitEngine::start`], which asserts CS and
//! clocks the start bit, and ends when the returned [`CommandFrame`] is
//! ended or dropped. Dropping an unfinished frame deasserts CS, so an early
//! return never leaves the EEPROM selected.
//!
//! All bits are sent and received most-significant bit first.

use std::time::{Duration, Instant};

use crate::chip::{ControlBits, DeviceGeometry};
use crate::programmer::RegisterAccess;

/// Hold time after each pin change, in microseconds
pub const SETTLE_US: u32 = 2;
/// Hold time after the rising clock edge before sampling DO
pub const READ_SETTLE_US: u32 = 3;
/// Hold time between the last address bit and the dummy-bit check
pub const DUMMY_BIT_US: u32 = 1;

/// Bit engine over the CNTRL register of one device
pub struct SerialBitEngine<A> {
    access: A,
    cntrl_offset: usize,
    wired: ControlBits,
}

impl<A: RegisterAccess> SerialBitEngine<A> {
    /// Create an engine for the given register access and geometry
    pub fn new(access: A, geometry: &DeviceGeometry) -> Self {
        Self {
            access,
            cntrl_offset: geometry.cntrl_offset(),
            wired: geometry.wired(),
        }
    }

    /// Consume the engine and return the register access
    pub fn into_inner(self) -> A {
        self.access
    }

    /// Borrow the register access
    pub fn access(&self) -> &A {
        &self.access
    }

    /// Mutably borrow the register access
    pub fn access_mut(&mut self) -> &mut A {
        &mut self.access
    }

    fn read_cntrl(&mut self) -> u32 {
        self.access.read32(self.cntrl_offset)
    }

    fn write_cntrl(&mut self, value: u32) {
        self.access.write32(self.cntrl_offset, value);
    }

    /// DI, plus DOE where the chip wires it
    fn data_in_lines(&self) -> u32 {
        ((ControlBits::DATA_IN | ControlBits::OUTPUT_ENABLE) & self.wired).bits()
    }

    /// CS, DI and DOE as wired
    fn select_lines(&self) -> u32 {
        ((ControlBits::CHIP_SELECT | ControlBits::DATA_IN | ControlBits::OUTPUT_ENABLE)
            & self.wired)
            .bits()
    }

    /// CS, SK, DI and DOE as wired
    fn idle_clear_lines(&self) -> u32 {
        ((ControlBits::CHIP_SELECT
            | ControlBits::CLOCK
            | ControlBits::DATA_IN
            | ControlBits::OUTPUT_ENABLE)
            & self.wired)
            .bits()
    }

    /// Assert CS and clock the start bit
    pub fn start(&mut self) -> CommandFrame<'_, A> {
        let mut cntrl = self.read_cntrl();
        // SK=0, CS=1, DI=1, DOE=1
        cntrl = (cntrl & !ControlBits::CLOCK.bits()) | self.select_lines();
        self.write_cntrl(cntrl);
        self.access.delay_us(SETTLE_US);
        // SK=1
        cntrl |= ControlBits::CLOCK.bits();
        self.write_cntrl(cntrl);
        self.access.delay_us(SETTLE_US);

        CommandFrame {
            engine: self,
            cntrl,
            active: true,
        }
    }

    /// Deassert CS, SK, DI and DOE starting from `cntrl`
    fn end_with(&mut self, cntrl: u32) -> u32 {
        let cntrl = cntrl & !self.idle_clear_lines();
        self.write_cntrl(cntrl);
        self.access.delay_us(SETTLE_US);
        cntrl
    }

    /// Put the EEPROM interface into a known idle state
    ///
    /// Deselects, pulses SK once with CS low and deselects again, which
    /// aborts anything a previous user left half-clocked.
    pub fn reset(&mut self) {
        let cntrl = self.read_cntrl();
        let cntrl = self.end_with(cntrl) | ControlBits::CLOCK.bits();
        self.write_cntrl(cntrl);
        self.access.delay_us(SETTLE_US);
        self.end_with(cntrl);
    }

    /// Wait for the EEPROM to finish a programming cycle
    ///
    /// Selects the EEPROM and polls DO, yielding between samples, until it
    /// goes high or `timeout` elapses. Returns true if the part reported
    /// ready. The EEPROM is deselected on return either way.
    pub fn wait_ready(&mut self, timeout: Duration) -> bool {
        let mut cntrl = self.read_cntrl();
        // SK=0, CS=1, DI=1, DOE=1
        cntrl = (cntrl & !ControlBits::CLOCK.bits()) | self.select_lines();
        self.write_cntrl(cntrl);
        let started = Instant::now();
        self.access.delay_us(SETTLE_US);

        let mut ready = false;
        loop {
            self.access.yield_now();
            cntrl = self.read_cntrl();
            if cntrl & ControlBits::DATA_OUT.bits() != 0 {
                // Clocking once clears the ready status
                cntrl |= ControlBits::CLOCK.bits();
                self.write_cntrl(cntrl);
                self.access.delay_us(SETTLE_US);
                ready = true;
                break;
            }
            if started.elapsed() >= timeout {
                break;
            }
        }

        self.end_with(cntrl);
        ready
    }
}

/// One framed EEPROM command
///
/// Holds the CNTRL value between bit operations; no other state is cached.
pub struct CommandFrame<'e, A: RegisterAccess> {
    engine: &'e mut SerialBitEngine<A>,
    cntrl: u32,
    active: bool,
}

impl<A: RegisterAccess> CommandFrame<'_, A> {
    /// Clock out the low `nbits` bits of `bits`, MSB first
    pub fn put_bits(&mut self, bits: u32, nbits: u32) {
        let data_in = self.engine.data_in_lines();
        for i in (0..nbits).rev() {
            if bits & (1 << i) != 0 {
                self.cntrl |= data_in;
            } else {
                self.cntrl &= !data_in;
            }
            // SK=0
            self.cntrl &= !ControlBits::CLOCK.bits();
            self.engine.write_cntrl(self.cntrl);
            self.engine.access.delay_us(SETTLE_US);
            // SK=1
            self.cntrl |= ControlBits::CLOCK.bits();
            self.engine.write_cntrl(self.cntrl);
            self.engine.access.delay_us(SETTLE_US);
        }
    }

    /// Re-read CNTRL and return whether DO is high
    ///
    /// The re-read value replaces the cached one.
    pub fn sample_data_out(&mut self) -> bool {
        self.cntrl = self.engine.read_cntrl();
        self.cntrl & ControlBits::DATA_OUT.bits() != 0
    }

    /// Hold for `us` microseconds without changing any line
    pub fn hold(&mut self, us: u32) {
        self.engine.access.delay_us(us);
    }

    /// Clock in `nbits` bits from DO, MSB first
    pub fn get_bits(&mut self, nbits: u32) -> u32 {
        // DI=1, DOE=1 while the EEPROM drives DO
        self.cntrl |= self.engine.data_in_lines();

        let mut value = 0u32;
        for _ in 0..nbits {
            value <<= 1;
            // SK=0
            self.cntrl &= !ControlBits::CLOCK.bits();
            self.engine.write_cntrl(self.cntrl);
            self.engine.access.delay_us(SETTLE_US);
            // SK=1
            self.cntrl |= ControlBits::CLOCK.bits();
            self.engine.write_cntrl(self.cntrl);
            self.engine.access.delay_us(READ_SETTLE_US);
            if self.sample_data_out() {
                value |= 1;
            }
        }
        value
    }

    /// Deassert CS and finish the command
    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.active {
            self.active = false;
            self.cntrl = self.engine.end_with(self.cntrl);
        }
    }
}

impl<A: RegisterAccess> Drop for CommandFrame<'_, A> {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::{model_info, PlxModel};

    /// Records every CNTRL write, reads back the last value
    struct Recorder {
        value: u32,
        writes: Vec<u32>,
        data_out: bool,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                value: 0x0012_3400,
                writes: Vec::new(),
                data_out: false,
            }
        }
    }

    impl RegisterAccess for Recorder {
        fn read32(&mut self, _offset: usize) -> u32 {
            if self.data_out {
                self.value | ControlBits::DATA_OUT.bits()
            } else {
                self.value & !ControlBits::DATA_OUT.bits()
            }
        }

        fn write32(&mut self, _offset: usize, value: u32) {
            self.value = value;
            self.writes.push(value);
        }

        fn read8(&mut self, _offset: usize) -> u8 {
            0
        }

        fn delay_us(&mut self, _us: u32) {}

        fn yield_now(&mut self) {}
    }

    fn geometry(model: PlxModel) -> DeviceGeometry {
        let info = model_info(model);
        info.geometry(info.eeproms[0]).unwrap()
    }

    const SK: u32 = 0x0100_0000;
    const CS: u32 = 0x0200_0000;
    const DI: u32 = 0x0400_0000;
    const DOE: u32 = 0x8000_0000;

    #[test]
    fn test_start_and_end_preserve_other_bits() {
        let mut engine = SerialBitEngine::new(Recorder::new(), &geometry(PlxModel::Pci9050));
        engine.start().end();
        let writes = &engine.access().writes;
        assert_eq!(writes[0], 0x0012_3400 | CS | DI);
        assert_eq!(writes[1], 0x0012_3400 | CS | DI | SK);
        assert_eq!(writes[2], 0x0012_3400);
        assert_eq!(writes.len(), 3);
    }

    #[test]
    fn test_output_enable_follows_data_in() {
        let mut engine = SerialBitEngine::new(Recorder::new(), &geometry(PlxModel::Pci9056));
        let mut frame = engine.start();
        frame.put_bits(0b10, 2);
        frame.end();
        let writes = &engine.access().writes;
        // start, two bits (two writes each), end
        assert_eq!(writes.len(), 7);
        assert_eq!(writes[0] & (DI | DOE), DI | DOE);
        // first bit 1: SK low then high with DI and DOE set
        assert_eq!(writes[2] & (SK | DI | DOE), DI | DOE);
        assert_eq!(writes[3] & (SK | DI | DOE), SK | DI | DOE);
        // second bit 0: DI and DOE cleared together
        assert_eq!(writes[4] & (SK | DI | DOE), 0);
        assert_eq!(writes[5] & (SK | DI | DOE), SK);
        assert_eq!(writes[6] & (SK | CS | DI | DOE), 0);
    }

    #[test]
    fn test_output_enable_untouched_when_not_wired() {
        let mut access = Recorder::new();
        access.value |= DOE;
        let mut engine = SerialBitEngine::new(access, &geometry(PlxModel::Pci9054));
        let mut frame = engine.start();
        frame.put_bits(0, 3);
        frame.end();
        assert!(engine.access().writes.iter().all(|w| w & DOE != 0));
    }

    #[test]
    fn test_put_bits_msb_first() {
        let mut engine = SerialBitEngine::new(Recorder::new(), &geometry(PlxModel::Pci9050));
        let mut frame = engine.start();
        frame.put_bits(0b1011_0010, 8);
        drop(frame);
        let bits: Vec<u32> = engine.access().writes[2..18]
            .chunks(2)
            .map(|pair| {
                assert_eq!(pair[0] & SK, 0);
                assert_eq!(pair[1] & SK, SK);
                (pair[1] & DI != 0) as u32
            })
            .collect();
        assert_eq!(bits, vec![1, 0, 1, 1, 0, 0, 1, 0]);
    }

    #[test]
    fn test_get_bits_reads_data_out() {
        let mut access = Recorder::new();
        access.data_out = true;
        let mut engine = SerialBitEngine::new(access, &geometry(PlxModel::Pci9050));
        let mut frame = engine.start();
        assert_eq!(frame.get_bits(16), 0xFFFF);
    }

    #[test]
    fn test_drop_deselects() {
        let mut engine = SerialBitEngine::new(Recorder::new(), &geometry(PlxModel::Pci9050));
        {
            let mut frame = engine.start();
            frame.put_bits(1, 1);
        }
        let last = *engine.access().writes.last().unwrap();
        assert_eq!(last & (CS | SK | DI), 0);
    }

    #[test]
    fn test_wait_ready_immediate() {
        let mut access = Recorder::new();
        access.data_out = true;
        let mut engine = SerialBitEngine::new(access, &geometry(PlxModel::Pci9050));
        assert!(engine.wait_ready(Duration::from_millis(50)));
        let last = *engine.access().writes.last().unwrap();
        assert_eq!(last & (CS | SK | DI), 0);
    }

    #[test]
    fn test_wait_ready_times_out() {
        let mut engine = SerialBitEngine::new(Recorder::new(), &geometry(PlxModel::Pci9050));
        let start = Instant::now();
        assert!(!engine.wait_ready(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_reset_sequence() {
        let mut engine = SerialBitEngine::new(Recorder::new(), &geometry(PlxModel::Pci9656));
        engine.reset();
        let writes = &engine.access().writes;
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[0] & (CS | SK | DI | DOE), 0);
        assert_eq!(writes[1] & (CS | SK | DI | DOE), SK);
        assert_eq!(writes[2] & (CS | SK | DI | DOE), 0);
    }
}
