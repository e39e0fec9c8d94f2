//! Pin-level model of a 93CS46/56/66 Microwire EEPROM
//!
//! The model is driven by the CS, SK and DI levels the bridge writes and
//! answers with the DO level the bridge samples. It decodes the start bit,
//! opcode and address on rising SK edges, shifts read data out on rising
//! edges and commits a write when CS falls after the 16th data bit.

use plxeeprom_core::EepromType;

/// Injected misbehaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fault {
    /// Behave like a healthy part
    #[default]
    None,
    /// DO is stuck high; reads fail the dummy-bit check
    StuckDataOut,
    /// Programming never completes; DO stays low while polled
    NeverReady,
    /// The first `n` programming cycles complete, later ones never do
    FailAfter(u32),
    /// The first `n` READ commands succeed, then DO sticks high
    StuckAfterReads(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// CS low
    Deselected,
    /// CS high, waiting for the start bit; DO shows ready/busy
    Selected,
    Opcode { bits: u32, count: u32 },
    Address { opcode: u32, bits: u32, count: u32 },
    /// READ: DO is the dummy zero until the first data clock
    ReadData { address: u32, shifted: u32 },
    WriteData { address: u32, bits: u32, count: u32 },
    /// All 16 data bits received; committed when CS falls
    WritePending { address: u32, value: u16 },
    /// Padding bits of EWEN/EWDS or anything unsupported
    Ignore,
}

/// Simulated Microwire EEPROM in x16 organisation
#[derive(Debug, Clone)]
pub struct MicrowireEeprom {
    words: Vec<u16>,
    address_width: u32,
    write_enabled: bool,
    phase: Phase,
    /// Ready polls left before the current programming cycle finishes
    busy: u32,
    busy_polls: u32,
    /// Programming cycles started so far
    cycles: u32,
    /// READ commands decoded so far
    reads: u32,
    fault: Fault,
    commands: Vec<Command>,
}

/// A decoded command, for inspection by tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// READ of a word address
    Read(u32),
    /// WRITE of a word address; `committed` is false when writes were
    /// disabled
    Write {
        /// Word address
        address: u32,
        /// Value
        value: u16,
        /// Whether the word was actually programmed
        committed: bool,
    },
    /// EWEN
    WriteEnable,
    /// EWDS
    WriteDisable,
}

impl MicrowireEeprom {
    /// Create a part of the given type filled with `fill`
    pub fn new(eeprom: EepromType, fill: u8) -> Self {
        Self {
            words: vec![u16::from_le_bytes([fill, fill]); eeprom.words() as usize],
            address_width: eeprom.address_width(),
            write_enabled: false,
            phase: Phase::Deselected,
            busy: 0,
            busy_polls: 3,
            cycles: 0,
            reads: 0,
            fault: Fault::None,
            commands: Vec::new(),
        }
    }

    /// Set how many ready polls a programming cycle takes
    pub fn with_busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self
    }

    /// Inject a fault
    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = fault;
        self
    }

    /// Word contents
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Mutable word contents
    pub fn words_mut(&mut self) -> &mut [u16] {
        &mut self.words
    }

    /// Contents as little-endian bytes
    pub fn bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// Load contents from little-endian bytes
    pub fn load(&mut self, data: &[u8]) {
        for (word, pair) in self.words.iter_mut().zip(data.chunks(2)) {
            let hi = pair.get(1).copied().unwrap_or((*word >> 8) as u8);
            *word = u16::from_le_bytes([pair[0], hi]);
        }
    }

    /// Whether EWEN is in effect
    pub fn write_enabled(&self) -> bool {
        self.write_enabled
    }

    /// Commands decoded so far
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Forget the decoded command log
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    fn word_mask(&self) -> u32 {
        self.words.len() as u32 - 1
    }

    /// Chip select went high
    pub fn select(&mut self) {
        self.phase = Phase::Selected;
    }

    /// Chip select went low
    pub fn deselect(&mut self) {
        if let Phase::WritePending { address, value } = self.phase {
            let committed = self.write_enabled;
            if committed {
                self.words[address as usize] = value;
                self.busy = self.busy_polls;
                self.cycles += 1;
            } else {
                log::debug!("dummy EEPROM: write to {:#x} while disabled", address);
            }
            self.commands.push(Command::Write {
                address,
                value,
                committed,
            });
        }
        self.phase = Phase::Deselected;
    }

    /// Rising SK edge with CS high, latching `di`
    pub fn clock(&mut self, di: bool) {
        let bit = di as u32;
        self.phase = match self.phase {
            Phase::Deselected => Phase::Deselected,
            Phase::Selected if di => Phase::Opcode { bits: 0, count: 0 },
            Phase::Selected => Phase::Selected,
            Phase::Opcode { bits, count } => {
                let bits = (bits << 1) | bit;
                if count + 1 == 2 {
                    Phase::Address {
                        opcode: bits,
                        bits: 0,
                        count: 0,
                    }
                } else {
                    Phase::Opcode {
                        bits,
                        count: count + 1,
                    }
                }
            }
            Phase::Address {
                opcode,
                bits,
                count,
            } => {
                let bits = (bits << 1) | bit;
                if count + 1 == self.address_width {
                    self.decode(opcode, bits)
                } else {
                    Phase::Address {
                        opcode,
                        bits,
                        count: count + 1,
                    }
                }
            }
            Phase::ReadData { address, shifted } => {
                if shifted == 16 {
                    // Sequential read continues with the next word
                    let next = (address + 1) & self.word_mask();
                    self.commands.push(Command::Read(next));
                    Phase::ReadData {
                        address: next,
                        shifted: 1,
                    }
                } else {
                    Phase::ReadData {
                        address,
                        shifted: shifted + 1,
                    }
                }
            }
            Phase::WriteData {
                address,
                bits,
                count,
            } => {
                let bits = (bits << 1) | bit;
                if count + 1 == 16 {
                    Phase::WritePending {
                        address,
                        value: bits as u16,
                    }
                } else {
                    Phase::WriteData {
                        address,
                        bits,
                        count: count + 1,
                    }
                }
            }
            Phase::WritePending { .. } | Phase::Ignore => Phase::Ignore,
        };
    }

    fn decode(&mut self, opcode: u32, bits: u32) -> Phase {
        let address = bits & self.word_mask();
        match opcode {
            0b10 => {
                self.reads += 1;
                self.commands.push(Command::Read(address));
                Phase::ReadData {
                    address,
                    shifted: 0,
                }
            }
            0b01 => Phase::WriteData {
                address,
                bits: 0,
                count: 0,
            },
            0b00 => {
                match bits >> (self.address_width - 2) {
                    0b11 => {
                        self.write_enabled = true;
                        self.commands.push(Command::WriteEnable);
                    }
                    0b00 => {
                        self.write_enabled = false;
                        self.commands.push(Command::WriteDisable);
                    }
                    // ERAL and WRAL are never issued by the driver
                    _ => log::debug!("dummy EEPROM: ignoring ERAL/WRAL"),
                }
                Phase::Ignore
            }
            // ERASE
            _ => Phase::Ignore,
        }
    }

    /// Level of DO as sampled by the bridge
    pub fn data_out(&mut self) -> bool {
        match self.fault {
            Fault::StuckDataOut => return true,
            Fault::StuckAfterReads(n) if self.reads > n => return true,
            _ => {}
        }
        match self.phase {
            Phase::Selected => {
                let stuck_busy = match self.fault {
                    Fault::NeverReady => true,
                    Fault::FailAfter(n) => self.cycles > n,
                    _ => false,
                };
                if stuck_busy {
                    return false;
                }
                if self.busy > 0 {
                    self.busy -= 1;
                    false
                } else {
                    true
                }
            }
            Phase::ReadData { shifted: 0, .. } => false,
            Phase::ReadData { address, shifted } => {
                (self.words[address as usize] >> (16 - shifted)) & 1 != 0
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_bits(part: &mut MicrowireEeprom, value: u32, nbits: u32) {
        for i in (0..nbits).rev() {
            part.clock(value & (1 << i) != 0);
        }
    }

    fn read(part: &mut MicrowireEeprom, address: u32, width: u32) -> (bool, u16) {
        part.select();
        clock_bits(part, 0b110, 3);
        clock_bits(part, address, width);
        let dummy = part.data_out();
        let mut value = 0u16;
        for _ in 0..16 {
            part.clock(true);
            value = (value << 1) | part.data_out() as u16;
        }
        part.deselect();
        (dummy, value)
    }

    fn write(part: &mut MicrowireEeprom, address: u32, width: u32, value: u16) {
        part.select();
        clock_bits(part, 0b101, 3);
        clock_bits(part, address, width);
        clock_bits(part, value as u32, 16);
        part.deselect();
    }

    #[test]
    fn test_read_shifts_msb_first() {
        let mut part = MicrowireEeprom::new(EepromType::Cs46, 0);
        part.words_mut()[5] = 0xA5C3;
        assert_eq!(read(&mut part, 5, 6), (false, 0xA5C3));
    }

    #[test]
    fn test_write_requires_enable() {
        let mut part = MicrowireEeprom::new(EepromType::Cs46, 0xFF);
        write(&mut part, 1, 6, 0x1234);
        assert_eq!(part.words()[1], 0xFFFF);

        part.select();
        clock_bits(&mut part, 0b10011, 5);
        clock_bits(&mut part, 0, 4);
        part.deselect();
        assert!(part.write_enabled());

        write(&mut part, 1, 6, 0x1234);
        assert_eq!(part.words()[1], 0x1234);
        assert_eq!(
            part.commands().last(),
            Some(&Command::Write {
                address: 1,
                value: 0x1234,
                committed: true
            })
        );
    }

    #[test]
    fn test_busy_after_write() {
        let mut part = MicrowireEeprom::new(EepromType::Cs66, 0).with_busy_polls(2);
        part.select();
        clock_bits(&mut part, 0b10011, 5);
        clock_bits(&mut part, 0, 6);
        part.deselect();
        write(&mut part, 0x80, 8, 0xBEEF);

        part.select();
        assert!(!part.data_out());
        assert!(!part.data_out());
        assert!(part.data_out());
        part.deselect();
        assert_eq!(part.words()[0x80], 0xBEEF);
    }

    #[test]
    fn test_cs56_ignores_top_address_bit() {
        let mut part = MicrowireEeprom::new(EepromType::Cs56, 0);
        part.words_mut()[0x05] = 0x5555;
        assert_eq!(read(&mut part, 0x85, 8).1, 0x5555);
    }

    #[test]
    fn test_byte_view() {
        let mut part = MicrowireEeprom::new(EepromType::Cs46, 0);
        part.load(&[0x11, 0x22, 0x33]);
        assert_eq!(part.words()[0], 0x2211);
        assert_eq!(part.words()[1], 0x0033);
        assert_eq!(&part.bytes()[..4], &[0x11, 0x22, 0x33, 0x00]);
    }

    #[test]
    fn test_stuck_data_out() {
        let mut part = MicrowireEeprom::new(EepromType::Cs46, 0).with_fault(Fault::StuckDataOut);
        assert!(read(&mut part, 0, 6).0);
    }
}
