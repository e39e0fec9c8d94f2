//! Byte-addressed access to a word-organised EEPROM
//!
//! The EEPROM is presented as a flat little-endian byte array: byte `2n` is
//! the low half of word `n`, byte `2n + 1` the high half. Requests may start
//! and end on any byte; the word at each unaligned end is read first so its
//! other half survives the write.
//!
//! Both directions report partial progress. An error after some bytes were
//! transferred yields the short count; an error before any byte yields the
//! error itself.

use crate::error::{Error, Result};
use crate::programmer::RegisterAccess;
use crate::protocol::EepromProtocol;

fn word_address(pos: usize) -> u32 {
    (pos / 2) as u32
}

/// Read bytes starting at `pos` into `buf`
///
/// Returns the number of bytes read, which is 0 at or beyond the end of the
/// EEPROM and never more than the bytes remaining after `pos`.
pub fn read_bytes<A: RegisterAccess>(
    protocol: &mut EepromProtocol<A>,
    pos: usize,
    buf: &mut [u8],
) -> Result<usize> {
    let capacity = protocol.geometry().capacity();
    if pos >= capacity {
        return Ok(0);
    }
    let count = buf.len().min(capacity - pos);

    let mut word = 0u16;
    for (n, byte) in buf[..count].iter_mut().enumerate() {
        let addr = pos + n;
        if n == 0 || addr % 2 == 0 {
            word = match protocol.read_word(word_address(addr)) {
                Ok(word) => word,
                Err(e) if n > 0 => {
                    log::debug!("short read at byte {:#x}: {}", addr, e);
                    return Ok(n);
                }
                Err(e) => return Err(e),
            };
        }
        *byte = if addr % 2 == 0 {
            word as u8
        } else {
            (word >> 8) as u8
        };
    }
    Ok(count)
}

/// Write `data` starting at `pos`
///
/// Writes are enabled for the duration of the call and disabled again on
/// every exit path. Returns the number of bytes committed; a byte whose
/// word could not be written is not counted.
pub fn write_bytes<A: RegisterAccess>(
    protocol: &mut EepromProtocol<A>,
    pos: usize,
    data: &[u8],
) -> Result<usize> {
    let capacity = protocol.geometry().capacity();
    if pos > capacity {
        return Err(Error::NoSpace);
    }
    if data.is_empty() {
        return Ok(0);
    }
    let count = data.len().min(capacity - pos);
    if count == 0 {
        return Err(Error::NoSpace);
    }

    protocol.write_enable();
    let (written, err) = write_words(protocol, pos, &data[..count]);
    protocol.write_disable();

    match err {
        Some(e) if written == 0 => Err(e),
        Some(e) => {
            log::debug!("short write: {} of {} bytes: {}", written, count, e);
            Ok(written)
        }
        None => Ok(written),
    }
}

/// Merge `data` into words and program them, stopping at the first error
fn write_words<A: RegisterAccess>(
    protocol: &mut EepromProtocol<A>,
    pos: usize,
    data: &[u8],
) -> (usize, Option<Error>) {
    let count = data.len();
    let mut word = 0u16;
    let mut n = 0;

    while n < count {
        let addr = pos + n;
        let odd = addr % 2 == 1;
        let last = count - n == 1;

        // Preserve the half of the word this request does not cover
        if (n == 0 && odd) || (last && !odd) {
            word = match protocol.read_word(word_address(addr)) {
                Ok(word) => word,
                Err(e) => return (n, Some(e)),
            };
        }

        if odd {
            word = (word & 0x00FF) | ((data[n] as u16) << 8);
        } else {
            word = (word & 0xFF00) | data[n] as u16;
        }

        if odd || last {
            if let Err(e) = protocol.write_word(word_address(addr), word) {
                // The low byte of this word was counted but never committed
                if odd && n > 0 {
                    n -= 1;
                }
                return (n, Some(e));
            }
        }
        n += 1;
    }
    (n, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::{model_info, ControlBits, EepromType, PlxModel};

    /// Register file that answers every read with an idle, ready EEPROM
    /// returning all zeros, and records the commands it sees
    struct ZeroPart {
        cntrl: u32,
        cs_falls: usize,
    }

    impl RegisterAccess for ZeroPart {
        fn read32(&mut self, _offset: usize) -> u32 {
            // DO low during reads, high while polling for ready
            if self.cntrl & ControlBits::CLOCK.bits() == 0 {
                self.cntrl | ControlBits::DATA_OUT.bits()
            } else {
                self.cntrl
            }
        }

        fn write32(&mut self, _offset: usize, value: u32) {
            let cs = ControlBits::CHIP_SELECT.bits();
            if self.cntrl & cs != 0 && value & cs == 0 {
                self.cs_falls += 1;
            }
            self.cntrl = value & !ControlBits::DATA_OUT.bits();
        }

        fn read8(&mut self, _offset: usize) -> u8 {
            0
        }

        fn delay_us(&mut self, _us: u32) {}

        fn yield_now(&mut self) {}
    }

    fn protocol() -> EepromProtocol<ZeroPart> {
        let geometry = model_info(PlxModel::Pci9050)
            .geometry(EepromType::Cs46)
            .unwrap();
        EepromProtocol::new(
            ZeroPart {
                cntrl: 0,
                cs_falls: 0,
            },
            geometry,
        )
    }

    #[test]
    fn test_read_past_end_is_empty() {
        let mut p = protocol();
        let mut buf = [0xEE; 4];
        assert_eq!(read_bytes(&mut p, 128, &mut buf), Ok(0));
        assert_eq!(read_bytes(&mut p, 500, &mut buf), Ok(0));
        assert_eq!(buf, [0xEE; 4]);
    }

    #[test]
    fn test_read_is_clipped() {
        let mut p = protocol();
        let mut buf = [0xEE; 8];
        assert_eq!(read_bytes(&mut p, 125, &mut buf), Ok(3));
        assert_eq!(&buf[..3], &[0, 0, 0]);
        assert_eq!(&buf[3..], &[0xEE; 5]);
    }

    #[test]
    fn test_write_bounds() {
        let mut p = protocol();
        assert_eq!(write_bytes(&mut p, 129, &[1]), Err(Error::NoSpace));
        assert_eq!(write_bytes(&mut p, 128, &[1]), Err(Error::NoSpace));
        assert_eq!(write_bytes(&mut p, 129, &[]), Err(Error::NoSpace));
        assert_eq!(write_bytes(&mut p, 128, &[]), Ok(0));
        assert_eq!(p.engine().access().cs_falls, 0);
    }

    #[test]
    fn test_write_is_clipped() {
        let mut p = protocol();
        assert_eq!(write_bytes(&mut p, 127, &[1, 2, 3]), Ok(1));
    }
}
