//! Register access trait for the PLX local configuration registers
//!
//! The local configuration registers are exposed through a BAR which is
//! either memory-mapped or in PCI I/O space. Backends implement this trait
//! once for each access method; everything above it is access-agnostic.

use std::time::{Duration, Instant};

/// Access to the chip's local configuration registers
///
/// Offsets are byte offsets into the local configuration BAR. Accesses are
/// infallible once the region is mapped.
pub trait RegisterAccess {
    /// Read a 32-bit register
    fn read32(&mut self, offset: usize) -> u32;

    /// Write a 32-bit register
    fn write32(&mut self, offset: usize, value: u32);

    /// Read an 8-bit register
    fn read8(&mut self, offset: usize) -> u8;

    /// Delay for at least `us` microseconds
    ///
    /// The serial EEPROM timings are a few microseconds, well below what a
    /// scheduler sleep can honour, so the default implementation spins.
    fn delay_us(&mut self, us: u32) {
        busy_wait(Duration::from_micros(us as u64));
    }

    /// Give up the processor between polls of a slow operation
    fn yield_now(&mut self) {
        std::thread::yield_now();
    }
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for Box<T> {
    fn read32(&mut self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&mut self, offset: usize, value: u32) {
        (**self).write32(offset, value)
    }

    fn read8(&mut self, offset: usize) -> u8 {
        (**self).read8(offset)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }

    fn yield_now(&mut self) {
        (**self).yield_now()
    }
}

/// Spin until `duration` has elapsed
pub fn busy_wait(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        core::hint::spin_loop();
    }
}
