//! Device handle and byte-stream sessions

use std::io;

use crate::chip::DeviceGeometry;
use crate::device::sync::{InterruptibleMutex, Interrupter};
use crate::error::{Error, Result};
use crate::programmer::RegisterAccess;
use crate::protocol::EepromProtocol;
use crate::stream;

/// One detected chip and its EEPROM
///
/// Owns the register access exclusively. Every request takes the device
/// lock for its whole duration, so concurrent callers are serialised and a
/// caller blocked on the lock can be cancelled through [`interrupter`].
///
/// [`interrupter`]: DeviceHandle::interrupter
pub struct DeviceHandle<A> {
    geometry: DeviceGeometry,
    protocol: InterruptibleMutex<EepromProtocol<A>>,
}

impl<A: RegisterAccess> DeviceHandle<A> {
    /// Wrap register access for a device with known geometry
    pub fn new(access: A, geometry: DeviceGeometry) -> Self {
        Self {
            geometry,
            protocol: InterruptibleMutex::new(EepromProtocol::new(access, geometry)),
        }
    }

    /// Device geometry
    pub fn geometry(&self) -> &DeviceGeometry {
        &self.geometry
    }

    /// EEPROM capacity in bytes
    pub fn capacity(&self) -> usize {
        self.geometry.capacity()
    }

    /// Read bytes at `pos`; see [`stream::read_bytes`]
    pub fn read_at(&self, pos: usize, buf: &mut [u8]) -> Result<usize> {
        let mut protocol = self.protocol.lock()?;
        stream::read_bytes(&mut protocol, pos, buf)
    }

    /// Write bytes at `pos`; see [`stream::write_bytes`]
    pub fn write_at(&self, pos: usize, data: &[u8]) -> Result<usize> {
        let mut protocol = self.protocol.lock()?;
        stream::write_bytes(&mut protocol, pos, data)
    }

    /// Run `f` with exclusive access to the word-level protocol
    pub fn with_protocol<R>(&self, f: impl FnOnce(&mut EepromProtocol<A>) -> R) -> Result<R> {
        let mut protocol = self.protocol.lock()?;
        Ok(f(&mut protocol))
    }

    /// Reset the EEPROM interface
    pub fn reset(&self) -> Result<()> {
        self.with_protocol(|protocol| protocol.reset())
    }

    /// Reset the EEPROM interface and start a session at offset 0
    pub fn open(&self) -> Result<Session<'_, A>> {
        self.reset()?;
        log::debug!("opened {}", self.geometry);
        Ok(Session {
            handle: self,
            pos: 0,
        })
    }

    /// Tear down the handle and return the register access
    pub fn into_inner(self) -> Option<A> {
        self.protocol.into_inner().map(EepromProtocol::into_inner)
    }
}

impl<A: RegisterAccess + Send + 'static> DeviceHandle<A> {
    /// Handle that cancels threads waiting for this device
    pub fn interrupter(&self) -> Interrupter {
        self.protocol.interrupter()
    }
}

/// A byte-stream cursor over a device
///
/// Implements [`io::Read`], [`io::Write`] and [`io::Seek`] over the EEPROM
/// contents. The position only changes by the number of bytes actually
/// transferred, or by seeking.
pub struct Session<'h, A> {
    handle: &'h DeviceHandle<A>,
    pos: usize,
}

impl<A: RegisterAccess> Session<'_, A> {
    /// Current byte position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The device this session belongs to
    pub fn handle(&self) -> &DeviceHandle<A> {
        self.handle
    }

    /// Move the cursor, checking the target is within `[0, capacity]`
    pub fn seek_to(&mut self, target: io::SeekFrom) -> Result<usize> {
        let capacity = self.handle.capacity() as i64;
        let target = match target {
            io::SeekFrom::Start(pos) => i64::try_from(pos).map_err(|_| Error::InvalidSeek)?,
            io::SeekFrom::Current(delta) => (self.pos as i64)
                .checked_add(delta)
                .ok_or(Error::InvalidSeek)?,
            io::SeekFrom::End(delta) => capacity.checked_add(delta).ok_or(Error::InvalidSeek)?,
        };
        if !(0..=capacity).contains(&target) {
            return Err(Error::InvalidSeek);
        }
        self.pos = target as usize;
        Ok(self.pos)
    }
}

impl<A: RegisterAccess> io::Read for Session<'_, A> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.handle.read_at(self.pos, buf)?;
        self.pos += n;
        Ok(n)
    }
}

impl<A: RegisterAccess> io::Write for Session<'_, A> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.handle.write_at(self.pos, buf)?;
        self.pos += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<A: RegisterAccess> io::Seek for Session<'_, A> {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        Ok(self.seek_to(pos)? as u64)
    }
}
