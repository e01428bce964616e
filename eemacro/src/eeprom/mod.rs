//! Non-volatile byte storage drivers.
//!
//! The macro store addresses its memory through the [`Eeprom`] trait: single
//! byte reads and writes plus a bounded range copy, all in a flat `u16`
//! address space. Writes may be queued and committed later (typically at idle
//! points of the scan cycle); the store only relies on two properties:
//!
//! - submission order is preserved (FIFO commit),
//! - reads observe queued-but-uncommitted writes.

mod ram;

pub use ram::{QueuedEeprom, RamEeprom};

use embedded_storage::Storage;

pub trait Eeprom {
    type Error: core::fmt::Debug;

    /// Read one byte. Must reflect queued writes that have not committed yet.
    fn read(&mut self, addr: u16) -> Result<u8, Self::Error>;

    /// Write one byte. May be queued; commit order must match submission
    /// order.
    fn write(&mut self, addr: u16, value: u8) -> Result<(), Self::Error>;

    /// Copy `len` bytes from `src` to `dst`, ordered like `write`.
    ///
    /// Overlapping ranges are only required to work for `dst < src` (a
    /// left-moving shift, copied front to back).
    fn copy(&mut self, dst: u16, src: u16, len: u8) -> Result<(), Self::Error>;

    /// Commit all queued writes. Immediately-durable implementations may make
    /// this a no-op.
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Adapter exposing any [`embedded_storage::Storage`] implementor as an
/// [`Eeprom`].
///
/// Writes go straight through, so durability is whatever the wrapped storage
/// provides and `flush` is a no-op. `copy` stages each chunk in a RAM buffer
/// before writing it back, which keeps overlapping ranges intact.
pub struct StorageEeprom<S: Storage> {
    storage: S,
}

impl<S: Storage> StorageEeprom<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn into_inner(self) -> S {
        self.storage
    }
}

impl<S: Storage> Eeprom for StorageEeprom<S>
where
    S::Error: core::fmt::Debug,
{
    type Error = S::Error;

    fn read(&mut self, addr: u16) -> Result<u8, Self::Error> {
        let mut buffer = [0u8; 1];
        self.storage.read(addr as u32, &mut buffer)?;
        Ok(buffer[0])
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), Self::Error> {
        self.storage.write(addr as u32, &[value])
    }

    fn copy(&mut self, dst: u16, src: u16, len: u8) -> Result<(), Self::Error> {
        let mut buffer = [0u8; u8::MAX as usize];
        let chunk = &mut buffer[..len as usize];
        self.storage.read(src as u32, chunk)?;
        self.storage.write(dst as u32, &buffer[..len as usize])
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
