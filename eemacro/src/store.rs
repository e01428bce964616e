use crate::config::MacroStorageConfig;
use crate::eeprom::Eeprom;
use crate::format::{FORMAT_VERSION, HEADER_LEN, Header, RECORD_HEADER_LEN, RecordType};
use crate::key_action::KeyAction;
use crate::recorder::RecorderState;

/// Errors surfaced by the macro store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Not enough room left before the end of the region to append safely
    /// (space for the terminating end marker is always kept). Nothing was
    /// written.
    OutOfSpace,
    /// No stored macro is triggered by the given key-action.
    NotFound,
    /// `record_init` was called while a recording was already in progress.
    AlreadyRecording,
    /// A recording operation was called while no recording was in progress.
    NotRecording,
    /// A scan would have left the configured region, or hit an unknown record
    /// type. The log does not get here through any documented mutation, so no
    /// recovery is attempted at runtime; at boot this triggers
    /// reinitialization instead.
    Corrupted,
    /// Error from the underlying storage driver.
    Storage(E),
}

/// Persistent macro store over a fixed non-volatile region.
///
/// Owns the region described by its [`MacroStorageConfig`]: a 5-byte header
/// followed by a log of type-tagged, length-prefixed records, terminated by a
/// single end marker. The position of that marker (`end_macro`) is the only
/// log state kept in RAM; everything else is re-derived from the media by
/// linear scans, which is cheap at the involved sizes and keeps every call
/// restartable.
pub struct MacroStore<E: Eeprom> {
    pub(crate) eeprom: E,
    pub(crate) config: MacroStorageConfig,
    /// Address of the record terminating the log.
    pub(crate) end_macro: u16,
    pub(crate) state: RecorderState,
}

impl<E: Eeprom> MacroStore<E> {
    /// Mount the store, validating the region header.
    ///
    /// A header that does not carry the expected start/end addresses and
    /// version — a fresh chip, a relocated region, an old layout — wipes the
    /// region and starts an empty log. That is not an error: stored macros
    /// are convenience data and are simply dropped.
    pub fn new(eeprom: E, config: MacroStorageConfig) -> Result<Self, Error<E::Error>> {
        assert!(
            config.start as u32 + (HEADER_LEN + RECORD_HEADER_LEN) as u32 <= config.end as u32,
            "macro region too small for header and log"
        );
        let region_len = (config.end - config.start) as u32 + 1;
        if region_len < 300 {
            warn!("only {} bytes allocated for macros", region_len);
        }

        let mut store = Self {
            eeprom,
            config,
            end_macro: 0,
            state: RecorderState::Idle,
        };
        store.init()?;
        Ok(store)
    }

    fn init(&mut self) -> Result<(), Error<E::Error>> {
        let mut buffer = [0u8; HEADER_LEN as usize];
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = self.read_at(self.config.start + i as u16)?;
        }
        let stored = Header::deserialize_from(&buffer);

        if stored != Header::expected(&self.config) {
            info!(
                "macro region header mismatch (version {}), reinitializing",
                stored.version
            );
            return self.reinitialize();
        }

        match self.scan_for_end() {
            Ok(addr) => {
                self.end_macro = addr;
                debug!(
                    "macro region mounted, {} of {} bytes free",
                    self.free_bytes(),
                    self.macros_end() - self.macros_start()
                );
                Ok(())
            }
            // A log without a reachable end marker (e.g. power lost between
            // queued commits) cannot be trusted; start over.
            Err(Error::Corrupted) => {
                warn!("macro log has no end marker, reinitializing");
                self.reinitialize()
            }
            Err(e) => Err(e),
        }
    }

    fn reinitialize(&mut self) -> Result<(), Error<E::Error>> {
        let mut buffer = [0u8; HEADER_LEN as usize];
        Header::expected(&self.config).serialize_into(&mut buffer);
        for (i, byte) in buffer.iter().enumerate() {
            self.write_at(self.config.start + i as u16, *byte)?;
        }
        self.write_at(self.macros_start(), RecordType::End as u8)?;
        self.end_macro = self.macros_start();
        self.state = RecorderState::Idle;
        self.eeprom.flush().map_err(Error::Storage)?;
        info!("macro region initialized, version {}", FORMAT_VERSION);
        Ok(())
    }

    /// Address of the first log byte.
    pub(crate) fn macros_start(&self) -> u16 {
        self.config.start + HEADER_LEN
    }

    /// Address of the last usable log byte, inclusive.
    pub(crate) fn macros_end(&self) -> u16 {
        self.config.end
    }

    pub(crate) fn read_at(&mut self, addr: u16) -> Result<u8, Error<E::Error>> {
        if addr < self.config.start || addr > self.config.end {
            return Err(Error::Corrupted);
        }
        self.eeprom.read(addr).map_err(Error::Storage)
    }

    pub(crate) fn write_at(&mut self, addr: u16, value: u8) -> Result<(), Error<E::Error>> {
        if addr < self.config.start || addr > self.config.end {
            return Err(Error::Corrupted);
        }
        self.eeprom.write(addr, value).map_err(Error::Storage)
    }

    /// Record type at `addr`, or `Corrupted` for a byte no record starts with.
    pub(crate) fn record_type_at(&mut self, addr: u16) -> Result<RecordType, Error<E::Error>> {
        let value = self.read_at(addr)?;
        RecordType::from_u8(value).ok_or(Error::Corrupted)
    }

    /// Address of the record following the one at `addr` (not valid for the
    /// end marker, which has no length).
    pub(crate) fn next_record_addr(&mut self, addr: u16) -> Result<u16, Error<E::Error>> {
        let length = self.read_at(addr.wrapping_add(1))? as u32;
        if length < RECORD_HEADER_LEN as u32 {
            return Err(Error::Corrupted);
        }
        let next = addr as u32 + length;
        // Some record, if only the end marker, must still fit behind it.
        if next > self.macros_end() as u32 {
            return Err(Error::Corrupted);
        }
        Ok(next as u16)
    }

    fn scan_for_end(&mut self) -> Result<u16, Error<E::Error>> {
        let mut addr = self.macros_start();
        loop {
            match self.record_type_at(addr)? {
                RecordType::End => return Ok(addr),
                _ => addr = self.next_record_addr(addr)?,
            }
        }
    }

    /// Decode the key-action stored at `addr`.
    pub(crate) fn read_key_action_at(&mut self, addr: u16) -> Result<KeyAction, Error<E::Error>> {
        let mut cursor = addr;
        let mut read = || {
            let byte = self.read_at(cursor)?;
            cursor = cursor.wrapping_add(1);
            Ok(byte)
        };
        KeyAction::decode(&mut read)
    }

    /// Address of the macro triggered by `trigger`, if one is stored.
    ///
    /// Linear scan: deleted and continuation records are skipped by their
    /// length, valid records are compared by their decoded trigger.
    pub fn find_by_trigger(&mut self, trigger: KeyAction) -> Result<Option<u16>, Error<E::Error>> {
        let mut addr = self.macros_start();
        loop {
            match self.record_type_at(addr)? {
                RecordType::End => return Ok(None),
                RecordType::ValidMacro => {
                    let stored = self.read_key_action_at(addr + RECORD_HEADER_LEN)?;
                    if stored == trigger {
                        return Ok(Some(addr));
                    }
                }
                RecordType::Deleted | RecordType::Continued => {}
            }
            addr = self.next_record_addr(addr)?;
        }
    }

    /// First deleted record at or after `from`, if any remains before the end
    /// marker.
    pub(crate) fn find_next_deleted(&mut self, from: u16) -> Result<Option<u16>, Error<E::Error>> {
        let mut addr = from;
        loop {
            match self.record_type_at(addr)? {
                RecordType::End => return Ok(None),
                RecordType::Deleted => return Ok(Some(addr)),
                _ => addr = self.next_record_addr(addr)?,
            }
        }
    }

    /// First record at or after `from` that is neither deleted nor a
    /// continuation. Always terminates: the end marker qualifies.
    pub(crate) fn find_next_nondeleted(&mut self, from: u16) -> Result<u16, Error<E::Error>> {
        let mut addr = from;
        loop {
            match self.record_type_at(addr)? {
                RecordType::Deleted | RecordType::Continued => {
                    addr = self.next_record_addr(addr)?;
                }
                RecordType::ValidMacro | RecordType::End => return Ok(addr),
            }
        }
    }

    /// Whether a macro triggered by `trigger` is stored.
    pub fn exists(&mut self, trigger: KeyAction) -> Result<bool, Error<E::Error>> {
        Ok(self.find_by_trigger(trigger)?.is_some())
    }

    /// Mark the macro triggered by `trigger` as deleted.
    ///
    /// Only the type byte is rewritten; length and data stay in place until
    /// compaction reclaims them. Continuation records of the macro become
    /// unreachable through the same tombstone. Returns whether a macro was
    /// found; clearing an absent trigger is a no-op.
    pub fn clear(&mut self, trigger: KeyAction) -> Result<bool, Error<E::Error>> {
        match self.find_by_trigger(trigger)? {
            Some(addr) => {
                self.write_at(addr, RecordType::Deleted as u8)?;
                info!("cleared macro at {}", addr);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop every stored macro by truncating the log to a single end marker.
    ///
    /// One write, atomic at the driver's write granularity. An in-progress
    /// recording is aborted.
    pub fn clear_all(&mut self) -> Result<(), Error<E::Error>> {
        if matches!(self.state, RecorderState::Recording(_)) {
            warn!("clear_all while recording, aborting the recording");
            self.state = RecorderState::Idle;
        }
        self.write_at(self.macros_start(), RecordType::End as u8)?;
        self.end_macro = self.macros_start();
        info!("cleared all macros");
        Ok(())
    }

    /// Bytes available for new records before the end of the region.
    pub fn free_bytes(&self) -> u16 {
        self.macros_end() - self.end_macro
    }

    /// Bytes currently held by deleted records and their orphaned
    /// continuations, all of which a compaction pass would reclaim.
    pub fn reclaimable_bytes(&mut self) -> Result<u16, Error<E::Error>> {
        let mut addr = self.macros_start();
        let mut reclaimable = 0u16;
        let mut live = false;
        loop {
            match self.record_type_at(addr)? {
                RecordType::End => return Ok(reclaimable),
                RecordType::ValidMacro => live = true,
                RecordType::Deleted => live = false,
                RecordType::Continued => {}
            }
            let next = self.next_record_addr(addr)?;
            if !live {
                reclaimable += next - addr;
            }
            addr = next;
        }
    }

    /// Commit all queued writes to the driver.
    pub fn flush(&mut self) -> Result<(), Error<E::Error>> {
        self.eeprom.flush().map_err(Error::Storage)
    }

    /// Hand the storage driver back, consuming the store.
    pub fn into_inner(self) -> E {
        self.eeprom
    }
}
