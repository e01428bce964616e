use crate::eeprom::Eeprom;
use crate::format::{MAX_RECORD_LEN, RECORD_HEADER_LEN, RecordType};
use crate::key_action::{KeyAction, MAX_ENCODED_KEY_ACTION};
use crate::store::{Error, MacroStore};

#[derive(Clone, Copy, Debug)]
pub(crate) enum RecorderState {
    Idle,
    Recording(Recording),
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Recording {
    /// First physical record of the macro. Its type byte stays unwritten (the
    /// old end marker) until `record_finalize` publishes it, so lookups keep
    /// seeing the previous log state for the whole recording.
    first_record: u16,
    /// The currently open physical record.
    open_record: u16,
    /// Next unwritten byte.
    write_addr: u16,
}

impl<E: Eeprom> MacroStore<E> {
    /// Begin recording a macro triggered by `trigger`.
    ///
    /// Reserves the new record at the current end of the log and writes the
    /// encoded trigger as its first data bytes. Fails with `OutOfSpace` when
    /// the region cannot hold a record header, a worst-case trigger encoding
    /// and the terminating end marker.
    pub fn record_init(&mut self, trigger: KeyAction) -> Result<(), Error<E::Error>> {
        if matches!(self.state, RecorderState::Recording(_)) {
            return Err(Error::AlreadyRecording);
        }

        let start = self.end_macro;
        let worst_case = (RECORD_HEADER_LEN as u32) + MAX_ENCODED_KEY_ACTION as u32;
        if start as u32 + worst_case > self.macros_end() as u32 {
            return Err(Error::OutOfSpace);
        }

        let mut addr = start + RECORD_HEADER_LEN;
        for byte in trigger.encode() {
            self.write_at(addr, byte)?;
            addr += 1;
        }

        self.state = RecorderState::Recording(Recording {
            first_record: start,
            open_record: start,
            write_addr: addr,
        });
        debug!("recording macro at {}", start);
        Ok(())
    }

    /// Append one key-action to the macro being recorded.
    ///
    /// Key-actions the configured filter rejects (layer shifts, typically)
    /// are skipped without error. When the encoded action would push the open
    /// record past the 255-byte cap, the record is closed and a continuation
    /// record is opened; callers never see the split. Fails with `OutOfSpace`
    /// if the action (plus the reserved end marker) no longer fits, leaving
    /// the log and the recording exactly as they were.
    pub fn record_action(&mut self, key_action: KeyAction) -> Result<(), Error<E::Error>> {
        let RecorderState::Recording(mut rec) = self.state else {
            return Err(Error::NotRecording);
        };

        if (self.config.record_filter)(&key_action) {
            debug!("not recording filtered key-action");
            return Ok(());
        }

        let encoded = key_action.encode();
        let open_len = (rec.write_addr - rec.open_record) as u32;

        if open_len + encoded.len() as u32 > MAX_RECORD_LEN as u32 {
            // Check the space for the continuation before touching anything.
            if rec.write_addr as u32 + RECORD_HEADER_LEN as u32 + encoded.len() as u32
                > self.macros_end() as u32
            {
                return Err(Error::OutOfSpace);
            }
            self.write_at(rec.open_record + 1, open_len as u8)?;
            self.write_at(rec.write_addr, RecordType::Continued as u8)?;
            rec.open_record = rec.write_addr;
            rec.write_addr += RECORD_HEADER_LEN;
        } else if rec.write_addr as u32 + encoded.len() as u32 > self.macros_end() as u32 {
            return Err(Error::OutOfSpace);
        }

        for byte in encoded {
            self.write_at(rec.write_addr, byte)?;
            rec.write_addr += 1;
        }

        self.state = RecorderState::Recording(rec);
        Ok(())
    }

    /// Commit the macro being recorded.
    ///
    /// Writes the open record's final length and the new end marker, then
    /// publishes the macro by writing its type byte last: with the driver
    /// committing in submission order, an interrupted finalize leaves the old
    /// log instead of a half-visible macro.
    pub fn record_finalize(&mut self) -> Result<(), Error<E::Error>> {
        let RecorderState::Recording(rec) = self.state else {
            return Err(Error::NotRecording);
        };

        let open_len = rec.write_addr - rec.open_record;
        self.write_at(rec.open_record + 1, open_len as u8)?;
        self.write_at(rec.write_addr, RecordType::End as u8)?;
        self.write_at(rec.first_record, RecordType::ValidMacro as u8)?;

        self.end_macro = rec.write_addr;
        self.state = RecorderState::Idle;
        info!(
            "recorded macro at {}, {} bytes free",
            rec.first_record,
            self.free_bytes()
        );
        Ok(())
    }

    /// Abandon the macro being recorded.
    ///
    /// Nothing was published, so the log is untouched: the head record's type
    /// byte still reads as the end marker and every byte written past it is
    /// unused capacity again.
    pub fn record_cancel(&mut self) -> Result<(), Error<E::Error>> {
        let RecorderState::Recording(rec) = self.state else {
            return Err(Error::NotRecording);
        };
        self.state = RecorderState::Idle;
        debug!("cancelled recording at {}", rec.first_record);
        Ok(())
    }
}
