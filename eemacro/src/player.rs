use crate::eeprom::Eeprom;
use crate::format::{RECORD_HEADER_LEN, RecordType};
use crate::key_action::KeyAction;
use crate::store::{Error, MacroStore};

/// The layout-execution side of the keyboard, as the macro store sees it.
///
/// Injected key-actions go through the same downstream processing as live
/// keystrokes (layer resolution and all); that is this collaborator's
/// responsibility, not the store's.
pub trait LayoutExecutor {
    fn execute_key_action(&mut self, key_action: KeyAction);
}

/// Read position inside a macro's data stream.
///
/// `record_end` is the address one past the open record's last data byte;
/// stepping across it continues into a following continuation record, so the
/// stream reads as contiguous even when a single key-action's bytes straddle
/// a record boundary.
struct DataCursor {
    cur: u16,
    record_end: u16,
}

impl<E: Eeprom> MacroStore<E> {
    /// Replay the macro triggered by `trigger` through `layout`, in recorded
    /// order.
    pub fn play(
        &mut self,
        trigger: KeyAction,
        layout: &mut impl LayoutExecutor,
    ) -> Result<(), Error<E::Error>> {
        let Some(addr) = self.find_by_trigger(trigger)? else {
            return Err(Error::NotFound);
        };

        let length = self.read_at(addr + 1)? as u16;
        let mut cursor = DataCursor {
            cur: addr + RECORD_HEADER_LEN,
            record_end: addr + length,
        };

        // The stored data opens with the trigger itself.
        if self.next_key_action(&mut cursor)?.is_none() {
            return Err(Error::Corrupted);
        }

        debug!("replaying macro at {}", addr);
        while let Some(key_action) = self.next_key_action(&mut cursor)? {
            layout.execute_key_action(key_action);
        }
        Ok(())
    }

    fn next_key_action(
        &mut self,
        cursor: &mut DataCursor,
    ) -> Result<Option<KeyAction>, Error<E::Error>> {
        if self.cursor_exhausted(cursor)? {
            return Ok(None);
        }
        let mut read = || self.cursor_next_byte(cursor);
        KeyAction::decode(&mut read).map(Some)
    }

    /// Whether the data stream has ended, hopping into the next continuation
    /// record when the open one is used up.
    fn cursor_exhausted(&mut self, cursor: &mut DataCursor) -> Result<bool, Error<E::Error>> {
        loop {
            if cursor.cur < cursor.record_end {
                return Ok(false);
            }
            match self.record_type_at(cursor.record_end)? {
                RecordType::Continued => {
                    let next_end = self.next_record_addr(cursor.record_end)?;
                    cursor.cur = cursor.record_end + RECORD_HEADER_LEN;
                    cursor.record_end = next_end;
                }
                _ => return Ok(true),
            }
        }
    }

    fn cursor_next_byte(&mut self, cursor: &mut DataCursor) -> Result<u8, Error<E::Error>> {
        if self.cursor_exhausted(cursor)? {
            // A key-action promised more bytes than the macro holds.
            return Err(Error::Corrupted);
        }
        let byte = self.read_at(cursor.cur)?;
        cursor.cur += 1;
        Ok(byte)
    }
}
