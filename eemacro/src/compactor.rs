use crate::eeprom::Eeprom;
use crate::format::RecordType;
use crate::recorder::RecorderState;
use crate::store::{Error, MacroStore};

impl<E: Eeprom> MacroStore<E> {
    /// Reclaim the space held by deleted records.
    ///
    /// Runs of live records are copied toward the start of the region, in
    /// order, collapsing every tombstone; afterwards the freed space is one
    /// contiguous tail behind the end marker.
    ///
    /// The write ordering keeps the log parseable at every point of the
    /// commit sequence, relying only on the driver committing in submission
    /// order:
    ///
    /// 1. an end marker over the first tombstone truncates the log to the
    ///    still-intact prefix (macros behind it just disappear for a moment),
    /// 2. each run's bytes are copied into the dead zone, past the published
    ///    end,
    /// 3. an end marker is written after the copied run,
    /// 4. the run's first type byte is written last, atomically publishing
    ///    the run together with its new terminator.
    ///
    /// Interrupted anywhere, the log stays valid; unreached live records are
    /// invisible until a later pass, and rerunning the compactor absorbs
    /// whatever garbage was left behind the marker.
    pub fn compact(&mut self) -> Result<(), Error<E::Error>> {
        if matches!(self.state, RecorderState::Recording(_)) {
            return Err(Error::AlreadyRecording);
        }

        let old_end = self.end_macro;
        let Some(mut to_overwrite) = self.find_next_deleted(self.macros_start())? else {
            debug!("no deleted macros, nothing to compact");
            return Ok(());
        };
        info!("compacting macro log");

        // Works on the first loop entry as well: the scan leaves the first
        // tombstone run immediately.
        let mut next = self.find_next_nondeleted(to_overwrite)?;

        self.write_at(to_overwrite, RecordType::End as u8)?;

        while next != old_end {
            // `to_compress` opens the next run of live bytes, `next` ends it.
            let to_compress = self.find_next_nondeleted(next)?;
            if to_compress == old_end {
                break;
            }
            next = match self.find_next_deleted(to_compress)? {
                Some(addr) => addr,
                None => old_end,
            };

            let run_type = self.read_at(to_compress)?;
            let type_location = to_overwrite;
            to_overwrite += 1;

            let mut src = to_compress + 1;
            while src < next {
                let chunk = u16::min(next - src, u8::MAX as u16) as u8;
                self.eeprom
                    .copy(to_overwrite, src, chunk)
                    .map_err(Error::Storage)?;
                to_overwrite += chunk as u16;
                src += chunk as u16;
            }

            // Terminate behind the copy, then publish. The marker lands where
            // the next run's type byte goes, so it is transient unless this
            // run was the last.
            self.write_at(to_overwrite, RecordType::End as u8)?;
            self.write_at(type_location, run_type)?;
        }

        self.end_macro = to_overwrite;
        info!(
            "compaction reclaimed {} bytes, {} free",
            old_end - to_overwrite,
            self.free_bytes()
        );
        Ok(())
    }
}
