use heapless::Vec;
use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};

/// Longest possible encoding of a key-action, in bytes.
pub const MAX_ENCODED_KEY_ACTION: usize = 4;

/// The press or release of one key on one layer of the layout matrix.
///
/// The four fields together reference a key unambiguously, so a `KeyAction`
/// also serves as the UID a macro is looked up by.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, MaxSize, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyAction {
    pub pressed: bool,
    pub layer: u8,
    pub row: u8,
    pub column: u8,
}

impl KeyAction {
    pub const fn press(layer: u8, row: u8, column: u8) -> Self {
        Self {
            pressed: true,
            layer,
            row,
            column,
        }
    }

    pub const fn release(layer: u8, row: u8, column: u8) -> Self {
        Self {
            pressed: false,
            layer,
            row,
            column,
        }
    }

    /// Encode into the variable-length on-media form.
    ///
    /// `layer`, `row` and `column` are handled as 4 pairs of bits each, most
    /// significant pair first. Leading pairs that are zero in *all three*
    /// fields are not written (at most 3 may be skipped; the least significant
    /// pair is always written). Each output byte packs:
    ///
    /// ```text
    /// | 7         | 6       | 5 4   | 3 2 | 1 0    |
    /// | continued | pressed | layer | row | column |
    /// ```
    ///
    /// `pressed` occupies bit 6 of the first byte only; subsequent bytes carry
    /// a fixed `1` there so no continuation byte can read as an all-zero
    /// terminator.
    pub fn encode(&self) -> Vec<u8, MAX_ENCODED_KEY_ACTION> {
        let mut layer = self.layer;
        let mut row = self.row;
        let mut column = self.column;

        let mut skipped = 0;
        while skipped < 3 && (layer | row | column) & 0xC0 == 0 {
            layer <<= 2;
            row <<= 2;
            column <<= 2;
            skipped += 1;
        }

        let mut out = Vec::new();
        let mut byte = (self.pressed as u8) << 6;
        for pair in skipped..4 {
            byte |= (((pair < 3) as u8) << 7)
                | ((layer & 0xC0) >> 2)
                | ((row & 0xC0) >> 4)
                | ((column & 0xC0) >> 6);
            out.push(byte).expect("at most 4 bytes are produced");
            byte = 1 << 6;

            layer <<= 2;
            row <<= 2;
            column <<= 2;
        }
        out
    }

    /// Decode a key-action from a byte source.
    ///
    /// Reads 1 to 4 bytes. The stream is trusted: the number of continuation
    /// bytes is not bounded here, so the caller must not hand this a cursor
    /// positioned on foreign or corrupt data.
    pub fn decode<E>(read: &mut impl FnMut() -> Result<u8, E>) -> Result<Self, E> {
        // The first byte is the only one carrying `pressed`.
        let mut byte = read()?;
        let mut action = KeyAction {
            pressed: byte >> 6 & 0b01 != 0,
            layer: byte >> 4 & 0b11,
            row: byte >> 2 & 0b11,
            column: byte & 0b11,
        };

        while byte >> 7 != 0 {
            byte = read()?;
            action.layer = action.layer << 2 | byte >> 4 & 0b11;
            action.row = action.row << 2 | byte >> 2 & 0b11;
            action.column = action.column << 2 | byte & 0b11;
        }

        Ok(action)
    }
}
