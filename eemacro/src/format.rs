//! On-media layout of the macro region.
//!
//! The region starts with a 5-byte header, followed by the macro log:
//!
//! ```text
//! | start address (BE u16) | end address (BE u16) | version |  records ...  |
//! ```
//!
//! Each record is a type byte, a length byte (total record size, header
//! included) and data; the log is terminated by a single `End` type byte with
//! no length. The header addresses are written so that a build whose region
//! moved or changed size cannot misread data written by an older build; any
//! mismatch wipes the region.

use byteorder::{BigEndian, ByteOrder};

use crate::config::MacroStorageConfig;

/// Version byte of the on-media layout.
///
/// `0x00` and `0xFF` are reserved to mean "uninitialized or inconsistent"
/// (`0xFF` is the erased state of the memory).
pub const FORMAT_VERSION: u8 = 0x01;

pub(crate) const HEADER_LEN: u16 = 5;

/// Type and length bytes preceding every record's data.
pub(crate) const RECORD_HEADER_LEN: u16 = 2;

/// Total size cap of one physical record, limited by the 1-byte length field.
pub(crate) const MAX_RECORD_LEN: u16 = u8::MAX as u16;

/// Record type tags as stored on media.
///
/// `End` shares its value with the erased state of the memory, so a freshly
/// erased log reads as already terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub(crate) enum RecordType {
    Deleted = 0x00,
    ValidMacro = 0x01,
    Continued = 0x02,
    End = 0xFF,
}

impl RecordType {
    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(RecordType::Deleted),
            0x01 => Some(RecordType::ValidMacro),
            0x02 => Some(RecordType::Continued),
            0xFF => Some(RecordType::End),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct Header {
    pub(crate) start: u16,
    pub(crate) end: u16,
    pub(crate) version: u8,
}

impl Header {
    /// The header a correctly initialized region is expected to carry.
    pub(crate) fn expected(config: &MacroStorageConfig) -> Self {
        Self {
            start: config.start,
            end: config.end,
            version: FORMAT_VERSION,
        }
    }

    pub(crate) fn serialize_into(&self, buffer: &mut [u8; HEADER_LEN as usize]) {
        BigEndian::write_u16(&mut buffer[0..2], self.start);
        BigEndian::write_u16(&mut buffer[2..4], self.end);
        buffer[4] = self.version;
    }

    pub(crate) fn deserialize_from(buffer: &[u8; HEADER_LEN as usize]) -> Self {
        Self {
            start: BigEndian::read_u16(&buffer[0..2]),
            end: BigEndian::read_u16(&buffer[2..4]),
            version: buffer[4],
        }
    }
}
