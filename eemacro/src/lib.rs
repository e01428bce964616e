//! Persistent macro storage for keyboard firmware.
//!
//! Records sequences of key-actions (press/release events on a layer, row and
//! column of the layout matrix) into a small fixed region of non-volatile
//! memory, so a single trigger key can later replay them. The region holds a
//! log of type-tagged, length-prefixed records behind a 5-byte header; the
//! store implements the record framing, trigger lookup, tombstone deletion
//! and in-place compaction itself, on top of nothing but byte-level storage.
//!
//! Macros are convenience data: a header or version mismatch at boot, or a
//! power loss at the wrong moment, wipes the region rather than attempting
//! recovery. Within that contract every mutation is ordered so that the log
//! stays parseable between any two committed writes.
//!
//! The storage driver is abstracted by [`eeprom::Eeprom`]; the keyboard's
//! layout engine connects through [`LayoutExecutor`] for replay and through
//! [`MacroStorageConfig::record_filter`] for the recording policy.

#![no_std]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod eeprom;
pub mod key_action;

mod compactor;
mod format;
mod player;
mod recorder;
mod store;

pub use config::MacroStorageConfig;
pub use format::FORMAT_VERSION;
pub use key_action::{KeyAction, MAX_ENCODED_KEY_ACTION};
pub use player::LayoutExecutor;
pub use store::{Error, MacroStore};
